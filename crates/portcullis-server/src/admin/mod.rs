//! Identity provider administration API.

pub mod auth;
pub mod identity_provider;
pub mod state;

use axum::Router;
use axum::extract::FromRef;
use axum::routing::get;

pub use auth::AdminAccess;
pub use state::AdminState;

/// Routes under `/api/providers`. `GET` routes also answer `HEAD`.
pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    AdminState: FromRef<S>,
{
    Router::new()
        .route(
            "/api/providers",
            get(identity_provider::list_identity_providers)
                .post(identity_provider::create_identity_provider),
        )
        .route(
            "/api/providers/{name}",
            get(identity_provider::read_identity_provider)
                .delete(identity_provider::delete_identity_provider),
        )
}
