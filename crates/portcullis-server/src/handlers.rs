use axum::Json;
use axum::extract::State;
use portcullis_api::ApiError;
use portcullis_auth::federation::{AuthenticationScheme, SchemeProvider};
use serde_json::{Value, json};

use crate::login::LoginState;

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/schemes - Static schemes first, then stored providers.
///
/// A stored provider sharing a static scheme's name is listed twice; the
/// `source` field tells the entries apart.
pub async fn list_schemes(
    State(state): State<LoginState>,
) -> Result<Json<Vec<AuthenticationScheme>>, ApiError> {
    Ok(Json(state.schemes.get_all_schemes().await?))
}
