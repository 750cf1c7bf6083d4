//! Admin API access extractor.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use portcullis_api::ApiError;
use subtle::ConstantTimeEq;

use super::state::AdminState;

/// Proof that the request may use the admin API.
///
/// When `admin.api_token` is configured the request must carry
/// `Authorization: Bearer <token>`; otherwise every request is admitted.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}

impl<S> FromRequestParts<S> for AdminAccess
where
    S: Send + Sync,
    AdminState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let admin = AdminState::from_ref(state);
        let Some(expected) = admin.api_token.as_deref() else {
            return Ok(Self);
        };

        let presented = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        match presented {
            Some(token) if tokens_match(token, expected) => Ok(Self),
            Some(_) => {
                tracing::debug!("Admin access denied: token mismatch");
                Err(ApiError::unauthorized("Invalid admin token"))
            }
            None => Err(ApiError::unauthorized("Admin token required")),
        }
    }
}
