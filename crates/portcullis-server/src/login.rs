//! Login endpoint.
//!
//! Resolves the authentication handler for a scheme name and redirects the
//! user agent to the partner's authorization endpoint.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use portcullis_api::ApiError;
use portcullis_auth::federation::{
    DynamicHandlerProvider, DynamicSchemeProvider, HandlerProvider, RequestContext,
};
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

/// State for the login and scheme listing endpoints.
#[derive(Clone)]
pub struct LoginState {
    pub schemes: Arc<DynamicSchemeProvider>,
    pub handlers: Arc<DynamicHandlerProvider>,
    pub base_url: Url,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    pub state: Option<String>,
    pub nonce: Option<String>,
}

/// GET /login/{scheme} - Redirect to the partner's login page.
///
/// `state` and `nonce` are generated when omitted.
pub async fn login(
    State(state): State<LoginState>,
    Path(scheme): Path<String>,
    Query(params): Query<LoginParams>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext::new(state.base_url.clone()).with_request_id(request_id.clone());

    let Some(handler) = state.handlers.get_handler(&ctx, &scheme).await? else {
        tracing::debug!(scheme = %scheme, request_id = %request_id, "Unknown scheme requested");
        return Err(ApiError::not_found(format!(
            "Unknown identity provider '{}'",
            scheme
        )));
    };

    let login_state = params
        .state
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let nonce = params
        .nonce
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    let url = handler.challenge(&ctx, &login_state, &nonce)?;
    tracing::debug!(scheme = %scheme, request_id = %request_id, "Redirecting to identity provider");

    Ok((StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response())
}
