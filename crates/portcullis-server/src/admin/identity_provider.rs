//! Identity provider admin handlers.
//!
//! CRUD over the identity provider store. Records are validated through the
//! options factory before they are persisted, so a provider that would fail
//! at login time is rejected at creation time instead.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use portcullis_api::ApiError;
use portcullis_auth::http::admin::{
    CreateProviderRequest, Page, ProviderResource, ProviderSearchParams, ProviderSummary,
    provider_location,
};

use super::auth::AdminAccess;
use super::state::AdminState;

fn missing_field_message(field: &str) -> String {
    let what = match field {
        "name" => "a name",
        "authority" => "an authority",
        "clientId" => "a client ID",
        other => other,
    };
    format!("Cannot create an identity provider without {what}")
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/providers - List identity providers.
///
/// Query parameters:
/// - `name`: case-insensitive name prefix
/// - `skip`: results to skip (negative counts as 0)
/// - `take`: page size, clamped to 0..=100 (default: 20)
pub async fn list_identity_providers(
    _admin: AdminAccess,
    State(state): State<AdminState>,
    Query(params): Query<ProviderSearchParams>,
) -> Result<Json<Page<ProviderSummary>>, ApiError> {
    let records = state.store.query().await?;
    let page = params
        .apply(records)
        .map(|record| ProviderSummary::new(record, &state.base_url));

    Ok(Json(page))
}

/// GET /api/providers/{name} - Read a single identity provider.
pub async fn read_identity_provider(
    _admin: AdminAccess,
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<ProviderResource>, ApiError> {
    let record = state
        .store
        .find(&name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Identity provider '{}' not found", name)))?;

    Ok(Json(record.into()))
}

/// POST /api/providers - Register a new identity provider.
pub async fn create_identity_provider(
    _admin: AdminAccess,
    State(state): State<AdminState>,
    Json(request): Json<CreateProviderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = request.into_record();

    if let Some(field) = record.missing_required_field() {
        return Err(ApiError::bad_request(missing_field_message(field)));
    }

    if state.store.find(&record.name).await?.is_some() {
        return Err(ApiError::conflict(format!(
            "Identity provider '{}' already exists",
            record.name
        )));
    }

    // Reject configurations that could never produce a working handler.
    state.options_factory.create(&record)?;

    let name = record.name.clone();
    state.store.upsert(&name, record.clone()).await?;

    tracing::info!(
        provider = %name,
        authority = %record.authority,
        "Identity provider created"
    );

    let location = provider_location(&state.base_url, &name);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ProviderResource::from(record)),
    ))
}

/// DELETE /api/providers/{name} - Remove an identity provider.
///
/// Always succeeds, whether or not the provider existed.
pub async fn delete_identity_provider(
    _admin: AdminAccess,
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.remove(&name).await?;

    if state.invalidate_on_delete && state.handlers.invalidate(&name) {
        tracing::debug!(provider = %name, "Dropped cached handler for deleted provider");
    }

    tracing::info!(provider = %name, "Identity provider deleted");
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_messages() {
        assert_eq!(
            missing_field_message("name"),
            "Cannot create an identity provider without a name"
        );
        assert_eq!(
            missing_field_message("authority"),
            "Cannot create an identity provider without an authority"
        );
        assert_eq!(
            missing_field_message("clientId"),
            "Cannot create an identity provider without a client ID"
        );
    }
}
