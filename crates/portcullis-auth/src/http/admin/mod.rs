//! Admin API types.
//!
//! The route handlers live in `portcullis-server`; this module holds the
//! request/response bodies so they can be shared and tested without a
//! running server.

pub mod types;

pub use types::{
    CreateProviderRequest, DEFAULT_TAKE, MAX_TAKE, Page, ProviderResource, ProviderSearchParams,
    ProviderSummary, provider_location,
};
