//! # portcullis-auth
//!
//! Runtime-registered external identity providers for the Portcullis
//! server.
//!
//! This crate provides:
//! - The identity provider record and its store contract, with an in-memory store
//! - Conversion of records into validated OpenID Connect handler options
//! - Scheme and handler resolution that layers stored providers over the
//!   boot-time ones, building each handler at most once
//! - An OpenID Connect handler backed by a discovery client
//!
//! ## Modules
//!
//! - [`config`] - Federation configuration
//! - [`federation`] - Store, options, scheme and handler resolution
//! - [`http`] - Admin API request/response types

pub mod config;
pub mod federation;
pub mod http;

pub use config::{ConfigError, FederationConfig};
pub use federation::{
    DynamicHandlerProvider, DynamicSchemeProvider, FederationError, IdentityProviderRecord,
    IdentityProviderStore, StoreError,
};
