//! Dynamic identity provider federation.
//!
//! Operators register OpenID Connect partners at runtime through an
//! [`IdentityProviderStore`]. [`DynamicSchemeProvider`] and
//! [`DynamicHandlerProvider`] decorate the boot-time scheme and handler
//! providers so those partners can be logged in with, by name, without a
//! restart.

pub mod discovery;
pub mod error;
pub mod handler;
pub mod memory;
pub mod monitor;
pub mod oidc;
pub mod options;
pub mod record;
pub mod resolver;
pub mod scheme;
pub mod store;

pub use discovery::{DiscoveryClient, DiscoveryError};
pub use error::FederationError;
pub use handler::{
    AuthenticationHandler, DynHandler, DynHandlerProvider, HandlerFactory, HandlerProvider,
    RequestContext, StaticHandlerProvider,
};
pub use memory::MemoryIdentityProviderStore;
pub use monitor::{ChangeListener, ChangeSubscription, OptionsMonitor, StaticOptionsMonitor};
pub use oidc::{OidcDiscoveryDocument, OidcHandler, OidcHandlerFactory};
pub use options::{
    DefaultOptionsFactory, FederationPostConfigure, OidcOptions, OptionsFactory,
    PostConfigureChain, PostConfigureOptions,
};
pub use record::IdentityProviderRecord;
pub use resolver::DynamicHandlerProvider;
pub use scheme::{
    AuthenticationScheme, DynSchemeProvider, DynamicSchemeProvider, HandlerKind, SchemeProvider,
    SchemeSource, StaticSchemeProvider,
};
pub use store::{DynIdentityProviderStore, IdentityProviderStore, StoreError, StoreResult};
