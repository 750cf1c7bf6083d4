//! Portcullis HTTP server.
//!
//! Serves the identity provider admin API under `/api/providers`, the scheme
//! listing at `/api/schemes`, and the login redirect at `/login/{scheme}`.
//! Providers created through the admin API can be used for login
//! immediately; handlers are built on first use and cached.

pub mod admin;
pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod login;
pub mod observability;
pub mod server;
pub mod state;

pub use server::{PortcullisServer, ServerBuilder, build_app};
pub use state::AppState;
