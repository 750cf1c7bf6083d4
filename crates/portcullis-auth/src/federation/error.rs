//! Error types for identity provider resolution.
//!
//! "Not found" is never an error here: unknown schemes and missing records
//! are reported as `None` by the resolvers and stores.

use std::time::Duration;

use super::store::StoreError;

/// Errors that can occur while validating, storing, or resolving identity
/// providers.
#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    /// The provider configuration cannot produce valid handler options.
    #[error("Invalid identity provider configuration ({field}): {message}")]
    InvalidProviderConfiguration {
        /// Name of the offending field (e.g. `authority`).
        field: String,
        /// Description of what is wrong with the field.
        message: String,
    },

    /// The backing store failed.
    #[error("Identity provider store error: {0}")]
    Storage(#[from] StoreError),

    /// The handler could not be initialized against the partner.
    #[error("Failed to initialize handler for scheme '{scheme}': {message}")]
    Initialization {
        /// The scheme being initialized.
        scheme: String,
        /// Description of the failure.
        message: String,
    },

    /// Handler initialization did not finish in time.
    #[error("Handler initialization for scheme '{scheme}' timed out after {after:?}")]
    Timeout {
        /// The scheme being initialized.
        scheme: String,
        /// The timeout that elapsed.
        after: Duration,
    },
}

impl FederationError {
    /// Creates an `InvalidProviderConfiguration` error.
    #[must_use]
    pub fn invalid_configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProviderConfiguration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an `Initialization` error.
    #[must_use]
    pub fn initialization(scheme: impl Into<String>, message: impl ToString) -> Self {
        Self::Initialization {
            scheme: scheme.into(),
            message: message.to_string(),
        }
    }

    /// Creates a `Timeout` error.
    #[must_use]
    pub fn timeout(scheme: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            scheme: scheme.into(),
            after,
        }
    }

    /// Returns the offending field for configuration errors.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidProviderConfiguration { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Returns `true` if this is a user input error.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidProviderConfiguration { .. })
    }

    /// Returns `true` if the backing store failed.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns `true` if a caller may retry the operation later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Initialization { .. } | Self::Timeout { .. }
        )
    }
}
