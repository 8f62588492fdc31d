//! Error types for the Rackspace provider client.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors raised by the Rackspace provider client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RackspaceClientError {
    /// Raised when the high-level configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when the identity service rejects the credentials.
    #[error("authentication failed for user '{username}': {message}")]
    AuthFailed {
        /// Username used for the token request.
        username: String,
        /// Message returned by the identity service.
        message: String,
    },
    /// Raised when the service catalogue lacks a usable endpoint.
    #[error("no '{service}' endpoint in region {region}")]
    EndpointNotFound {
        /// Service type looked up in the catalogue.
        service: String,
        /// Region requested by the caller.
        region: String,
    },
    /// Raised when the API answers with an unexpected status.
    #[error("unexpected response from provider (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it was readable.
        message: String,
    },
    /// Wrapper for transport and decoding failures.
    #[error("provider error: {message}")]
    Provider {
        /// Underlying error message.
        message: String,
    },
}

impl From<reqwest::Error> for RackspaceClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Provider {
            message: value.to_string(),
        }
    }
}

impl From<ConfigError> for RackspaceClientError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
