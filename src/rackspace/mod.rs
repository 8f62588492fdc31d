//! Rackspace-style provider client.
//!
//! Authenticates against the identity service with a username and API key,
//! resolves the regional compute endpoint from the service catalogue, and
//! implements the [`crate::provider::ProviderClient`] trait over the compute
//! API's REST surface.

mod error;
mod identity;
mod servers;
mod types;

use std::time::Duration;

use crate::config::RackspaceConfig;

pub use error::RackspaceClientError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Provider client holding an authenticated session.
#[derive(Clone)]
pub struct RackspaceClient {
    http: reqwest::Client,
    token: String,
    endpoint: String,
}

impl RackspaceClient {
    /// Validates the configuration, obtains a token, and resolves the
    /// compute endpoint for the configured region.
    ///
    /// # Errors
    ///
    /// Returns [`RackspaceClientError::Config`] when the configuration is
    /// incomplete, [`RackspaceClientError::AuthFailed`] when the identity
    /// service rejects the credentials, and
    /// [`RackspaceClientError::EndpointNotFound`] when the service catalogue
    /// lacks a compute endpoint for the region.
    pub async fn authenticate(config: &RackspaceConfig) -> Result<Self, RackspaceClientError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(RackspaceClientError::from)?;

        let access = identity::obtain_access(&http, config).await?;
        let endpoint = identity::compute_endpoint(&access, &config.region)?;

        Ok(Self {
            http,
            token: access.token.id,
            endpoint,
        })
    }
}
