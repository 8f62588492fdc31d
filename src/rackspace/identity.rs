//! Token and endpoint resolution against the identity service.

use crate::config::RackspaceConfig;

use super::RackspaceClientError;
use super::types::{Access, ApiKeyCredentials, AuthPayload, AuthRequest, AuthResponse};

const COMPUTE_SERVICE_TYPE: &str = "compute";

/// Requests a token for the configured credentials.
pub(in crate::rackspace) async fn obtain_access(
    http: &reqwest::Client,
    config: &RackspaceConfig,
) -> Result<Access, RackspaceClientError> {
    let url = format!("{}/tokens", config.identity_endpoint.trim_end_matches('/'));
    let payload = AuthRequest {
        auth: AuthPayload {
            api_key_credentials: ApiKeyCredentials {
                username: config.username.clone(),
                api_key: config.api_key.clone(),
            },
        },
    };

    let response = http.post(&url).json(&payload).send().await?;
    let status = response.status();
    let body = response.bytes().await?;

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(RackspaceClientError::AuthFailed {
            username: config.username.clone(),
            message: String::from_utf8_lossy(&body).into_owned(),
        });
    }
    if !status.is_success() {
        return Err(RackspaceClientError::Api {
            status: status.as_u16(),
            message: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    let parsed: AuthResponse =
        serde_json::from_slice(&body).map_err(|err| RackspaceClientError::Provider {
            message: err.to_string(),
        })?;
    Ok(parsed.access)
}

/// Picks the public compute endpoint for the requested region. Catalogue
/// entries without a region act as a fallback when no regional endpoint
/// matches.
pub(in crate::rackspace) fn compute_endpoint(
    access: &Access,
    region: &str,
) -> Result<String, RackspaceClientError> {
    let endpoints = || {
        access
            .service_catalog
            .iter()
            .filter(|entry| entry.service_type == COMPUTE_SERVICE_TYPE)
            .flat_map(|entry| entry.endpoints.iter())
    };

    endpoints()
        .find(|endpoint| endpoint.region.as_deref() == Some(region))
        .or_else(|| endpoints().find(|endpoint| endpoint.region.is_none()))
        .map(|endpoint| endpoint.public_url.trim_end_matches('/').to_owned())
        .ok_or_else(|| RackspaceClientError::EndpointNotFound {
            service: COMPUTE_SERVICE_TYPE.to_owned(),
            region: region.to_owned(),
        })
}
