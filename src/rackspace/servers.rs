//! Compute API calls backing the provider client trait.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::provider::{
    FlavorSummary, ImageSummary, InstanceHandle, InstanceNetworks, InstanceRefresh,
    InstanceStatus, ProviderClient, ProviderFuture,
};

use super::types::{AddressEntry, CreateServerBody, CreateServerRequest, FlavorsEnvelope,
    ImagesEnvelope, ServerEnvelope};
use super::{AUTH_TOKEN_HEADER, RackspaceClient, RackspaceClientError};

/// Network labels the provider uses in address listings.
const PUBLIC_NETWORK: &str = "public";
const PRIVATE_NETWORK: &str = "private";

pub(in crate::rackspace) fn parse_networks(
    addresses: &BTreeMap<String, Vec<AddressEntry>>,
) -> InstanceNetworks {
    let collect = |label: &str| {
        addresses
            .get(label)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.addr.parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    };
    InstanceNetworks {
        public: collect(PUBLIC_NETWORK),
        private: collect(PRIVATE_NETWORK),
    }
}

impl RackspaceClient {
    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RackspaceClientError> {
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(RackspaceClientError::Api {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        serde_json::from_slice(&body).map_err(|err| RackspaceClientError::Provider {
            message: err.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RackspaceClientError> {
        let url = format!("{}{path}", self.endpoint);
        let response = self
            .http
            .get(&url)
            .header(AUTH_TOKEN_HEADER, &self.token)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn create_server(
        &self,
        name: &str,
        image_id: &str,
        flavor_id: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<InstanceHandle, RackspaceClientError> {
        let url = format!("{}/servers", self.endpoint);
        let payload = CreateServerRequest {
            server: CreateServerBody {
                name: name.to_owned(),
                image_ref: image_id.to_owned(),
                flavor_ref: flavor_id.to_owned(),
                metadata: metadata.clone(),
            },
        };
        let response = self
            .http
            .post(&url)
            .header(AUTH_TOKEN_HEADER, &self.token)
            .json(&payload)
            .send()
            .await?;
        let envelope: ServerEnvelope = Self::read_json(response).await?;

        Ok(InstanceHandle {
            id: envelope.server.id,
            name: name.to_owned(),
            status: InstanceStatus::Building,
            admin_password: envelope.server.admin_pass.unwrap_or_default(),
            networks: parse_networks(&envelope.server.addresses),
        })
    }

    async fn fetch_server(
        &self,
        handle: &InstanceHandle,
    ) -> Result<InstanceRefresh, RackspaceClientError> {
        let envelope: ServerEnvelope = self.get_json(&format!("/servers/{}", handle.id)).await?;
        let status = envelope
            .server
            .status
            .as_deref()
            .map_or(InstanceStatus::Unknown, InstanceStatus::from_provider);

        Ok(InstanceRefresh {
            status,
            networks: parse_networks(&envelope.server.addresses),
        })
    }
}

impl ProviderClient for RackspaceClient {
    type Error = RackspaceClientError;

    fn list_images(&self) -> ProviderFuture<'_, Vec<ImageSummary>, Self::Error> {
        Box::pin(async move {
            let envelope: ImagesEnvelope = self.get_json("/images").await?;
            Ok(envelope
                .images
                .into_iter()
                .map(|image| ImageSummary {
                    id: image.id,
                    name: image.name,
                })
                .collect())
        })
    }

    fn list_flavors(&self) -> ProviderFuture<'_, Vec<FlavorSummary>, Self::Error> {
        Box::pin(async move {
            let envelope: FlavorsEnvelope = self.get_json("/flavors/detail").await?;
            Ok(envelope
                .flavors
                .into_iter()
                .map(|flavor| FlavorSummary {
                    id: flavor.id,
                    ram_mb: flavor.ram,
                })
                .collect())
        })
    }

    fn create_instance<'a>(
        &'a self,
        name: &'a str,
        image_id: &'a str,
        flavor_id: &'a str,
        metadata: &'a BTreeMap<String, String>,
    ) -> ProviderFuture<'a, InstanceHandle, Self::Error> {
        Box::pin(async move { self.create_server(name, image_id, flavor_id, metadata).await })
    }

    fn refresh_instance<'a>(
        &'a self,
        handle: &'a InstanceHandle,
    ) -> ProviderFuture<'a, InstanceRefresh, Self::Error> {
        Box::pin(async move { self.fetch_server(handle).await })
    }
}
