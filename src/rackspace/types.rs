//! Serde wire types for the identity and compute APIs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct AuthRequest {
    pub(crate) auth: AuthPayload,
}

#[derive(Serialize)]
pub(crate) struct AuthPayload {
    #[serde(rename = "RAX-KSKEY:apiKeyCredentials")]
    pub(crate) api_key_credentials: ApiKeyCredentials,
}

#[derive(Serialize)]
pub(crate) struct ApiKeyCredentials {
    pub(crate) username: String,
    #[serde(rename = "apiKey")]
    pub(crate) api_key: String,
}

#[derive(Deserialize)]
pub(crate) struct AuthResponse {
    pub(crate) access: Access,
}

#[derive(Deserialize)]
pub(crate) struct Access {
    pub(crate) token: Token,
    #[serde(rename = "serviceCatalog", default)]
    pub(crate) service_catalog: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
pub(crate) struct Token {
    pub(crate) id: String,
}

#[derive(Deserialize)]
pub(crate) struct CatalogEntry {
    #[serde(rename = "type")]
    pub(crate) service_type: String,
    #[serde(default)]
    pub(crate) endpoints: Vec<CatalogEndpoint>,
}

#[derive(Deserialize)]
pub(crate) struct CatalogEndpoint {
    #[serde(default)]
    pub(crate) region: Option<String>,
    #[serde(rename = "publicURL")]
    pub(crate) public_url: String,
}

#[derive(Deserialize)]
pub(crate) struct ImagesEnvelope {
    pub(crate) images: Vec<ImageEntry>,
}

#[derive(Deserialize)]
pub(crate) struct ImageEntry {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: String,
}

#[derive(Deserialize)]
pub(crate) struct FlavorsEnvelope {
    pub(crate) flavors: Vec<FlavorEntry>,
}

#[derive(Deserialize)]
pub(crate) struct FlavorEntry {
    pub(crate) id: String,
    pub(crate) ram: u32,
}

#[derive(Serialize)]
pub(crate) struct CreateServerRequest {
    pub(crate) server: CreateServerBody,
}

#[derive(Serialize)]
pub(crate) struct CreateServerBody {
    pub(crate) name: String,
    #[serde(rename = "imageRef")]
    pub(crate) image_ref: String,
    #[serde(rename = "flavorRef")]
    pub(crate) flavor_ref: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) metadata: BTreeMap<String, String>,
}

#[derive(Deserialize)]
pub(crate) struct ServerEnvelope {
    pub(crate) server: ServerEntry,
}

#[derive(Deserialize)]
pub(crate) struct ServerEntry {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(rename = "adminPass", default)]
    pub(crate) admin_pass: Option<String>,
    #[serde(default)]
    pub(crate) addresses: BTreeMap<String, Vec<AddressEntry>>,
}

#[derive(Deserialize)]
pub(crate) struct AddressEntry {
    pub(crate) addr: String,
}
