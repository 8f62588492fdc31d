//! Configuration loading via `ortho-config`.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Identity endpoint used when the credentials provide none.
pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identity.api.rackspacecloud.com/v2.0";

/// Account credentials and defaults derived from configuration files and
/// `RAX_*` environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "RAX")]
pub struct RackspaceConfig {
    /// Account username. This value is required.
    pub username: String,
    /// API key used for authentication. This value is required.
    pub api_key: String,
    /// Region servers are built in. Defaults to `LON`; the CLI flag takes
    /// precedence.
    #[ortho_config(default = "LON".to_owned())]
    pub region: String,
    /// Identity service endpoint used to obtain a token and the compute
    /// endpoint for the region.
    #[ortho_config(default = DEFAULT_IDENTITY_ENDPOINT.to_owned())]
    pub identity_endpoint: String,
}

/// Metadata for a configuration field, used to generate actionable error
/// messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl RackspaceConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to the armada credentials file",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("armada")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Replaces the configured region, used to apply the CLI flag.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Performs semantic validation on required fields. Error messages
    /// include guidance on how to provide missing values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.username,
            &FieldMetadata::new("account username", "RAX_USERNAME", "username"),
        )?;
        Self::require_field(
            &self.api_key,
            &FieldMetadata::new("API key", "RAX_API_KEY", "api_key"),
        )?;
        Self::require_field(
            &self.region,
            &FieldMetadata::new("region", "RAX_REGION", "region"),
        )?;
        Self::require_field(
            &self.identity_endpoint,
            &FieldMetadata::new(
                "identity endpoint",
                "RAX_IDENTITY_ENDPOINT",
                "identity_endpoint",
            ),
        )?;
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
