//! Provider abstraction for batch instance provisioning.
//!
//! The batch core depends only on the [`ProviderClient`] trait; the concrete
//! HTTP client lives in [`crate::rackspace`].

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;

use thiserror::Error;

/// Maximum number of instances a single batch may request.
pub const MAX_BATCH_SIZE: usize = 50;

/// Maximum number of metadata pairs the provider accepts per instance.
pub const MAX_METADATA_ENTRIES: usize = 5;

/// Parameters shared by every create call in a batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionRequest {
    /// Prefix for generated instance names; each instance gets a random
    /// suffix appended. May be empty, in which case names are bare suffixes.
    pub name_prefix: String,
    /// Image identifier, or an identifier fragment resolved against the
    /// provider's image list.
    pub image: String,
    /// RAM size in megabytes used to select the flavour.
    pub ram_mb: u32,
    /// Metadata attached to every instance in the batch.
    pub metadata: BTreeMap<String, String>,
    /// Number of instances to create.
    pub count: usize,
}

impl ProvisionRequest {
    /// Starts a builder for a [`ProvisionRequest`].
    #[must_use]
    pub fn builder() -> ProvisionRequestBuilder {
        ProvisionRequestBuilder::new()
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the image reference is empty, the count
    /// is outside `1..=50`, the RAM size is zero, or the metadata map holds
    /// more than five entries.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.image.is_empty() {
            return Err(RequestError::MissingField("image".to_owned()));
        }
        if self.ram_mb == 0 {
            return Err(RequestError::MissingField("ram_mb".to_owned()));
        }
        if self.count == 0 || self.count > MAX_BATCH_SIZE {
            return Err(RequestError::CountOutOfRange(self.count));
        }
        if self.metadata.len() > MAX_METADATA_ENTRIES {
            return Err(RequestError::TooMuchMetadata(self.metadata.len()));
        }
        Ok(())
    }
}

/// Builder for [`ProvisionRequest`] that defers trimming and validation to
/// construction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProvisionRequestBuilder {
    name_prefix: String,
    image: String,
    ram_mb: u32,
    metadata: BTreeMap<String, String>,
    count: usize,
}

impl ProvisionRequestBuilder {
    /// Creates an empty builder; fields must be populated before build.
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: 1,
            ..Self::default()
        }
    }

    /// Sets the instance name prefix.
    #[must_use]
    pub fn name_prefix(mut self, value: impl Into<String>) -> Self {
        self.name_prefix = value.into();
        self
    }

    /// Sets the image identifier or identifier fragment.
    #[must_use]
    pub fn image(mut self, value: impl Into<String>) -> Self {
        self.image = value.into();
        self
    }

    /// Sets the RAM size in megabytes.
    #[must_use]
    pub const fn ram_mb(mut self, value: u32) -> Self {
        self.ram_mb = value;
        self
    }

    /// Sets the metadata map.
    #[must_use]
    pub fn metadata(mut self, value: BTreeMap<String, String>) -> Self {
        self.metadata = value;
        self
    }

    /// Sets the number of instances to create.
    #[must_use]
    pub const fn count(mut self, value: usize) -> Self {
        self.count = value;
        self
    }

    /// Builds and validates the [`ProvisionRequest`], trimming string inputs.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when validation fails; see
    /// [`ProvisionRequest::validate`].
    pub fn build(self) -> Result<ProvisionRequest, RequestError> {
        let request = ProvisionRequest {
            name_prefix: self.name_prefix.trim().to_owned(),
            image: self.image.trim().to_owned(),
            ram_mb: self.ram_mb,
            metadata: self.metadata,
            count: self.count,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Errors raised while validating a [`ProvisionRequest`].
#[derive(Debug, Error, Eq, PartialEq)]
pub enum RequestError {
    /// Raised when a required field is missing or empty.
    #[error("missing or empty field: {0}")]
    MissingField(String),
    /// Raised when the instance count is outside `1..=50`.
    #[error("count must be between 1 and {MAX_BATCH_SIZE}, got {0}")]
    CountOutOfRange(usize),
    /// Raised when the metadata map holds more than five entries.
    #[error("at most {MAX_METADATA_ENTRIES} metadata entries are accepted, got {0}")]
    TooMuchMetadata(usize),
}

/// Lifecycle state reported by the provider for an instance.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstanceStatus {
    /// The instance is still being built; any in-progress provider state
    /// maps here.
    Building,
    /// The instance finished building and is reachable.
    Active,
    /// The provider reported a build failure.
    Error,
    /// The provider lost track of the instance.
    Unknown,
}

impl InstanceStatus {
    /// Maps a raw provider status string onto the lifecycle enum. Only the
    /// exact terminal statuses are recognised; every other value counts as
    /// still building.
    #[must_use]
    pub fn from_provider(raw: &str) -> Self {
        match raw {
            "ACTIVE" => Self::Active,
            "ERROR" => Self::Error,
            "UNKNOWN" => Self::Unknown,
            _ => Self::Building,
        }
    }

    /// Returns true when no further transitions are expected.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Building)
    }

    /// Provider-style upper-case rendering of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Building => "BUILDING",
            Self::Active => "ACTIVE",
            Self::Error => "ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses assigned to an instance, in provider order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceNetworks {
    /// Public addresses; the provider assigns at least two (IPv4 and IPv6)
    /// once the build completes.
    pub public: Vec<IpAddr>,
    /// Private addresses; at least one once the build completes.
    pub private: Vec<IpAddr>,
}

/// Handle for one requested instance, created by the create call and updated
/// by applying status refreshes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceHandle {
    /// Provider identifier for the instance.
    pub id: String,
    /// Generated instance name.
    pub name: String,
    /// Last observed lifecycle state.
    pub status: InstanceStatus,
    /// Administrative password; only the creation response carries it.
    pub admin_password: String,
    /// Last observed addresses.
    pub networks: InstanceNetworks,
}

impl InstanceHandle {
    /// Applies a refresh onto the handle. A handle that already reached a
    /// terminal status is left untouched.
    pub fn apply(&mut self, refresh: InstanceRefresh) {
        if self.status.is_terminal() {
            return;
        }
        self.status = refresh.status;
        self.networks = refresh.networks;
    }
}

/// Provider view of an instance returned by a status refresh. Refreshes
/// never carry the administrative password.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceRefresh {
    /// Current lifecycle state.
    pub status: InstanceStatus,
    /// Current addresses.
    pub networks: InstanceNetworks,
}

/// One entry of the provider's image catalogue.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImageSummary {
    /// Image identifier.
    pub id: String,
    /// Human readable image name.
    pub name: String,
}

/// One entry of the provider's flavour catalogue.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlavorSummary {
    /// Flavour identifier.
    pub id: String,
    /// RAM size in megabytes.
    pub ram_mb: u32,
}

/// Future returned by provider operations.
pub type ProviderFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Minimal interface the batch core requires from a cloud provider.
pub trait ProviderClient {
    /// Provider specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists the image catalogue.
    fn list_images(&self) -> ProviderFuture<'_, Vec<ImageSummary>, Self::Error>;

    /// Lists the flavour catalogue.
    fn list_flavors(&self) -> ProviderFuture<'_, Vec<FlavorSummary>, Self::Error>;

    /// Creates one instance and returns its handle, initially building.
    fn create_instance<'a>(
        &'a self,
        name: &'a str,
        image_id: &'a str,
        flavor_id: &'a str,
        metadata: &'a BTreeMap<String, String>,
    ) -> ProviderFuture<'a, InstanceHandle, Self::Error>;

    /// Fetches the provider's current view of an instance.
    fn refresh_instance<'a>(
        &'a self,
        handle: &'a InstanceHandle,
    ) -> ProviderFuture<'a, InstanceRefresh, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request() -> ProvisionRequestBuilder {
        ProvisionRequest::builder().image("abc123").ram_mb(512)
    }

    #[test]
    fn builder_defaults_to_one_instance() {
        let built = request()
            .build()
            .unwrap_or_else(|err| panic!("build failed: {err}"));
        assert_eq!(built.count, 1);
        assert!(built.metadata.is_empty());
    }

    #[test]
    fn builder_trims_string_inputs() {
        let built = request()
            .name_prefix("  web-  ")
            .build()
            .unwrap_or_else(|err| panic!("build failed: {err}"));
        assert_eq!(built.name_prefix, "web-");
    }

    #[test]
    fn builder_rejects_empty_image() {
        let err = ProvisionRequest::builder()
            .ram_mb(512)
            .build()
            .expect_err("empty image should be rejected");
        assert!(matches!(err, RequestError::MissingField(field) if field == "image"));
    }

    #[rstest]
    #[case(0)]
    #[case(51)]
    fn builder_rejects_count_outside_bounds(#[case] count: usize) {
        let err = request()
            .count(count)
            .build()
            .expect_err("count outside 1..=50 should be rejected");
        assert!(matches!(err, RequestError::CountOutOfRange(value) if value == count));
    }

    #[test]
    fn builder_rejects_oversized_metadata() {
        let metadata: BTreeMap<String, String> = (0..6)
            .map(|index| (format!("key{index}"), format!("value{index}")))
            .collect();
        let err = request()
            .metadata(metadata)
            .build()
            .expect_err("six metadata entries should be rejected");
        assert!(matches!(err, RequestError::TooMuchMetadata(6)));
    }

    #[rstest]
    #[case("ACTIVE", InstanceStatus::Active)]
    #[case("ERROR", InstanceStatus::Error)]
    #[case("UNKNOWN", InstanceStatus::Unknown)]
    #[case("BUILD", InstanceStatus::Building)]
    #[case("HARD_REBOOT", InstanceStatus::Building)]
    #[case("active", InstanceStatus::Building)]
    fn status_mapping_recognises_exact_terminal_values(
        #[case] raw: &str,
        #[case] expected: InstanceStatus,
    ) {
        assert_eq!(InstanceStatus::from_provider(raw), expected);
    }

    #[test]
    fn terminal_statuses_are_exactly_the_non_building_ones() {
        assert!(!InstanceStatus::Building.is_terminal());
        assert!(InstanceStatus::Active.is_terminal());
        assert!(InstanceStatus::Error.is_terminal());
        assert!(InstanceStatus::Unknown.is_terminal());
    }

    #[test]
    fn apply_refresh_ignores_updates_after_a_terminal_state() {
        let mut handle = InstanceHandle {
            id: "srv-1".to_owned(),
            name: "node-abc".to_owned(),
            status: InstanceStatus::Error,
            admin_password: "secret".to_owned(),
            networks: InstanceNetworks::default(),
        };
        handle.apply(InstanceRefresh {
            status: InstanceStatus::Active,
            networks: InstanceNetworks::default(),
        });
        assert_eq!(handle.status, InstanceStatus::Error);
    }

    #[test]
    fn apply_refresh_updates_a_building_handle() {
        let mut handle = InstanceHandle {
            id: "srv-1".to_owned(),
            name: "node-abc".to_owned(),
            status: InstanceStatus::Building,
            admin_password: "secret".to_owned(),
            networks: InstanceNetworks::default(),
        };
        let public: Vec<std::net::IpAddr> = vec!["203.0.113.10"
            .parse()
            .unwrap_or_else(|err| panic!("address parse: {err}"))];
        handle.apply(InstanceRefresh {
            status: InstanceStatus::Active,
            networks: InstanceNetworks {
                public: public.clone(),
                private: Vec::new(),
            },
        });
        assert_eq!(handle.status, InstanceStatus::Active);
        assert_eq!(handle.networks.public, public);
        assert_eq!(handle.admin_password, "secret");
    }
}
