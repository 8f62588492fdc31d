//! Core library for the armada batch provisioning tool.
//!
//! The crate exposes a provider abstraction for creating and polling cloud
//! instances, a batch core that launches N create requests and tracks the
//! fleet to a terminal state, and a Rackspace-style client that implements
//! the provider trait over the first generation compute API.

pub mod batch;
pub mod config;
pub mod logging;
pub mod provider;
pub mod rackspace;
pub mod run;

pub use batch::{
    BatchResult, BatchTracker, DEFAULT_POLL_INTERVAL, LaunchOutcome, LogReporter, Reporter,
    TrackError, Verdict,
};
pub use config::{ConfigError, RackspaceConfig};
pub use logging::LoggingError;
pub use provider::{
    FlavorSummary, ImageSummary, InstanceHandle, InstanceNetworks, InstanceRefresh,
    InstanceStatus, ProviderClient, ProviderFuture, ProvisionRequest, ProvisionRequestBuilder,
    RequestError,
};
pub use rackspace::{RackspaceClient, RackspaceClientError};
pub use run::{ProvisionOrchestrator, RunError, RunOutcome};
