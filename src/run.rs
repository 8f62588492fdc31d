//! Orchestrates a full provisioning run.
//!
//! The orchestrator resolves the requested image and flavour against the
//! provider's catalogues, launches the batch, tracks it to completion, and
//! folds creation failures into the outcome the CLI maps onto exit codes.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::batch::{BatchResult, BatchTracker, DEFAULT_POLL_INTERVAL, Reporter, TrackError};
use crate::provider::{FlavorSummary, ImageSummary, ProviderClient, ProvisionRequest, RequestError};

/// Errors surfaced while performing a provisioning run.
#[derive(Debug, Error)]
pub enum RunError<ProviderError>
where
    ProviderError: std::error::Error + 'static,
{
    /// Raised when the request fails validation.
    #[error("invalid provision request: {0}")]
    Request(#[from] RequestError),
    /// Raised when no image id contains the requested fragment.
    #[error("image '{fragment}' was not found")]
    ImageNotFound {
        /// Identifier fragment passed by the caller.
        fragment: String,
    },
    /// Raised when no flavour offers the requested RAM size.
    #[error("no flavour offers {ram_mb} MB of RAM")]
    FlavorNotFound {
        /// Requested RAM size in megabytes.
        ram_mb: u32,
    },
    /// Raised when listing the image catalogue fails.
    #[error("image lookup failed: {0}")]
    ImageLookup(#[source] ProviderError),
    /// Raised when listing the flavour catalogue fails.
    #[error("flavour lookup failed: {0}")]
    FlavorLookup(#[source] ProviderError),
    /// Raised when tracking stops before every instance settles.
    #[error(transparent)]
    Track(#[from] TrackError),
}

/// Outcome of a provisioning run, pairing the tracked result with the
/// creation failures the tracker never saw.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunOutcome {
    /// Partitioned outcome of the tracked instances.
    pub result: BatchResult,
    /// Number of instances originally requested.
    pub requested: usize,
    /// Create calls the provider rejected; these instances were never
    /// tracked.
    pub create_failures: usize,
}

impl RunOutcome {
    /// True when every requested instance was created and reached ACTIVE.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.result.verdict().ok && self.create_failures == 0
    }
}

/// Drives lookup → launch → track for one batch.
#[derive(Debug)]
pub struct ProvisionOrchestrator<P, R> {
    provider: P,
    reporter: R,
    poll_interval: Duration,
    deadline: Option<Duration>,
}

impl<P, R> ProvisionOrchestrator<P, R>
where
    P: ProviderClient,
    R: Reporter,
{
    /// Creates an orchestrator with the default poll interval and no
    /// deadline.
    #[must_use]
    pub const fn new(provider: P, reporter: R) -> Self {
        Self {
            provider,
            reporter,
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }

    /// Overrides the wait between refresh passes.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bounds the total polling time; `None` (the default) polls until the
    /// batch settles.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Runs the batch end to end and returns the outcome.
    ///
    /// Lookup failures abort the run before any create call is issued.
    /// Cancellation via `shutdown` stops tracking at the next suspension
    /// point and returns the partial outcome.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when validation or a catalogue lookup fails, or
    /// when a configured deadline elapses during tracking.
    pub async fn execute(
        &self,
        request: &ProvisionRequest,
        shutdown: &CancellationToken,
    ) -> Result<RunOutcome, RunError<P::Error>> {
        request.validate()?;
        let image = self.resolve_image(&request.image).await?;
        let flavor = self.resolve_flavor(request.ram_mb).await?;

        warn!("Cloud server build request initiated");
        info!("Image details, ID: '{}' Name: '{}'", image.id, image.name);
        info!(
            "Server build details, Size: '{}' MB Count: '{}'",
            request.ram_mb, request.count
        );

        let tracker = BatchTracker::new(&self.provider, &self.reporter)
            .with_poll_interval(self.poll_interval)
            .with_deadline(self.deadline);

        let launch = tracker.launch(request, &image.id, &flavor.id).await;
        let create_failures = launch.create_failures;
        let result = tracker.track(launch.handles, shutdown).await?;

        Ok(RunOutcome {
            result,
            requested: request.count,
            create_failures,
        })
    }

    /// Picks the first image whose id contains the requested fragment.
    async fn resolve_image(&self, fragment: &str) -> Result<ImageSummary, RunError<P::Error>> {
        let images = self
            .provider
            .list_images()
            .await
            .map_err(RunError::ImageLookup)?;
        images
            .into_iter()
            .find(|image| image.id.contains(fragment))
            .ok_or_else(|| RunError::ImageNotFound {
                fragment: fragment.to_owned(),
            })
    }

    /// Picks the flavour whose RAM size matches exactly.
    async fn resolve_flavor(&self, ram_mb: u32) -> Result<FlavorSummary, RunError<P::Error>> {
        let flavors = self
            .provider
            .list_flavors()
            .await
            .map_err(RunError::FlavorLookup)?;
        flavors
            .into_iter()
            .find(|flavor| flavor.ram_mb == ram_mb)
            .ok_or(RunError::FlavorNotFound { ram_mb })
    }
}
