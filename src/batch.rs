//! Batch provisioning core.
//!
//! The launcher issues every create request up front, then the tracker polls
//! the fleet in synchronous passes until each instance reaches a terminal
//! state, classifying outcomes into a [`BatchResult`]. Instances are reported
//! through an injected [`Reporter`] so the tracker never touches global
//! logging state directly.

use std::time::Duration;

use rand::Rng;
use rand::distributions::Alphanumeric;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::provider::{InstanceHandle, InstanceStatus, ProviderClient, ProvisionRequest};

/// Wait between status-refresh passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Length of the random suffix appended to each instance name.
const NAME_SUFFIX_LEN: usize = 8;

/// Generates one instance name: the request prefix plus a random
/// alphanumeric suffix. Names are only required to be distinct within a
/// batch; no collision check against the existing fleet is made.
fn instance_name(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NAME_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{prefix}{suffix}")
}

/// Aggregate outcome of a tracked batch.
///
/// `succeeded` and `failed` are in terminal order: the order in which the
/// instances left the working set, not creation order. `pending` is empty
/// for a run that polled to completion and holds the still-building handles
/// when tracking was cancelled.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchResult {
    /// Number of handles the tracker was given.
    pub total: usize,
    /// Instances that reached ACTIVE.
    pub succeeded: Vec<InstanceHandle>,
    /// Instances that settled in ERROR or UNKNOWN.
    pub failed: Vec<InstanceHandle>,
    /// Instances still building when tracking stopped early.
    pub pending: Vec<InstanceHandle>,
}

impl BatchResult {
    /// Classifies the batch: ok if and only if no instance failed.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        Verdict {
            ok: self.failed.is_empty(),
        }
    }
}

/// Batch-level success/failure classification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Verdict {
    /// True when every tracked instance reached ACTIVE.
    pub ok: bool,
}

/// Outcome of issuing the create calls for a batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LaunchOutcome {
    /// Handles for the instances the provider accepted.
    pub handles: Vec<InstanceHandle>,
    /// Number of create calls the provider rejected.
    pub create_failures: usize,
}

/// Receives per-instance progress reports from the launcher and tracker.
pub trait Reporter {
    /// Called once per instance when it reaches a terminal status.
    fn instance_terminal(&self, handle: &InstanceHandle);

    /// Called when a create call fails; the instance is not tracked.
    fn create_failed(&self, name: &str, message: &str);

    /// Called when a status refresh fails; the instance stays in the
    /// working set and is retried on the next pass.
    fn refresh_failed(&self, handle: &InstanceHandle, message: &str);
}

/// Reporter that writes through the `tracing` pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

fn display_address(address: Option<&std::net::IpAddr>) -> String {
    address.map_or_else(|| "none".to_owned(), ToString::to_string)
}

impl Reporter for LogReporter {
    fn instance_terminal(&self, handle: &InstanceHandle) {
        info!(
            "Server details: Name: '{}' Status: '{}' Admin password: '{}'",
            handle.name, handle.status, handle.admin_password
        );
        info!(
            "Networks: Public #1: '{}' Public #2: '{}' Private: '{}'",
            display_address(handle.networks.public.first()),
            display_address(handle.networks.public.get(1)),
            display_address(handle.networks.private.first())
        );
        if handle.status != InstanceStatus::Active {
            warn!(
                "Something went wrong with the build request for '{}' (status '{}')",
                handle.name, handle.status
            );
        }
    }

    fn create_failed(&self, name: &str, message: &str) {
        warn!("Create request for '{name}' failed: {message}");
    }

    fn refresh_failed(&self, handle: &InstanceHandle, message: &str) {
        warn!(
            "Status refresh for '{}' failed, will retry next pass: {message}",
            handle.name
        );
    }
}

/// Errors raised while tracking a batch.
#[derive(Debug, Error)]
pub enum TrackError {
    /// Raised when the configured deadline elapses before every instance
    /// settles. Carries what resolved so far; the remaining handles are in
    /// `result.pending`.
    #[error("batch did not settle within {waited_secs}s: {pending} instance(s) still building")]
    DeadlineExceeded {
        /// Seconds spent polling.
        waited_secs: u64,
        /// Number of instances still building.
        pending: usize,
        /// Partial outcome at the moment the deadline fired.
        result: Box<BatchResult>,
    },
}

/// Launches a batch of create requests and polls the fleet to completion.
///
/// Borrows the provider and reporter so the surrounding orchestration can
/// keep using them for lookups and summary logging.
#[derive(Debug)]
pub struct BatchTracker<'a, P, R> {
    provider: &'a P,
    reporter: &'a R,
    poll_interval: Duration,
    deadline: Option<Duration>,
}

impl<'a, P, R> BatchTracker<'a, P, R>
where
    P: ProviderClient,
    R: Reporter,
{
    /// Creates a tracker with the default poll interval and no deadline.
    #[must_use]
    pub const fn new(provider: &'a P, reporter: &'a R) -> Self {
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

    /// Bounds the total polling time. `None` polls until every instance
    /// settles, which is the reference behaviour.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Issues one create call per requested instance, sequentially and in
    /// order. A rejected create is reported and counted but does not abort
    /// the remaining creates; the returned handle set may therefore be
    /// smaller than `request.count`.
    pub async fn launch(
        &self,
        request: &ProvisionRequest,
        image_id: &str,
        flavor_id: &str,
    ) -> LaunchOutcome {
        let mut handles = Vec::with_capacity(request.count);
        let mut create_failures = 0_usize;

        for _ in 0..request.count {
            let name = instance_name(&request.name_prefix);
            match self
                .provider
                .create_instance(&name, image_id, flavor_id, &request.metadata)
                .await
            {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    self.reporter.create_failed(&name, &err.to_string());
                    create_failures += 1;
                }
            }
        }

        LaunchOutcome {
            handles,
            create_failures,
        }
    }

    /// Polls every handle until the working set is empty and returns the
    /// partitioned outcome.
    ///
    /// Each pass refreshes every live handle; a terminal status is reported
    /// exactly once and the handle leaves the working set. A refresh failure
    /// keeps the handle live for the next pass. Between passes the tracker
    /// sleeps for the poll interval, racing the sleep against `shutdown`;
    /// cancellation returns the partial result with the remaining handles in
    /// `pending` instead of hanging.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::DeadlineExceeded`] when a deadline was
    /// configured and elapsed with instances still building.
    pub async fn track(
        &self,
        handles: Vec<InstanceHandle>,
        shutdown: &CancellationToken,
    ) -> Result<BatchResult, TrackError> {
        let total = handles.len();
        let started = Instant::now();
        let mut live = handles;
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        while !live.is_empty() {
            // Consume the working set and rebuild it from the survivors;
            // the sequence being iterated is never mutated mid-pass.
            let mut survivors = Vec::with_capacity(live.len());
            for mut handle in live {
                match self.provider.refresh_instance(&handle).await {
                    Ok(refresh) => handle.apply(refresh),
                    Err(err) => {
                        self.reporter.refresh_failed(&handle, &err.to_string());
                        survivors.push(handle);
                        continue;
                    }
                }

                if handle.status.is_terminal() {
                    self.reporter.instance_terminal(&handle);
                    if handle.status == InstanceStatus::Active {
                        succeeded.push(handle);
                    } else {
                        failed.push(handle);
                    }
                } else {
                    survivors.push(handle);
                }
            }
            live = survivors;

            if live.is_empty() {
                break;
            }

            if let Some(deadline) = self.deadline
                && started.elapsed() >= deadline
            {
                let result = BatchResult {
                    total,
                    succeeded,
                    failed,
                    pending: live,
                };
                return Err(TrackError::DeadlineExceeded {
                    waited_secs: started.elapsed().as_secs(),
                    pending: result.pending.len(),
                    result: Box::new(result),
                });
            }

            tokio::select! {
                () = shutdown.cancelled() => {
                    return Ok(BatchResult {
                        total,
                        succeeded,
                        failed,
                        pending: live,
                    });
                }
                () = sleep(self.poll_interval) => {}
            }
        }

        Ok(BatchResult {
            total,
            succeeded,
            failed,
            pending: Vec::new(),
        })
    }
}
