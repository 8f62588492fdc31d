//! Test doubles for the batch core.
//!
//! Provides a scripted provider whose catalogue, create outcomes, and
//! per-instance refresh sequences are set up ahead of a scenario, plus a
//! recording reporter for asserting what was reported.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use armada::provider::{
    FlavorSummary, ImageSummary, InstanceHandle, InstanceNetworks, InstanceRefresh,
    InstanceStatus, ProviderClient, ProviderFuture,
};
use armada::Reporter;
use thiserror::Error;

/// One scripted refresh outcome for an instance.
#[derive(Clone, Copy, Debug)]
pub enum RefreshStep {
    /// Report this status (with populated networks when terminal).
    Status(InstanceStatus),
    /// Fail the refresh call with a provider error.
    Fail,
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScriptedProviderError {
    #[error("scripted create failure")]
    Create,
    #[error("scripted refresh failure")]
    Refresh,
    #[error("scripted listing failure")]
    Listing,
}

#[derive(Default)]
struct State {
    images: Vec<ImageSummary>,
    flavors: Vec<FlavorSummary>,
    fail_listings: bool,
    failed_creates: Vec<usize>,
    created: usize,
    created_names: Vec<String>,
    created_args: Vec<(String, String, String)>,
    created_meta: Vec<BTreeMap<String, String>>,
    default_script: Option<Vec<RefreshStep>>,
    scripts: BTreeMap<usize, Vec<RefreshStep>>,
    by_id: BTreeMap<String, VecDeque<RefreshStep>>,
    refresh_counts: BTreeMap<String, usize>,
}

/// Provider double scripted per scenario.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    state: Arc<Mutex<State>>,
}

/// Identifier the double assigns to the nth successful create call.
pub fn instance_id(index: usize) -> String {
    format!("srv-{index}")
}

fn active_networks() -> InstanceNetworks {
    let parse = |raw: &str| {
        raw.parse()
            .unwrap_or_else(|err| panic!("address parse: {err}"))
    };
    InstanceNetworks {
        public: vec![parse("203.0.113.7"), parse("2001:db8::7")],
        private: vec![parse("10.0.0.7")],
    }
}

fn refresh_for(status: InstanceStatus) -> InstanceRefresh {
    let networks = if status == InstanceStatus::Active {
        active_networks()
    } else {
        InstanceNetworks::default()
    };
    InstanceRefresh { status, networks }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalogue(images: Vec<ImageSummary>, flavors: Vec<FlavorSummary>) -> Self {
        let provider = Self::new();
        {
            let mut state = provider.lock();
            state.images = images;
            state.flavors = flavors;
        }
        provider
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("scripted provider lock poisoned: {err}"))
    }

    pub fn fail_listings(&self) {
        self.lock().fail_listings = true;
    }

    /// Makes the create call at `index` (in request order) fail.
    pub fn fail_create_at(&self, index: usize) {
        self.lock().failed_creates.push(index);
    }

    /// Scripts the refresh sequence for the instance created at `index`.
    pub fn script_instance(&self, index: usize, steps: Vec<RefreshStep>) {
        self.lock().scripts.insert(index, steps);
    }

    /// Scripts the refresh sequence used by instances without their own.
    pub fn script_default(&self, steps: Vec<RefreshStep>) {
        self.lock().default_script = Some(steps);
    }

    pub fn created_names(&self) -> Vec<String> {
        self.lock().created_names.clone()
    }

    pub fn created_args(&self) -> Vec<(String, String, String)> {
        self.lock().created_args.clone()
    }

    pub fn created_meta(&self) -> Vec<BTreeMap<String, String>> {
        self.lock().created_meta.clone()
    }

    pub fn refresh_count(&self, id: &str) -> usize {
        self.lock().refresh_counts.get(id).copied().unwrap_or(0)
    }
}

impl ProviderClient for ScriptedProvider {
    type Error = ScriptedProviderError;

    fn list_images(&self) -> ProviderFuture<'_, Vec<ImageSummary>, Self::Error> {
        Box::pin(async move {
            let state = self.lock();
            if state.fail_listings {
                return Err(ScriptedProviderError::Listing);
            }
            Ok(state.images.clone())
        })
    }

    fn list_flavors(&self) -> ProviderFuture<'_, Vec<FlavorSummary>, Self::Error> {
        Box::pin(async move {
            let state = self.lock();
            if state.fail_listings {
                return Err(ScriptedProviderError::Listing);
            }
            Ok(state.flavors.clone())
        })
    }

    fn create_instance<'a>(
        &'a self,
        name: &'a str,
        image_id: &'a str,
        flavor_id: &'a str,
        metadata: &'a BTreeMap<String, String>,
    ) -> ProviderFuture<'a, InstanceHandle, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            let index = state.created;
            state.created += 1;

            if state.failed_creates.contains(&index) {
                return Err(ScriptedProviderError::Create);
            }

            let id = instance_id(index);
            let scripted = state.scripts.remove(&index);
            let steps = match scripted {
                Some(steps) => steps,
                None => state.default_script.clone().unwrap_or_default(),
            };
            state.by_id.insert(id.clone(), steps.into_iter().collect());
            state.created_names.push(name.to_owned());
            state.created_args.push((
                name.to_owned(),
                image_id.to_owned(),
                flavor_id.to_owned(),
            ));
            state.created_meta.push(metadata.clone());

            Ok(InstanceHandle {
                id,
                name: name.to_owned(),
                status: InstanceStatus::Building,
                admin_password: format!("pw-{index}"),
                networks: InstanceNetworks::default(),
            })
        })
    }

    fn refresh_instance<'a>(
        &'a self,
        handle: &'a InstanceHandle,
    ) -> ProviderFuture<'a, InstanceRefresh, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            *state.refresh_counts.entry(handle.id.clone()).or_insert(0) += 1;
            let step = state
                .by_id
                .get_mut(&handle.id)
                .and_then(VecDeque::pop_front);
            match step {
                Some(RefreshStep::Fail) => Err(ScriptedProviderError::Refresh),
                Some(RefreshStep::Status(status)) => Ok(refresh_for(status)),
                // An exhausted script settles as UNKNOWN so a buggy extra
                // pass shows up as a wrong partition instead of a hang.
                None => Ok(refresh_for(InstanceStatus::Unknown)),
            }
        })
    }
}

#[derive(Default)]
struct Events {
    terminal: Vec<(String, InstanceStatus)>,
    create_failures: Vec<String>,
    refresh_failures: Vec<String>,
}

/// Reporter double that records every report it receives.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Events>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Events> {
        self.events
            .lock()
            .unwrap_or_else(|err| panic!("recording reporter lock poisoned: {err}"))
    }

    pub fn terminal(&self) -> Vec<(String, InstanceStatus)> {
        self.lock().terminal.clone()
    }

    pub fn create_failures(&self) -> Vec<String> {
        self.lock().create_failures.clone()
    }

    pub fn refresh_failures(&self) -> Vec<String> {
        self.lock().refresh_failures.clone()
    }
}

impl Reporter for RecordingReporter {
    fn instance_terminal(&self, handle: &InstanceHandle) {
        self.lock()
            .terminal
            .push((handle.name.clone(), handle.status));
    }

    fn create_failed(&self, name: &str, _message: &str) {
        self.lock().create_failures.push(name.to_owned());
    }

    fn refresh_failed(&self, handle: &InstanceHandle, _message: &str) {
        self.lock().refresh_failures.push(handle.name.clone());
    }
}
