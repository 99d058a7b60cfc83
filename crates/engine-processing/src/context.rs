use crate::{config::DriverConfig, state_manager::StateManager};
use connectors::beacon::BeaconSource;
use engine_core::{
    metrics::Metrics,
    retry::RetryPolicy,
    state::{Datastore, StateStore},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Collaborators shared by every driver of one run.
#[derive(Clone)]
pub struct DriverContext {
    pub run_id: String,
    pub source: Arc<dyn BeaconSource>,
    pub store: Arc<dyn Datastore>,
    pub state: Arc<dyn StateStore>,
    pub policy: RetryPolicy,
    pub metrics: Metrics,
    pub cancel: CancellationToken,
    pub config: DriverConfig,
}

impl DriverContext {
    pub fn state_manager(&self) -> StateManager {
        StateManager::new(self.run_id.clone(), self.state.clone())
    }
}
