use crate::error::FetchError;
use async_trait::async_trait;
use model::records::{slot::SlotRecord, validator::ValidatorRecord};

pub mod client;
pub mod models;

/// Result of a lookup that reached the node. `NotFound` covers missed slots
/// and unknown validator indices; it is a legitimate answer, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Found(T),
    NotFound,
}

impl<T> FetchOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            FetchOutcome::Found(value) => Some(value),
            FetchOutcome::NotFound => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Found(value) => FetchOutcome::Found(f(value)),
            FetchOutcome::NotFound => FetchOutcome::NotFound,
        }
    }
}

/// Read access to a beacon node. Implementations are shared by every worker
/// of a pool and must tolerate concurrent calls.
#[async_trait]
pub trait BeaconSource: Send + Sync {
    /// Slot of the current head block.
    async fn head_slot(&self) -> Result<u64, FetchError>;

    async fn fetch_slot(&self, slot: u64) -> Result<FetchOutcome<SlotRecord>, FetchError>;

    async fn fetch_validator(
        &self,
        index: u64,
    ) -> Result<FetchOutcome<ValidatorRecord>, FetchError>;
}
