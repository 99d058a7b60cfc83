use connectors::error::FetchError;
use engine_config::settings::error::SettingsError;
use engine_core::error::{ProgressError, StoreError};
use engine_processing::error::{IngestError, RecheckError, StateError, StatsError};
use thiserror::Error;

/// Errors that end a run. Item-level failures never reach this type.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Failed to open state store: {0}")]
    Sled(#[from] sled::Error),

    #[error("Datastore error: {0}")]
    Store(#[from] StoreError),

    #[error("Beacon client error: {0}")]
    Source(#[from] FetchError),

    #[error("Failed to read head slot: {0}")]
    Head(FetchError),

    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("Validator recheck failed: {0}")]
    Recheck(#[from] RecheckError),

    #[error("Stats computation failed: {0}")]
    Stats(#[from] StatsError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}
