use engine_core::error::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Checkpoint load failed: {0}")]
    CheckpointLoad(String),

    #[error("Checkpoint save failed: {0}")]
    CheckpointSave(String),

    #[error("Journal operation failed: {0}")]
    Journal(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("State store operation failed: {0}")]
    State(#[from] StateError),

    #[error("Datastore operation failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum RecheckError {
    #[error("Datastore operation failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Datastore operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("State store operation failed: {0}")]
    State(#[from] StateError),

    #[error("Failed to serialize stats snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}
