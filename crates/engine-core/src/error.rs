use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Failed to encode or decode document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Failed to encode or decode state entry: {0}")]
    State(#[from] bincode::Error),

    #[error("Document '{key}' in collection '{collection}' is not a JSON object")]
    NotAnObject { collection: String, key: String },
}

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Failed to load checkpoint: {0}")]
    LoadCheckpoint(String),

    #[error("Failed to read run journal: {0}")]
    Journal(String),

    #[error("Failed to count collection '{collection}': {reason}")]
    Count { collection: String, reason: String },
}
