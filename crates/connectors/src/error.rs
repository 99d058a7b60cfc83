use thiserror::Error;

/// Failures talking to the beacon node. A 404 is not an error, see
/// [`crate::beacon::FetchOutcome::NotFound`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network failure, timeout, 5xx, 408 or 429. Worth retrying.
    #[error("Transient failure fetching {url}: {reason}")]
    Transient { url: String, reason: String },

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Invalid beacon client configuration: {0}")]
    Config(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}
