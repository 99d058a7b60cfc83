use engine_config::settings::{
    DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_RECHECK_CONCURRENCY, Settings,
};

/// Tunables shared by the ingestion, recheck and stats drivers.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Slots per ingestion batch
    pub batch_size: u64,

    /// Concurrent fetches while ingesting
    pub concurrency_limit: usize,

    /// Concurrent fetches while refreshing validators
    pub recheck_concurrency: usize,

    /// Items between recheck progress lines
    pub progress_interval: u64,

    /// First slot when no checkpoint exists
    pub start_slot: u64,

    pub graffiti_term: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            recheck_concurrency: DEFAULT_RECHECK_CONCURRENCY,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            start_slot: 0,
            graffiti_term: String::new(),
        }
    }
}

impl DriverConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            batch_size: settings.batch_size,
            concurrency_limit: settings.concurrency_limit,
            recheck_concurrency: settings.recheck_concurrency,
            progress_interval: settings.progress_interval,
            start_slot: settings.start_slot,
            graffiti_term: settings.graffiti_term.clone(),
        }
    }

    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_recheck_concurrency(mut self, limit: usize) -> Self {
        self.recheck_concurrency = limit;
        self
    }

    pub fn with_start_slot(mut self, slot: u64) -> Self {
        self.start_slot = slot;
        self
    }

    pub fn with_graffiti_term(mut self, term: impl Into<String>) -> Self {
        self.graffiti_term = term.into();
        self
    }
}
