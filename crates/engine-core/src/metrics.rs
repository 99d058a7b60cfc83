use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    records_persisted: AtomicU64,
    records_skipped: AtomicU64,
    failure_count: AtomicU64,
    retry_count: AtomicU64,
    batches_committed: AtomicU64,
    validators_refreshed: AtomicU64,
}

/// Run-wide counters shared by every worker.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_persisted: u64,
    pub records_skipped: u64,
    pub failure_count: u64,
    pub retry_count: u64,
    pub batches_committed: u64,
    pub validators_refreshed: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_persisted(&self, count: u64) {
        self.inner
            .records_persisted
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_skipped(&self, count: u64) {
        self.inner.records_skipped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_failures(&self, count: u64) {
        self.inner.failure_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_retries(&self, count: u64) {
        self.inner.retry_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batches(&self, count: u64) {
        self.inner
            .batches_committed
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_validators(&self, count: u64) {
        self.inner
            .validators_refreshed
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_persisted: self.inner.records_persisted.load(Ordering::Relaxed),
            records_skipped: self.inner.records_skipped.load(Ordering::Relaxed),
            failure_count: self.inner.failure_count.load(Ordering::Relaxed),
            retry_count: self.inner.retry_count.load(Ordering::Relaxed),
            batches_committed: self.inner.batches_committed.load(Ordering::Relaxed),
            validators_refreshed: self.inner.validators_refreshed.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = Metrics::new();
        let worker = metrics.clone();

        worker.increment_persisted(3);
        worker.increment_retries(2);
        metrics.increment_batches(1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.records_persisted, 3);
        assert_eq!(snapshot.retry_count, 2);
        assert_eq!(snapshot.batches_committed, 1);
        assert_eq!(snapshot.failure_count, 0);
    }
}
