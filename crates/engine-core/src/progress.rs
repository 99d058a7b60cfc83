use crate::{
    error::ProgressError,
    state::{
        BLOCKS, Datastore, FAILED_SLOTS, StateStore, VALIDATORS,
        filter::Filter,
        models::{Checkpoint, INGEST_CHECKPOINT, JournalEntry},
    },
};
use serde::Serialize;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};
use tracing::info;

/// Elapsed/ETA figures for a run of `total` items of which `done` finished.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressEstimate {
    pub done: u64,
    pub total: u64,
    pub elapsed: Duration,
    pub rate_per_sec: f64,
    pub eta: Option<Duration>,
}

impl ProgressEstimate {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.done.min(self.total) as f64 / self.total as f64) * 100.0
    }
}

/// Pure estimate: the remaining items are assumed to finish at the average
/// rate observed so far. No ETA until at least one item is done.
pub fn estimate(done: u64, total: u64, elapsed: Duration) -> ProgressEstimate {
    let secs = elapsed.as_secs_f64();
    let rate_per_sec = if secs > 0.0 { done as f64 / secs } else { 0.0 };

    let eta = if done >= total {
        Some(Duration::ZERO)
    } else if done == 0 {
        None
    } else {
        let remaining = (total - done) as f64;
        Some(Duration::from_secs_f64(secs * remaining / done as f64))
    };

    ProgressEstimate {
        done,
        total,
        elapsed,
        rate_per_sec,
        eta,
    }
}

/// Tracks completed items for one driver and logs elapsed/ETA telemetry.
#[derive(Debug)]
pub struct ProgressReporter {
    label: &'static str,
    total: u64,
    interval: u64,
    done: AtomicU64,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(label: &'static str, total: u64, interval: u64) -> Self {
        Self {
            label,
            total,
            interval: interval.max(1),
            done: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Adds `n` finished items without logging.
    pub fn advance(&self, n: u64) -> ProgressEstimate {
        let done = self.done.fetch_add(n, Ordering::Relaxed) + n;
        estimate(done, self.total, self.started.elapsed())
    }

    /// Adds `n` finished items and logs whenever an interval boundary is crossed.
    pub fn tick(&self, n: u64) {
        let before = self.done.fetch_add(n, Ordering::Relaxed);
        let after = before + n;
        if before / self.interval != after / self.interval {
            self.log(&estimate(after, self.total, self.started.elapsed()));
        }
    }

    pub fn current(&self) -> ProgressEstimate {
        estimate(
            self.done.load(Ordering::Relaxed),
            self.total,
            self.started.elapsed(),
        )
    }

    pub fn report(&self) {
        self.log(&self.current());
    }

    pub fn finish(&self) {
        let current = self.current();
        info!(
            task = self.label,
            done = current.done,
            total = current.total,
            elapsed_secs = %format!("{:.1}", current.elapsed.as_secs_f64()),
            "Finished"
        );
    }

    fn log(&self, estimate: &ProgressEstimate) {
        let eta = estimate
            .eta
            .map(|eta| format!("{:.0}s", eta.as_secs_f64()))
            .unwrap_or_else(|| "n/a".to_string());

        info!(
            task = self.label,
            done = estimate.done,
            total = estimate.total,
            percent = %format!("{:.1}", estimate.percent()),
            rate = %format!("{:.1}/s", estimate.rate_per_sec),
            elapsed_secs = %format!("{:.1}", estimate.elapsed.as_secs_f64()),
            eta = %eta,
            "Progress"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunStage {
    Idle,
    Running,
    Interrupted,
    Done,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Idle => "Idle",
            RunStage::Running => "Running",
            RunStage::Interrupted => "Interrupted",
            RunStage::Done => "Done",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub stage: RunStage,
    pub run_id: Option<String>,
    pub checkpoint: Option<Checkpoint>,
    pub blocks: u64,
    pub validators: u64,
    pub failed_slots: u64,
    pub recent: Vec<JournalEntry>,
}

/// Reads persisted state to describe the latest run.
#[derive(Clone)]
pub struct ProgressService {
    pub state: Arc<dyn StateStore>,
    pub store: Arc<dyn Datastore>,
}

impl ProgressService {
    pub fn new(state: Arc<dyn StateStore>, store: Arc<dyn Datastore>) -> Self {
        ProgressService { state, store }
    }

    pub async fn status(&self, recent: usize) -> Result<RunStatus, ProgressError> {
        let checkpoint = self
            .state
            .load_checkpoint(INGEST_CHECKPOINT)
            .await
            .map_err(|e| ProgressError::LoadCheckpoint(e.to_string()))?;

        let recent = self
            .state
            .recent_journal(recent.max(1))
            .await
            .map_err(|e| ProgressError::Journal(e.to_string()))?;

        let stage = match recent.first() {
            None => RunStage::Idle,
            Some(JournalEntry::RunDone { .. }) => RunStage::Done,
            Some(JournalEntry::Interrupted { .. }) => RunStage::Interrupted,
            Some(_) => RunStage::Running,
        };

        let count = |collection: &'static str| async move {
            self.store
                .count(collection, &Filter::All)
                .await
                .map_err(|e| ProgressError::Count {
                    collection: collection.to_string(),
                    reason: e.to_string(),
                })
        };

        Ok(RunStatus {
            stage,
            run_id: recent.first().map(|e| e.run_id().to_string()),
            checkpoint,
            blocks: count(BLOCKS).await?,
            validators: count(VALIDATORS).await?,
            failed_slots: count(FAILED_SLOTS).await?,
            recent,
        })
    }
}
