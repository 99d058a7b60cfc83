use crate::error::StateError;
use chrono::Utc;
use engine_core::state::{
    StateStore,
    models::{Checkpoint, INGEST_CHECKPOINT, JournalEntry},
};
use model::pagination::range::SlotRange;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-batch counts recorded in the journal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub succeeded: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl BatchTally {
    pub fn processed(&self) -> u64 {
        self.succeeded + self.skipped + self.failed
    }

    pub fn add(&mut self, other: BatchTally) {
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Manages the ingestion checkpoint and journal writes for one run.
pub struct StateManager {
    run_id: String,
    store: Arc<dyn StateStore>,
}

impl StateManager {
    pub fn new(run_id: String, store: Arc<dyn StateStore>) -> Self {
        Self { run_id, store }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn load_checkpoint(&self) -> Result<Option<Checkpoint>, StateError> {
        self.store
            .load_checkpoint(INGEST_CHECKPOINT)
            .await
            .map_err(|e| StateError::CheckpointLoad(e.to_string()))
    }

    /// First slot that still needs ingesting: one past the checkpoint, or
    /// `start_slot` when nothing was committed yet.
    pub async fn resume_from(&self, start_slot: u64) -> Result<u64, StateError> {
        match self.load_checkpoint().await? {
            Some(cp) => {
                let next = cp.last_processed.saturating_add(1).max(start_slot);
                info!(
                    last_processed = cp.last_processed,
                    resume_from = next,
                    "Resuming from checkpoint"
                );
                Ok(next)
            }
            None => {
                info!(start_slot, "No checkpoint found, starting fresh");
                Ok(start_slot)
            }
        }
    }

    /// Advances the checkpoint to the end of `batch` and journals the commit.
    /// Returns whether the checkpoint moved.
    pub async fn commit_batch(
        &self,
        batch: SlotRange,
        tally: BatchTally,
    ) -> Result<bool, StateError> {
        let advanced = self
            .store
            .save_checkpoint(&Checkpoint {
                name: INGEST_CHECKPOINT.to_string(),
                run_id: self.run_id.clone(),
                last_processed: batch.end,
                batch_start: batch.start,
                updated_at: Utc::now(),
            })
            .await
            .map_err(|e| StateError::CheckpointSave(e.to_string()))?;

        if !advanced {
            debug!(batch = %batch, "Checkpoint already past batch, left unchanged");
        }

        self.append(JournalEntry::BatchCommit {
            run_id: self.run_id.clone(),
            start: batch.start,
            end: batch.end,
            succeeded: tally.succeeded,
            skipped: tally.skipped,
            failed: tally.failed,
            at: Utc::now(),
        })
        .await?;

        Ok(advanced)
    }

    pub async fn run_started(&self, head_slot: u64, resume_from: u64) -> Result<(), StateError> {
        self.append(JournalEntry::RunStart {
            run_id: self.run_id.clone(),
            head_slot,
            resume_from,
            at: Utc::now(),
        })
        .await
    }

    pub async fn recheck_done(&self, validators: u64, failed: u64) -> Result<(), StateError> {
        self.append(JournalEntry::RecheckDone {
            run_id: self.run_id.clone(),
            validators,
            failed,
            at: Utc::now(),
        })
        .await
    }

    pub async fn stats_computed(&self, head_slot: u64) -> Result<(), StateError> {
        self.append(JournalEntry::StatsComputed {
            run_id: self.run_id.clone(),
            head_slot,
            at: Utc::now(),
        })
        .await
    }

    pub async fn interrupted(&self) -> Result<(), StateError> {
        let last_processed = self.load_checkpoint().await?.map(|cp| cp.last_processed);
        self.append(JournalEntry::Interrupted {
            run_id: self.run_id.clone(),
            last_processed,
            at: Utc::now(),
        })
        .await
    }

    pub async fn run_done(&self) -> Result<(), StateError> {
        self.append(JournalEntry::RunDone {
            run_id: self.run_id.clone(),
            at: Utc::now(),
        })
        .await
    }

    async fn append(&self, entry: JournalEntry) -> Result<(), StateError> {
        self.store
            .append_journal(&entry)
            .await
            .map_err(|e| StateError::Journal(e.to_string()))
    }
}
