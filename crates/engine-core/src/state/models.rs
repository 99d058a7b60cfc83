use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the checkpoint owned by the batch ingestion driver.
pub const INGEST_CHECKPOINT: &str = "ingest";

/// Highest contiguous id whose batch was fully processed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Checkpoint {
    pub name: String,
    pub run_id: String,
    pub last_processed: u64,
    pub batch_start: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum JournalEntry {
    RunStart {
        run_id: String,
        head_slot: u64,
        resume_from: u64,
        at: DateTime<Utc>,
    },
    BatchCommit {
        run_id: String,
        start: u64,
        end: u64,
        succeeded: u64,
        skipped: u64,
        failed: u64,
        at: DateTime<Utc>,
    },
    RecheckDone {
        run_id: String,
        validators: u64,
        failed: u64,
        at: DateTime<Utc>,
    },
    StatsComputed {
        run_id: String,
        head_slot: u64,
        at: DateTime<Utc>,
    },
    Interrupted {
        run_id: String,
        last_processed: Option<u64>,
        at: DateTime<Utc>,
    },
    RunDone {
        run_id: String,
        at: DateTime<Utc>,
    },
}

impl JournalEntry {
    pub fn run_id(&self) -> &str {
        match self {
            JournalEntry::RunStart { run_id, .. } => run_id,
            JournalEntry::BatchCommit { run_id, .. } => run_id,
            JournalEntry::RecheckDone { run_id, .. } => run_id,
            JournalEntry::StatsComputed { run_id, .. } => run_id,
            JournalEntry::Interrupted { run_id, .. } => run_id,
            JournalEntry::RunDone { run_id, .. } => run_id,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            JournalEntry::RunStart { at, .. }
            | JournalEntry::BatchCommit { at, .. }
            | JournalEntry::RecheckDone { at, .. }
            | JournalEntry::StatsComputed { at, .. }
            | JournalEntry::Interrupted { at, .. }
            | JournalEntry::RunDone { at, .. } => *at,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            JournalEntry::RunStart { .. } => "run_start",
            JournalEntry::BatchCommit { .. } => "batch_commit",
            JournalEntry::RecheckDone { .. } => "recheck_done",
            JournalEntry::StatsComputed { .. } => "stats_computed",
            JournalEntry::Interrupted { .. } => "interrupted",
            JournalEntry::RunDone { .. } => "run_done",
        }
    }
}
