#![allow(dead_code)]

use async_trait::async_trait;
use connectors::{
    beacon::{BeaconSource, FetchOutcome},
    error::FetchError,
};
use engine_config::settings::Settings;
use engine_core::{
    retry::{RetryPolicy, Sleeper},
    state::sled_store::SledStore,
};
use engine_runtime::execution::executor::RunExecutor;
use model::records::{
    slot::SlotRecord,
    validator::{ValidatorRecord, ValidatorStatus},
};
use std::{
    collections::HashSet,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;

pub const GRAFFITI_TERM: &str = "rocketpool";

#[derive(Debug)]
pub struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

/// Deterministic in-process beacon node.
///
/// * slot `s` is proposed by validator `s % validator_count`
/// * every fifth slot carries graffiti `RocketPool <n>`, the rest `Lighthouse/v5`
/// * validator `i` withdraws to address `i / 4`; every third validator has exited
pub struct FakeBeacon {
    head: AtomicU64,
    validator_count: u64,
    missing: HashSet<u64>,
    broken: Mutex<HashSet<u64>>,
    cancel_at: Mutex<Option<(usize, CancellationToken)>>,
    pub slot_calls: AtomicUsize,
    pub validator_calls: AtomicUsize,
}

impl FakeBeacon {
    pub fn new(head: u64, validator_count: u64) -> Self {
        Self {
            head: AtomicU64::new(head),
            validator_count: validator_count.max(1),
            missing: HashSet::new(),
            broken: Mutex::new(HashSet::new()),
            cancel_at: Mutex::new(None),
            slot_calls: AtomicUsize::new(0),
            validator_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_missing(mut self, slots: impl IntoIterator<Item = u64>) -> Self {
        self.missing.extend(slots);
        self
    }

    pub fn break_slots(&self, slots: impl IntoIterator<Item = u64>) {
        self.broken.lock().unwrap().extend(slots);
    }

    pub fn heal(&self) {
        self.broken.lock().unwrap().clear();
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    /// Cancels `token` once `n` more slot fetches have been made.
    pub fn cancel_after(&self, n: usize, token: CancellationToken) {
        let at = self.slot_calls.load(Ordering::SeqCst) + n;
        *self.cancel_at.lock().unwrap() = Some((at, token));
    }

    pub fn block(&self, slot: u64) -> SlotRecord {
        SlotRecord {
            slot,
            proposer_index: slot % self.validator_count,
            graffiti: if slot % 5 == 0 {
                format!("RocketPool {}", slot % 7)
            } else {
                "Lighthouse/v5".to_string()
            },
            fee_recipient: Some(format!("0x{:040x}", slot % 3)),
            block_number: Some(18_000_000 + slot),
        }
    }

    pub fn validator(&self, index: u64) -> ValidatorRecord {
        let status = if index % 3 == 0 {
            ValidatorStatus::ExitedUnslashed
        } else {
            ValidatorStatus::ActiveOngoing
        };
        let creds = format!("0x01{}{:040x}", "00".repeat(11), index / 4);
        ValidatorRecord::new(index, status, creds)
    }
}

#[async_trait]
impl BeaconSource for FakeBeacon {
    async fn head_slot(&self) -> Result<u64, FetchError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn fetch_slot(&self, slot: u64) -> Result<FetchOutcome<SlotRecord>, FetchError> {
        let n = self.slot_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = self.cancel_at.lock().unwrap().as_ref()
            && n >= *at
        {
            token.cancel();
        }

        if self.broken.lock().unwrap().contains(&slot) {
            return Err(FetchError::Transient {
                url: format!("fake://eth/v2/beacon/blocks/{slot}"),
                reason: "status 503".into(),
            });
        }
        if self.missing.contains(&slot) {
            return Ok(FetchOutcome::NotFound);
        }
        Ok(FetchOutcome::Found(self.block(slot)))
    }

    async fn fetch_validator(
        &self,
        index: u64,
    ) -> Result<FetchOutcome<ValidatorRecord>, FetchError> {
        self.validator_calls.fetch_add(1, Ordering::SeqCst);
        if index >= self.validator_count {
            return Ok(FetchOutcome::NotFound);
        }
        Ok(FetchOutcome::Found(self.validator(index)))
    }
}

pub fn settings(dir: &Path) -> Settings {
    let mut settings = Settings::defaults_in(dir);
    settings.batch_size = 100;
    settings.concurrency_limit = 16;
    settings.recheck_concurrency = 32;
    settings.progress_interval = 50;
    settings.graffiti_term = GRAFFITI_TERM.to_string();
    settings
}

pub fn executor(
    settings: &Settings,
    source: Arc<FakeBeacon>,
    store: Arc<SledStore>,
    cancel: CancellationToken,
) -> RunExecutor {
    RunExecutor::new(settings, source, store, cancel).with_policy(
        RetryPolicy::linear(settings.retry_limit, Duration::from_millis(1))
            .with_sleeper(Arc::new(NoSleep)),
    )
}
