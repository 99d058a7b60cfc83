use crate::{config::DriverConfig, context::DriverContext};
use async_trait::async_trait;
use connectors::{
    beacon::{BeaconSource, FetchOutcome},
    error::FetchError,
};
use engine_core::{
    error::StoreError,
    metrics::Metrics,
    retry::{RetryPolicy, Sleeper},
    state::{Datastore, StateStore, filter::Filter, sled_store::SledStore},
};
use model::records::{
    slot::SlotRecord,
    validator::{ValidatorRecord, ValidatorStatus},
};
use serde_json::{Map, Value};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

/// In-memory beacon node. Slot `s` is proposed by validator `s % 10` and
/// carries graffiti "RocketPool" when `s % 3 == 0`.
#[derive(Default)]
pub struct FakeBeacon {
    pub head: u64,
    pub missing: HashSet<u64>,
    pub broken: Mutex<HashSet<u64>>,
    pub validators: HashMap<u64, ValidatorRecord>,
    pub cancel_after: Option<(usize, CancellationToken)>,
    pub slot_calls: AtomicUsize,
    pub validator_calls: AtomicUsize,
}

impl FakeBeacon {
    pub fn new(head: u64) -> Self {
        Self {
            head,
            ..Default::default()
        }
    }

    pub fn with_validators(mut self, indices: impl IntoIterator<Item = u64>) -> Self {
        for index in indices {
            self.validators.insert(index, validator(index));
        }
        self
    }

    pub fn heal(&self) {
        self.broken.lock().unwrap().clear();
    }
}

pub fn block(slot: u64) -> SlotRecord {
    SlotRecord {
        slot,
        proposer_index: slot % 10,
        graffiti: if slot % 3 == 0 {
            "RocketPool".into()
        } else {
            "lighthouse".into()
        },
        fee_recipient: Some(format!("0x{:040x}", slot % 4)),
        block_number: Some(1_000 + slot),
    }
}

/// Validators with an even index are active; every pair shares a withdrawal address.
pub fn validator(index: u64) -> ValidatorRecord {
    let status = if index % 2 == 0 {
        ValidatorStatus::ActiveOngoing
    } else {
        ValidatorStatus::ExitedUnslashed
    };
    let creds = format!("0x01{}{:040x}", "00".repeat(11), index / 2);
    ValidatorRecord::new(index, status, creds)
}

#[async_trait]
impl BeaconSource for FakeBeacon {
    async fn head_slot(&self) -> Result<u64, FetchError> {
        Ok(self.head)
    }

    async fn fetch_slot(&self, slot: u64) -> Result<FetchOutcome<SlotRecord>, FetchError> {
        let n = self.slot_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = &self.cancel_after
            && n == *after
        {
            token.cancel();
        }

        if self.broken.lock().unwrap().contains(&slot) {
            return Err(FetchError::Transient {
                url: format!("fake://blocks/{slot}"),
                reason: "status 503".into(),
            });
        }
        if self.missing.contains(&slot) {
            return Ok(FetchOutcome::NotFound);
        }
        Ok(FetchOutcome::Found(block(slot)))
    }

    async fn fetch_validator(
        &self,
        index: u64,
    ) -> Result<FetchOutcome<ValidatorRecord>, FetchError> {
        self.validator_calls.fetch_add(1, Ordering::SeqCst);
        Ok(match self.validators.get(&index) {
            Some(record) => FetchOutcome::Found(record.clone()),
            None => FetchOutcome::NotFound,
        })
    }
}

/// Datastore that refuses every write to one collection.
pub struct RejectingStore {
    pub inner: Arc<SledStore>,
    pub collection: &'static str,
}

impl RejectingStore {
    fn rejected(&self) -> StoreError {
        StoreError::Document(serde_json::from_str::<Value>("write rejected").unwrap_err())
    }
}

#[async_trait]
impl Datastore for RejectingStore {
    async fn upsert(
        &self,
        collection: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        if collection == self.collection {
            return Err(self.rejected());
        }
        self.inner.upsert(collection, key, fields).await
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(collection, key).await
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&[&str]>,
    ) -> Result<Vec<Value>, StoreError> {
        self.inner.find_many(collection, filter, projection).await
    }

    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: &Filter,
    ) -> Result<Vec<Value>, StoreError> {
        self.inner.distinct(collection, field, filter).await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.count(collection, filter).await
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        self.inner.remove(collection, key).await
    }
}

pub fn context(
    source: Arc<FakeBeacon>,
    store: Arc<SledStore>,
    cancel: CancellationToken,
    config: DriverConfig,
) -> DriverContext {
    context_with_store(source, store.clone(), store, cancel, config)
}

pub fn context_with_store(
    source: Arc<FakeBeacon>,
    store: Arc<dyn Datastore>,
    state: Arc<dyn StateStore>,
    cancel: CancellationToken,
    config: DriverConfig,
) -> DriverContext {
    DriverContext {
        run_id: "test-run".into(),
        source,
        store,
        state,
        policy: RetryPolicy::linear(3, Duration::from_millis(1)).with_sleeper(Arc::new(NoSleep)),
        metrics: Metrics::new(),
        cancel,
        config,
    }
}
