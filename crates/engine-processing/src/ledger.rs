use chrono::Utc;
use engine_core::{
    error::StoreError,
    state::{Datastore, FAILED_SLOTS, filter::Filter, id_key},
};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Slots whose fetch or persist failed after all retries. The batch that
/// contained them still commits; the ledger is re-driven on the next run.
#[derive(Clone)]
pub struct FailedSlots {
    store: Arc<dyn Datastore>,
}

impl FailedSlots {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, slot: u64, reason: &str) -> Result<(), StoreError> {
        let key = id_key(slot);
        let attempts = self
            .store
            .get(FAILED_SLOTS, &key)
            .await?
            .and_then(|doc| doc.get("attempts").and_then(Value::as_u64))
            .unwrap_or(0);

        let mut fields = Map::new();
        fields.insert("slot".into(), json!(slot));
        fields.insert("error".into(), json!(reason));
        fields.insert("attempts".into(), json!(attempts + 1));
        fields.insert("last_seen".into(), json!(Utc::now().to_rfc3339()));

        self.store.upsert(FAILED_SLOTS, &key, fields).await
    }

    pub async fn clear(&self, slot: u64) -> Result<bool, StoreError> {
        self.store.remove(FAILED_SLOTS, &id_key(slot)).await
    }

    /// Ledger slots in ascending order.
    pub async fn slots(&self) -> Result<Vec<u64>, StoreError> {
        let docs = self
            .store
            .find_many(FAILED_SLOTS, &Filter::All, Some(&["slot"][..]))
            .await?;

        let mut slots: Vec<u64> = docs
            .iter()
            .filter_map(|doc| doc.get("slot").and_then(Value::as_u64))
            .collect();
        slots.sort_unstable();
        Ok(slots)
    }

    pub async fn len(&self) -> Result<u64, StoreError> {
        self.store.count(FAILED_SLOTS, &Filter::All).await
    }
}
