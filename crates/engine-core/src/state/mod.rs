use crate::{
    error::StoreError,
    state::{
        filter::Filter,
        models::{Checkpoint, JournalEntry},
    },
};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub mod filter;
pub mod models;
pub mod sled_store;

pub const BLOCKS: &str = "blocks";
pub const VALIDATORS: &str = "validators";
pub const STATS: &str = "stats";
pub const FAILED_SLOTS: &str = "failed_slots";

/// Document key for a numeric id. Zero-padded so keys iterate in id order.
pub fn id_key(id: u64) -> String {
    format!("{id:020}")
}

/// Document store the drivers persist records into. Every write is an upsert
/// keyed by a stable id.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Merges `fields` into the document under `key`, creating it if absent.
    async fn upsert(
        &self,
        collection: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&[&str]>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Distinct non-null values of `field` among matching documents, in first-seen order.
    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: &Filter,
    ) -> Result<Vec<Value>, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Returns whether a document was removed.
    async fn remove(&self, collection: &str, key: &str) -> Result<bool, StoreError>;
}

/// Durable engine state: the ingestion checkpoint and the run journal.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Stores `cp` unless the stored checkpoint is already at or past it.
    /// Returns whether the checkpoint advanced.
    async fn save_checkpoint(&self, cp: &Checkpoint) -> Result<bool, StoreError>;

    async fn load_checkpoint(&self, name: &str) -> Result<Option<Checkpoint>, StoreError>;

    async fn append_journal(&self, entry: &JournalEntry) -> Result<(), StoreError>;

    async fn iter_journal(&self, run_id: &str) -> Result<Vec<JournalEntry>, StoreError>;

    /// Most recent entries across all runs, newest first.
    async fn recent_journal(&self, limit: usize) -> Result<Vec<JournalEntry>, StoreError>;
}
