use crate::{
    error::StoreError,
    state::{
        Datastore, StateStore,
        filter::{Filter, project},
        models::{Checkpoint, JournalEntry},
    },
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::{collections::HashSet, path::Path};

const CHECKPOINT_TREE: &str = "__checkpoints";
const JOURNAL_TREE: &str = "__journal";

/// Embedded store backing both the document collections and the engine state.
/// `sled::Db` is internally synchronized, so one handle is shared by all workers.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// In-memory store removed on drop.
    pub fn temporary() -> Result<Self, sled::Error> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    pub async fn flush(&self) -> Result<(), StoreError> {
        self.db.flush_async().await?;
        Ok(())
    }

    fn scan(
        &self,
        collection: &str,
    ) -> Result<impl Iterator<Item = Result<Value, StoreError>>, StoreError> {
        let tree = self.db.open_tree(collection)?;
        Ok(tree.iter().values().map(|item| {
            let bytes = item?;
            Ok(serde_json::from_slice::<Value>(&bytes)?)
        }))
    }
}

#[async_trait]
impl Datastore for SledStore {
    async fn upsert(
        &self,
        collection: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let tree = self.db.open_tree(collection)?;

        // Read-merge-write inside a transaction so concurrent upserts to the
        // same key never lose fields.
        let result = tree.transaction::<_, _, StoreError>(|tx| {
            let mut doc = match tx.get(key.as_bytes())? {
                Some(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) => {
                        return Err(ConflictableTransactionError::Abort(
                            StoreError::NotAnObject {
                                collection: collection.to_string(),
                                key: key.to_string(),
                            },
                        ));
                    }
                    Err(e) => return Err(ConflictableTransactionError::Abort(e.into())),
                },
                None => Map::new(),
            };

            doc.extend(fields.clone());
            let bytes = serde_json::to_vec(&doc)
                .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
            tx.insert(key.as_bytes(), bytes)?;
            Ok(())
        });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(e.into()),
        }
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let tree = self.db.open_tree(collection)?;
        match tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&[&str]>,
    ) -> Result<Vec<Value>, StoreError> {
        let mut docs = Vec::new();
        for doc in self.scan(collection)? {
            let doc = doc?;
            if filter.matches(&doc) {
                docs.push(project(doc, projection));
            }
        }
        Ok(docs)
    }

    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: &Filter,
    ) -> Result<Vec<Value>, StoreError> {
        let mut seen = HashSet::new();
        let mut values = Vec::new();

        for doc in self.scan(collection)? {
            let doc = doc?;
            if !filter.matches(&doc) {
                continue;
            }
            if let Some(value) = doc.get(field)
                && !value.is_null()
                && seen.insert(value.to_string())
            {
                values.push(value.clone());
            }
        }

        Ok(values)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        if matches!(filter, Filter::All) {
            return Ok(self.db.open_tree(collection)?.len() as u64);
        }

        let mut count = 0;
        for doc in self.scan(collection)? {
            if filter.matches(&doc?) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        let tree = self.db.open_tree(collection)?;
        Ok(tree.remove(key.as_bytes())?.is_some())
    }
}

#[async_trait]
impl StateStore for SledStore {
    async fn save_checkpoint(&self, cp: &Checkpoint) -> Result<bool, StoreError> {
        let tree = self.db.open_tree(CHECKPOINT_TREE)?;
        let new_bytes = bincode::serialize(cp)?;

        // Check-then-set in one transaction: a checkpoint never moves backwards.
        let result = tree.transaction::<_, _, StoreError>(|tx| {
            if let Some(existing_bytes) = tx.get(cp.name.as_bytes())? {
                let existing: Checkpoint = bincode::deserialize(&existing_bytes)
                    .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;

                if existing.last_processed >= cp.last_processed {
                    return Ok(false);
                }
            }

            tx.insert(cp.name.as_bytes(), new_bytes.as_slice())?;
            Ok(true)
        });

        let advanced = match result {
            Ok(advanced) => advanced,
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => return Err(e.into()),
        };

        if advanced {
            // Flushes every document written before the commit as well.
            self.flush().await?;
        }
        Ok(advanced)
    }

    async fn load_checkpoint(&self, name: &str) -> Result<Option<Checkpoint>, StoreError> {
        let tree = self.db.open_tree(CHECKPOINT_TREE)?;
        match tree.get(name.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn append_journal(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        let tree = self.db.open_tree(JOURNAL_TREE)?;
        let seq = self.db.generate_id()?;
        tree.insert(seq.to_be_bytes().to_vec(), bincode::serialize(entry)?)?;
        Ok(())
    }

    async fn iter_journal(&self, run_id: &str) -> Result<Vec<JournalEntry>, StoreError> {
        let tree = self.db.open_tree(JOURNAL_TREE)?;
        let mut entries = Vec::new();

        for item in tree.iter().values() {
            let entry: JournalEntry = bincode::deserialize(&item?)?;
            if entry.run_id() == run_id {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    async fn recent_journal(&self, limit: usize) -> Result<Vec<JournalEntry>, StoreError> {
        let tree = self.db.open_tree(JOURNAL_TREE)?;
        tree.iter()
            .values()
            .rev()
            .take(limit)
            .map(|item| -> Result<JournalEntry, StoreError> { Ok(bincode::deserialize(&item?)?) })
            .collect()
    }
}
