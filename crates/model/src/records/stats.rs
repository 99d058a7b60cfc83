use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Aggregates computed over the persisted blocks as of `head_slot`.
/// Appended once per head slot and never modified afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub head_slot: u64,
    pub filter_term: String,
    pub matched_blocks: u64,
    pub distinct_proposers: u64,
    pub unique_operators: u64,
    pub active_validators: u64,
    pub created_at: DateTime<Utc>,
}

impl StatsSnapshot {
    /// Document fields as stored in the `stats` collection.
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
