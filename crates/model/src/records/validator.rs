use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Validator lifecycle status as reported by the beacon node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStatus {
    PendingInitialized,
    PendingQueued,
    ActiveOngoing,
    ActiveExiting,
    ActiveSlashed,
    ExitedUnslashed,
    ExitedSlashed,
    WithdrawalPossible,
    WithdrawalDone,
    #[serde(other)]
    Unknown,
}

impl ValidatorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidatorStatus::PendingInitialized => "pending_initialized",
            ValidatorStatus::PendingQueued => "pending_queued",
            ValidatorStatus::ActiveOngoing => "active_ongoing",
            ValidatorStatus::ActiveExiting => "active_exiting",
            ValidatorStatus::ActiveSlashed => "active_slashed",
            ValidatorStatus::ExitedUnslashed => "exited_unslashed",
            ValidatorStatus::ExitedSlashed => "exited_slashed",
            ValidatorStatus::WithdrawalPossible => "withdrawal_possible",
            ValidatorStatus::WithdrawalDone => "withdrawal_done",
            ValidatorStatus::Unknown => "unknown",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ValidatorStatus::ActiveOngoing
                | ValidatorStatus::ActiveExiting
                | ValidatorStatus::ActiveSlashed
        )
    }
}

impl fmt::Display for ValidatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidatorRecord {
    pub index: u64,
    pub status: ValidatorStatus,
    pub withdrawal_credentials: String,
    pub withdrawal_address: Option<String>,
}

impl ValidatorRecord {
    pub fn new(index: u64, status: ValidatorStatus, withdrawal_credentials: String) -> Self {
        let withdrawal_address = withdrawal_address(&withdrawal_credentials);
        ValidatorRecord {
            index,
            status,
            withdrawal_credentials,
            withdrawal_address,
        }
    }

    /// Document fields as stored in the `validators` collection.
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Extracts the execution-layer withdrawal address from 32-byte withdrawal
/// credentials. Only `0x01` and `0x02` credentials carry one; `0x00` (BLS)
/// credentials yield `None`.
pub fn withdrawal_address(credentials: &str) -> Option<String> {
    let digits = credentials.strip_prefix("0x").unwrap_or(credentials);
    if digits.len() != 64 || !digits.is_ascii() {
        return None;
    }

    match &digits[..2] {
        "01" | "02" => Some(format!("0x{}", digits[24..].to_ascii_lowercase())),
        _ => None,
    }
}
