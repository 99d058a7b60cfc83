use model::records::{
    slot::{SlotRecord, decode_graffiti},
    validator::{ValidatorRecord, ValidatorStatus},
};
use serde::{Deserialize, Deserializer, de};

/// Beacon API envelope; every endpoint wraps its payload in `data`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct HeaderData {
    pub header: SignedHeader,
}

#[derive(Debug, Deserialize)]
pub struct SignedHeader {
    pub message: HeaderMessage,
}

#[derive(Debug, Deserialize)]
pub struct HeaderMessage {
    #[serde(deserialize_with = "quoted_u64")]
    pub slot: u64,
}

#[derive(Debug, Deserialize)]
pub struct SignedBlock {
    pub message: BlockMessage,
}

#[derive(Debug, Deserialize)]
pub struct BlockMessage {
    #[serde(deserialize_with = "quoted_u64")]
    pub slot: u64,
    #[serde(deserialize_with = "quoted_u64")]
    pub proposer_index: u64,
    pub body: BlockBody,
}

#[derive(Debug, Deserialize)]
pub struct BlockBody {
    #[serde(default)]
    pub graffiti: String,
    /// Absent before the merge.
    #[serde(default)]
    pub execution_payload: Option<ExecutionPayload>,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionPayload {
    pub fee_recipient: String,
    #[serde(deserialize_with = "quoted_u64")]
    pub block_number: u64,
}

#[derive(Debug, Deserialize)]
pub struct ValidatorData {
    #[serde(deserialize_with = "quoted_u64")]
    pub index: u64,
    pub status: ValidatorStatus,
    pub validator: ValidatorDetails,
}

#[derive(Debug, Deserialize)]
pub struct ValidatorDetails {
    pub withdrawal_credentials: String,
}

impl From<SignedBlock> for SlotRecord {
    fn from(block: SignedBlock) -> Self {
        let BlockMessage {
            slot,
            proposer_index,
            body,
        } = block.message;

        SlotRecord {
            slot,
            proposer_index,
            graffiti: decode_graffiti(&body.graffiti),
            fee_recipient: body
                .execution_payload
                .as_ref()
                .map(|p| p.fee_recipient.to_lowercase()),
            block_number: body.execution_payload.map(|p| p.block_number),
        }
    }
}

impl From<ValidatorData> for ValidatorRecord {
    fn from(data: ValidatorData) -> Self {
        ValidatorRecord::new(
            data.index,
            data.status,
            data.validator.withdrawal_credentials,
        )
    }
}

/// The Beacon API encodes integers as decimal strings; accept bare numbers too.
fn quoted_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(de::Error::custom),
    }
}
