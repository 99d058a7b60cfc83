use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields extracted from a proposed beacon block.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SlotRecord {
    pub slot: u64,
    pub proposer_index: u64,
    /// Graffiti decoded to text, trailing NUL padding removed.
    pub graffiti: String,
    pub fee_recipient: Option<String>,
    pub block_number: Option<u64>,
}

impl SlotRecord {
    /// Document fields as stored in the `blocks` collection.
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Decodes the 32-byte hex graffiti of a block body into text.
///
/// Invalid UTF-8 is replaced lossily, malformed hex yields an empty string.
pub fn decode_graffiti(hex: &str) -> String {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    if digits.len() % 2 != 0 || !digits.is_ascii() {
        return String::new();
    }

    let bytes: Option<Vec<u8>> = (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect();

    match bytes {
        Some(bytes) => String::from_utf8_lossy(&bytes)
            .trim_end_matches('\0')
            .to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_padded_graffiti() {
        let hex = format!("0x4c69676874686f7573652f76342e302e30{}", "00".repeat(15));
        assert_eq!(decode_graffiti(&hex), "Lighthouse/v4.0.0");
    }

    #[test]
    fn empty_graffiti_is_empty_text() {
        let hex = format!("0x{}", "00".repeat(32));
        assert_eq!(decode_graffiti(&hex), "");
    }

    #[test]
    fn malformed_hex_is_empty_text() {
        assert_eq!(decode_graffiti("0xzz"), "");
        assert_eq!(decode_graffiti("0x123"), "");
    }

    #[test]
    fn fields_are_keyed_by_name() {
        let record = SlotRecord {
            slot: 7,
            proposer_index: 12,
            graffiti: "hello".into(),
            fee_recipient: None,
            block_number: Some(100),
        };
        let fields = record.to_fields();
        assert_eq!(fields["slot"], 7);
        assert_eq!(fields["proposer_index"], 12);
        assert_eq!(fields["graffiti"], "hello");
        assert!(fields["fee_recipient"].is_null());
    }
}
