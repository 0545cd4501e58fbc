use {
    super::payload_text,
    serde::{Deserialize, Serialize},
};

/// Outcome of a ledger mutating smart contract call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct InvokeResult {
    #[serde(rename = "txId")]
    pub transaction_id: String,
    #[serde(deserialize_with = "payload_text", default)]
    pub payload: String,
}

/// Outcome of a read-only smart contract call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueryResult {
    #[serde(deserialize_with = "payload_text", default)]
    pub payload: String,
}

impl From<serde_json::Value> for QueryResult {
    /// Results of pending queries carry the bare payload instead of an
    /// object with a `payload` field.
    fn from(value: serde_json::Value) -> Self {
        Self {
            payload: super::value_text(value),
        }
    }
}
