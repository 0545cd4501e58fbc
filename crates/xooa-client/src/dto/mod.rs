//! Data transfer objects mirroring the JSON documents of the Xooa gateway.
//!
//! Field names follow the gateway's own (inconsistent) spelling on the wire
//! and are exposed with regular Rust names.

pub mod block;
pub mod contract;
pub mod identity;
pub mod transaction;

pub use {
    block::{Block, CurrentBlock},
    contract::{InvokeResult, QueryResult},
    identity::{Access, Attribute, Identity, IdentityRequest},
    transaction::{ReadSet, ReadSubSet, Transaction, Version, WriteSet, WriteSubSet},
};
use serde::{Deserialize, Deserializer, Serialize};

/// Handle to a request the gateway is still processing.
///
/// Returned whenever the gateway answers with `202 Accepted`. The result can
/// be fetched later through the result endpoints with [`Self::result_id`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PendingTransaction {
    #[serde(rename = "resultId")]
    pub result_id: String,
    #[serde(rename = "resultURL", default)]
    pub result_url: String,
}

/// Envelope of every `/results/{id}` response.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ResultEnvelope<T> {
    pub result: T,
}

/// Response of an identity deletion.
#[derive(Clone, Copy, Debug, Deserialize)]
pub(crate) struct Deleted {
    pub deleted: bool,
}

/// Accepts any JSON value and keeps it as text: strings are taken verbatim,
/// `null` becomes the empty string and everything else its compact JSON
/// encoding. Smart contract payloads are opaque to the SDK.
pub(crate) fn payload_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(serde_json::Value::deserialize(deserializer)?))
}

pub(crate) fn value_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
