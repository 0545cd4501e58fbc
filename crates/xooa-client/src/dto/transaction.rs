use {
    serde::{Deserialize, Serialize},
    serde_with::{DisplayFromStr, PickFirst, serde_as},
};

/// A ledger transaction with its read/write sets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Transaction {
    #[serde(rename = "txid")]
    pub transaction_id: String,
    #[serde(rename = "smartcontract")]
    pub smart_contract: String,
    #[serde(rename = "creator_msp_id")]
    pub creator_msp_id: String,
    #[serde(rename = "endorser_msp_id", default)]
    pub endorser_msp_ids: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "createdt")]
    pub created_at: String,
    #[serde(rename = "read_set", default)]
    pub read_sets: Vec<ReadSet>,
    #[serde(rename = "write_set", default)]
    pub write_sets: Vec<WriteSet>,
}

/// Keys a transaction read from the state of one chaincode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReadSet {
    pub chaincode: String,
    #[serde(rename = "set", default)]
    pub sets: Vec<ReadSubSet>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReadSubSet {
    pub key: String,
    #[serde(default)]
    pub version: Version,
}

/// Height at which a key was last written.
#[serde_as]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Version {
    #[serde(rename = "block_num")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub block_number: u64,
    #[serde(rename = "tx_num")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub transaction_number: u64,
}

/// Keys a transaction wrote to the state of one chaincode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WriteSet {
    pub chaincode: String,
    #[serde(rename = "set", default)]
    pub sets: Vec<WriteSubSet>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WriteSubSet {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub is_delete: bool,
}
