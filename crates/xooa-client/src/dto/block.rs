use serde::{Deserialize, Serialize};

/// The latest block of the application's channel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBlock {
    pub current_block_hash: String,
    pub previous_block_hash: String,
    pub block_number: u64,
}

/// Summary of a block looked up by its number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Block {
    pub previous_hash: String,
    pub data_hash: String,
    #[serde(rename = "blockNumber")]
    pub block_number: u64,
    #[serde(rename = "numberOfTransactions")]
    pub number_of_transactions: u64,
}
