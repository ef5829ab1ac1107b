use devnet_primitives::{Address, B64, B256, Bloom, Bytes, U64, U256};
use serde::{Deserialize, Serialize};

/// A transaction as returned by `eth_getTransactionByHash` or as part of a
/// block with full transactions.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    /// Hash of the transaction
    pub hash: B256,
    /// The sender's nonce
    pub nonce: U64,
    /// Hash of the block containing the transaction; `None` when pending
    pub block_hash: Option<B256>,
    /// Number of the block containing the transaction; `None` when pending
    pub block_number: Option<U64>,
    /// Index of the transaction in its block; `None` when pending
    pub transaction_index: Option<U64>,
    /// The sender
    pub from: Address,
    /// The recipient; `None` for contract creation
    pub to: Option<Address>,
    /// Transferred value
    pub value: U256,
    /// Effective gas price
    pub gas_price: U256,
    /// Gas limit
    pub gas: U64,
    /// Input data
    pub input: Bytes,
    /// Signature V-value
    pub v: U64,
    /// Signature R-value
    pub r: U256,
    /// Signature S-value
    pub s: U256,
    /// Chain ID, for replay-protected transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U64>,
}

/// A block as returned by `eth_getBlockByNumber` and `eth_getBlockByHash`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock<TransactionT> {
    /// Hash of the block; `None` when pending
    pub hash: Option<B256>,
    /// Hash of the parent block
    pub parent_hash: B256,
    /// Hash of the block's ommers
    pub sha3_uncles: B256,
    /// The beneficiary of the block's rewards
    pub miner: Address,
    /// Root of the state trie after this block
    pub state_root: B256,
    /// Root of the transactions trie
    pub transactions_root: B256,
    /// Root of the receipts trie
    pub receipts_root: B256,
    /// Bloom filter of the block's logs
    pub logs_bloom: Bloom,
    /// Proof-of-work difficulty
    pub difficulty: U256,
    /// Number of the block; `None` when pending
    pub number: Option<U64>,
    /// Gas limit of the block
    pub gas_limit: U64,
    /// Total gas used by the block's transactions
    pub gas_used: U64,
    /// Timestamp of the block, in seconds since the epoch
    pub timestamp: U64,
    /// Extra data
    pub extra_data: Bytes,
    /// Proof-of-work mix hash; the previous RANDAO value after the merge
    #[serde(default)]
    pub mix_hash: B256,
    /// Proof-of-work nonce
    #[serde(default)]
    pub nonce: B64,
    /// Base fee per gas, since London
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<U256>,
    /// Root of the withdrawals trie, since Shanghai
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<B256>,
    /// Blob gas used by the block's transactions, since Cancun
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_gas_used: Option<U64>,
    /// Excess blob gas, since Cancun
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excess_blob_gas: Option<U64>,
    /// Root of the parent beacon block, since Cancun
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<B256>,
    /// Commitment to the block's execution layer requests, since Prague
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_hash: Option<B256>,
    /// Transactions of the block
    pub transactions: Vec<TransactionT>,
}
