use std::num::NonZeroU64;

use devnet_primitives::{B256, U256};
use devnet_state_api::StateError;

/// An error that can occur when adding a transaction to the pool.
#[derive(Debug, thiserror::Error)]
pub enum MemPoolAddTransactionError {
    /// Contract creation without init code.
    #[error("contract creation without any data provided")]
    ContractCreationWithoutData,
    /// Sender does not have enough funds to send transaction.
    #[error(
        "sender doesn't have enough funds to send tx. The upfront cost is: {max_upfront_cost} and the sender's account only has: {sender_balance}"
    )]
    InsufficientFunds {
        /// The maximum upfront cost of the transaction
        max_upfront_cost: U256,
        /// The sender's balance
        sender_balance: U256,
    },
    /// Transaction nonce is lower than the sender's executable nonce.
    #[error("Nonce too low. Expected nonce to be at least {sender_nonce} but got {transaction_nonce}.")]
    NonceTooLow {
        /// Transaction's nonce.
        transaction_nonce: u64,
        /// Sender's executable nonce.
        sender_nonce: u64,
    },
    /// Transaction gas limit is below its intrinsic gas.
    #[error("Transaction requires at least {initial_cost} gas but got {transaction_gas_limit}")]
    IntrinsicGasTooLow {
        /// The intrinsic gas of the transaction
        initial_cost: u64,
        /// The transaction gas limit
        transaction_gas_limit: u64,
    },
    /// Transaction gas limit exceeds block gas limit.
    #[error(
        "Transaction gas limit is {transaction_gas_limit} and exceeds block gas limit of {block_gas_limit}"
    )]
    ExceedsBlockGasLimit {
        /// The block gas limit
        block_gas_limit: NonZeroU64,
        /// The transaction gas limit
        transaction_gas_limit: u64,
    },
    /// Transaction already exists in the pool.
    #[error("Known transaction: 0x{transaction_hash:x}")]
    TransactionAlreadyExists {
        /// The transaction hash
        transaction_hash: B256,
    },
    /// State error
    #[error(transparent)]
    State(#[from] StateError),
}

/// An error that can occur when restoring a pool snapshot.
#[derive(Debug, thiserror::Error)]
pub enum MemPoolError {
    /// No snapshot was registered under the provided ID.
    #[error("There's no snapshot with such ID")]
    UnknownSnapshot {
        /// The snapshot ID
        snapshot_id: u64,
    },
}
