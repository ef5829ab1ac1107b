use std::time::SystemTime;

use devnet_blockchain_api::BlockchainError;
use devnet_mem_pool::{MemPoolAddTransactionError, MemPoolError};
use devnet_primitives::{Address, B256, U256};
use devnet_rpc_client::RpcClientError;
use devnet_signer::SignatureError;
use devnet_state_api::StateError;

use crate::executor::{Exception, ExecutorError};

/// Error that occurs while constructing a node.
#[derive(Debug, thiserror::Error)]
pub enum CreationError {
    /// Blockchain error
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),
    /// An HTTP header of the fork configuration is invalid
    #[error("Invalid HTTP header: {name}")]
    InvalidHttpHeader {
        /// The name of the header
        name: String,
    },
    /// The initial date lies before the UNIX epoch
    #[error("The initial date configuration value {0:?} is before the UNIX epoch")]
    InvalidInitialDate(SystemTime),
    /// The node was constructed as a fork without fork configuration
    #[error("Missing fork configuration")]
    MissingForkConfig,
    /// A secret key of a genesis account is invalid
    #[error(transparent)]
    InvalidSecretKey(#[from] SignatureError),
    /// Error from the JSON-RPC client of the remote chain
    #[error(transparent)]
    RpcClient(#[from] RpcClientError),
    /// State error
    #[error(transparent)]
    State(#[from] StateError),
}

/// Error that occurs while operating a node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The transaction nonce is too high, while automatically mining.
    #[error(
        "Nonce too high. Expected nonce to be {expected} but got {actual}. Note that transactions can't be queued when automining."
    )]
    AutoMineNonceTooHigh {
        /// The sender's next nonce
        expected: u64,
        /// The transaction's nonce
        actual: u64,
    },
    /// Blockchain error
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),
    /// The transaction could not be executed
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    /// The filter does not collect logs
    #[error("Filter 0x{filter_id:x} is not a logs filter")]
    InvalidFilterType {
        /// ID of the filter
        filter_id: U256,
    },
    /// The transaction was already mined
    #[error("Known transaction: 0x{transaction_hash:x}")]
    KnownTransaction {
        /// Hash of the transaction
        transaction_hash: B256,
    },
    /// The transaction pool rejected the transaction
    #[error(transparent)]
    MemPoolAddTransaction(#[from] MemPoolAddTransactionError),
    /// Transaction pool error
    #[error(transparent)]
    MemPool(#[from] MemPoolError),
    /// Signing failed
    #[error(transparent)]
    Signature(#[from] SignatureError),
    /// State error
    #[error(transparent)]
    State(#[from] StateError),
    /// The proposed timestamp equals the previous block's
    #[error("Timestamp {proposed} is equal to the previous block's timestamp")]
    TimestampEqualsPrevious {
        /// The proposed timestamp
        proposed: u64,
    },
    /// The proposed timestamp lies before the previous block's
    #[error("Timestamp {proposed} is lower than the previous block's timestamp {previous}")]
    TimestampLowerThanPrevious {
        /// The proposed timestamp
        proposed: u64,
        /// The previous block's timestamp
        previous: u64,
    },
    /// The transaction does not succeed, even with the block gas limit
    #[error(transparent)]
    TransactionFailed(#[from] Exception),
    /// The node does not know the secret key of the sender
    #[error("Unknown account {address}")]
    UnknownAddress {
        /// The sender's address
        address: Address,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            NodeError::TimestampLowerThanPrevious {
                proposed: 1,
                previous: 2
            }
            .to_string(),
            "Timestamp 1 is lower than the previous block's timestamp 2"
        );
        assert_eq!(
            NodeError::TransactionFailed(Exception::Revert).to_string(),
            "Transaction reverted"
        );
    }
}
