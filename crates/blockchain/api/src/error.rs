use devnet_primitives::B256;
use devnet_rpc_client::RpcClientError;

/// Error type for blockchains.
#[derive(Debug, thiserror::Error)]
pub enum BlockchainError {
    /// Block number does not follow the last block
    #[error("Invalid block number: {actual}. Expected: {expected}.")]
    InvalidBlockNumber {
        /// Provided block number
        actual: u64,
        /// Expected block number
        expected: u64,
    },
    /// Parent hash does not match the last block
    #[error("Invalid parent hash: {actual}. Expected: {expected}.")]
    InvalidParentHash {
        /// Provided parent hash
        actual: B256,
        /// Expected parent hash
        expected: B256,
    },
    /// Remote blocks cannot be deleted
    #[error("Cannot delete remote block.")]
    CannotDeleteRemote,
    /// Block number exceeds the last block number
    #[error("Unknown block number")]
    UnknownBlockNumber,
    /// The remote node does not have the requested block
    #[error("Block not found: {block_number}")]
    MissingRemoteBlock {
        /// The requested block number
        block_number: u64,
    },
    /// A remote block or transaction cannot be represented locally
    #[error("Invalid remote data for {hash}: {reason}")]
    InvalidRemoteData {
        /// Hash of the block or transaction
        hash: B256,
        /// Why the data is invalid
        reason: &'static str,
    },
    /// Error from the underlying RPC client
    #[error(transparent)]
    Remote(#[from] RpcClientError),
}
