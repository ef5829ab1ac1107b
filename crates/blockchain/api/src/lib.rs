//! Types for Ethereum blockchains
#![warn(missing_docs)]

mod block;
mod error;
mod storage;

use std::{fmt::Debug, sync::Arc};

use auto_impl::auto_impl;
use devnet_primitives::B256;
use devnet_transaction::Signed;

pub use self::{
    block::{Block, Header, transactions_root},
    error::BlockchainError,
    storage::BlockStorage,
};

/// Trait for implementations of an Ethereum blockchain.
#[auto_impl(&mut, Box)]
pub trait Blockchain: Debug + Send + Sync {
    /// Retrieves the chain ID of the blockchain.
    fn chain_id(&self) -> u64;

    /// Retrieves the block with the provided hash, if it exists.
    fn block_by_hash(&self, hash: &B256) -> Result<Option<Arc<Block>>, BlockchainError>;

    /// Retrieves the block with the provided number, if it exists.
    fn block_by_number(&self, number: u64) -> Result<Option<Arc<Block>>, BlockchainError>;

    /// Retrieves the block that contains a transaction with the provided hash,
    /// if it exists.
    fn block_by_transaction_hash(
        &self,
        transaction_hash: &B256,
    ) -> Result<Option<Arc<Block>>, BlockchainError>;

    /// Retrieves the transaction with the provided hash, if it was included
    /// in a block.
    fn transaction_by_hash(
        &self,
        transaction_hash: &B256,
    ) -> Result<Option<Signed>, BlockchainError>;

    /// Retrieves the last block in the blockchain.
    fn last_block(&self) -> Result<Arc<Block>, BlockchainError>;

    /// Retrieves the last block number in the blockchain.
    fn last_block_number(&self) -> u64;

    /// Inserts the provided block into the blockchain, returning a reference to
    /// the inserted block.
    fn insert_block(&mut self, block: Block) -> Result<Arc<Block>, BlockchainError>;

    /// Reverts to the block with the provided number, deleting all later
    /// blocks.
    fn revert_to_block(&mut self, block_number: u64) -> Result<(), BlockchainError>;
}

/// A transaction retrieved from a remote node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteTransaction {
    /// The transaction
    pub transaction: Signed,
    /// The number of the block that includes the transaction, if it was
    /// mined
    pub block_number: Option<u64>,
}

/// A blocking source of blocks and transactions of a remote chain.
#[auto_impl(&, Box, Arc)]
pub trait RemoteBlockSource: Debug + Send + Sync {
    /// Retrieves the block with the provided number, if it exists.
    fn block_by_number(&self, number: u64) -> Result<Option<Block>, BlockchainError>;

    /// Retrieves the block with the provided hash, if it exists.
    fn block_by_hash(&self, hash: &B256) -> Result<Option<Block>, BlockchainError>;

    /// Retrieves the transaction with the provided hash, if it exists.
    fn transaction_by_hash(
        &self,
        transaction_hash: &B256,
    ) -> Result<Option<RemoteTransaction>, BlockchainError>;
}

/// Validates that the provided block can be appended after `last_block`.
pub fn validate_next_block(last_block: &Block, next_block: &Block) -> Result<(), BlockchainError> {
    let expected = last_block.header().number + 1;
    if next_block.header().number != expected {
        return Err(BlockchainError::InvalidBlockNumber {
            actual: next_block.header().number,
            expected,
        });
    }

    if next_block.header().parent_hash != *last_block.hash() {
        return Err(BlockchainError::InvalidParentHash {
            actual: next_block.header().parent_hash,
            expected: *last_block.hash(),
        });
    }

    Ok(())
}
