//! An in-memory blockchain that starts at a local genesis block.

use std::sync::Arc;

use devnet_blockchain_api::{Block, BlockStorage, Blockchain, BlockchainError, validate_next_block};
use devnet_primitives::B256;
use devnet_transaction::Signed;

/// A blockchain consisting of local blocks.
#[derive(Clone, Debug)]
pub struct LocalBlockchain {
    storage: BlockStorage,
    chain_id: u64,
}

impl LocalBlockchain {
    /// Constructs a new instance from the provided genesis block.
    pub fn new(genesis_block: Block, chain_id: u64) -> Result<Self, BlockchainError> {
        if genesis_block.number() != 0 {
            return Err(BlockchainError::InvalidBlockNumber {
                actual: genesis_block.number(),
                expected: 0,
            });
        }

        let mut storage = BlockStorage::with_first_block_number(0);
        storage.insert(genesis_block);

        Ok(Self { storage, chain_id })
    }

    fn genesis_or_last(&self) -> Result<&Arc<Block>, BlockchainError> {
        self.storage
            .last()
            .ok_or(BlockchainError::UnknownBlockNumber)
    }
}

impl Blockchain for LocalBlockchain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn block_by_hash(&self, hash: &B256) -> Result<Option<Arc<Block>>, BlockchainError> {
        Ok(self.storage.block_by_hash(hash).cloned())
    }

    fn block_by_number(&self, number: u64) -> Result<Option<Arc<Block>>, BlockchainError> {
        Ok(self.storage.block_by_number(number).cloned())
    }

    fn block_by_transaction_hash(
        &self,
        transaction_hash: &B256,
    ) -> Result<Option<Arc<Block>>, BlockchainError> {
        Ok(self
            .storage
            .block_by_transaction_hash(transaction_hash)
            .cloned())
    }

    fn transaction_by_hash(
        &self,
        transaction_hash: &B256,
    ) -> Result<Option<Signed>, BlockchainError> {
        Ok(self.storage.transaction_by_hash(transaction_hash).cloned())
    }

    fn last_block(&self) -> Result<Arc<Block>, BlockchainError> {
        self.genesis_or_last().cloned()
    }

    fn last_block_number(&self) -> u64 {
        self.storage.last().map_or(0, |block| block.number())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn insert_block(&mut self, block: Block) -> Result<Arc<Block>, BlockchainError> {
        validate_next_block(self.genesis_or_last()?, &block)?;

        log::debug!("Inserting local block {}", block.number());
        Ok(self.storage.insert(block))
    }

    fn revert_to_block(&mut self, block_number: u64) -> Result<(), BlockchainError> {
        if block_number > self.last_block_number() {
            return Err(BlockchainError::UnknownBlockNumber);
        }

        self.storage.revert_to_block(block_number);
        Ok(())
    }
}
