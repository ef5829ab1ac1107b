use std::sync::Arc;

use devnet_primitives::B256;
use devnet_transaction::{ExecutableTransaction as _, Signed};
use rpds::{HashTrieMapSync, VectorSync};

use crate::Block;

/// Storage of consecutive blocks, starting at a fixed block number.
///
/// All maps are persistent, so cloning the storage is O(1).
#[derive(Clone, Debug)]
pub struct BlockStorage {
    first_block_number: u64,
    blocks: VectorSync<Arc<Block>>,
    hash_to_number: HashTrieMapSync<B256, u64>,
    transaction_to_block: HashTrieMapSync<B256, u64>,
}

impl BlockStorage {
    /// Constructs empty storage whose first block will have the provided
    /// number.
    pub fn with_first_block_number(first_block_number: u64) -> Self {
        Self {
            first_block_number,
            blocks: VectorSync::new_sync(),
            hash_to_number: HashTrieMapSync::new_sync(),
            transaction_to_block: HashTrieMapSync::new_sync(),
        }
    }

    /// Retrieves the last block, if any.
    pub fn last(&self) -> Option<&Arc<Block>> {
        self.blocks.last()
    }

    /// Whether the storage contains no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Retrieves the block with the provided number, if it exists.
    pub fn block_by_number(&self, number: u64) -> Option<&Arc<Block>> {
        let index = number.checked_sub(self.first_block_number)?;
        self.blocks.get(usize::try_from(index).ok()?)
    }

    /// Retrieves the block with the provided hash, if it exists.
    pub fn block_by_hash(&self, hash: &B256) -> Option<&Arc<Block>> {
        self.hash_to_number
            .get(hash)
            .and_then(|number| self.block_by_number(*number))
    }

    /// Retrieves the block that contains the transaction with the provided
    /// hash, if it exists.
    pub fn block_by_transaction_hash(&self, transaction_hash: &B256) -> Option<&Arc<Block>> {
        self.transaction_to_block
            .get(transaction_hash)
            .and_then(|number| self.block_by_number(*number))
    }

    /// Retrieves the transaction with the provided hash, if it exists.
    pub fn transaction_by_hash(&self, transaction_hash: &B256) -> Option<&Signed> {
        self.block_by_transaction_hash(transaction_hash)
            .and_then(|block| {
                block
                    .transactions()
                    .iter()
                    .find(|transaction| transaction.transaction_hash() == transaction_hash)
            })
    }

    /// Appends a block. The caller is responsible for validating that the
    /// block follows the last block.
    pub fn insert(&mut self, block: Block) -> Arc<Block> {
        let number = block.number();
        debug_assert_eq!(
            number,
            self.first_block_number + self.blocks.len() as u64,
            "Blocks must be consecutive"
        );

        for transaction in block.transactions() {
            self.transaction_to_block
                .insert_mut(*transaction.transaction_hash(), number);
        }
        self.hash_to_number.insert_mut(*block.hash(), number);

        let block = Arc::new(block);
        self.blocks.push_back_mut(block.clone());

        block
    }

    /// Deletes all blocks after the provided block number.
    pub fn revert_to_block(&mut self, block_number: u64) {
        while let Some(last) = self.blocks.last().cloned() {
            if last.number() <= block_number {
                break;
            }

            for transaction in last.transactions() {
                self.transaction_to_block
                    .remove_mut(transaction.transaction_hash());
            }
            self.hash_to_number.remove_mut(last.hash());
            self.blocks.drop_last_mut();
        }
    }
}
