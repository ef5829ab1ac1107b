//! A blockchain that extends a remote chain from a fork block.

mod remote;

use std::sync::Arc;

use devnet_blockchain_api::{
    Block, BlockStorage, Blockchain, BlockchainError, RemoteBlockSource, validate_next_block,
};
use devnet_primitives::{B256, HashMap};
use devnet_transaction::Signed;
use parking_lot::Mutex;

pub use self::remote::RpcRemoteBlocks;

#[derive(Debug, Default)]
struct RemoteBlockCache {
    blocks: HashMap<u64, Arc<Block>>,
    hash_to_number: HashMap<B256, u64>,
}

/// A blockchain whose blocks up to and including the fork block are
/// retrieved from a remote node, followed by local blocks.
///
/// Remote blocks after the fork block are never visible.
#[derive(Debug)]
pub struct ForkBlockchain {
    remote: Arc<dyn RemoteBlockSource>,
    fork_block: Arc<Block>,
    local_storage: BlockStorage,
    remote_cache: Mutex<RemoteBlockCache>,
    chain_id: u64,
}

impl ForkBlockchain {
    /// Constructs a new instance, retrieving the fork block from the remote
    /// source.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(remote)))]
    pub fn new(
        remote: Arc<dyn RemoteBlockSource>,
        fork_block_number: u64,
        chain_id: u64,
    ) -> Result<Self, BlockchainError> {
        let fork_block = remote
            .block_by_number(fork_block_number)?
            .map(Arc::new)
            .ok_or(BlockchainError::MissingRemoteBlock {
                block_number: fork_block_number,
            })?;

        log::debug!(
            "Forking from block {fork_block_number} with hash {}",
            fork_block.hash()
        );

        Ok(Self {
            remote,
            fork_block,
            local_storage: BlockStorage::with_first_block_number(fork_block_number + 1),
            remote_cache: Mutex::new(RemoteBlockCache::default()),
            chain_id,
        })
    }

    /// Returns the number of the fork block.
    pub fn fork_block_number(&self) -> u64 {
        self.fork_block.number()
    }

    fn cache_remote_block(&self, block: Block) -> Arc<Block> {
        let mut cache = self.remote_cache.lock();

        let number = block.number();
        let block = cache
            .blocks
            .entry(number)
            .or_insert_with(|| Arc::new(block))
            .clone();

        cache.hash_to_number.insert(*block.hash(), number);

        block
    }

    fn remote_block_by_number(&self, number: u64) -> Result<Option<Arc<Block>>, BlockchainError> {
        if number == self.fork_block_number() {
            return Ok(Some(self.fork_block.clone()));
        }

        if let Some(block) = self.remote_cache.lock().blocks.get(&number) {
            return Ok(Some(block.clone()));
        }

        let block = self.remote.block_by_number(number)?;
        Ok(block.map(|block| self.cache_remote_block(block)))
    }

    fn remote_block_by_hash(&self, hash: &B256) -> Result<Option<Arc<Block>>, BlockchainError> {
        if self.fork_block.hash() == hash {
            return Ok(Some(self.fork_block.clone()));
        }

        {
            let cache = self.remote_cache.lock();
            if let Some(block) = cache
                .hash_to_number
                .get(hash)
                .and_then(|number| cache.blocks.get(number))
            {
                return Ok(Some(block.clone()));
            }
        }

        let Some(block) = self.remote.block_by_hash(hash)? else {
            return Ok(None);
        };

        if block.number() > self.fork_block_number() {
            log::debug!(
                "Ignoring remote block {hash} that is newer than the fork block"
            );
            return Ok(None);
        }

        Ok(Some(self.cache_remote_block(block)))
    }

    fn remote_transaction_block_number(
        &self,
        transaction_hash: &B256,
    ) -> Result<Option<(Signed, u64)>, BlockchainError> {
        let Some(remote) = self.remote.transaction_by_hash(transaction_hash)? else {
            return Ok(None);
        };

        Ok(remote
            .block_number
            .filter(|number| *number <= self.fork_block_number())
            .map(|number| (remote.transaction, number)))
    }
}

impl Blockchain for ForkBlockchain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    fn block_by_hash(&self, hash: &B256) -> Result<Option<Arc<Block>>, BlockchainError> {
        if let Some(block) = self.local_storage.block_by_hash(hash) {
            return Ok(Some(block.clone()));
        }

        self.remote_block_by_hash(hash)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    fn block_by_number(&self, number: u64) -> Result<Option<Arc<Block>>, BlockchainError> {
        if number > self.fork_block_number() {
            Ok(self.local_storage.block_by_number(number).cloned())
        } else {
            self.remote_block_by_number(number)
        }
    }

    fn block_by_transaction_hash(
        &self,
        transaction_hash: &B256,
    ) -> Result<Option<Arc<Block>>, BlockchainError> {
        if let Some(block) = self.local_storage.block_by_transaction_hash(transaction_hash) {
            return Ok(Some(block.clone()));
        }

        match self.remote_transaction_block_number(transaction_hash)? {
            Some((_, block_number)) => self.remote_block_by_number(block_number),
            None => Ok(None),
        }
    }

    fn transaction_by_hash(
        &self,
        transaction_hash: &B256,
    ) -> Result<Option<Signed>, BlockchainError> {
        if let Some(transaction) = self.local_storage.transaction_by_hash(transaction_hash) {
            return Ok(Some(transaction.clone()));
        }

        Ok(self
            .remote_transaction_block_number(transaction_hash)?
            .map(|(transaction, _)| transaction))
    }

    fn last_block(&self) -> Result<Arc<Block>, BlockchainError> {
        Ok(self
            .local_storage
            .last()
            .unwrap_or(&self.fork_block)
            .clone())
    }

    fn last_block_number(&self) -> u64 {
        self.local_storage
            .last()
            .map_or_else(|| self.fork_block_number(), |block| block.number())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn insert_block(&mut self, block: Block) -> Result<Arc<Block>, BlockchainError> {
        let last_block = self.last_block()?;
        validate_next_block(&last_block, &block)?;

        Ok(self.local_storage.insert(block))
    }

    fn revert_to_block(&mut self, block_number: u64) -> Result<(), BlockchainError> {
        if block_number < self.fork_block_number() {
            return Err(BlockchainError::CannotDeleteRemote);
        }

        if block_number > self.last_block_number() {
            return Err(BlockchainError::UnknownBlockNumber);
        }

        self.local_storage.revert_to_block(block_number);
        Ok(())
    }
}
