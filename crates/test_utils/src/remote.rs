use std::sync::atomic::{AtomicBool, Ordering};

use devnet_blockchain_api::{Block, BlockchainError, Header, RemoteBlockSource, RemoteTransaction};
use devnet_primitives::{Address, B256, Bytes, HashMap, U256};
use devnet_rpc_client::{RpcClientError, jsonrpc};
use devnet_state_api::StateError;
use devnet_state_remote::RemoteStateSource;
use devnet_transaction::ExecutableTransaction as _;
use parking_lot::{Mutex, RwLock};

use crate::transaction::dummy_transaction;

fn remote_error() -> RpcClientError {
    RpcClientError::JsonRpcError {
        error: jsonrpc::Error {
            code: -32_000,
            message: "mock remote failure".to_string(),
            data: None,
        },
        request: String::new(),
    }
}

/// An account of a [`MockRemoteState`].
#[derive(Clone, Debug, Default)]
pub struct MockRemoteAccount {
    /// The account's nonce
    pub nonce: u64,
    /// The account's balance
    pub balance: U256,
    /// The account's code
    pub code: Bytes,
    /// The account's storage slots
    pub storage: HashMap<U256, U256>,
}

/// Number of calls per method of a [`MockRemoteState`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemoteStateCalls {
    /// Calls of `nonce`
    pub nonce: usize,
    /// Calls of `balance`
    pub balance: usize,
    /// Calls of `code`
    pub code: usize,
    /// Calls of `storage_at`
    pub storage: usize,
}

/// An in-memory [`RemoteStateSource`]. Unknown accounts are empty.
#[derive(Debug, Default)]
pub struct MockRemoteState {
    accounts: RwLock<HashMap<Address, MockRemoteAccount>>,
    calls: Mutex<RemoteStateCalls>,
    block_numbers: Mutex<Vec<u64>>,
    failing: AtomicBool,
}

impl MockRemoteState {
    /// Inserts or replaces the account at the provided address.
    pub fn insert_account(&self, address: Address, account: MockRemoteAccount) {
        self.accounts.write().insert(address, account);
    }

    /// Returns the number of calls made so far.
    pub fn calls(&self) -> RemoteStateCalls {
        *self.calls.lock()
    }

    /// Returns the distinct block numbers that were requested, in ascending
    /// order.
    pub fn block_numbers(&self) -> Vec<u64> {
        let mut block_numbers = self.block_numbers.lock().clone();
        block_numbers.sort_unstable();
        block_numbers.dedup();
        block_numbers
    }

    /// Sets whether all subsequent calls fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record<T>(
        &self,
        address: Address,
        block_number: u64,
        counter: impl FnOnce(&mut RemoteStateCalls) -> &mut usize,
        read: impl FnOnce(Option<&MockRemoteAccount>) -> T,
    ) -> Result<T, StateError> {
        *counter(&mut *self.calls.lock()) += 1;
        self.block_numbers.lock().push(block_number);

        if self.failing.load(Ordering::SeqCst) {
            return Err(StateError::Remote(remote_error()));
        }

        Ok(read(self.accounts.read().get(&address)))
    }
}

impl RemoteStateSource for MockRemoteState {
    fn nonce(&self, address: Address, block_number: u64) -> Result<u64, StateError> {
        self.record(
            address,
            block_number,
            |calls| &mut calls.nonce,
            |account| account.map_or(0, |account| account.nonce),
        )
    }

    fn balance(&self, address: Address, block_number: u64) -> Result<U256, StateError> {
        self.record(
            address,
            block_number,
            |calls| &mut calls.balance,
            |account| account.map_or(U256::ZERO, |account| account.balance),
        )
    }

    fn code(&self, address: Address, block_number: u64) -> Result<Bytes, StateError> {
        self.record(
            address,
            block_number,
            |calls| &mut calls.code,
            |account| account.map(|account| account.code.clone()).unwrap_or_default(),
        )
    }

    fn storage_at(
        &self,
        address: Address,
        index: U256,
        block_number: u64,
    ) -> Result<U256, StateError> {
        self.record(
            address,
            block_number,
            |calls| &mut calls.storage,
            |account| {
                account
                    .and_then(|account| account.storage.get(&index))
                    .copied()
                    .unwrap_or(U256::ZERO)
            },
        )
    }
}

/// Number of calls per method of a [`MockRemoteBlocks`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemoteBlockCalls {
    /// Calls of `block_by_number`
    pub block_by_number: usize,
    /// Calls of `block_by_hash`
    pub block_by_hash: usize,
    /// Calls of `transaction_by_hash`
    pub transaction_by_hash: usize,
}

/// An in-memory [`RemoteBlockSource`].
#[derive(Debug, Default)]
pub struct MockRemoteBlocks {
    blocks: Vec<Block>,
    calls: Mutex<RemoteBlockCalls>,
    failing: AtomicBool,
}

impl MockRemoteBlocks {
    /// Constructs a chain of blocks numbered from zero up to and including
    /// `last_block_number`. Every block contains a single dummy transaction
    /// whose nonce equals the block number.
    pub fn with_chain(last_block_number: u64) -> Self {
        let mut blocks: Vec<Block> = Vec::new();

        for number in 0..=last_block_number {
            let parent_hash = blocks.last().map_or(B256::ZERO, |parent| *parent.hash());
            let header = Header::new(
                parent_hash,
                number,
                1_700_000_000 + number * 12,
                Address::ZERO,
                30_000_000,
            );

            blocks.push(Block::new(header, vec![dummy_transaction(number)]));
        }

        Self {
            blocks,
            ..Self::default()
        }
    }

    /// Returns the block with the provided number, without counting a call.
    pub fn block(&self, number: u64) -> Option<Block> {
        self.blocks
            .iter()
            .find(|block| block.number() == number)
            .cloned()
    }

    /// Returns the number of calls made so far.
    pub fn calls(&self) -> RemoteBlockCalls {
        *self.calls.lock()
    }

    /// Sets whether all subsequent calls fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_failing(&self) -> Result<(), BlockchainError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(BlockchainError::Remote(remote_error()))
        } else {
            Ok(())
        }
    }
}

impl RemoteBlockSource for MockRemoteBlocks {
    fn block_by_number(&self, number: u64) -> Result<Option<Block>, BlockchainError> {
        self.calls.lock().block_by_number += 1;
        self.check_failing()?;

        Ok(self.block(number))
    }

    fn block_by_hash(&self, hash: &B256) -> Result<Option<Block>, BlockchainError> {
        self.calls.lock().block_by_hash += 1;
        self.check_failing()?;

        Ok(self.blocks.iter().find(|block| block.hash() == hash).cloned())
    }

    fn transaction_by_hash(
        &self,
        transaction_hash: &B256,
    ) -> Result<Option<RemoteTransaction>, BlockchainError> {
        self.calls.lock().transaction_by_hash += 1;
        self.check_failing()?;

        Ok(self.blocks.iter().find_map(|block| {
            block
                .transactions()
                .iter()
                .find(|transaction| transaction.transaction_hash() == transaction_hash)
                .map(|transaction| RemoteTransaction {
                    transaction: transaction.clone(),
                    block_number: Some(block.number()),
                })
        }))
    }
}
