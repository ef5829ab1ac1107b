//! Types for Ethereum state management

pub mod account;
mod error;
mod genesis;
mod root;
mod version;

use std::{collections::BTreeMap, fmt::Debug, hash::Hash};

use auto_impl::auto_impl;
use devnet_primitives::{Address, B256, Bytes, U256};

pub use self::{
    account::AccountInfo,
    error::StateError,
    genesis::{GenesisAccountState, GenesisConfig},
    root::{SnapshotRoot, TrieRoot},
    version::VersionCounter,
};

/// Trait for reading account state.
#[auto_impl(&, &mut, Box, Arc)]
pub trait State {
    /// Retrieves the nonce, balance and code hash of the account at the
    /// provided address. Non-existent accounts are returned as empty accounts.
    fn get_account(&self, address: Address) -> Result<AccountInfo, StateError>;

    /// Retrieves the code of the account at the provided address.
    fn get_contract_code(&self, address: Address) -> Result<Bytes, StateError>;

    /// Retrieves the value of the storage slot at the provided address and
    /// index.
    fn get_contract_storage(&self, address: Address, index: U256) -> Result<U256, StateError>;

    /// Whether the account at the provided address is empty, as defined by
    /// EIP-161.
    fn account_is_empty(&self, address: Address) -> Result<bool, StateError> {
        self.get_account(address).map(|account| account.is_empty())
    }
}

/// Trait for the full capability set of a state manager, as required by an
/// execution engine and the node that drives it.
///
/// Checkpoints are strictly nested: every [`commit`](Self::commit) or
/// [`revert`](Self::revert) consumes the most recent
/// [`checkpoint`](Self::checkpoint).
pub trait StateManager: State {
    /// The handle type returned by [`state_root`](Self::state_root).
    type Root: Copy + Debug + Eq + Hash + Into<B256> + Send + Sync;

    /// Overwrites the nonce, balance and code hash of the account at the
    /// provided address.
    fn put_account(&mut self, address: Address, account: AccountInfo) -> Result<(), StateError>;

    /// Marks the account at the provided address as touched.
    fn touch_account(&mut self, address: Address);

    /// Removes all touched accounts that are empty, as defined by EIP-161.
    fn cleanup_touched_accounts(&mut self) -> Result<(), StateError>;

    /// Sets the code of the account at the provided address.
    fn put_contract_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError>;

    /// Sets the value of the storage slot at the provided address and index.
    fn put_contract_storage(
        &mut self,
        address: Address,
        index: U256,
        value: U256,
    ) -> Result<(), StateError>;

    /// Clears all storage of the account at the provided address.
    fn clear_contract_storage(&mut self, address: Address) -> Result<(), StateError>;

    /// Retrieves the value of the storage slot as it was when first observed
    /// since the last call to
    /// [`clear_original_storage_cache`](Self::clear_original_storage_cache).
    fn get_original_contract_storage(
        &mut self,
        address: Address,
        index: U256,
    ) -> Result<U256, StateError>;

    /// Clears the cache of original storage values.
    fn clear_original_storage_cache(&mut self);

    /// Creates a checkpoint that can later be committed or reverted.
    fn checkpoint(&mut self) -> Result<(), StateError>;

    /// Discards the most recent checkpoint, keeping all changes made since.
    fn commit(&mut self) -> Result<(), StateError>;

    /// Restores the state to the most recent checkpoint and discards it.
    fn revert(&mut self) -> Result<(), StateError>;

    /// Returns the number of outstanding checkpoints.
    fn checkpoint_depth(&self) -> usize;

    /// Returns a handle to the current state, which can be restored using
    /// [`set_state_root`](Self::set_state_root).
    fn state_root(&mut self) -> Result<Self::Root, StateError>;

    /// Restores the state registered under the provided handle.
    fn set_state_root(&mut self, root: Self::Root) -> Result<(), StateError>;

    /// Creates an independent copy of the state manager that shares the
    /// registry of state roots.
    fn copy(&self) -> Self
    where
        Self: Sized;

    /// Retrieves all storage slots of the account at the provided address.
    fn dump_storage(&self, address: Address) -> Result<BTreeMap<U256, U256>, StateError>;

    /// Whether a genesis state has been generated.
    fn has_genesis_state(&self) -> Result<bool, StateError>;

    /// Generates the canonical genesis state, which has no accounts.
    fn generate_canonical_genesis(&mut self) -> Result<(), StateError>;

    /// Generates a genesis state from the provided configuration.
    fn generate_genesis(&mut self, config: &GenesisConfig) -> Result<(), StateError>;
}
