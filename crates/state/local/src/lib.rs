//! An authoritative, in-memory state with a real state root.

mod state;

use std::{collections::BTreeMap, sync::Arc};

use devnet_primitives::{Address, B256, Bytes, HashMap, HashSet, KECCAK_EMPTY, U256, keccak256};
use devnet_state_api::{
    AccountInfo, GenesisConfig, State, StateError, StateManager, TrieRoot, VersionCounter,
};
use parking_lot::RwLock;

use self::state::{LocalAccount, LocalState};

type Registry = Arc<RwLock<HashMap<TrieRoot, LocalState>>>;

#[derive(Clone, Debug)]
struct Checkpoint {
    state: LocalState,
    version: u64,
}

/// A state manager that owns all of its data and computes the
/// Merkle-Patricia root of it.
///
/// Every root returned by [`StateManager::state_root`] is registered, so the
/// state can later be restored using [`StateManager::set_state_root`].
#[derive(Debug)]
pub struct LocalStateManager {
    state: LocalState,
    version: u64,
    versions: VersionCounter,
    /// The state root of the state with the specified version
    memoized_root: Option<(u64, TrieRoot)>,
    registry: Registry,
    checkpoints: Vec<Checkpoint>,
    original_storage: HashMap<(Address, U256), U256>,
    touched_accounts: HashSet<Address>,
    has_genesis_state: bool,
}

impl LocalStateManager {
    /// Constructs an empty instance.
    pub fn new() -> Self {
        let versions = VersionCounter::default();

        Self {
            state: LocalState::default(),
            version: versions.next_version(),
            versions,
            memoized_root: None,
            registry: Registry::default(),
            checkpoints: Vec::new(),
            original_storage: HashMap::default(),
            touched_accounts: HashSet::default(),
            has_genesis_state: false,
        }
    }

    fn modify_account(&mut self, address: Address, modifier: impl FnOnce(&mut LocalAccount)) {
        let mut account = self
            .state
            .accounts
            .get(&address)
            .cloned()
            .unwrap_or_default();

        modifier(&mut account);

        self.state.accounts.insert_mut(address, account);
        self.version = self.versions.next_version();
    }

    fn install_state(&mut self, state: LocalState, version: u64) {
        self.state = state;
        self.version = version;
    }
}

impl Default for LocalStateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl State for LocalStateManager {
    fn get_account(&self, address: Address) -> Result<AccountInfo, StateError> {
        Ok(self
            .state
            .accounts
            .get(&address)
            .map(LocalAccount::info)
            .unwrap_or_default())
    }

    fn get_contract_code(&self, address: Address) -> Result<Bytes, StateError> {
        let code = self
            .state
            .accounts
            .get(&address)
            .and_then(|account| self.state.code.get(&account.code_hash))
            .cloned()
            .unwrap_or_default();

        Ok(code)
    }

    fn get_contract_storage(&self, address: Address, index: U256) -> Result<U256, StateError> {
        Ok(self
            .state
            .accounts
            .get(&address)
            .and_then(|account| account.storage.get(&index))
            .copied()
            .unwrap_or(U256::ZERO))
    }
}

impl StateManager for LocalStateManager {
    type Root = TrieRoot;

    fn put_account(&mut self, address: Address, account: AccountInfo) -> Result<(), StateError> {
        self.modify_account(address, |local| {
            local.nonce = account.nonce;
            local.balance = account.balance;
            local.code_hash = account.code_hash;
        });

        Ok(())
    }

    fn touch_account(&mut self, address: Address) {
        self.touched_accounts.insert(address);
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    fn cleanup_touched_accounts(&mut self) -> Result<(), StateError> {
        let touched = std::mem::take(&mut self.touched_accounts);

        let mut removed_any = false;
        for address in touched {
            let is_empty = self
                .state
                .accounts
                .get(&address)
                .is_some_and(|account| account.info().is_empty());

            if is_empty {
                log::debug!("Removing empty touched account {address}");

                self.state.accounts.remove_mut(&address);
                removed_any = true;
            }
        }

        if removed_any {
            self.version = self.versions.next_version();
        }

        Ok(())
    }

    fn put_contract_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
        let code_hash = keccak256(&code);
        if code_hash != KECCAK_EMPTY {
            self.state.code.insert_mut(code_hash, code);
        }

        self.modify_account(address, |account| account.code_hash = code_hash);

        Ok(())
    }

    fn put_contract_storage(
        &mut self,
        address: Address,
        index: U256,
        value: U256,
    ) -> Result<(), StateError> {
        self.modify_account(address, |account| {
            if value == U256::ZERO {
                account.storage.remove_mut(&index);
            } else {
                account.storage.insert_mut(index, value);
            }
        });

        Ok(())
    }

    fn clear_contract_storage(&mut self, address: Address) -> Result<(), StateError> {
        self.modify_account(address, |account| {
            account.storage = rpds::HashTrieMapSync::new_sync();
        });

        Ok(())
    }

    fn get_original_contract_storage(
        &mut self,
        address: Address,
        index: U256,
    ) -> Result<U256, StateError> {
        if let Some(value) = self.original_storage.get(&(address, index)) {
            return Ok(*value);
        }

        let value = self.get_contract_storage(address, index)?;
        self.original_storage.insert((address, index), value);

        Ok(value)
    }

    fn clear_original_storage_cache(&mut self) {
        self.original_storage.clear();
    }

    fn checkpoint(&mut self) -> Result<(), StateError> {
        self.checkpoints.push(Checkpoint {
            state: self.state.clone(),
            version: self.version,
        });

        Ok(())
    }

    fn commit(&mut self) -> Result<(), StateError> {
        self.checkpoints
            .pop()
            .ok_or(StateError::NotCheckpointed { method: "commit" })?;

        Ok(())
    }

    fn revert(&mut self) -> Result<(), StateError> {
        let Checkpoint { state, version } = self
            .checkpoints
            .pop()
            .ok_or(StateError::NotCheckpointed { method: "revert" })?;

        self.install_state(state, version);

        Ok(())
    }

    fn checkpoint_depth(&self) -> usize {
        self.checkpoints.len()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    fn state_root(&mut self) -> Result<TrieRoot, StateError> {
        if let Some((version, root)) = self.memoized_root {
            if version == self.version {
                return Ok(root);
            }
        }

        let root = TrieRoot::new(self.state.compute_root());

        self.registry.write().insert(root, self.state.clone());
        self.memoized_root = Some((self.version, root));

        Ok(root)
    }

    fn set_state_root(&mut self, root: TrieRoot) -> Result<(), StateError> {
        let state = self
            .registry
            .read()
            .get(&root)
            .cloned()
            .ok_or_else(|| StateError::UnknownStateRoot(B256::from(root)))?;

        let version = self.versions.next_version();
        self.install_state(state, version);
        self.memoized_root = Some((version, root));

        Ok(())
    }

    fn copy(&self) -> Self {
        Self {
            state: self.state.clone(),
            version: self.version,
            versions: self.versions.clone(),
            memoized_root: self.memoized_root,
            registry: self.registry.clone(),
            checkpoints: Vec::new(),
            original_storage: HashMap::default(),
            touched_accounts: self.touched_accounts.clone(),
            has_genesis_state: self.has_genesis_state,
        }
    }

    fn dump_storage(&self, address: Address) -> Result<BTreeMap<U256, U256>, StateError> {
        Ok(self
            .state
            .accounts
            .get(&address)
            .map(|account| {
                account
                    .storage
                    .iter()
                    .map(|(index, value)| (*index, *value))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn has_genesis_state(&self) -> Result<bool, StateError> {
        Ok(self.has_genesis_state)
    }

    fn generate_canonical_genesis(&mut self) -> Result<(), StateError> {
        let version = self.versions.next_version();
        self.install_state(LocalState::default(), version);
        self.has_genesis_state = true;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn generate_genesis(&mut self, config: &GenesisConfig) -> Result<(), StateError> {
        self.generate_canonical_genesis()?;

        for account in &config.accounts {
            self.put_account(
                account.address,
                AccountInfo {
                    nonce: account.nonce,
                    balance: account.balance,
                    code_hash: KECCAK_EMPTY,
                },
            )?;

            if !account.code.is_empty() {
                self.put_contract_code(account.address, account.code.clone())?;
            }

            for (index, value) in &account.storage {
                self.put_contract_storage(account.address, *index, *value)?;
            }
        }

        Ok(())
    }
}
