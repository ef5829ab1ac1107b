//! A state manager that overlays local changes on top of the state of a
//! remote chain, pinned to a fork block.

use std::{collections::BTreeMap, sync::Arc};

use devnet_primitives::{
    Address, Bytes, HashMap, KECCAK_EMPTY, U256, keccak256,
    random::RandomHashGenerator,
};
use devnet_state_api::{
    AccountInfo, GenesisConfig, SnapshotRoot, State, StateError, StateManager, VersionCounter,
    account::AccountState,
};
use devnet_state_remote::RemoteStateSource;
use parking_lot::{Mutex, RwLock};
use rpds::HashTrieMapSync;

type ForkState = HashTrieMapSync<Address, AccountState>;

#[derive(Clone, Debug)]
struct RegisteredState {
    state: ForkState,
    version: u64,
}

type Registry = Arc<RwLock<HashMap<SnapshotRoot, RegisteredState>>>;

/// A state manager integrating the state of a remote node, as of the fork
/// block, with local overrides.
///
/// State roots are random handles without cryptographic meaning. A handle is
/// only minted when the state has changed since the last handle was returned.
#[derive(Debug)]
pub struct ForkStateManager {
    remote: Arc<dyn RemoteStateSource>,
    fork_block_number: u64,
    state: ForkState,
    version: u64,
    versions: VersionCounter,
    state_root: SnapshotRoot,
    registry: Registry,
    hash_generator: Arc<Mutex<RandomHashGenerator>>,
    checkpoints: Vec<SnapshotRoot>,
    original_storage: HashMap<(Address, U256), U256>,
}

impl ForkStateManager {
    /// Constructs a new instance that retrieves missing data from the remote
    /// source, as of the provided fork block number.
    pub fn new(
        remote: Arc<dyn RemoteStateSource>,
        fork_block_number: u64,
        hash_generator: Arc<Mutex<RandomHashGenerator>>,
    ) -> Self {
        let versions = VersionCounter::default();
        let version = versions.next_version();

        let state = ForkState::new_sync();
        let state_root = SnapshotRoot::new(hash_generator.lock().next_value());

        let mut registry = HashMap::default();
        registry.insert(
            state_root,
            RegisteredState {
                state: state.clone(),
                version,
            },
        );

        Self {
            remote,
            fork_block_number,
            state,
            version,
            versions,
            state_root,
            registry: Arc::new(RwLock::new(registry)),
            hash_generator,
            checkpoints: Vec::new(),
            original_storage: HashMap::default(),
        }
    }

    /// Returns the number of the block at which the remote state is read.
    pub fn fork_block_number(&self) -> u64 {
        self.fork_block_number
    }

    fn modify_account(&mut self, address: Address, modifier: impl FnOnce(&mut AccountState)) {
        let mut account = self.state.get(&address).cloned().unwrap_or_default();

        modifier(&mut account);

        self.state.insert_mut(address, account);
        self.version = self.versions.next_version();
    }

    fn resolve_code(&self, address: Address) -> Result<Bytes, StateError> {
        match self.state.get(&address).and_then(|account| account.code.as_ref()) {
            Some(code) => Ok(code.clone()),
            None => self.remote.code(address, self.fork_block_number),
        }
    }
}

impl State for ForkStateManager {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    fn get_account(&self, address: Address) -> Result<AccountInfo, StateError> {
        let local = self.state.get(&address);

        let nonce = match local.and_then(|account| account.nonce) {
            Some(nonce) => nonce,
            None => self.remote.nonce(address, self.fork_block_number)?,
        };

        let balance = match local.and_then(|account| account.balance) {
            Some(balance) => balance,
            None => self.remote.balance(address, self.fork_block_number)?,
        };

        let code = self.resolve_code(address)?;

        Ok(AccountInfo {
            nonce,
            balance,
            code_hash: keccak256(&code),
        })
    }

    fn get_contract_code(&self, address: Address) -> Result<Bytes, StateError> {
        self.resolve_code(address)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    fn get_contract_storage(&self, address: Address, index: U256) -> Result<U256, StateError> {
        if let Some(account) = self.state.get(&address) {
            if let Some(value) = account.storage.get(&index) {
                return Ok(*value);
            }

            if account.storage_cleared {
                return Ok(U256::ZERO);
            }
        }

        self.remote
            .storage_at(address, index, self.fork_block_number)
    }
}

impl StateManager for ForkStateManager {
    type Root = SnapshotRoot;

    fn put_account(&mut self, address: Address, account: AccountInfo) -> Result<(), StateError> {
        self.modify_account(address, |local| {
            local.nonce = Some(account.nonce);
            local.balance = Some(account.balance);

            // Accounts without code are common, so avoid fetching their code.
            if account.code_hash == KECCAK_EMPTY {
                local.code = Some(Bytes::new());
            }
        });

        Ok(())
    }

    fn touch_account(&mut self, _address: Address) {
        // Empty accounts only affect a real state root, which is not maintained.
    }

    fn cleanup_touched_accounts(&mut self) -> Result<(), StateError> {
        Ok(())
    }

    fn put_contract_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
        self.modify_account(address, |account| account.code = Some(code));

        Ok(())
    }

    fn put_contract_storage(
        &mut self,
        address: Address,
        index: U256,
        value: U256,
    ) -> Result<(), StateError> {
        self.modify_account(address, |account| {
            account.storage.insert_mut(index, value);
        });

        Ok(())
    }

    fn clear_contract_storage(&mut self, address: Address) -> Result<(), StateError> {
        self.modify_account(address, |account| {
            account.storage = HashTrieMapSync::new_sync();
            account.storage_cleared = true;
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

        // A failed fetch must not be memoised.
        let value = self.get_contract_storage(address, index)?;
        self.original_storage.insert((address, index), value);

        Ok(value)
    }

    fn clear_original_storage_cache(&mut self) {
        self.original_storage.clear();
    }

    fn checkpoint(&mut self) -> Result<(), StateError> {
        let state_root = self.state_root()?;
        self.checkpoints.push(state_root);

        Ok(())
    }

    fn commit(&mut self) -> Result<(), StateError> {
        self.checkpoints
            .pop()
            .ok_or(StateError::NotCheckpointed { method: "commit" })?;

        Ok(())
    }

    fn revert(&mut self) -> Result<(), StateError> {
        let state_root = self
            .checkpoints
            .pop()
            .ok_or(StateError::NotCheckpointed { method: "revert" })?;

        self.set_state_root(state_root)
    }

    fn checkpoint_depth(&self) -> usize {
        self.checkpoints.len()
    }

    fn state_root(&mut self) -> Result<SnapshotRoot, StateError> {
        let is_registered = self
            .registry
            .read()
            .get(&self.state_root)
            .is_some_and(|registered| registered.version == self.version);

        if !is_registered {
            let state_root = SnapshotRoot::new(self.hash_generator.lock().next_value());

            let previous = self.registry.write().insert(
                state_root,
                RegisteredState {
                    state: self.state.clone(),
                    version: self.version,
                },
            );
            debug_assert!(previous.is_none(), "State root handles must be unique");

            log::trace!("Registered state under new root {state_root}");
            self.state_root = state_root;
        }

        Ok(self.state_root)
    }

    fn set_state_root(&mut self, root: SnapshotRoot) -> Result<(), StateError> {
        let RegisteredState { state, version } = self
            .registry
            .read()
            .get(&root)
            .cloned()
            .ok_or_else(|| StateError::UnknownStateRoot(*root.as_b256()))?;

        self.state = state;
        self.version = version;
        self.state_root = root;

        Ok(())
    }

    fn copy(&self) -> Self {
        Self {
            remote: self.remote.clone(),
            fork_block_number: self.fork_block_number,
            state: self.state.clone(),
            version: self.version,
            versions: self.versions.clone(),
            state_root: self.state_root,
            registry: self.registry.clone(),
            hash_generator: self.hash_generator.clone(),
            checkpoints: Vec::new(),
            original_storage: HashMap::default(),
        }
    }

    fn dump_storage(&self, _address: Address) -> Result<BTreeMap<U256, U256>, StateError> {
        Err(StateError::Unsupported {
            action: "dump_storage",
        })
    }

    fn has_genesis_state(&self) -> Result<bool, StateError> {
        Err(StateError::Unsupported {
            action: "has_genesis_state",
        })
    }

    fn generate_canonical_genesis(&mut self) -> Result<(), StateError> {
        Err(StateError::Unsupported {
            action: "generate_canonical_genesis",
        })
    }

    fn generate_genesis(&mut self, _config: &GenesisConfig) -> Result<(), StateError> {
        Err(StateError::Unsupported {
            action: "generate_genesis",
        })
    }
}
