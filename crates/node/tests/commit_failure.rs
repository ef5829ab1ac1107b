mod common;

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use devnet_blockchain_api::{Block, Header};
use devnet_blockchain_local::LocalBlockchain;
use devnet_node::{Node, NodeError, time::MockTime};
use devnet_primitives::{Address, B256, Bytes, U256, address};
use devnet_state_api::{
    AccountInfo, GenesisAccountState, GenesisConfig, State, StateError, StateManager, TrieRoot,
};
use devnet_state_local::LocalStateManager;
use devnet_test_utils::{
    executor::TransferExecutor,
    secret_key::{test_address, test_secret_key},
    transaction::signed_transfer,
};

use self::common::{GENESIS_TIMESTAMP, INITIAL_BALANCE, config};

const RECIPIENT: Address = address!("0000000000000000000000000000000000000d0e");

/// A local state whose commits fail while the flag is set.
#[derive(Debug)]
struct FailingCommitState {
    inner: LocalStateManager,
    fail_commits: Arc<AtomicBool>,
}

impl State for FailingCommitState {
    fn get_account(&self, address: Address) -> Result<AccountInfo, StateError> {
        self.inner.get_account(address)
    }

    fn get_contract_code(&self, address: Address) -> Result<Bytes, StateError> {
        self.inner.get_contract_code(address)
    }

    fn get_contract_storage(&self, address: Address, index: U256) -> Result<U256, StateError> {
        self.inner.get_contract_storage(address, index)
    }
}

impl StateManager for FailingCommitState {
    type Root = TrieRoot;

    fn put_account(&mut self, address: Address, account: AccountInfo) -> Result<(), StateError> {
        self.inner.put_account(address, account)
    }

    fn touch_account(&mut self, address: Address) {
        self.inner.touch_account(address);
    }

    fn cleanup_touched_accounts(&mut self) -> Result<(), StateError> {
        self.inner.cleanup_touched_accounts()
    }

    fn put_contract_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
        self.inner.put_contract_code(address, code)
    }

    fn put_contract_storage(
        &mut self,
        address: Address,
        index: U256,
        value: U256,
    ) -> Result<(), StateError> {
        self.inner.put_contract_storage(address, index, value)
    }

    fn clear_contract_storage(&mut self, address: Address) -> Result<(), StateError> {
        self.inner.clear_contract_storage(address)
    }

    fn get_original_contract_storage(
        &mut self,
        address: Address,
        index: U256,
    ) -> Result<U256, StateError> {
        self.inner.get_original_contract_storage(address, index)
    }

    fn clear_original_storage_cache(&mut self) {
        self.inner.clear_original_storage_cache();
    }

    fn checkpoint(&mut self) -> Result<(), StateError> {
        self.inner.checkpoint()
    }

    fn commit(&mut self) -> Result<(), StateError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StateError::Unsupported { action: "commit" });
        }

        self.inner.commit()
    }

    fn revert(&mut self) -> Result<(), StateError> {
        self.inner.revert()
    }

    fn checkpoint_depth(&self) -> usize {
        self.inner.checkpoint_depth()
    }

    fn state_root(&mut self) -> Result<TrieRoot, StateError> {
        self.inner.state_root()
    }

    fn set_state_root(&mut self, root: TrieRoot) -> Result<(), StateError> {
        self.inner.set_state_root(root)
    }

    fn copy(&self) -> Self {
        Self {
            inner: self.inner.copy(),
            fail_commits: self.fail_commits.clone(),
        }
    }

    fn dump_storage(&self, address: Address) -> Result<BTreeMap<U256, U256>, StateError> {
        self.inner.dump_storage(address)
    }

    fn has_genesis_state(&self) -> Result<bool, StateError> {
        self.inner.has_genesis_state()
    }

    fn generate_canonical_genesis(&mut self) -> Result<(), StateError> {
        self.inner.generate_canonical_genesis()
    }

    fn generate_genesis(&mut self, config: &GenesisConfig) -> Result<(), StateError> {
        self.inner.generate_genesis(config)
    }
}

type FailingCommitNode = Node<FailingCommitState, TransferExecutor, Arc<MockTime>>;

fn failing_commit_node() -> anyhow::Result<(FailingCommitNode, Arc<AtomicBool>)> {
    let config = config(false);

    let mut inner = LocalStateManager::new();
    inner.generate_genesis(&GenesisConfig {
        accounts: (0..4)
            .map(|index| GenesisAccountState {
                address: test_address(index),
                balance: INITIAL_BALANCE,
                nonce: 0,
                code: Bytes::new(),
                storage: BTreeMap::new(),
            })
            .collect(),
    })?;

    let mut header = Header::new(
        B256::ZERO,
        0,
        GENESIS_TIMESTAMP,
        Address::ZERO,
        config.block_gas_limit.get(),
    );
    header.state_root = inner.state_root()?.into();
    let blockchain = LocalBlockchain::new(Block::new(header, Vec::new()), config.chain_id)?;

    let fail_commits = Arc::new(AtomicBool::new(false));
    let state = FailingCommitState {
        inner,
        fail_commits: fail_commits.clone(),
    };

    let node = Node::new(
        &config,
        state,
        Box::new(blockchain),
        TransferExecutor,
        Arc::new(MockTime::with_seconds(GENESIS_TIMESTAMP)),
    )?;

    Ok((node, fail_commits))
}

#[test]
fn failed_commit_releases_checkpoint() -> anyhow::Result<()> {
    let (mut node, fail_commits) = failing_commit_node()?;

    let transaction = signed_transfer(&test_secret_key(0), 0, RECIPIENT, U256::from(1), 1);
    let transaction_hash = node.send_transaction(transaction)?;

    fail_commits.store(true, Ordering::SeqCst);
    let result = node.mine_block(None);
    assert!(matches!(result, Err(NodeError::State(StateError::Unsupported { .. }))));

    assert_eq!(node.state().checkpoint_depth(), 0);
    assert_eq!(node.last_block_number(), 0);
    assert_eq!(node.account(test_address(0))?.nonce, 0);
    assert_eq!(node.account(RECIPIENT)?.balance, U256::ZERO);

    // The transaction is still pending and can be mined once commits succeed
    fail_commits.store(false, Ordering::SeqCst);
    let result = node.mine_block(None)?;

    assert!(result.block.contains_transaction(&transaction_hash));
    assert_eq!(node.state().checkpoint_depth(), 0);
    assert_eq!(node.account(RECIPIENT)?.balance, U256::from(1));

    Ok(())
}
