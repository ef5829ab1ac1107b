#![allow(dead_code)]

use std::sync::Arc;

use devnet_node::{
    AccountOwner, GenesisAccount, Node, NodeConfig, executor::Executor, time::MockTime,
};
use devnet_primitives::U256;
use devnet_state_local::LocalStateManager;
use devnet_test_utils::{
    executor::TransferExecutor, secret_key::TEST_SECRET_KEYS, transaction::DUMMY_CHAIN_ID,
};

pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// One ether
pub const INITIAL_BALANCE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

pub type LocalNode<ExecutorT = TransferExecutor> =
    Node<LocalStateManager, ExecutorT, Arc<MockTime>>;

pub fn config(automine: bool) -> NodeConfig {
    NodeConfig {
        chain_id: DUMMY_CHAIN_ID,
        network_id: DUMMY_CHAIN_ID,
        genesis_accounts: TEST_SECRET_KEYS
            .iter()
            .map(|secret_key| GenesisAccount {
                owner: AccountOwner::SecretKey((*secret_key).to_string()),
                balance: INITIAL_BALANCE,
            })
            .collect(),
        automine,
        ..NodeConfig::default()
    }
}

pub fn local_node_with_executor<ExecutorT: Executor<LocalStateManager>>(
    config: &NodeConfig,
    executor: ExecutorT,
) -> anyhow::Result<(LocalNode<ExecutorT>, Arc<MockTime>)> {
    let timer = Arc::new(MockTime::with_seconds(GENESIS_TIMESTAMP));
    let node = Node::new_local(config, executor, timer.clone())?;

    Ok((node, timer))
}

pub fn local_node(automine: bool) -> anyhow::Result<(LocalNode, Arc<MockTime>)> {
    local_node_with_executor(&config(automine), TransferExecutor)
}
