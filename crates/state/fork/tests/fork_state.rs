use std::sync::Arc;

use devnet_primitives::{
    Address, Bytes, KECCAK_EMPTY, U256, address, keccak256, random::RandomHashGenerator,
};
use devnet_state_api::{AccountInfo, GenesisConfig, State as _, StateError, StateManager as _};
use devnet_state_fork::ForkStateManager;
use devnet_test_utils::remote::{MockRemoteAccount, MockRemoteState};
use parking_lot::Mutex;

const FORK_BLOCK: u64 = 1_000;
const CONTRACT: Address = address!("00000000000000000000000000000000000c0de0");
const UNKNOWN: Address = address!("0000000000000000000000000000000000000bad");

fn contract_code() -> Bytes {
    Bytes::from_static(&[0x60, 0x01, 0x60, 0x00, 0x55])
}

fn setup() -> (Arc<MockRemoteState>, ForkStateManager) {
    let remote = Arc::new(MockRemoteState::default());
    remote.insert_account(
        CONTRACT,
        MockRemoteAccount {
            nonce: 1,
            balance: U256::from(500),
            code: contract_code(),
            storage: [(U256::from(1), U256::from(11)), (U256::from(2), U256::from(22))]
                .into_iter()
                .collect(),
        },
    );

    let state = ForkStateManager::new(
        remote.clone(),
        FORK_BLOCK,
        Arc::new(Mutex::new(RandomHashGenerator::with_seed("fork"))),
    );

    (remote, state)
}

#[test]
fn get_account_reads_remote_at_fork_block() -> anyhow::Result<()> {
    let (remote, state) = setup();

    let account = state.get_account(CONTRACT)?;
    assert_eq!(account.nonce, 1);
    assert_eq!(account.balance, U256::from(500));
    assert_eq!(account.code_hash, keccak256(contract_code()));

    assert_eq!(remote.block_numbers(), vec![FORK_BLOCK]);

    Ok(())
}

#[test]
fn get_account_of_unknown_account_is_empty() -> anyhow::Result<()> {
    let (_remote, state) = setup();

    let account = state.get_account(UNKNOWN)?;
    assert_eq!(account, AccountInfo::default());
    assert_eq!(account.code_hash, KECCAK_EMPTY);
    assert!(state.account_is_empty(UNKNOWN)?);

    Ok(())
}

#[test]
fn local_fields_override_remote_individually() -> anyhow::Result<()> {
    let (remote, mut state) = setup();

    state.put_contract_code(CONTRACT, Bytes::from_static(&[0x00]))?;

    let account = state.get_account(CONTRACT)?;
    assert_eq!(account.nonce, 1);
    assert_eq!(account.code_hash, keccak256([0x00u8]));
    assert_eq!(remote.calls().code, 0);

    Ok(())
}

#[test]
fn put_account_with_empty_code_skips_remote_code() -> anyhow::Result<()> {
    let (remote, mut state) = setup();

    state.put_account(
        UNKNOWN,
        AccountInfo {
            nonce: 0,
            balance: U256::from(10),
            code_hash: KECCAK_EMPTY,
        },
    )?;

    let account = state.get_account(UNKNOWN)?;
    assert_eq!(account.balance, U256::from(10));
    assert!(state.get_contract_code(UNKNOWN)?.is_empty());

    assert_eq!(remote.calls().code, 0);
    assert_eq!(remote.calls().nonce, 0);
    assert_eq!(remote.calls().balance, 0);

    Ok(())
}

#[test]
fn put_account_with_code_hash_keeps_remote_code() -> anyhow::Result<()> {
    let (_remote, mut state) = setup();

    state.put_account(
        CONTRACT,
        AccountInfo {
            nonce: 2,
            balance: U256::from(1),
            code_hash: keccak256(contract_code()),
        },
    )?;

    assert_eq!(state.get_contract_code(CONTRACT)?, contract_code());

    Ok(())
}

#[test]
fn cleared_storage_reads_zero_without_remote() -> anyhow::Result<()> {
    let (remote, mut state) = setup();

    state.put_contract_storage(CONTRACT, U256::from(3), U256::from(33))?;
    state.clear_contract_storage(CONTRACT)?;

    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(1))?, U256::ZERO);
    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(2))?, U256::ZERO);
    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(3))?, U256::ZERO);
    assert_eq!(remote.calls().storage, 0);

    state.put_contract_storage(CONTRACT, U256::from(1), U256::from(5))?;
    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(1))?, U256::from(5));
    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(2))?, U256::ZERO);
    assert_eq!(remote.calls().storage, 0);

    Ok(())
}

#[test]
fn storage_override_takes_precedence() -> anyhow::Result<()> {
    let (remote, mut state) = setup();

    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(1))?, U256::from(11));
    assert_eq!(remote.calls().storage, 1);

    state.put_contract_storage(CONTRACT, U256::from(1), U256::ZERO)?;
    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(1))?, U256::ZERO);
    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(2))?, U256::from(22));
    assert_eq!(remote.calls().storage, 2);

    Ok(())
}

#[test]
fn original_storage_is_memoised() -> anyhow::Result<()> {
    let (remote, mut state) = setup();

    let original = state.get_original_contract_storage(CONTRACT, U256::from(1))?;
    assert_eq!(original, U256::from(11));

    state.put_contract_storage(CONTRACT, U256::from(1), U256::from(99))?;
    assert_eq!(
        state.get_original_contract_storage(CONTRACT, U256::from(1))?,
        original
    );
    assert_eq!(remote.calls().storage, 1);

    state.clear_original_storage_cache();
    assert_eq!(
        state.get_original_contract_storage(CONTRACT, U256::from(1))?,
        U256::from(99)
    );

    Ok(())
}

#[test]
fn failed_original_storage_is_not_memoised() -> anyhow::Result<()> {
    let (remote, mut state) = setup();

    remote.set_failing(true);
    assert!(matches!(
        state.get_original_contract_storage(CONTRACT, U256::from(1)),
        Err(StateError::Remote(_))
    ));

    remote.set_failing(false);
    assert_eq!(
        state.get_original_contract_storage(CONTRACT, U256::from(1))?,
        U256::from(11)
    );

    Ok(())
}

#[test]
fn checkpoint_revert_round_trip() -> anyhow::Result<()> {
    let (_remote, mut state) = setup();
    state.put_contract_storage(CONTRACT, U256::from(1), U256::from(1))?;
    let before = state.state_root()?;

    state.checkpoint()?;
    state.put_account(CONTRACT, AccountInfo::default())?;
    state.put_contract_storage(CONTRACT, U256::from(1), U256::from(2))?;
    state.clear_contract_storage(UNKNOWN)?;
    state.revert()?;

    assert_eq!(state.checkpoint_depth(), 0);
    assert_eq!(state.state_root()?, before);
    assert_eq!(state.get_account(CONTRACT)?.balance, U256::from(500));
    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(1))?, U256::from(1));

    Ok(())
}

#[test]
fn checkpoint_commit_keeps_changes() -> anyhow::Result<()> {
    let (_remote, mut state) = setup();

    state.checkpoint()?;
    state.checkpoint()?;
    state.put_contract_storage(CONTRACT, U256::from(1), U256::from(2))?;
    state.commit()?;

    assert_eq!(state.checkpoint_depth(), 1);
    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(1))?, U256::from(2));

    state.revert()?;
    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(1))?, U256::from(11));

    Ok(())
}

#[test]
fn commit_and_revert_require_checkpoint() {
    let (_remote, mut state) = setup();

    assert!(matches!(
        state.commit(),
        Err(StateError::NotCheckpointed { method: "commit" })
    ));
    assert!(matches!(
        state.revert(),
        Err(StateError::NotCheckpointed { method: "revert" })
    ));
}

#[test]
fn state_root_is_stable_until_mutation() -> anyhow::Result<()> {
    let (_remote, mut state) = setup();

    let first = state.state_root()?;
    assert_eq!(state.state_root()?, first);

    state.put_contract_storage(CONTRACT, U256::from(1), U256::from(1))?;
    let second = state.state_root()?;
    assert_ne!(second, first);
    assert_eq!(state.state_root()?, second);

    state.set_state_root(first)?;
    assert_eq!(state.state_root()?, first);
    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(1))?, U256::from(11));

    state.set_state_root(second)?;
    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(1))?, U256::from(1));

    Ok(())
}

#[test]
fn reads_do_not_change_state_root() -> anyhow::Result<()> {
    let (_remote, mut state) = setup();

    let root = state.state_root()?;
    state.get_account(CONTRACT)?;
    state.get_original_contract_storage(CONTRACT, U256::from(2))?;
    state.touch_account(CONTRACT);
    state.cleanup_touched_accounts()?;

    assert_eq!(state.state_root()?, root);

    Ok(())
}

#[test]
fn unknown_state_root() {
    let (_remote, mut state) = setup();

    let mut other = ForkStateManager::new(
        Arc::new(MockRemoteState::default()),
        FORK_BLOCK,
        Arc::new(Mutex::new(RandomHashGenerator::with_seed("other"))),
    );
    let Ok(foreign_root) = other.state_root() else {
        panic!("state root should be available");
    };

    assert!(matches!(
        state.set_state_root(foreign_root),
        Err(StateError::UnknownStateRoot(_))
    ));
}

#[test]
fn copy_is_independent_but_shares_registry() -> anyhow::Result<()> {
    let (_remote, mut state) = setup();

    let mut copy = state.copy();
    copy.put_account(
        CONTRACT,
        AccountInfo {
            nonce: 9,
            balance: U256::from(9),
            code_hash: KECCAK_EMPTY,
        },
    )?;
    let copy_root = copy.state_root()?;

    assert_eq!(state.get_account(CONTRACT)?.nonce, 1);

    state.set_state_root(copy_root)?;
    assert_eq!(state.get_account(CONTRACT)?.nonce, 9);

    Ok(())
}

#[test]
fn copies_never_share_handles_for_different_states() -> anyhow::Result<()> {
    let (_remote, mut state) = setup();
    let mut copy = state.copy();

    state.put_contract_storage(CONTRACT, U256::from(1), U256::from(100))?;
    copy.put_contract_storage(CONTRACT, U256::from(1), U256::from(200))?;

    let root = state.state_root()?;
    let copy_root = copy.state_root()?;
    assert_ne!(root, copy_root);

    state.set_state_root(copy_root)?;
    assert_eq!(state.get_contract_storage(CONTRACT, U256::from(1))?, U256::from(200));

    Ok(())
}

#[test]
fn genesis_and_dump_are_unsupported() {
    let (_remote, mut state) = setup();

    assert!(matches!(
        state.dump_storage(CONTRACT),
        Err(StateError::Unsupported { .. })
    ));
    assert!(matches!(
        state.has_genesis_state(),
        Err(StateError::Unsupported { .. })
    ));
    assert!(matches!(
        state.generate_canonical_genesis(),
        Err(StateError::Unsupported { .. })
    ));
    assert!(matches!(
        state.generate_genesis(&GenesisConfig::default()),
        Err(StateError::Unsupported { .. })
    ));
}

#[test]
fn remote_failure_propagates() {
    let (remote, state) = setup();
    remote.set_failing(true);

    assert!(matches!(
        state.get_account(CONTRACT),
        Err(StateError::Remote(_))
    ));
}
