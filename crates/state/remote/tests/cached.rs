use devnet_primitives::{U256, address};
use devnet_state_remote::{CachedRemoteState, RemoteStateSource};
use devnet_test_utils::remote::{MockRemoteAccount, MockRemoteState};

const FORK_BLOCK: u64 = 100;

#[test]
fn repeated_reads_hit_remote_once() -> anyhow::Result<()> {
    let address = address!("0000000000000000000000000000000000000abc");

    let remote = MockRemoteState::default();
    remote.insert_account(
        address,
        MockRemoteAccount {
            nonce: 3,
            balance: U256::from(1_000),
            storage: [(U256::from(1), U256::from(7))].into_iter().collect(),
            ..MockRemoteAccount::default()
        },
    );

    let cached = CachedRemoteState::new(&remote);

    for _ in 0..3 {
        assert_eq!(cached.nonce(address, FORK_BLOCK)?, 3);
        assert_eq!(cached.balance(address, FORK_BLOCK)?, U256::from(1_000));
        assert_eq!(
            cached.storage_at(address, U256::from(1), FORK_BLOCK)?,
            U256::from(7)
        );
        assert!(cached.code(address, FORK_BLOCK)?.is_empty());
    }

    assert_eq!(remote.calls().nonce, 1);
    assert_eq!(remote.calls().balance, 1);
    assert_eq!(remote.calls().storage, 1);
    assert_eq!(remote.calls().code, 1);

    Ok(())
}

#[test]
fn failures_are_not_cached() -> anyhow::Result<()> {
    let address = address!("0000000000000000000000000000000000000abc");

    let remote = MockRemoteState::default();
    remote.insert_account(
        address,
        MockRemoteAccount {
            balance: U256::from(5),
            ..MockRemoteAccount::default()
        },
    );

    let cached = CachedRemoteState::new(&remote);

    remote.set_failing(true);
    assert!(cached.balance(address, FORK_BLOCK).is_err());

    remote.set_failing(false);
    assert_eq!(cached.balance(address, FORK_BLOCK)?, U256::from(5));
    assert_eq!(cached.balance(address, FORK_BLOCK)?, U256::from(5));

    assert_eq!(remote.calls().balance, 2);

    Ok(())
}

#[test]
fn different_blocks_are_cached_separately() -> anyhow::Result<()> {
    let address = address!("0000000000000000000000000000000000000abc");

    let remote = MockRemoteState::default();
    let cached = CachedRemoteState::new(&remote);

    cached.nonce(address, FORK_BLOCK)?;
    cached.nonce(address, FORK_BLOCK + 1)?;
    cached.nonce(address, FORK_BLOCK)?;

    assert_eq!(remote.calls().nonce, 2);

    Ok(())
}
