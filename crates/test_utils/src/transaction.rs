use devnet_primitives::{Address, Bytes, TxKind, U256, address};
use devnet_signer::SecretKey;
use devnet_transaction::{Signed, request};

/// Chain ID used for dummy transactions.
pub const DUMMY_CHAIN_ID: u64 = 123;

/// Caller of [`dummy_transaction`].
pub const DUMMY_CALLER: Address = address!("00000000000000000000000000000000000ca11e");

/// Creates a deterministic dummy transaction from [`DUMMY_CALLER`].
pub fn dummy_transaction(nonce: u64) -> Signed {
    request::Legacy {
        nonce,
        gas_price: 0,
        gas_limit: 30_000,
        kind: TxKind::Call(Address::ZERO),
        value: U256::ZERO,
        input: Bytes::new(),
        chain_id: Some(DUMMY_CHAIN_ID),
    }
    .fake_sign(DUMMY_CALLER)
}

/// Creates a dummy EIP-155 transaction.
pub fn dummy_eip155_transaction(caller: Address, nonce: u64) -> Signed {
    dummy_eip155_transaction_with_price(caller, nonce, 0)
}

/// Creates a dummy EIP-155 transaction with the provided gas price.
pub fn dummy_eip155_transaction_with_price(caller: Address, nonce: u64, gas_price: u128) -> Signed {
    dummy_eip155_transaction_with_price_limit_and_value(caller, nonce, gas_price, 30_000, U256::ZERO)
}

/// Creates a dummy EIP-155 transaction with the provided gas limit.
pub fn dummy_eip155_transaction_with_limit(caller: Address, nonce: u64, gas_limit: u64) -> Signed {
    dummy_eip155_transaction_with_price_limit_and_value(caller, nonce, 0, gas_limit, U256::ZERO)
}

/// Creates a dummy EIP-155 transaction with the provided gas price, gas limit,
/// and value. The recipient is random, so transactions with equal parameters
/// have distinct hashes.
pub fn dummy_eip155_transaction_with_price_limit_and_value(
    caller: Address,
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    value: U256,
) -> Signed {
    request::Legacy {
        nonce,
        gas_price,
        gas_limit,
        kind: TxKind::Call(Address::random()),
        value,
        input: Bytes::new(),
        chain_id: Some(DUMMY_CHAIN_ID),
    }
    .fake_sign(caller)
}

/// Creates a dummy contract creation transaction with the provided init code.
pub fn dummy_contract_creation(caller: Address, nonce: u64, init_code: Bytes) -> Signed {
    request::Legacy {
        nonce,
        gas_price: 0,
        gas_limit: 100_000,
        kind: TxKind::Create,
        value: U256::ZERO,
        input: init_code,
        chain_id: Some(DUMMY_CHAIN_ID),
    }
    .fake_sign(caller)
}

/// Creates a value transfer signed with the provided secret key.
///
/// # Panics
///
/// Panics if signing fails.
pub fn signed_transfer(
    secret_key: &SecretKey,
    nonce: u64,
    to: Address,
    value: U256,
    gas_price: u128,
) -> Signed {
    request::Legacy {
        nonce,
        gas_price,
        gas_limit: 21_000,
        kind: TxKind::Call(to),
        value,
        input: Bytes::new(),
        chain_id: Some(DUMMY_CHAIN_ID),
    }
    .sign(secret_key)
    .expect("signing with a valid secret key succeeds")
}
