//! Ethereum transaction types

/// Types for transaction requests.
pub mod request;
/// Types for signed transactions.
pub mod signed;

use alloy_rlp::Encodable;
use devnet_primitives::{Address, B256, Bytes, TxKind, U256};

pub use self::signed::Signed;

/// Gas charged for every transaction.
pub const TRANSACTION_GAS: u64 = 21_000;
/// Additional gas charged for contract creation transactions.
pub const CREATE_GAS: u64 = 32_000;
/// Gas charged per zero byte of transaction data.
pub const DATA_ZERO_BYTE_GAS: u64 = 4;
/// Gas charged per non-zero byte of transaction data.
pub const DATA_NON_ZERO_BYTE_GAS: u64 = 16;

/// Trait for transactions that can be pooled and executed.
pub trait ExecutableTransaction {
    /// Address of the transaction's sender.
    fn caller(&self) -> &Address;

    /// The maximum amount of gas the transaction may consume.
    fn gas_limit(&self) -> u64;

    /// The gas price paid per unit of gas.
    fn gas_price(&self) -> &u128;

    /// Either a contract creation or a call to the specified address.
    fn kind(&self) -> TxKind;

    /// The value transferred to the recipient.
    fn value(&self) -> &U256;

    /// The transaction's input data.
    fn data(&self) -> &Bytes;

    /// The sender's sequence number.
    fn nonce(&self) -> u64;

    /// The chain ID the transaction is replay-protected for, if any.
    fn chain_id(&self) -> Option<u64>;

    /// The transaction's hash.
    fn transaction_hash(&self) -> &B256;
}

/// Calculates the maximum gas cost of the transaction.
pub fn max_cost(transaction: &impl ExecutableTransaction) -> u128 {
    u128::from(transaction.gas_limit()).saturating_mul(*transaction.gas_price())
}

/// Calculates the upfront cost of the transaction: the value plus the
/// maximum gas cost. The sender needs at least this balance for the
/// transaction to be executable.
pub fn upfront_cost(transaction: &impl ExecutableTransaction) -> U256 {
    U256::from(max_cost(transaction)).saturating_add(*transaction.value())
}

/// Calculates the intrinsic gas of the transaction: the base fee charged
/// before any code is executed.
pub fn initial_cost(transaction: &impl ExecutableTransaction) -> u64 {
    let data_cost = transaction
        .data()
        .iter()
        .map(|byte| {
            if *byte == 0 {
                DATA_ZERO_BYTE_GAS
            } else {
                DATA_NON_ZERO_BYTE_GAS
            }
        })
        .sum::<u64>();

    let create_cost = if transaction.kind().is_create() {
        CREATE_GAS
    } else {
        0
    };

    TRANSACTION_GAS + create_cost + data_cost
}

/// RLP-encodes the provided fields as a list.
pub(crate) fn encode_list(fields: &[&dyn Encodable]) -> Vec<u8> {
    let payload_length = fields.iter().map(|field| field.length()).sum();

    let mut out = Vec::with_capacity(alloy_rlp::length_of_length(payload_length) + payload_length);
    alloy_rlp::Header {
        list: true,
        payload_length,
    }
    .encode(&mut out);

    for field in fields {
        field.encode(&mut out);
    }

    out
}
