#![warn(missing_docs)]

//! Primitive Ethereum types used throughout the devnet crates

/// Utilities for generating pseudo-random hashes.
pub mod random;

pub use alloy_primitives::{
    Address, B64, B256, Bloom, BloomInput, Bytes, TxKind, U64, U256, address, b256, bytes, keccak256,
    map::{HashMap, HashSet, hash_map},
};

/// Keccak-256 hash of empty bytes, used as the code hash of accounts without
/// code.
pub const KECCAK_EMPTY: B256 =
    b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

/// Root hash of an empty Merkle-Patricia trie: `keccak256(rlp(""))`.
pub const KECCAK_NULL_RLP: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// Hash of the RLP encoding of an empty list, used as the ommers hash.
pub const KECCAK_RLP_EMPTY_ARRAY: B256 =
    b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");
