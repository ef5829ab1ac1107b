//! Shared utilities for tests of the devnet crates.
#![warn(missing_docs)]

/// Mock execution engines.
pub mod executor;
/// Deterministic accounts for tests.
pub mod secret_key;
/// In-memory remote chain data sources that count their calls.
pub mod remote;
/// Builders for dummy transactions.
pub mod transaction;
