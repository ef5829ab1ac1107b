#![warn(missing_docs)]

//! A development node that mines blocks of pooled transactions on top of a
//! local or forked chain, executing them with an external execution engine.

/// Node configuration.
pub mod config;
mod error;
/// Types for the execution engine.
pub mod executor;
/// Filters that collect events between polls.
pub mod filter;
mod gas;
mod interval;
/// Global logging setup.
pub mod logging;
mod node;
/// Receipts of mined transactions and their logs.
pub mod receipt;
mod snapshot;
/// Types for measuring time.
pub mod time;

pub use self::{
    config::{AccountOwner, ForkConfig, GenesisAccount, IntervalConfig, NodeConfig},
    error::{CreationError, NodeError},
    interval::IntervalMiner,
    node::{CallRequest, ForkMetadata, MineBlockResult, Node},
};
