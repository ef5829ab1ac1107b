#![warn(missing_docs)]

//! Ethereum JSON-RPC client for the remote chain of a forked node

mod client;
/// Types specific to JSON-RPC
pub mod jsonrpc;
mod method;
mod types;

pub use reqwest::header::{self, HeaderMap};

pub use self::{
    client::{RpcClient, RpcClientError},
    method::{BlockSpec, RequestMethod},
    types::{RpcBlock, RpcTransaction},
};
