//! State sources that retrieve data from a remote Ethereum node via
//! JSON-RPC.
mod cached;

use std::{fmt::Debug, sync::Arc};

use auto_impl::auto_impl;
use devnet_primitives::{Address, Bytes, U256};
use devnet_rpc_client::{BlockSpec, RpcClient};
use devnet_state_api::StateError;
use tokio::runtime;

pub use self::cached::CachedRemoteState;

/// A blocking source of account data of a remote chain, as of a historical
/// block number.
#[auto_impl(&, Box, Arc)]
pub trait RemoteStateSource: Debug + Send + Sync {
    /// Retrieves the nonce of the account at the provided address.
    fn nonce(&self, address: Address, block_number: u64) -> Result<u64, StateError>;

    /// Retrieves the balance of the account at the provided address.
    fn balance(&self, address: Address, block_number: u64) -> Result<U256, StateError>;

    /// Retrieves the code of the account at the provided address.
    fn code(&self, address: Address, block_number: u64) -> Result<Bytes, StateError>;

    /// Retrieves the value of the storage slot at the provided address and
    /// index.
    fn storage_at(
        &self,
        address: Address,
        index: U256,
        block_number: u64,
    ) -> Result<U256, StateError>;
}

/// A state source backed by a remote Ethereum node
#[derive(Debug)]
pub struct RpcRemoteState {
    client: Arc<RpcClient>,
    runtime: runtime::Handle,
}

impl RpcRemoteState {
    /// Construct a new instance using an RPC client for a remote Ethereum node
    /// and the handle of the runtime that drives it.
    pub fn new(runtime: runtime::Handle, client: Arc<RpcClient>) -> Self {
        Self { client, runtime }
    }

    /// Retrieves the RPC client.
    pub fn client(&self) -> &Arc<RpcClient> {
        &self.client
    }

    fn block_on<T, FutureT>(&self, future: FutureT) -> Result<T, StateError>
    where
        FutureT: Future<Output = Result<T, devnet_rpc_client::RpcClientError>>,
    {
        tokio::task::block_in_place(move || self.runtime.block_on(future)).map_err(|error| {
            log::debug!("Remote state request failed: {error}");
            StateError::Remote(error)
        })
    }
}

impl RemoteStateSource for RpcRemoteState {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    fn nonce(&self, address: Address, block_number: u64) -> Result<u64, StateError> {
        self.block_on(
            self.client
                .get_transaction_count(address, BlockSpec::Number(block_number)),
        )
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    fn balance(&self, address: Address, block_number: u64) -> Result<U256, StateError> {
        self.block_on(
            self.client
                .get_balance(address, BlockSpec::Number(block_number)),
        )
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    fn code(&self, address: Address, block_number: u64) -> Result<Bytes, StateError> {
        self.block_on(self.client.get_code(address, BlockSpec::Number(block_number)))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    fn storage_at(
        &self,
        address: Address,
        index: U256,
        block_number: u64,
    ) -> Result<U256, StateError> {
        self.block_on(self.client.get_storage_at(
            address,
            index,
            BlockSpec::Number(block_number),
        ))
    }
}
