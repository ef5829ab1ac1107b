use std::fmt::Debug;

use auto_impl::auto_impl;
use devnet_primitives::{Address, B256, Bytes};
use devnet_state_api::{StateError, StateManager};
use devnet_transaction::Signed;

/// The environment of the block in which a transaction is executed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockContext {
    /// The block number
    pub number: u64,
    /// The block timestamp
    pub timestamp: u64,
    /// The recipient of transaction fees
    pub beneficiary: Address,
    /// The block gas limit
    pub gas_limit: u64,
    /// The chain ID
    pub chain_id: u64,
}

/// Options that relax transaction validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Skip the nonce check
    pub skip_nonce: bool,
    /// Skip the balance check
    pub skip_balance: bool,
}

/// A log emitted during execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    /// The emitting contract
    pub address: Address,
    /// The indexed topics
    pub topics: Vec<B256>,
    /// The non-indexed data
    pub data: Bytes,
}

/// The reason why an execution did not succeed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Exception {
    /// The execution reverted.
    #[error("Transaction reverted")]
    Revert,
    /// The execution ran out of gas.
    #[error("Transaction ran out of gas")]
    OutOfGas,
    /// The execution halted for another reason.
    #[error("Transaction halted: {0}")]
    Halt(String),
}

/// The result of executing a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    /// The gas consumed by the transaction
    pub gas_used: u64,
    /// The return or revert data
    pub output: Bytes,
    /// The exception, if execution did not succeed
    pub exception: Option<Exception>,
    /// The emitted logs
    pub logs: Vec<Log>,
}

impl ExecutionResult {
    /// Whether the execution succeeded.
    pub fn is_success(&self) -> bool {
        self.exception.is_none()
    }
}

/// An error that prevents a transaction from being executed at all.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The transaction is not valid in the current state.
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    /// State error
    #[error(transparent)]
    State(#[from] StateError),
}

/// Trait for an execution engine that applies transactions to a state.
///
/// Implementations modify the state directly. The caller decides whether to
/// keep those modifications by checkpointing the state beforehand.
#[auto_impl(&, Box, Arc)]
pub trait Executor<StateT: StateManager>: Debug + Send + Sync {
    /// Executes the transaction in the provided block environment.
    fn execute(
        &self,
        state: &mut StateT,
        block: &BlockContext,
        transaction: &Signed,
        options: &ExecutionOptions,
    ) -> Result<ExecutionResult, ExecutorError>;
}
