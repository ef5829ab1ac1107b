use std::sync::atomic::{AtomicUsize, Ordering};

use devnet_node::executor::{
    BlockContext, Exception, ExecutionOptions, ExecutionResult, Executor, ExecutorError, Log,
};
use devnet_primitives::{Bytes, TxKind, U256, keccak256};
use devnet_state_api::StateManager;
use devnet_transaction::{ExecutableTransaction as _, Signed, initial_cost, upfront_cost};

/// An execution engine that only transfers value.
///
/// Every transaction uses its intrinsic gas, which is paid to the block's
/// beneficiary. Calls with input data emit a single log from the recipient,
/// whose topic is the hash of the input.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransferExecutor;

impl<StateT: StateManager> Executor<StateT> for TransferExecutor {
    fn execute(
        &self,
        state: &mut StateT,
        block: &BlockContext,
        transaction: &Signed,
        options: &ExecutionOptions,
    ) -> Result<ExecutionResult, ExecutorError> {
        let caller = *transaction.caller();
        let mut sender = state.get_account(caller)?;

        if !options.skip_nonce && transaction.nonce() != sender.nonce {
            return Err(ExecutorError::InvalidTransaction(format!(
                "nonce {} does not match account nonce {}",
                transaction.nonce(),
                sender.nonce
            )));
        }

        if !options.skip_balance && sender.balance < upfront_cost(transaction) {
            return Err(ExecutorError::InvalidTransaction(
                "insufficient funds for gas * price + value".to_string(),
            ));
        }

        let gas_used = initial_cost(transaction);
        if gas_used > transaction.gas_limit() {
            return Ok(ExecutionResult {
                gas_used: transaction.gas_limit(),
                output: Bytes::new(),
                exception: Some(Exception::OutOfGas),
                logs: Vec::new(),
            });
        }

        let fee = U256::from(gas_used).saturating_mul(U256::from(*transaction.gas_price()));
        let value = *transaction.value();

        sender.nonce += 1;
        sender.balance = sender.balance.saturating_sub(fee.saturating_add(value));
        state.put_account(caller, sender)?;

        let mut logs = Vec::new();
        if let TxKind::Call(to) = transaction.kind() {
            let mut recipient = state.get_account(to)?;
            recipient.balance = recipient.balance.saturating_add(value);
            state.put_account(to, recipient)?;
            state.touch_account(to);

            if !transaction.data().is_empty() {
                logs.push(Log {
                    address: to,
                    topics: vec![keccak256(transaction.data())],
                    data: transaction.data().clone(),
                });
            }
        }

        let mut beneficiary = state.get_account(block.beneficiary)?;
        beneficiary.balance = beneficiary.balance.saturating_add(fee);
        state.put_account(block.beneficiary, beneficiary)?;

        Ok(ExecutionResult {
            gas_used,
            output: Bytes::new(),
            exception: None,
            logs,
        })
    }
}

/// An execution engine whose transactions only succeed with a gas limit of
/// at least `required_gas`, while reporting `gas_used` on success. This
/// mimics contracts whose logic depends on the available gas.
///
/// Every execution increments the sender's nonce.
#[derive(Debug)]
pub struct ThresholdExecutor {
    required_gas: u64,
    gas_used: u64,
    executions: AtomicUsize,
}

impl ThresholdExecutor {
    /// Constructs a new instance.
    pub fn new(required_gas: u64, gas_used: u64) -> Self {
        Self {
            required_gas,
            gas_used,
            executions: AtomicUsize::new(0),
        }
    }

    /// Returns the number of executions so far.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::Relaxed)
    }
}

impl<StateT: StateManager> Executor<StateT> for ThresholdExecutor {
    fn execute(
        &self,
        state: &mut StateT,
        _block: &BlockContext,
        transaction: &Signed,
        _options: &ExecutionOptions,
    ) -> Result<ExecutionResult, ExecutorError> {
        self.executions.fetch_add(1, Ordering::Relaxed);

        let caller = *transaction.caller();
        let mut sender = state.get_account(caller)?;
        sender.nonce += 1;
        state.put_account(caller, sender)?;

        let result = if transaction.gas_limit() >= self.required_gas {
            ExecutionResult {
                gas_used: self.gas_used,
                output: Bytes::new(),
                exception: None,
                logs: Vec::new(),
            }
        } else {
            ExecutionResult {
                gas_used: transaction.gas_limit(),
                output: Bytes::new(),
                exception: Some(Exception::OutOfGas),
                logs: Vec::new(),
            }
        };

        Ok(result)
    }
}
