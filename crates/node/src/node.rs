use std::{
    cmp::Ordering,
    collections::BTreeMap,
    num::NonZeroU64,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use devnet_blockchain_api::{Block, Blockchain, Header};
use devnet_blockchain_fork::{ForkBlockchain, RpcRemoteBlocks};
use devnet_blockchain_local::LocalBlockchain;
use devnet_mem_pool::{OrderedTransaction, TxPool};
use devnet_primitives::{
    Address, B256, Bloom, Bytes, HashMap, HashSet, TxKind, U256, random::RandomHashGenerator,
};
use devnet_rpc_client::{
    HeaderMap, RpcClient,
    header::{HeaderName, HeaderValue},
};
use devnet_signer::{SecretKey, secret_key_from_str, secret_key_to_address};
use devnet_state_api::{AccountInfo, GenesisAccountState, GenesisConfig, State as _, StateManager};
use devnet_state_fork::ForkStateManager;
use devnet_state_local::LocalStateManager;
use devnet_state_remote::{CachedRemoteState, RpcRemoteState};
use devnet_transaction::{ExecutableTransaction as _, Signed, initial_cost, request};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::runtime;

use crate::{
    AccountOwner, CreationError, NodeConfig, NodeError,
    executor::{BlockContext, ExecutionOptions, ExecutionResult, Executor, ExecutorError},
    filter::{Filter, FilterData, FilteredEvents, LogFilterCriteria},
    gas,
    receipt::{FilterLog, ReceiptStorage, TransactionReceipt, block_receipts},
    snapshot::Snapshot,
    time::TimeSinceEpoch,
};

const FORK_STATE_ROOT_SEED: &str = "seed";

/// A message call or transaction whose sender is not required to sign it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallRequest {
    /// The sender
    pub from: Address,
    /// The recipient, or `None` for contract creation
    pub to: Option<Address>,
    /// The gas limit. Defaults to the block gas limit.
    pub gas_limit: Option<u64>,
    /// The gas price. Defaults to zero.
    pub gas_price: Option<u128>,
    /// The transferred value
    pub value: U256,
    /// The input data
    pub data: Bytes,
}

/// Metadata of the remote chain that a node forked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForkMetadata {
    /// Chain ID of the remote chain
    pub chain_id: u64,
    /// Number of the fork block
    pub fork_block_number: u64,
    /// Hash of the fork block
    pub fork_block_hash: B256,
}

/// The result of mining a block.
#[derive(Clone, Debug)]
pub struct MineBlockResult {
    /// The mined block
    pub block: Arc<Block>,
    /// The results of the included transactions, in block order
    pub transaction_results: Vec<ExecutionResult>,
}

/// A development node that combines a blockchain, a state manager, a
/// transaction pool and an execution engine.
pub struct Node<StateT: StateManager, ExecutorT, TimerT> {
    blockchain: Box<dyn Blockchain>,
    state: StateT,
    executor: ExecutorT,
    mem_pool: TxPool<Signed>,
    timer: TimerT,
    network_id: u64,
    beneficiary: Address,
    hardfork: Option<String>,
    is_auto_mining: bool,
    local_accounts: IndexMap<Address, SecretKey>,
    impersonated_accounts: HashSet<Address>,
    fork_metadata: Option<ForkMetadata>,
    block_time_offset_seconds: i64,
    next_block_timestamp: Option<u64>,
    next_snapshot_id: u64,
    snapshots: BTreeMap<u64, Snapshot<StateT::Root>>,
    receipts: ReceiptStorage,
    last_filter_id: U256,
    filters: HashMap<U256, Filter>,
}

impl<StateT, ExecutorT, TimerT> Node<StateT, ExecutorT, TimerT>
where
    StateT: StateManager,
    ExecutorT: Executor<StateT>,
    TimerT: TimeSinceEpoch,
{
    /// Constructs a node from an existing state and blockchain. The state has
    /// to correspond to the blockchain's last block.
    pub fn new(
        config: &NodeConfig,
        state: StateT,
        blockchain: Box<dyn Blockchain>,
        executor: ExecutorT,
        timer: TimerT,
    ) -> Result<Self, CreationError> {
        let local_accounts = local_accounts(config)?;
        let block_time_offset_seconds = block_time_offset_seconds(config, &timer)?;

        Ok(Self {
            blockchain,
            state,
            executor,
            mem_pool: TxPool::new(config.block_gas_limit),
            timer,
            network_id: config.network_id,
            beneficiary: config.coinbase,
            hardfork: config.hardfork.clone(),
            is_auto_mining: config.automine,
            local_accounts,
            impersonated_accounts: HashSet::default(),
            fork_metadata: None,
            block_time_offset_seconds,
            next_block_timestamp: None,
            // We start at 1 to mimic Ganache
            next_snapshot_id: 1,
            snapshots: BTreeMap::new(),
            receipts: ReceiptStorage::default(),
            last_filter_id: U256::ZERO,
            filters: HashMap::default(),
        })
    }

    /// Returns the addresses of accounts whose secret keys are known to the
    /// node.
    pub fn accounts(&self) -> impl Iterator<Item = &Address> {
        self.local_accounts.keys()
    }

    /// Retrieves the account at the provided address.
    pub fn account(&self, address: Address) -> Result<AccountInfo, NodeError> {
        Ok(self.state.get_account(address)?)
    }

    /// Returns the nonce that the next transaction of the sender needs to
    /// have, taking pending transactions into account.
    pub fn account_next_nonce(&self, address: &Address) -> Result<u64, NodeError> {
        Ok(self.mem_pool.executable_nonce(&self.state, address)?)
    }

    /// Retrieves the code of the account at the provided address.
    pub fn code(&self, address: Address) -> Result<Bytes, NodeError> {
        Ok(self.state.get_contract_code(address)?)
    }

    /// Retrieves the value of the storage slot at the provided address and
    /// index.
    pub fn storage_at(&self, address: Address, index: U256) -> Result<U256, NodeError> {
        Ok(self.state.get_contract_storage(address, index)?)
    }

    /// Returns the current block gas limit.
    pub fn block_gas_limit(&self) -> u64 {
        self.mem_pool.block_gas_limit().get()
    }

    /// Sets the gas limit of blocks mined after this call. Pending
    /// transactions that exceed the new limit are removed.
    pub fn set_block_gas_limit(&mut self, gas_limit: NonZeroU64) -> Result<(), NodeError> {
        self.mem_pool.set_block_gas_limit(gas_limit);
        self.mem_pool.clean(&self.state)?;

        Ok(())
    }

    /// Returns the chain ID.
    pub fn chain_id(&self) -> u64 {
        self.blockchain.chain_id()
    }

    /// Returns the network ID.
    pub fn network_id(&self) -> u64 {
        self.network_id
    }

    /// Returns the beneficiary of mined blocks.
    pub fn coinbase(&self) -> Address {
        self.beneficiary
    }

    /// Sets the beneficiary of mined blocks.
    pub fn set_coinbase(&mut self, coinbase: Address) {
        self.beneficiary = coinbase;
    }

    /// Returns the configured hardfork name, if any.
    pub fn hardfork(&self) -> Option<&str> {
        self.hardfork.as_deref()
    }

    /// Returns whether the node mines a block for every submitted
    /// transaction.
    pub fn is_auto_mining(&self) -> bool {
        self.is_auto_mining
    }

    /// Sets whether the node mines a block for every submitted transaction.
    pub fn set_auto_mining(&mut self, enabled: bool) {
        self.is_auto_mining = enabled;
    }

    /// Returns the metadata of the forked chain, if the node is forked.
    pub fn fork_metadata(&self) -> Option<&ForkMetadata> {
        self.fork_metadata.as_ref()
    }

    /// Returns the transaction pool.
    pub fn mem_pool(&self) -> &TxPool<Signed> {
        &self.mem_pool
    }

    /// Returns the state manager.
    pub fn state(&self) -> &StateT {
        &self.state
    }

    /// Retrieves the last block.
    pub fn last_block(&self) -> Result<Arc<Block>, NodeError> {
        Ok(self.blockchain.last_block()?)
    }

    /// Returns the number of the last block.
    pub fn last_block_number(&self) -> u64 {
        self.blockchain.last_block_number()
    }

    /// Retrieves the block with the provided number, if it exists.
    pub fn block_by_number(&self, number: u64) -> Result<Option<Arc<Block>>, NodeError> {
        Ok(self.blockchain.block_by_number(number)?)
    }

    /// Retrieves the block with the provided hash, if it exists.
    pub fn block_by_hash(&self, hash: &B256) -> Result<Option<Arc<Block>>, NodeError> {
        Ok(self.blockchain.block_by_hash(hash)?)
    }

    /// Retrieves the block that includes the transaction with the provided
    /// hash, if it exists.
    pub fn block_by_transaction_hash(
        &self,
        transaction_hash: &B256,
    ) -> Result<Option<Arc<Block>>, NodeError> {
        Ok(self.blockchain.block_by_transaction_hash(transaction_hash)?)
    }

    /// Retrieves the transaction with the provided hash from the pool or the
    /// blockchain.
    pub fn transaction_by_hash(&self, transaction_hash: &B256) -> Result<Option<Signed>, NodeError> {
        if let Some(transaction) = self.mem_pool.transaction_by_hash(transaction_hash) {
            return Ok(Some(transaction.pending().clone()));
        }

        Ok(self.blockchain.transaction_by_hash(transaction_hash)?)
    }

    /// Removes the transaction with the provided hash from the pool, if it
    /// exists.
    pub fn remove_pending_transaction(
        &mut self,
        transaction_hash: &B256,
    ) -> Option<OrderedTransaction<Signed>> {
        self.mem_pool.remove_transaction(transaction_hash)
    }

    /// Retrieves the receipt of the mined transaction with the provided hash.
    /// Transactions of remote blocks have no receipt.
    pub fn transaction_receipt(&self, transaction_hash: &B256) -> Option<Arc<TransactionReceipt>> {
        self.receipts.receipt_by_transaction_hash(transaction_hash)
    }

    /// Starts accepting transactions from the address without a signature.
    /// Always returns `true`.
    pub fn impersonate_account(&mut self, address: Address) -> bool {
        self.impersonated_accounts.insert(address);

        true
    }

    /// Stops accepting unsigned transactions from the address. Returns
    /// whether it was impersonated.
    pub fn stop_impersonating_account(&mut self, address: Address) -> bool {
        self.impersonated_accounts.remove(&address)
    }

    /// Signs the request on behalf of the sender. Requests of impersonated
    /// accounts are fake-signed; otherwise the sender needs to be a local
    /// account.
    pub fn sign_transaction(
        &self,
        caller: &Address,
        request: request::Legacy,
    ) -> Result<Signed, NodeError> {
        if self.impersonated_accounts.contains(caller) {
            return Ok(request.fake_sign(*caller));
        }

        let secret_key = self
            .local_accounts
            .get(caller)
            .ok_or(NodeError::UnknownAddress { address: *caller })?;

        Ok(request.sign(secret_key)?)
    }

    /// Adds the transaction to the pool. When automining, blocks are mined
    /// until no pending transactions remain.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn send_transaction(&mut self, transaction: Signed) -> Result<B256, NodeError> {
        let transaction_hash = *transaction.transaction_hash();

        if self
            .blockchain
            .block_by_transaction_hash(&transaction_hash)?
            .is_some()
        {
            return Err(NodeError::KnownTransaction { transaction_hash });
        }

        let snapshot_id = if self.is_auto_mining {
            self.validate_auto_mine_transaction(&transaction)?;

            Some(self.take_snapshot()?)
        } else {
            None
        };

        if let Err(error) = self.mem_pool.add_transaction(&self.state, transaction) {
            if let Some(snapshot_id) = snapshot_id {
                self.snapshots.remove(&snapshot_id);
            }

            return Err(error.into());
        }

        log::debug!("Added transaction 0x{transaction_hash:x} to the pool");
        self.notify_filters_about_pending_transaction(&transaction_hash);

        if let Some(snapshot_id) = snapshot_id {
            while self.mem_pool.has_pending_transactions() {
                if let Err(error) = self.mine_block(None) {
                    self.revert_to_snapshot(snapshot_id)?;
                    return Err(error);
                }
            }

            self.snapshots.remove(&snapshot_id);
        }

        Ok(transaction_hash)
    }

    /// Mines a block with the pending transactions of the pool. If no
    /// timestamp is provided, it is derived from the current time and the
    /// block time offset.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn mine_block(&mut self, timestamp: Option<u64>) -> Result<MineBlockResult, NodeError> {
        let (block_timestamp, new_offset) = self.next_block_timestamp(timestamp)?;
        let last_block = self.blockchain.last_block()?;

        let context = BlockContext {
            number: last_block.number() + 1,
            timestamp: block_timestamp,
            beneficiary: self.beneficiary,
            gas_limit: self.block_gas_limit(),
            chain_id: self.chain_id(),
        };

        let previous_root = self.state.state_root()?;
        let (result, logs) = match self.mine_block_with_mem_pool(*last_block.hash(), &context) {
            Ok(result) => result,
            Err(error) => {
                // Equivalent to a rollback of the block
                self.state.set_state_root(previous_root)?;
                return Err(error);
            }
        };

        self.mem_pool.clean(&self.state)?;

        if let Some(new_offset) = new_offset {
            self.block_time_offset_seconds = new_offset;
        }
        self.next_block_timestamp.take();

        self.notify_filters_about_mined_block(&result.block, &logs);

        log::debug!(
            "Mined block {} with {} transaction(s)",
            result.block.number(),
            result.block.transactions().len()
        );

        Ok(result)
    }

    /// Mines a block as part of interval mining.
    pub fn interval_mine(&mut self) -> Result<(), NodeError> {
        let result = self.mine_block(None)?;
        log::info!("Interval mined block #{}", result.block.number());

        Ok(())
    }

    /// Executes the call in the context of the next block. All state changes
    /// are discarded afterwards.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn run_call(&mut self, call: &CallRequest) -> Result<ExecutionResult, NodeError> {
        let transaction = self.fake_transaction(call, None)?;
        self.run_tx_and_revert_mutations(&transaction)
    }

    /// Estimates the gas limit that the call needs to succeed.
    ///
    /// Fails if the call does not succeed with the block gas limit.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn estimate_gas(&mut self, call: &CallRequest) -> Result<u64, NodeError> {
        let block_gas_limit = self.block_gas_limit();

        let transaction = self.fake_transaction(call, Some(block_gas_limit))?;
        let result = self.run_tx_and_revert_mutations(&transaction)?;
        if let Some(exception) = result.exception {
            return Err(NodeError::TransactionFailed(exception));
        }

        // Minimum gas cost that is required for the transaction to be included in a
        // block
        let minimum_cost = initial_cost(&transaction);

        let mut initial_estimation = result.gas_used;
        if minimum_cost >= initial_estimation {
            initial_estimation = minimum_cost + 1;
        }

        if self.check_gas_limit(call, initial_estimation)? {
            return Ok(initial_estimation);
        }

        // The execution logic can depend on the available gas, so the gas used with
        // the block gas limit is not necessarily sufficient.
        gas::binary_search_estimation(initial_estimation, block_gas_limit, |gas_limit| {
            self.check_gas_limit(call, gas_limit)
        })
    }

    /// Executes the transaction in the context of the next block, skipping
    /// nonce and balance checks. The state is always restored afterwards.
    pub fn run_tx_and_revert_mutations(
        &mut self,
        transaction: &Signed,
    ) -> Result<ExecutionResult, NodeError> {
        let context = self.next_block_context()?;
        let initial_root = self.state.state_root()?;

        let result = self.executor.execute(
            &mut self.state,
            &context,
            transaction,
            &ExecutionOptions {
                skip_nonce: true,
                skip_balance: true,
            },
        );

        self.state.set_state_root(initial_root)?;
        self.state.clear_original_storage_cache();

        Ok(result?)
    }

    /// Captures the chain, state, pool and time of the node. Returns the
    /// snapshot's ID.
    pub fn take_snapshot(&mut self) -> Result<u64, NodeError> {
        let id = self.next_snapshot_id;

        let snapshot = Snapshot {
            time: self.timer.since_epoch(),
            block_number: self.blockchain.last_block_number(),
            state_root: self.state.state_root()?,
            pool_snapshot_id: self.mem_pool.snapshot(),
            block_time_offset_seconds: self.block_time_offset_seconds,
            next_block_timestamp: self.next_block_timestamp,
        };

        self.next_snapshot_id += 1;
        self.snapshots.insert(id, snapshot);

        Ok(id)
    }

    /// Restores the snapshot with the provided ID. Returns whether the
    /// snapshot existed.
    ///
    /// The snapshot and all later snapshots are discarded, as they can only be
    /// used once.
    pub fn revert_to_snapshot(&mut self, snapshot_id: u64) -> Result<bool, NodeError> {
        let mut removed_snapshots = self.snapshots.split_off(&snapshot_id);

        let Some(snapshot) = removed_snapshots.remove(&snapshot_id) else {
            return Ok(false);
        };

        let Snapshot {
            time,
            block_number,
            state_root,
            pool_snapshot_id,
            block_time_offset_seconds,
            next_block_timestamp,
        } = snapshot;

        // We compute a new offset such that:
        // now + new_offset == snapshot_time + old_offset
        let now = saturating_i64(self.timer.since_epoch());
        self.block_time_offset_seconds =
            block_time_offset_seconds.saturating_add(saturating_i64(time).saturating_sub(now));

        self.blockchain.revert_to_block(block_number)?;
        self.receipts.revert_to_block(block_number);
        self.state.set_state_root(state_root)?;
        self.state.clear_original_storage_cache();
        self.mem_pool.revert(pool_snapshot_id)?;
        self.next_block_timestamp = next_block_timestamp;

        Ok(true)
    }

    /// Increases the offset between the system clock and block timestamps.
    /// Returns the new offset.
    pub fn increase_time(&mut self, increment: u64) -> i64 {
        self.block_time_offset_seconds = self
            .block_time_offset_seconds
            .saturating_add(saturating_i64(increment));

        self.block_time_offset_seconds
    }

    /// Returns the offset between the system clock and block timestamps.
    pub fn time_increment(&self) -> i64 {
        self.block_time_offset_seconds
    }

    /// Sets the timestamp of the next mined block.
    pub fn set_next_block_timestamp(&mut self, timestamp: u64) -> Result<u64, NodeError> {
        let latest_block = self.blockchain.last_block()?;
        let previous = latest_block.header().timestamp;

        match timestamp.cmp(&previous) {
            Ordering::Less => Err(NodeError::TimestampLowerThanPrevious {
                proposed: timestamp,
                previous,
            }),
            Ordering::Equal => Err(NodeError::TimestampEqualsPrevious {
                proposed: timestamp,
            }),
            Ordering::Greater => {
                self.next_block_timestamp = Some(timestamp);
                Ok(timestamp)
            }
        }
    }

    /// Returns the timestamp of the next mined block, if it was set.
    pub fn next_block_timestamp_override(&self) -> Option<u64> {
        self.next_block_timestamp
    }

    /// Installs a filter for new blocks. Returns the filter's ID.
    pub fn new_block_filter(&mut self, is_subscription: bool) -> Result<U256, NodeError> {
        let block_hash = *self.blockchain.last_block()?.hash();

        let filter_id = self.next_filter_id();
        self.filters.insert(
            filter_id,
            Filter::new_block_filter(block_hash, is_subscription, self.timer.since_epoch()),
        );

        Ok(filter_id)
    }

    /// Installs a filter for newly submitted transactions. Returns the
    /// filter's ID.
    pub fn new_pending_transaction_filter(&mut self, is_subscription: bool) -> U256 {
        let filter_id = self.next_filter_id();
        self.filters.insert(
            filter_id,
            Filter::new_pending_transaction_filter(is_subscription, self.timer.since_epoch()),
        );

        filter_id
    }

    /// Installs a filter for logs. The filter starts out with the already
    /// mined logs that satisfy the criteria. Returns the filter's ID.
    pub fn new_log_filter(
        &mut self,
        mut criteria: LogFilterCriteria,
        is_subscription: bool,
    ) -> U256 {
        let last_block_number = self.blockchain.last_block_number();
        criteria.from_block = Some(
            criteria
                .from_block
                .map_or(last_block_number, |from_block| from_block.min(last_block_number)),
        );

        let logs = self.get_logs(&criteria);

        let filter_id = self.next_filter_id();
        self.filters.insert(
            filter_id,
            Filter::new_log_filter(criteria, logs, is_subscription, self.timer.since_epoch()),
        );

        filter_id
    }

    /// Retrieves the logs of mined blocks that satisfy the criteria. Unset
    /// range bounds stand for the latest block and bounds past the latest
    /// block are clamped. Logs of remote blocks are not included.
    pub fn get_logs(&self, criteria: &LogFilterCriteria) -> Vec<FilterLog> {
        let last_block_number = self.blockchain.last_block_number();
        let bound = |block_number: Option<u64>| {
            block_number.map_or(last_block_number, |block_number| {
                block_number.min(last_block_number)
            })
        };

        self.receipts
            .logs(bound(criteria.from_block), bound(criteria.to_block), criteria)
    }

    /// Takes the events that the filter collected since the last poll.
    /// Returns `None` if the filter does not exist.
    pub fn get_filter_changes(&mut self, filter_id: &U256) -> Option<FilteredEvents> {
        let now = self.timer.since_epoch();
        self.filters
            .get_mut(filter_id)
            .map(|filter| filter.take_events(now))
    }

    /// Takes the logs that the log filter collected since the last poll.
    /// Returns `None` if the filter does not exist.
    pub fn get_filter_logs(
        &mut self,
        filter_id: &U256,
    ) -> Result<Option<Vec<FilterLog>>, NodeError> {
        let now = self.timer.since_epoch();
        self.filters
            .get_mut(filter_id)
            .map(|filter| {
                filter
                    .take_log_events(now)
                    .ok_or(NodeError::InvalidFilterType {
                        filter_id: *filter_id,
                    })
            })
            .transpose()
    }

    /// Removes the filter. Returns whether it existed and was installed in the
    /// same way, as a subscription or as a polled filter.
    pub fn uninstall_filter(&mut self, filter_id: &U256, is_subscription: bool) -> bool {
        if let Some(filter) = self.filters.get(filter_id) {
            filter.is_subscription == is_subscription && self.filters.remove(filter_id).is_some()
        } else {
            false
        }
    }

    fn check_gas_limit(&mut self, call: &CallRequest, gas_limit: u64) -> Result<bool, NodeError> {
        let transaction = self.fake_transaction(call, Some(gas_limit))?;
        let result = self.run_tx_and_revert_mutations(&transaction)?;

        Ok(result.is_success())
    }

    fn fake_transaction(
        &self,
        call: &CallRequest,
        gas_limit: Option<u64>,
    ) -> Result<Signed, NodeError> {
        let nonce = self.state.get_account(call.from)?.nonce;

        let request = request::Legacy {
            nonce,
            gas_price: call.gas_price.unwrap_or(0),
            gas_limit: gas_limit
                .or(call.gas_limit)
                .unwrap_or_else(|| self.block_gas_limit()),
            kind: call.to.map_or(TxKind::Create, TxKind::Call),
            value: call.value,
            input: call.data.clone(),
            chain_id: Some(self.chain_id()),
        };

        Ok(request.fake_sign(call.from))
    }

    fn mine_block_with_mem_pool(
        &mut self,
        parent_hash: B256,
        context: &BlockContext,
    ) -> Result<(MineBlockResult, Vec<FilterLog>), NodeError> {
        let mut pending = self.mem_pool.pending_in_nonce_order();

        let mut cumulative_gas_used = 0u64;
        let mut logs_bloom = Bloom::ZERO;
        let mut transactions = Vec::new();
        let mut transaction_results = Vec::new();
        let mut invalid_transactions = Vec::new();

        while let Some(transaction) = pending.next() {
            let caller = *transaction.caller();

            // Later transactions of the sender depend on this one
            if cumulative_gas_used.saturating_add(transaction.gas_limit()) > context.gas_limit {
                pending.remove_caller(&caller);
                continue;
            }

            self.state.checkpoint()?;
            let result = self.executor.execute(
                &mut self.state,
                context,
                &transaction,
                &ExecutionOptions::default(),
            );

            match result {
                Ok(result) => {
                    if let Err(error) = self
                        .state
                        .cleanup_touched_accounts()
                        .and_then(|()| self.state.commit())
                    {
                        self.state.revert()?;
                        return Err(error.into());
                    }
                    self.state.clear_original_storage_cache();

                    cumulative_gas_used += result.gas_used;
                    for log in &result.logs {
                        logs_bloom.accrue_raw_log(log.address, &log.topics);
                    }

                    transactions.push(transaction);
                    transaction_results.push(result);
                }
                Err(ExecutorError::InvalidTransaction(reason)) => {
                    self.state.revert()?;
                    self.state.clear_original_storage_cache();

                    log::debug!(
                        "Dropping transaction 0x{:x}: {reason}",
                        transaction.transaction_hash()
                    );
                    pending.remove_caller(&caller);
                    invalid_transactions.push(*transaction.transaction_hash());
                }
                Err(ExecutorError::State(error)) => {
                    self.state.revert()?;
                    return Err(error.into());
                }
            }
        }

        let mut header = Header::new(
            parent_hash,
            context.number,
            context.timestamp,
            context.beneficiary,
            context.gas_limit,
        );
        header.gas_used = cumulative_gas_used;
        header.logs_bloom = logs_bloom;
        header.state_root = self.state.state_root()?.into();

        let block = self
            .blockchain
            .insert_block(Block::new(header, transactions))?;

        for transaction_hash in &invalid_transactions {
            self.mem_pool.remove_transaction(transaction_hash);
        }

        let receipts = block_receipts(&block, &transaction_results);
        let logs = receipts
            .iter()
            .flat_map(|receipt| receipt.logs.iter().cloned())
            .collect();
        self.receipts.insert_block(block.number(), receipts);

        Ok((
            MineBlockResult {
                block,
                transaction_results,
            },
            logs,
        ))
    }

    fn next_block_context(&self) -> Result<BlockContext, NodeError> {
        let (timestamp, _new_offset) = self.next_block_timestamp(None)?;

        Ok(BlockContext {
            number: self.blockchain.last_block_number() + 1,
            timestamp,
            beneficiary: self.beneficiary,
            gas_limit: self.block_gas_limit(),
            chain_id: self.chain_id(),
        })
    }

    /// Calculates the timestamp of the next block and, if it changes, the new
    /// block time offset.
    fn next_block_timestamp(&self, timestamp: Option<u64>) -> Result<(u64, Option<i64>), NodeError> {
        let latest_block = self.blockchain.last_block()?;
        let latest_timestamp = latest_block.header().timestamp;

        let current_timestamp = saturating_i64(self.timer.since_epoch());

        let (mut block_timestamp, mut new_offset) = if let Some(timestamp) = timestamp {
            if timestamp < latest_timestamp {
                return Err(NodeError::TimestampLowerThanPrevious {
                    proposed: timestamp,
                    previous: latest_timestamp,
                });
            }

            let offset = saturating_i64(timestamp) - current_timestamp;
            (timestamp, Some(offset))
        } else if let Some(next_block_timestamp) = self.next_block_timestamp {
            let offset = saturating_i64(next_block_timestamp) - current_timestamp;
            (next_block_timestamp, Some(offset))
        } else {
            let next_timestamp =
                u64::try_from(current_timestamp.saturating_add(self.block_time_offset_seconds))
                    .unwrap_or(0);

            (next_timestamp, None)
        };

        if block_timestamp <= latest_timestamp {
            let increase = latest_timestamp + 1 - block_timestamp;
            block_timestamp = latest_timestamp + 1;

            if new_offset.is_none() {
                new_offset = Some(
                    self.block_time_offset_seconds
                        .saturating_add(saturating_i64(increase)),
                );
            }
        }

        Ok((block_timestamp, new_offset))
    }

    fn next_filter_id(&mut self) -> U256 {
        self.last_filter_id = self.last_filter_id.saturating_add(U256::from(1));
        self.last_filter_id
    }

    fn notify_filters_about_pending_transaction(&mut self, transaction_hash: &B256) {
        for filter in self.filters.values_mut() {
            if let FilterData::NewPendingTransactions(hashes) = &mut filter.data {
                hashes.push(*transaction_hash);
            }
        }
    }

    fn notify_filters_about_mined_block(&mut self, block: &Block, logs: &[FilterLog]) {
        for filter in self.filters.values_mut() {
            match &mut filter.data {
                FilterData::NewHeads(hashes) => hashes.push(*block.hash()),
                FilterData::Logs {
                    criteria,
                    logs: filter_logs,
                } => {
                    if criteria.contains_block(block.number())
                        && criteria.may_match_bloom(&block.header().logs_bloom)
                    {
                        filter_logs.extend(logs.iter().filter(|log| criteria.matches(log)).cloned());
                    }
                }
                FilterData::NewPendingTransactions(_) => (),
            }
        }

        // Remove outdated filters
        let now = self.timer.since_epoch();
        self.filters.retain(|_, filter| !filter.has_expired(now));
    }

    /// While automining, blocks are only mined until the pool has no pending
    /// transactions, so a transaction behind a nonce gap would stay queued.
    fn validate_auto_mine_transaction(&self, transaction: &Signed) -> Result<(), NodeError> {
        let expected = self.account_next_nonce(transaction.caller())?;
        let actual = transaction.nonce();

        if actual > expected {
            return Err(NodeError::AutoMineNonceTooHigh { expected, actual });
        }

        Ok(())
    }
}

impl<ExecutorT, TimerT> Node<LocalStateManager, ExecutorT, TimerT>
where
    ExecutorT: Executor<LocalStateManager>,
    TimerT: TimeSinceEpoch,
{
    /// Constructs a node with a local chain, starting from a genesis block
    /// with the configured genesis accounts.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn new_local(
        config: &NodeConfig,
        executor: ExecutorT,
        timer: TimerT,
    ) -> Result<Self, CreationError> {
        let accounts = config
            .genesis_accounts
            .iter()
            .map(|account| {
                Ok(GenesisAccountState {
                    address: account_owner_address(&account.owner)?,
                    balance: account.balance,
                    nonce: 0,
                    code: Bytes::new(),
                    storage: BTreeMap::new(),
                })
            })
            .collect::<Result<Vec<_>, CreationError>>()?;

        let mut state = LocalStateManager::new();
        state.generate_genesis(&GenesisConfig { accounts })?;

        let timestamp = match config.initial_date {
            Some(initial_date) => seconds_since_epoch(initial_date)?,
            None => timer.since_epoch(),
        };

        let mut header = Header::new(
            B256::ZERO,
            0,
            timestamp,
            Address::ZERO,
            config.block_gas_limit.get(),
        );
        header.state_root = state.state_root()?.into();

        let blockchain = LocalBlockchain::new(Block::new(header, Vec::new()), config.chain_id)?;

        Self::new(config, state, Box::new(blockchain), executor, timer)
    }
}

impl<ExecutorT, TimerT> Node<ForkStateManager, ExecutorT, TimerT>
where
    ExecutorT: Executor<ForkStateManager>,
    TimerT: TimeSinceEpoch,
{
    /// Constructs a node that forks the remote chain of the fork
    /// configuration. Requests to the remote chain are driven by the provided
    /// runtime, which needs to be multi-threaded.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn new_fork(
        runtime: runtime::Handle,
        config: &NodeConfig,
        executor: ExecutorT,
        timer: TimerT,
    ) -> Result<Self, CreationError> {
        let fork = config.fork.as_ref().ok_or(CreationError::MissingForkConfig)?;

        let client = Arc::new(RpcClient::new(
            &fork.json_rpc_url,
            Some(http_headers(&fork.http_headers)?),
        )?);

        let chain_id = block_on(&runtime, client.chain_id())?;
        let fork_block_number = match fork.block_number {
            Some(block_number) => block_number,
            None => block_on(&runtime, client.block_number())?,
        };

        let blockchain = ForkBlockchain::new(
            Arc::new(RpcRemoteBlocks::new(runtime.clone(), client.clone())),
            fork_block_number,
            chain_id,
        )?;
        let fork_block_hash = *blockchain.last_block()?.hash();

        let remote_state = CachedRemoteState::new(RpcRemoteState::new(runtime, client));
        let mut state = ForkStateManager::new(
            Arc::new(remote_state),
            fork_block_number,
            Arc::new(Mutex::new(RandomHashGenerator::with_seed(
                FORK_STATE_ROOT_SEED,
            ))),
        );

        for account in &config.genesis_accounts {
            let address = account_owner_address(&account.owner)?;
            let info = state.get_account(address)?;

            state.put_account(
                address,
                AccountInfo {
                    balance: account.balance,
                    ..info
                },
            )?;
        }

        let mut node = Self::new(config, state, Box::new(blockchain), executor, timer)?;
        node.fork_metadata = Some(ForkMetadata {
            chain_id,
            fork_block_number,
            fork_block_hash,
        });

        Ok(node)
    }
}

fn account_owner_address(owner: &AccountOwner) -> Result<Address, CreationError> {
    match owner {
        AccountOwner::SecretKey(secret_key) => {
            Ok(secret_key_to_address(&secret_key_from_str(secret_key)?))
        }
        AccountOwner::Address(address) => Ok(*address),
    }
}

fn local_accounts(config: &NodeConfig) -> Result<IndexMap<Address, SecretKey>, CreationError> {
    config
        .genesis_accounts
        .iter()
        .filter_map(|account| match &account.owner {
            AccountOwner::SecretKey(secret_key) => Some(secret_key),
            AccountOwner::Address(_) => None,
        })
        .map(|secret_key| {
            let secret_key = secret_key_from_str(secret_key)?;
            Ok((secret_key_to_address(&secret_key), secret_key))
        })
        .collect()
}

fn block_time_offset_seconds(
    config: &NodeConfig,
    timer: &impl TimeSinceEpoch,
) -> Result<i64, CreationError> {
    config.initial_date.map_or(Ok(0), |initial_date| {
        let initial_timestamp = saturating_i64(seconds_since_epoch(initial_date)?);
        let current_timestamp = saturating_i64(timer.since_epoch());

        Ok(initial_timestamp - current_timestamp)
    })
}

fn seconds_since_epoch(date: SystemTime) -> Result<u64, CreationError> {
    date.duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .map_err(|_error| CreationError::InvalidInitialDate(date))
}

fn http_headers(headers: &BTreeMap<String, String>) -> Result<HeaderMap, CreationError> {
    headers
        .iter()
        .map(|(name, value)| {
            let invalid = || CreationError::InvalidHttpHeader { name: name.clone() };

            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_error| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_error| invalid())?;

            Ok((header_name, header_value))
        })
        .collect()
}

fn block_on<T>(runtime: &runtime::Handle, future: impl Future<Output = T>) -> T {
    tokio::task::block_in_place(|| runtime.block_on(future))
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_http_headers() -> anyhow::Result<()> {
        let headers = BTreeMap::from([("authorization".to_string(), "Bearer token".to_string())]);

        let header_map = http_headers(&headers)?;
        assert_eq!(
            header_map.get("authorization").map(HeaderValue::as_bytes),
            Some("Bearer token".as_bytes())
        );

        Ok(())
    }

    #[test]
    fn invalid_http_header_name() {
        let headers = BTreeMap::from([("in valid".to_string(), "value".to_string())]);

        assert!(matches!(
            http_headers(&headers),
            Err(CreationError::InvalidHttpHeader { name }) if name == "in valid"
        ));
    }

    #[test]
    fn initial_date_before_epoch() {
        let date = UNIX_EPOCH - std::time::Duration::from_secs(1);

        assert!(matches!(
            seconds_since_epoch(date),
            Err(CreationError::InvalidInitialDate(_))
        ));
    }
}
