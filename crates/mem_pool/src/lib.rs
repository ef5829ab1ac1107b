//! A nonce-ordered pool of transactions pending inclusion in a block.
//!
//! Each sender's transactions are partitioned into _pending_ transactions,
//! which form a contiguous nonce sequence starting at the sender's executable
//! nonce, and _queued_ transactions, which are blocked behind a nonce gap.
//! The pool state is a persistent value, so snapshots are cheap.

mod error;
mod pending;

use std::{cmp::Ordering, fmt::Debug, num::NonZeroU64};

use devnet_primitives::{Address, B256, HashMap};
use devnet_state_api::{State, StateError};
use devnet_transaction::{ExecutableTransaction, initial_cost, upfront_cost};
use indexmap::IndexMap;
use rpds::HashTrieMapSync;

pub use self::{
    error::{MemPoolAddTransactionError, MemPoolError},
    pending::PendingTransactions,
};

/// A pooled transaction with an order ID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderedTransaction<TransactionT> {
    order_id: u64,
    transaction: TransactionT,
}

impl<TransactionT: ExecutableTransaction> OrderedTransaction<TransactionT> {
    /// Retrieves the order ID of the transaction. Order IDs are strictly
    /// increasing in insertion order.
    pub fn order_id(&self) -> u64 {
        self.order_id
    }

    /// Retrieves the pooled transaction.
    pub fn pending(&self) -> &TransactionT {
        &self.transaction
    }

    /// Converts the instance into the pooled transaction.
    pub fn into_transaction(self) -> TransactionT {
        self.transaction
    }

    fn caller(&self) -> &Address {
        self.transaction.caller()
    }

    fn hash(&self) -> &B256 {
        self.transaction.transaction_hash()
    }

    fn nonce(&self) -> u64 {
        self.transaction.nonce()
    }
}

/// Orders transactions by insertion.
pub fn order_id_comparator<TransactionT: ExecutableTransaction>(
    lhs: &OrderedTransaction<TransactionT>,
    rhs: &OrderedTransaction<TransactionT>,
) -> Ordering {
    lhs.order_id().cmp(&rhs.order_id())
}

type SenderTransactions<TransactionT> = Vec<OrderedTransaction<TransactionT>>;
type AddressToTransactions<TransactionT> =
    HashTrieMapSync<Address, SenderTransactions<TransactionT>>;

#[derive(Clone, Debug)]
struct PoolState<TransactionT> {
    pending: AddressToTransactions<TransactionT>,
    queued: AddressToTransactions<TransactionT>,
    executable_nonces: HashTrieMapSync<Address, u64>,
    hash_to_caller: HashTrieMapSync<B256, Address>,
    block_gas_limit: NonZeroU64,
}

#[derive(Clone, Debug)]
struct Snapshot<TransactionT> {
    state: PoolState<TransactionT>,
    version: u64,
}

/// The transaction pool.
#[derive(Clone, Debug)]
pub struct TxPool<TransactionT> {
    state: PoolState<TransactionT>,
    /// Identifies the current pool state. Every mutation assigns a fresh
    /// version.
    version: u64,
    latest_version: u64,
    next_order_id: u64,
    snapshots: HashMap<u64, Snapshot<TransactionT>>,
    current_snapshot_id: Option<u64>,
    next_snapshot_id: u64,
}

impl<TransactionT: Clone + Debug + ExecutableTransaction> TxPool<TransactionT> {
    /// Constructs an empty pool with the specified block gas limit.
    pub fn new(block_gas_limit: NonZeroU64) -> Self {
        Self {
            state: PoolState {
                pending: HashTrieMapSync::new_sync(),
                queued: HashTrieMapSync::new_sync(),
                executable_nonces: HashTrieMapSync::new_sync(),
                hash_to_caller: HashTrieMapSync::new_sync(),
                block_gas_limit,
            },
            version: 0,
            latest_version: 0,
            next_order_id: 0,
            snapshots: HashMap::default(),
            current_snapshot_id: None,
            next_snapshot_id: 1,
        }
    }

    /// Validates the provided transaction against the state and adds it to
    /// the pool.
    ///
    /// A transaction whose nonce equals the sender's executable nonce becomes
    /// pending, promoting any queued transactions that now form a contiguous
    /// nonce sequence. Any other transaction is queued.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn add_transaction<StateT: State + ?Sized>(
        &mut self,
        state: &StateT,
        transaction: TransactionT,
    ) -> Result<(), MemPoolAddTransactionError> {
        let caller = *transaction.caller();
        let sender_nonce = self.executable_nonce(state, &caller)?;

        if transaction.kind().is_create() && transaction.data().is_empty() {
            return Err(MemPoolAddTransactionError::ContractCreationWithoutData);
        }

        let sender_balance = state.get_account(caller)?.balance;
        let max_upfront_cost = upfront_cost(&transaction);
        if max_upfront_cost > sender_balance {
            return Err(MemPoolAddTransactionError::InsufficientFunds {
                max_upfront_cost,
                sender_balance,
            });
        }

        if transaction.nonce() < sender_nonce {
            return Err(MemPoolAddTransactionError::NonceTooLow {
                transaction_nonce: transaction.nonce(),
                sender_nonce,
            });
        }

        let initial_cost = initial_cost(&transaction);
        if initial_cost > transaction.gas_limit() {
            return Err(MemPoolAddTransactionError::IntrinsicGasTooLow {
                initial_cost,
                transaction_gas_limit: transaction.gas_limit(),
            });
        }

        if transaction.gas_limit() > self.state.block_gas_limit.get() {
            return Err(MemPoolAddTransactionError::ExceedsBlockGasLimit {
                block_gas_limit: self.state.block_gas_limit,
                transaction_gas_limit: transaction.gas_limit(),
            });
        }

        let transaction_hash = *transaction.transaction_hash();
        if self.state.hash_to_caller.contains_key(&transaction_hash) {
            return Err(MemPoolAddTransactionError::TransactionAlreadyExists { transaction_hash });
        }

        let is_pending = transaction.nonce() == sender_nonce;
        let transaction = OrderedTransaction {
            order_id: self.next_order_id,
            transaction,
        };
        self.next_order_id += 1;

        self.bump_version();
        self.state
            .hash_to_caller
            .insert_mut(transaction_hash, caller);

        if is_pending {
            log::debug!("Adding pending transaction 0x{transaction_hash:x} from {caller}");

            self.add_pending_transaction(caller, transaction);
        } else {
            log::debug!("Queueing transaction 0x{transaction_hash:x} from {caller}");

            let mut queued = self.sender_queued(&caller);
            queued.push(transaction);
            set_sender_transactions(&mut self.state.queued, caller, queued);
        }

        Ok(())
    }

    /// Retrieves the pending transactions, grouped by sender. Senders are
    /// ordered by the order ID of their first transaction.
    pub fn pending_transactions(&self) -> IndexMap<Address, Vec<OrderedTransaction<TransactionT>>> {
        sorted_by_first_order_id(&self.state.pending)
    }

    /// Retrieves the queued transactions, grouped by sender. Senders are
    /// ordered by the order ID of their first transaction.
    pub fn queued_transactions(&self) -> IndexMap<Address, Vec<OrderedTransaction<TransactionT>>> {
        sorted_by_first_order_id(&self.state.queued)
    }

    /// Whether the pool has any pending transactions.
    pub fn has_pending_transactions(&self) -> bool {
        !self.state.pending.is_empty()
    }

    /// Whether the pool has any queued transactions.
    pub fn has_queued_transactions(&self) -> bool {
        !self.state.queued.is_empty()
    }

    /// Retrieves the next nonce the sender can submit as a pending
    /// transaction. Falls back to the state's account nonce if the pool has
    /// no pending transactions for the sender.
    pub fn executable_nonce<StateT: State + ?Sized>(
        &self,
        state: &StateT,
        address: &Address,
    ) -> Result<u64, StateError> {
        match self.state.executable_nonces.get(address) {
            Some(nonce) => Ok(*nonce),
            None => state.get_account(*address).map(|account| account.nonce),
        }
    }

    /// Retrieves the block gas limit used to validate new transactions.
    pub fn block_gas_limit(&self) -> NonZeroU64 {
        self.state.block_gas_limit
    }

    /// Sets the block gas limit used to validate new transactions. Pooled
    /// transactions are only invalidated by a subsequent call to
    /// [`clean`](Self::clean).
    pub fn set_block_gas_limit(&mut self, block_gas_limit: NonZeroU64) {
        if self.state.block_gas_limit != block_gas_limit {
            self.bump_version();
            self.state.block_gas_limit = block_gas_limit;
        }
    }

    /// Removes all transactions that can no longer be executed: those whose
    /// gas limit exceeds the block gas limit, whose nonce is below the
    /// sender's nonce, or whose upfront cost exceeds the sender's balance.
    ///
    /// Queued transactions are not promoted.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn clean<StateT: State + ?Sized>(&mut self, state: &StateT) -> Result<(), StateError> {
        let mut pending = self.state.pending.clone();
        let mut queued = self.state.queued.clone();
        let mut removed = Vec::new();

        for map in [&mut pending, &mut queued] {
            let callers = map.keys().copied().collect::<Vec<_>>();
            for caller in callers {
                let account = state.get_account(caller)?;

                let Some(transactions) = map.get(&caller) else {
                    continue;
                };

                let (retained, invalid): (Vec<_>, Vec<_>) =
                    transactions.iter().cloned().partition(|transaction| {
                        let transaction = transaction.pending();

                        transaction.gas_limit() <= self.state.block_gas_limit.get()
                            && transaction.nonce() >= account.nonce
                            && upfront_cost(transaction) <= account.balance
                    });

                if !invalid.is_empty() {
                    removed.extend(invalid);
                    set_sender_transactions(map, caller, retained);
                }
            }
        }

        if removed.is_empty() {
            return Ok(());
        }

        self.bump_version();
        for transaction in &removed {
            log::debug!("Removing invalidated transaction 0x{:x}", transaction.hash());

            self.state.hash_to_caller.remove_mut(transaction.hash());
            if !pending.contains_key(transaction.caller()) {
                self.state.executable_nonces.remove_mut(transaction.caller());
            }
        }

        self.state.pending = pending;
        self.state.queued = queued;

        Ok(())
    }

    /// Retrieves the transaction corresponding to the provided hash, if it
    /// exists.
    pub fn transaction_by_hash(&self, hash: &B256) -> Option<&OrderedTransaction<TransactionT>> {
        let caller = self.state.hash_to_caller.get(hash)?;

        self.state
            .pending
            .get(caller)
            .into_iter()
            .chain(self.state.queued.get(caller))
            .flatten()
            .find(|transaction| transaction.hash() == hash)
    }

    /// Removes the transaction corresponding to the provided hash, if it
    /// exists. Pending transactions of the same sender that follow the
    /// removed transaction are queued, as their nonces are no longer
    /// reachable.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn remove_transaction(&mut self, hash: &B256) -> Option<OrderedTransaction<TransactionT>> {
        let caller = *self.state.hash_to_caller.get(hash)?;

        self.bump_version();
        self.state.hash_to_caller.remove_mut(hash);

        let mut pending = self.sender_pending(&caller);
        if let Some(idx) = pending
            .iter()
            .position(|transaction| transaction.hash() == hash)
        {
            let invalidated = pending.split_off(idx + 1);
            let removed = pending.remove(idx);

            if pending.is_empty() {
                self.state.executable_nonces.remove_mut(&caller);
            } else {
                self.state
                    .executable_nonces
                    .insert_mut(caller, removed.nonce());
            }
            set_sender_transactions(&mut self.state.pending, caller, pending);

            if !invalidated.is_empty() {
                let mut queued = self.sender_queued(&caller);
                queued.extend(invalidated);
                queued.sort_by_key(OrderedTransaction::order_id);
                set_sender_transactions(&mut self.state.queued, caller, queued);
            }

            return Some(removed);
        }

        let mut queued = self.sender_queued(&caller);
        let idx = queued
            .iter()
            .position(|transaction| transaction.hash() == hash)?;
        let removed = queued.remove(idx);
        set_sender_transactions(&mut self.state.queued, caller, queued);

        Some(removed)
    }

    /// Creates an iterator over all pending transactions. Transactions of a
    /// single sender are returned in nonce order, while the provided
    /// comparator decides between the first transactions of different
    /// senders.
    pub fn iter<ComparatorT>(
        &self,
        comparator: ComparatorT,
    ) -> PendingTransactions<TransactionT, ComparatorT>
    where
        ComparatorT: Fn(
            &OrderedTransaction<TransactionT>,
            &OrderedTransaction<TransactionT>,
        ) -> Ordering,
    {
        PendingTransactions::new(self.pending_transactions(), comparator)
    }

    /// Creates an iterator over all pending transactions, in nonce order per
    /// sender and insertion order across senders.
    pub fn pending_in_nonce_order(
        &self,
    ) -> PendingTransactions<
        TransactionT,
        fn(&OrderedTransaction<TransactionT>, &OrderedTransaction<TransactionT>) -> Ordering,
    > {
        self.iter(order_id_comparator::<TransactionT> as fn(&_, &_) -> Ordering)
    }

    /// Creates a snapshot of the pool state. Consecutive snapshots of an
    /// unchanged pool return the same ID.
    pub fn snapshot(&mut self) -> u64 {
        let unchanged = self.current_snapshot_id.filter(|id| {
            self.snapshots
                .get(id)
                .is_some_and(|snapshot| snapshot.version == self.version)
        });

        if let Some(snapshot_id) = unchanged {
            return snapshot_id;
        }

        let snapshot_id = self.next_snapshot_id;
        self.next_snapshot_id += 1;

        self.snapshots.insert(
            snapshot_id,
            Snapshot {
                state: self.state.clone(),
                version: self.version,
            },
        );
        self.current_snapshot_id = Some(snapshot_id);

        snapshot_id
    }

    /// Restores the pool state of the snapshot with the provided ID.
    pub fn revert(&mut self, snapshot_id: u64) -> Result<(), MemPoolError> {
        let snapshot = self
            .snapshots
            .get(&snapshot_id)
            .ok_or(MemPoolError::UnknownSnapshot { snapshot_id })?;

        self.state = snapshot.state.clone();
        self.version = snapshot.version;
        self.current_snapshot_id = Some(snapshot_id);

        Ok(())
    }

    fn add_pending_transaction(
        &mut self,
        caller: Address,
        transaction: OrderedTransaction<TransactionT>,
    ) {
        let mut pending = self.sender_pending(&caller);
        pending.push(transaction);

        let Reorganized {
            pending,
            queued,
            executable_nonce,
        } = reorganize(pending, self.sender_queued(&caller));

        self.state
            .executable_nonces
            .insert_mut(caller, executable_nonce);
        set_sender_transactions(&mut self.state.pending, caller, pending);
        set_sender_transactions(&mut self.state.queued, caller, queued);
    }

    fn bump_version(&mut self) {
        self.latest_version += 1;
        self.version = self.latest_version;
    }

    fn sender_pending(&self, caller: &Address) -> SenderTransactions<TransactionT> {
        self.state.pending.get(caller).cloned().unwrap_or_default()
    }

    fn sender_queued(&self, caller: &Address) -> SenderTransactions<TransactionT> {
        self.state.queued.get(caller).cloned().unwrap_or_default()
    }
}

struct Reorganized<TransactionT> {
    pending: SenderTransactions<TransactionT>,
    queued: SenderTransactions<TransactionT>,
    executable_nonce: u64,
}

/// Moves queued transactions that continue the contiguous nonce sequence of
/// the pending transactions to the pending list.
fn reorganize<TransactionT: ExecutableTransaction>(
    mut pending: SenderTransactions<TransactionT>,
    mut queued: SenderTransactions<TransactionT>,
) -> Reorganized<TransactionT> {
    let mut executable_nonce = pending
        .last()
        .map_or(0, |transaction| transaction.nonce() + 1);

    queued.sort_by_key(|transaction| (transaction.nonce(), transaction.order_id()));

    let mut remaining = Vec::with_capacity(queued.len());
    for transaction in queued {
        if transaction.nonce() == executable_nonce {
            executable_nonce += 1;
            pending.push(transaction);
        } else {
            remaining.push(transaction);
        }
    }

    remaining.sort_by_key(OrderedTransaction::order_id);

    Reorganized {
        pending,
        queued: remaining,
        executable_nonce,
    }
}

fn set_sender_transactions<TransactionT>(
    map: &mut AddressToTransactions<TransactionT>,
    caller: Address,
    transactions: SenderTransactions<TransactionT>,
) {
    if transactions.is_empty() {
        map.remove_mut(&caller);
    } else {
        map.insert_mut(caller, transactions);
    }
}

fn sorted_by_first_order_id<TransactionT: Clone>(
    map: &AddressToTransactions<TransactionT>,
) -> IndexMap<Address, Vec<OrderedTransaction<TransactionT>>> {
    let mut senders = map
        .iter()
        .map(|(caller, transactions)| (*caller, transactions.clone()))
        .collect::<Vec<_>>();

    senders.sort_by_key(|(_, transactions)| {
        transactions
            .first()
            .map_or(u64::MAX, |transaction| transaction.order_id)
    });

    senders.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use devnet_primitives::{Bytes, TxKind, U256};
    use devnet_transaction::{Signed, request};

    use super::*;

    const CALLER: Address = Address::repeat_byte(0x11);

    fn ordered(order_id: u64, nonce: u64) -> OrderedTransaction<Signed> {
        let transaction = request::Legacy {
            nonce,
            gas_price: 0,
            gas_limit: 21_000,
            kind: TxKind::Call(Address::repeat_byte(0x22)),
            value: U256::from(order_id),
            input: Bytes::new(),
            chain_id: Some(1),
        }
        .fake_sign(CALLER);

        OrderedTransaction {
            order_id,
            transaction,
        }
    }

    fn nonces(transactions: &[OrderedTransaction<Signed>]) -> Vec<u64> {
        transactions.iter().map(OrderedTransaction::nonce).collect()
    }

    #[test]
    fn reorganize_promotes_contiguous_queued() {
        let reorganized = reorganize(
            vec![ordered(0, 0), ordered(3, 1)],
            vec![ordered(1, 3), ordered(2, 2), ordered(4, 5)],
        );

        assert_eq!(nonces(&reorganized.pending), vec![0, 1, 2, 3]);
        assert_eq!(nonces(&reorganized.queued), vec![5]);
        assert_eq!(reorganized.executable_nonce, 4);
    }

    #[test]
    fn reorganize_keeps_queued_in_insertion_order() {
        let reorganized = reorganize(
            vec![ordered(0, 0)],
            vec![ordered(1, 7), ordered(2, 4), ordered(3, 9)],
        );

        assert_eq!(nonces(&reorganized.pending), vec![0]);
        assert_eq!(nonces(&reorganized.queued), vec![7, 4, 9]);
        assert_eq!(reorganized.executable_nonce, 1);
    }
}
