use std::{cmp::Ordering, fmt::Debug};

use devnet_primitives::Address;
use devnet_transaction::ExecutableTransaction;
use indexmap::IndexMap;

use crate::OrderedTransaction;

/// An iterator over pending transactions.
pub struct PendingTransactions<TransactionT, ComparatorT>
where
    ComparatorT: Fn(&OrderedTransaction<TransactionT>, &OrderedTransaction<TransactionT>) -> Ordering,
{
    transactions: IndexMap<Address, Vec<OrderedTransaction<TransactionT>>>,
    comparator: ComparatorT,
}

impl<TransactionT, ComparatorT> PendingTransactions<TransactionT, ComparatorT>
where
    ComparatorT: Fn(&OrderedTransaction<TransactionT>, &OrderedTransaction<TransactionT>) -> Ordering,
{
    pub(crate) fn new(
        transactions: IndexMap<Address, Vec<OrderedTransaction<TransactionT>>>,
        comparator: ComparatorT,
    ) -> Self {
        Self {
            transactions,
            comparator,
        }
    }

    /// Removes all pending transactions of the account corresponding to the
    /// provided address.
    pub fn remove_caller(
        &mut self,
        caller: &Address,
    ) -> Option<Vec<OrderedTransaction<TransactionT>>> {
        self.transactions.shift_remove(caller)
    }
}

impl<TransactionT, ComparatorT> Debug for PendingTransactions<TransactionT, ComparatorT>
where
    TransactionT: Debug,
    ComparatorT: Fn(&OrderedTransaction<TransactionT>, &OrderedTransaction<TransactionT>) -> Ordering,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTransactions")
            .field("transactions", &self.transactions)
            .finish()
    }
}

impl<TransactionT, ComparatorT> Iterator for PendingTransactions<TransactionT, ComparatorT>
where
    TransactionT: ExecutableTransaction,
    ComparatorT: Fn(&OrderedTransaction<TransactionT>, &OrderedTransaction<TransactionT>) -> Ordering,
{
    type Item = TransactionT;

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn next(&mut self) -> Option<Self::Item> {
        // Empty lists are removed as soon as they are drained
        let (caller, _) = self
            .transactions
            .iter()
            .filter_map(|(caller, transactions)| {
                transactions.first().map(|first| (*caller, first))
            })
            .min_by(|(_, lhs), (_, rhs)| (self.comparator)(lhs, rhs))?;

        let transactions = self.transactions.get_mut(&caller)?;
        let next = transactions.remove(0).into_transaction();

        if transactions.is_empty() {
            self.transactions.shift_remove(&caller);
        }

        Some(next)
    }
}
