use std::{collections::BTreeMap, ops::Deref, sync::Arc};

use devnet_blockchain_api::Block;
use devnet_primitives::{Address, B256, Bloom, HashMap};
use devnet_transaction::ExecutableTransaction as _;

use crate::{
    executor::{Exception, ExecutionResult, Log},
    filter::LogFilterCriteria,
};

/// A log emitted by a mined transaction, together with its position in the
/// chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterLog {
    /// The execution log
    pub inner: Log,
    /// Hash of the block that includes the log
    pub block_hash: B256,
    /// Number of the block that includes the log
    pub block_number: u64,
    /// Hash of the transaction that emitted the log
    pub transaction_hash: B256,
    /// Index of the transaction in its block
    pub transaction_index: u64,
    /// Index of the log in its block
    pub log_index: u64,
}

impl Deref for FilterLog {
    type Target = Log;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// The receipt of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Hash of the transaction
    pub transaction_hash: B256,
    /// Index of the transaction in its block
    pub transaction_index: u64,
    /// Hash of the block that includes the transaction
    pub block_hash: B256,
    /// Number of the block that includes the transaction
    pub block_number: u64,
    /// The sender
    pub from: Address,
    /// The recipient; `None` for contract creation
    pub to: Option<Address>,
    /// Gas used by the transaction
    pub gas_used: u64,
    /// Gas used by the transaction and all preceding transactions of the block
    pub cumulative_gas_used: u64,
    /// The emitted logs
    pub logs: Vec<FilterLog>,
    /// Bloom filter of the emitted logs
    pub logs_bloom: Bloom,
    /// The exception, if execution did not succeed
    pub exception: Option<Exception>,
}

impl TransactionReceipt {
    /// Whether the transaction succeeded.
    pub fn is_success(&self) -> bool {
        self.exception.is_none()
    }
}

/// Constructs the receipts of a mined block from the results of its
/// transactions, in block order.
pub(crate) fn block_receipts(
    block: &Block,
    transaction_results: &[ExecutionResult],
) -> Vec<TransactionReceipt> {
    let block_hash = *block.hash();
    let block_number = block.number();

    let mut cumulative_gas_used = 0u64;
    let mut log_index = 0u64;

    block
        .transactions()
        .iter()
        .zip(transaction_results)
        .enumerate()
        .map(|(transaction_index, (transaction, result))| {
            let transaction_index = transaction_index as u64;
            let transaction_hash = *transaction.transaction_hash();
            cumulative_gas_used += result.gas_used;

            let mut logs_bloom = Bloom::ZERO;
            let logs = result
                .logs
                .iter()
                .map(|log| {
                    logs_bloom.accrue_raw_log(log.address, &log.topics);

                    let log = FilterLog {
                        inner: log.clone(),
                        block_hash,
                        block_number,
                        transaction_hash,
                        transaction_index,
                        log_index,
                    };
                    log_index += 1;
                    log
                })
                .collect();

            TransactionReceipt {
                transaction_hash,
                transaction_index,
                block_hash,
                block_number,
                from: *transaction.caller(),
                to: transaction.kind().to().copied(),
                gas_used: result.gas_used,
                cumulative_gas_used,
                logs,
                logs_bloom,
                exception: result.exception.clone(),
            }
        })
        .collect()
}

/// Receipts of locally mined blocks, indexed by block number and transaction
/// hash.
#[derive(Clone, Debug, Default)]
pub(crate) struct ReceiptStorage {
    by_block_number: BTreeMap<u64, Vec<Arc<TransactionReceipt>>>,
    by_transaction_hash: HashMap<B256, Arc<TransactionReceipt>>,
}

impl ReceiptStorage {
    /// Stores the receipts of the block with the provided number.
    pub fn insert_block(&mut self, block_number: u64, receipts: Vec<TransactionReceipt>) {
        let receipts: Vec<_> = receipts.into_iter().map(Arc::new).collect();

        for receipt in &receipts {
            self.by_transaction_hash
                .insert(receipt.transaction_hash, receipt.clone());
        }

        self.by_block_number.insert(block_number, receipts);
    }

    /// Removes the receipts of all blocks after the provided block number.
    pub fn revert_to_block(&mut self, block_number: u64) {
        let Some(first_removed) = block_number.checked_add(1) else {
            return;
        };

        let removed = self.by_block_number.split_off(&first_removed);
        for receipt in removed.values().flatten() {
            self.by_transaction_hash.remove(&receipt.transaction_hash);
        }
    }

    /// Retrieves the receipt of the transaction with the provided hash.
    pub fn receipt_by_transaction_hash(
        &self,
        transaction_hash: &B256,
    ) -> Option<Arc<TransactionReceipt>> {
        self.by_transaction_hash.get(transaction_hash).cloned()
    }

    /// Retrieves the logs of blocks in the inclusive range that satisfy the
    /// criteria, in chain order.
    pub fn logs(
        &self,
        from_block: u64,
        to_block: u64,
        criteria: &LogFilterCriteria,
    ) -> Vec<FilterLog> {
        if from_block > to_block {
            return Vec::new();
        }

        self.by_block_number
            .range(from_block..=to_block)
            .flat_map(|(_, receipts)| receipts.iter())
            .filter(|receipt| criteria.may_match_bloom(&receipt.logs_bloom))
            .flat_map(|receipt| receipt.logs.iter())
            .filter(|log| criteria.matches(log))
            .cloned()
            .collect()
    }
}
