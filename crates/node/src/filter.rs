use devnet_primitives::{Address, B256, Bloom, BloomInput};

use crate::{executor::Log, receipt::FilterLog};

/// Number of seconds after the last poll until a filter expires.
pub const FILTER_TIMEOUT_SECONDS: u64 = 5 * 60;

/// Criteria that a log needs to satisfy to be reported by a log filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogFilterCriteria {
    /// First block of the range. `None` stands for the latest block.
    pub from_block: Option<u64>,
    /// Last block of the range. `None` stands for the latest block when
    /// querying logs and leaves the range open for filters.
    pub to_block: Option<u64>,
    /// Emitting contracts. Empty matches any contract.
    pub addresses: Vec<Address>,
    /// Topics by position. `None` matches any topic, otherwise the topic has
    /// to equal one of the options.
    pub topics: Vec<Option<Vec<B256>>>,
}

impl LogFilterCriteria {
    /// Whether the block number lies within the criteria's range.
    pub fn contains_block(&self, block_number: u64) -> bool {
        self.from_block.is_none_or(|from_block| block_number >= from_block)
            && self.to_block.is_none_or(|to_block| block_number <= to_block)
    }

    /// Whether the log satisfies the criteria.
    pub fn matches(&self, log: &Log) -> bool {
        if !self.addresses.is_empty() && !self.addresses.contains(&log.address) {
            return false;
        }

        self.topics
            .iter()
            .enumerate()
            .all(|(index, options)| match options {
                None => true,
                Some(options) => log
                    .topics
                    .get(index)
                    .is_some_and(|topic| options.contains(topic)),
            })
    }

    /// Whether the bloom may contain logs that satisfy the criteria.
    pub fn may_match_bloom(&self, bloom: &Bloom) -> bool {
        let address_match = self.addresses.is_empty()
            || self
                .addresses
                .iter()
                .any(|address| bloom.contains_raw_log(*address, &[]));

        address_match
            && self.topics.iter().flatten().all(|options| {
                options.is_empty()
                    || options
                        .iter()
                        .any(|topic| bloom.contains_input(BloomInput::Raw(topic.as_slice())))
            })
    }
}

/// The events that a filter collects between polls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterData {
    /// Hashes of newly mined blocks
    NewHeads(Vec<B256>),
    /// Hashes of newly submitted transactions
    NewPendingTransactions(Vec<B256>),
    /// Logs of newly mined blocks that satisfy the criteria
    Logs {
        /// The criteria
        criteria: LogFilterCriteria,
        /// The collected logs
        logs: Vec<FilterLog>,
    },
}

/// Events returned when polling a filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilteredEvents {
    /// Hashes of newly mined blocks
    NewHeads(Vec<B256>),
    /// Hashes of newly submitted transactions
    NewPendingTransactions(Vec<B256>),
    /// Newly emitted logs
    Logs(Vec<FilterLog>),
}

/// A filter that is either polled or backs a subscription.
#[derive(Clone, Debug)]
pub struct Filter {
    /// The collected events
    pub data: FilterData,
    /// Whether the filter was installed by a subscription
    pub is_subscription: bool,
    deadline: u64,
}

impl Filter {
    /// Constructs a filter for new blocks, seeded with the latest block's
    /// hash.
    pub fn new_block_filter(latest_block_hash: B256, is_subscription: bool, now: u64) -> Self {
        Self {
            data: FilterData::NewHeads(vec![latest_block_hash]),
            is_subscription,
            deadline: new_deadline(now),
        }
    }

    /// Constructs a filter for newly submitted transactions.
    pub fn new_pending_transaction_filter(is_subscription: bool, now: u64) -> Self {
        Self {
            data: FilterData::NewPendingTransactions(Vec::new()),
            is_subscription,
            deadline: new_deadline(now),
        }
    }

    /// Constructs a filter for logs, seeded with the already mined logs that
    /// satisfy the criteria.
    pub fn new_log_filter(
        criteria: LogFilterCriteria,
        logs: Vec<FilterLog>,
        is_subscription: bool,
        now: u64,
    ) -> Self {
        Self {
            data: FilterData::Logs { criteria, logs },
            is_subscription,
            deadline: new_deadline(now),
        }
    }

    /// Whether the filter was last polled more than
    /// [`FILTER_TIMEOUT_SECONDS`] ago.
    pub fn has_expired(&self, now: u64) -> bool {
        now > self.deadline
    }

    /// Takes the collected events and postpones the deadline.
    pub fn take_events(&mut self, now: u64) -> FilteredEvents {
        self.deadline = new_deadline(now);

        match &mut self.data {
            FilterData::NewHeads(hashes) => FilteredEvents::NewHeads(std::mem::take(hashes)),
            FilterData::NewPendingTransactions(hashes) => {
                FilteredEvents::NewPendingTransactions(std::mem::take(hashes))
            }
            FilterData::Logs { logs, .. } => FilteredEvents::Logs(std::mem::take(logs)),
        }
    }

    /// Takes the collected logs and postpones the deadline. Returns `None`
    /// if the filter does not collect logs.
    pub fn take_log_events(&mut self, now: u64) -> Option<Vec<FilterLog>> {
        let FilterData::Logs { logs, .. } = &mut self.data else {
            return None;
        };

        let logs = std::mem::take(logs);
        self.deadline = new_deadline(now);

        Some(logs)
    }
}

fn new_deadline(now: u64) -> u64 {
    now.saturating_add(FILTER_TIMEOUT_SECONDS)
}
