/// The node state that is restored when reverting to a snapshot.
#[derive(Clone, Debug)]
pub(crate) struct Snapshot<RootT> {
    /// Seconds since the epoch when the snapshot was taken
    pub time: u64,
    pub block_number: u64,
    pub state_root: RootT,
    pub pool_snapshot_id: u64,
    pub block_time_offset_seconds: i64,
    pub next_block_timestamp: Option<u64>,
}
