use std::fmt;

use devnet_primitives::B256;

/// A cryptographic state root: the root hash of the state trie.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrieRoot(B256);

impl TrieRoot {
    /// Wraps a state trie root hash.
    pub const fn new(root: B256) -> Self {
        Self(root)
    }

    /// Returns the root hash.
    pub const fn as_b256(&self) -> &B256 {
        &self.0
    }
}

/// An opaque handle to a snapshot of a forked state. It has no
/// cryptographic relation to the contents of the state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotRoot(B256);

impl SnapshotRoot {
    /// Wraps a snapshot handle.
    pub const fn new(handle: B256) -> Self {
        Self(handle)
    }

    /// Returns the raw handle.
    pub const fn as_b256(&self) -> &B256 {
        &self.0
    }
}

impl From<TrieRoot> for B256 {
    fn from(value: TrieRoot) -> Self {
        value.0
    }
}

impl From<SnapshotRoot> for B256 {
    fn from(value: SnapshotRoot) -> Self {
        value.0
    }
}

impl fmt::Display for TrieRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SnapshotRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
