//! Account types

use alloy_rlp::RlpEncodable;
use devnet_primitives::{B256, Bytes, KECCAK_EMPTY, U256};
use rpds::HashTrieMapSync;

/// Basic account information, as exchanged with the execution engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    /// Number of transactions sent or contracts created by the account
    pub nonce: u64,
    /// Balance in wei
    pub balance: U256,
    /// Keccak-256 hash of the account's code
    pub code_hash: B256,
}

impl AccountInfo {
    /// Whether the account is empty, as defined by EIP-161.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance == U256::ZERO && self.code_hash == KECCAK_EMPTY
    }
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::ZERO,
            code_hash: KECCAK_EMPTY,
        }
    }
}

/// An account as encoded in the state trie.
#[derive(Clone, Copy, Debug, PartialEq, Eq, RlpEncodable)]
pub struct BasicAccount {
    // The order of these fields determines encoding order.
    /// Number of transactions sent or contracts created by the account
    pub nonce: u64,
    /// Balance in wei
    pub balance: U256,
    /// Root of the account's storage trie
    pub storage_root: B256,
    /// Keccak-256 hash of the account's code
    pub code_hash: B256,
}

/// Local overrides of a single account in a forked state.
///
/// Every field is an override: `None` means that the value is retrieved from
/// the remote chain, not that it is zero.
#[derive(Clone, Debug)]
pub struct AccountState {
    /// Overridden nonce
    pub nonce: Option<u64>,
    /// Overridden balance
    pub balance: Option<U256>,
    /// Overridden code
    pub code: Option<Bytes>,
    /// Overridden storage slots
    pub storage: HashTrieMapSync<U256, U256>,
    /// Whether the storage was cleared. Storage slots without an override
    /// then read as zero instead of being retrieved remotely.
    pub storage_cleared: bool,
}

impl Default for AccountState {
    fn default() -> Self {
        Self {
            nonce: None,
            balance: None,
            code: None,
            storage: HashTrieMapSync::new_sync(),
            storage_cleared: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_account_is_empty() {
        assert!(AccountInfo::default().is_empty());

        let account = AccountInfo {
            nonce: 1,
            ..AccountInfo::default()
        };
        assert!(!account.is_empty());
    }

    #[test]
    fn account_with_code_is_not_empty() {
        let account = AccountInfo {
            code_hash: B256::repeat_byte(1),
            ..AccountInfo::default()
        };
        assert!(!account.is_empty());
    }
}
