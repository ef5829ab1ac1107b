use alloy_rlp::Encodable as _;
use devnet_primitives::{Address, B256, Bytes, KECCAK_EMPTY, U256};
use devnet_state_api::{AccountInfo, account::BasicAccount};
use rpds::HashTrieMapSync;

#[derive(Clone, Debug)]
pub(crate) struct LocalAccount {
    pub nonce: u64,
    pub balance: U256,
    pub code_hash: B256,
    pub storage: HashTrieMapSync<U256, U256>,
}

impl LocalAccount {
    pub fn info(&self) -> AccountInfo {
        AccountInfo {
            nonce: self.nonce,
            balance: self.balance,
            code_hash: self.code_hash,
        }
    }
}

impl Default for LocalAccount {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::ZERO,
            code_hash: KECCAK_EMPTY,
            storage: HashTrieMapSync::new_sync(),
        }
    }
}

/// The value of a local state. Cloning is O(1).
#[derive(Clone, Debug)]
pub(crate) struct LocalState {
    pub accounts: HashTrieMapSync<Address, LocalAccount>,
    pub code: HashTrieMapSync<B256, Bytes>,
}

impl LocalState {
    /// Computes the root of the secure state trie.
    pub fn compute_root(&self) -> B256 {
        devnet_trie::sec_trie_root(self.accounts.iter().map(|(address, account)| {
            let basic = BasicAccount {
                nonce: account.nonce,
                balance: account.balance,
                storage_root: devnet_trie::storage_root(account.storage.iter()),
                code_hash: account.code_hash,
            };

            let mut encoded = Vec::with_capacity(basic.length());
            basic.encode(&mut encoded);

            (address.0, encoded)
        }))
    }
}

impl Default for LocalState {
    fn default() -> Self {
        Self {
            accounts: HashTrieMapSync::new_sync(),
            code: HashTrieMapSync::new_sync(),
        }
    }
}
