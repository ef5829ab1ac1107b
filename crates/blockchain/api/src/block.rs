use alloy_rlp::RlpEncodable;
use devnet_primitives::{
    Address, B64, B256, Bloom, Bytes, KECCAK_NULL_RLP, KECCAK_RLP_EMPTY_ARRAY, U256, keccak256,
};
use devnet_transaction::{ExecutableTransaction as _, Signed};

/// An Ethereum block header.
#[derive(Clone, Debug, PartialEq, Eq, RlpEncodable)]
#[rlp(trailing)]
pub struct Header {
    // The order of these fields determines encoding order.
    /// The parent block's hash
    pub parent_hash: B256,
    /// The ommers' root hash
    pub ommers_hash: B256,
    /// The block's beneficiary address
    pub beneficiary: Address,
    /// The state's root hash
    pub state_root: B256,
    /// The transactions' root hash
    pub transactions_root: B256,
    /// The receipts' root hash
    pub receipts_root: B256,
    /// The logs' bloom
    pub logs_bloom: Bloom,
    /// The block's difficulty
    pub difficulty: U256,
    /// The block's number
    pub number: u64,
    /// The block's gas limit
    pub gas_limit: u64,
    /// The amount of gas used by the block
    pub gas_used: u64,
    /// The block's timestamp
    pub timestamp: u64,
    /// The block's extra data
    pub extra_data: Bytes,
    /// The block's mix hash
    pub mix_hash: B256,
    /// The block's nonce
    pub nonce: B64,
    /// `BaseFee` was added by EIP-1559 and is absent in legacy headers.
    pub base_fee_per_gas: Option<u128>,
    /// `WithdrawalsHash` was added by EIP-4895 and is absent in older headers.
    pub withdrawals_root: Option<B256>,
    /// Blob gas used was added by EIP-4844 and is absent in older headers.
    pub blob_gas_used: Option<u64>,
    /// Excess blob gas was added by EIP-4844 and is absent in older headers.
    pub excess_blob_gas: Option<u64>,
    /// The hash tree root of the parent beacon block (EIP-4788).
    pub parent_beacon_block_root: Option<B256>,
    /// The commitment hash of the block's execution layer requests (EIP-7685).
    pub requests_hash: Option<B256>,
}

impl Header {
    /// Constructs the header of a block without ommers or receipts.
    pub fn new(
        parent_hash: B256,
        number: u64,
        timestamp: u64,
        beneficiary: Address,
        gas_limit: u64,
    ) -> Self {
        Self {
            parent_hash,
            ommers_hash: KECCAK_RLP_EMPTY_ARRAY,
            beneficiary,
            state_root: KECCAK_NULL_RLP,
            transactions_root: KECCAK_NULL_RLP,
            receipts_root: KECCAK_NULL_RLP,
            logs_bloom: Bloom::ZERO,
            difficulty: U256::ZERO,
            number,
            gas_limit,
            gas_used: 0,
            timestamp,
            extra_data: Bytes::new(),
            mix_hash: B256::ZERO,
            nonce: B64::ZERO,
            base_fee_per_gas: None,
            withdrawals_root: None,
            blob_gas_used: None,
            excess_blob_gas: None,
            parent_beacon_block_root: None,
            requests_hash: None,
        }
    }

    /// Calculates the block's hash.
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }
}

/// An Ethereum block and its transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    header: Header,
    transactions: Vec<Signed>,
    hash: B256,
}

impl Block {
    /// Constructs a block, computing the header's transactions root and the
    /// block's hash.
    pub fn new(mut header: Header, transactions: Vec<Signed>) -> Self {
        header.transactions_root = transactions_root(&transactions);
        let hash = header.hash();

        Self {
            header,
            transactions,
            hash,
        }
    }

    /// Constructs a block with a known hash, without verifying it. Used for
    /// blocks retrieved from a remote node.
    pub fn with_hash_unchecked(header: Header, transactions: Vec<Signed>, hash: B256) -> Self {
        Self {
            header,
            transactions,
            hash,
        }
    }

    /// Returns the block's hash.
    pub fn hash(&self) -> &B256 {
        &self.hash
    }

    /// Returns the block's header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the block's number.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Returns the block's transactions.
    pub fn transactions(&self) -> &[Signed] {
        &self.transactions
    }

    /// Whether the block includes a transaction with the provided hash.
    pub fn contains_transaction(&self, transaction_hash: &B256) -> bool {
        self.transactions
            .iter()
            .any(|transaction| transaction.transaction_hash() == transaction_hash)
    }
}

/// Calculates the root of the trie of the transactions' RLP encodings.
pub fn transactions_root(transactions: &[Signed]) -> B256 {
    devnet_trie::ordered_trie_root(transactions.iter().map(Signed::rlp_encoding))
}

#[cfg(test)]
mod tests {
    use devnet_primitives::{TxKind, address};
    use devnet_transaction::request;

    use super::*;

    fn dummy_transaction(nonce: u64) -> Signed {
        request::Legacy {
            nonce,
            gas_price: 1,
            gas_limit: 21_000,
            kind: TxKind::Call(Address::ZERO),
            value: U256::ZERO,
            input: Bytes::new(),
            chain_id: Some(1),
        }
        .fake_sign(address!("0000000000000000000000000000000000000001"))
    }

    #[test]
    fn empty_block() {
        let block = Block::new(Header::new(B256::ZERO, 0, 0, Address::ZERO, 30_000_000), Vec::new());

        assert_eq!(block.header().transactions_root, KECCAK_NULL_RLP);
        assert_eq!(*block.hash(), block.header().hash());
    }

    #[test]
    fn hash_depends_on_transactions() {
        let header = Header::new(B256::ZERO, 1, 1, Address::ZERO, 30_000_000);

        let first = Block::new(header.clone(), vec![dummy_transaction(0)]);
        let second = Block::new(header, vec![dummy_transaction(1)]);

        assert_ne!(first.header().transactions_root, KECCAK_NULL_RLP);
        assert_ne!(first.hash(), second.hash());

        let transaction_hash = *first.transactions()[0].transaction_hash();
        assert!(first.contains_transaction(&transaction_hash));
        assert!(!second.contains_transaction(&transaction_hash));
    }
}
