use devnet_primitives::{Address, B256, Bytes, TxKind, U256, keccak256};
use devnet_signer::FakeableSignature;

use crate::{ExecutableTransaction, encode_list, request};

/// A signed legacy or EIP-155 transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signed {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    kind: TxKind,
    value: U256,
    input: Bytes,
    signature: FakeableSignature,
    hash: B256,
}

impl Signed {
    /// Constructs a signed transaction from a request and its signature.
    pub fn new(request: request::Legacy, signature: FakeableSignature) -> Self {
        let request::Legacy {
            nonce,
            gas_price,
            gas_limit,
            kind,
            value,
            input,
            chain_id: _,
        } = request;

        let mut transaction = Self {
            nonce,
            gas_price,
            gas_limit,
            kind,
            value,
            input,
            signature,
            hash: B256::ZERO,
        };
        transaction.hash = keccak256(transaction.rlp_encoding());

        transaction
    }

    /// Constructs a signed transaction with a known hash, without verifying
    /// the hash. Used for transactions retrieved from a remote node, which
    /// may not be legacy transactions.
    pub fn with_hash_unchecked(
        request: request::Legacy,
        signature: FakeableSignature,
        hash: B256,
    ) -> Self {
        let mut transaction = Self::new(request, signature);
        transaction.hash = hash;
        transaction
    }

    /// Returns the transaction's signature.
    pub fn signature(&self) -> &FakeableSignature {
        &self.signature
    }

    /// Returns the RLP encoding of the signed transaction.
    pub fn rlp_encoding(&self) -> Bytes {
        encode_list(&[
            &self.nonce,
            &self.gas_price,
            &self.gas_limit,
            &self.kind,
            &self.value,
            &self.input,
            &self.signature.v(),
            &self.signature.r(),
            &self.signature.s(),
        ])
        .into()
    }
}

impl ExecutableTransaction for Signed {
    fn caller(&self) -> &Address {
        self.signature.caller()
    }

    fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    fn gas_price(&self) -> &u128 {
        &self.gas_price
    }

    fn kind(&self) -> TxKind {
        self.kind
    }

    fn value(&self) -> &U256 {
        &self.value
    }

    fn data(&self) -> &Bytes {
        &self.input
    }

    fn nonce(&self) -> u64 {
        self.nonce
    }

    fn chain_id(&self) -> Option<u64> {
        let v = self.signature.v();
        (v >= 35).then(|| (v - 35) / 2)
    }

    fn transaction_hash(&self) -> &B256 {
        &self.hash
    }
}
