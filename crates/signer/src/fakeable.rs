use devnet_primitives::{Address, B256, U256};

use crate::{EcdsaSignature, SignatureError};

#[derive(Clone, Debug, PartialEq, Eq)]
enum FakeableData {
    /// Fake signature, used for impersonation.
    ///
    /// A fake signature must produce the same transaction hash for the same
    /// transaction from a sender, and different hashes for different senders.
    /// This is achieved by setting the `r` and `s` values to the sender's
    /// address.
    Fake { v: u64 },
    Recoverable { signature: EcdsaSignature },
}

/// A signature that is either a real ECDSA signature or a fake one that
/// carries the caller's address, used for impersonated accounts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeableSignature {
    data: FakeableData,
    address: Address,
}

impl FakeableSignature {
    /// Constructs a fake signature for the provided caller. When no V-value
    /// is provided, it defaults to 28.
    pub fn fake(address: Address, v: Option<u64>) -> Self {
        Self {
            data: FakeableData::Fake {
                v: v.unwrap_or(28),
            },
            address,
        }
    }

    /// Constructs an instance by recovering the caller's address from the
    /// signature of the provided prehashed message.
    pub fn recover(signature: EcdsaSignature, hash: &B256) -> Result<Self, SignatureError> {
        let address = signature.recover_address(hash)?;

        Ok(Self {
            data: FakeableData::Recoverable { signature },
            address,
        })
    }

    /// Constructs an instance from a signature and its caller's address,
    /// without verifying that they match. Used for transactions received
    /// from a trusted remote node.
    pub fn with_address_unchecked(signature: EcdsaSignature, address: Address) -> Self {
        Self {
            data: FakeableData::Recoverable { signature },
            address,
        }
    }

    /// Returns the Ethereum address of the transaction's caller.
    pub fn caller(&self) -> &Address {
        &self.address
    }

    /// Whether the signature is from an impersonated account.
    pub fn is_fake(&self) -> bool {
        matches!(self.data, FakeableData::Fake { .. })
    }

    /// Returns the signature's R-value.
    pub fn r(&self) -> U256 {
        match &self.data {
            FakeableData::Fake { .. } => U256::from_be_slice(self.address.as_slice()),
            FakeableData::Recoverable { signature } => signature.r,
        }
    }

    /// Returns the signature's S-value.
    pub fn s(&self) -> U256 {
        match &self.data {
            FakeableData::Fake { .. } => U256::from_be_slice(self.address.as_slice()),
            FakeableData::Recoverable { signature } => signature.s,
        }
    }

    /// Returns the signature's V-value.
    pub fn v(&self) -> u64 {
        match &self.data {
            FakeableData::Fake { v } => *v,
            FakeableData::Recoverable { signature } => signature.v,
        }
    }
}
