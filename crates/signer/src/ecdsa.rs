use devnet_primitives::{Address, B256, U256};
use k256::{
    PublicKey, SecretKey,
    ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey},
};

use crate::{SignatureError, public_key_to_address};

/// An ECDSA signature with a V-value that encodes the recovery ID, either as
/// `27 + recovery_id` or, following EIP-155, as
/// `chain_id * 2 + 35 + recovery_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcdsaSignature {
    /// R-value
    pub r: U256,
    /// S-value
    pub s: U256,
    /// V-value
    pub v: u64,
}

impl EcdsaSignature {
    /// Signs the provided prehashed message. When a chain ID is provided, the
    /// V-value is encoded according to EIP-155.
    pub fn sign_hash(
        hash: &B256,
        secret_key: &SecretKey,
        chain_id: Option<u64>,
    ) -> Result<Self, SignatureError> {
        let signing_key = SigningKey::from(secret_key);
        let (signature, recovery_id) = signing_key.sign_prehash_recoverable(hash.as_slice())?;

        let (r, s) = signature.split_bytes();
        let recovery_id = u64::from(recovery_id.to_byte());
        let v = chain_id.map_or(27 + recovery_id, |chain_id| {
            chain_id * 2 + 35 + recovery_id
        });

        Ok(Self {
            r: U256::from_be_slice(r.as_slice()),
            s: U256::from_be_slice(s.as_slice()),
            v,
        })
    }

    /// Returns the recovery ID encoded in the V-value.
    pub fn recovery_id(&self) -> Result<u8, SignatureError> {
        let recovery_id = match self.v {
            0 | 1 => self.v,
            27 | 28 => self.v - 27,
            v if v >= 35 => (v - 35) % 2,
            v => return Err(SignatureError::InvalidV(v)),
        };

        u8::try_from(recovery_id).map_err(|_error| SignatureError::InvalidV(self.v))
    }

    /// Returns the chain ID encoded in an EIP-155 V-value, if any.
    pub fn chain_id(&self) -> Option<u64> {
        (self.v >= 35).then(|| (self.v - 35) / 2)
    }

    /// Recovers the address of the account that signed the prehashed message.
    pub fn recover_address(&self, hash: &B256) -> Result<Address, SignatureError> {
        let mut bytes = [0u8; 64];
        let (r, s) = bytes.split_at_mut(32);
        r.copy_from_slice(&self.r.to_be_bytes::<32>());
        s.copy_from_slice(&self.s.to_be_bytes::<32>());

        let signature = Signature::from_slice(&bytes)?;
        let recovery_id =
            RecoveryId::from_byte(self.recovery_id()?).ok_or(SignatureError::InvalidV(self.v))?;

        let verifying_key =
            VerifyingKey::recover_from_prehash(hash.as_slice(), &signature, recovery_id)?;

        Ok(public_key_to_address(PublicKey::from(&verifying_key)))
    }
}
