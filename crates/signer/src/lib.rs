//! Ethereum signature types

mod ecdsa;
mod fakeable;

use devnet_primitives::Address;
pub use k256::SecretKey;
use k256::{FieldBytes, PublicKey, elliptic_curve::sec1::ToEncodedPoint};
use sha3::{Digest, Keccak256};

pub use self::{ecdsa::EcdsaSignature, fakeable::FakeableSignature};

/// An error involving a signature.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// Invalid secret key.
    #[error("Expected 32 byte secret key")]
    InvalidSecretKeyLength,
    /// When parsing a secret key from string to hex
    #[error("Invalid hex")]
    InvalidSecretKeyHex,
    /// The V-value does not encode a valid recovery ID
    #[error("Invalid V-value: {0}")]
    InvalidV(u64),
    /// ECDSA error
    #[error(transparent)]
    Ecdsa(#[from] k256::ecdsa::Error),
    /// Elliptic curve error
    #[error(transparent)]
    EllipticCurve(#[from] k256::elliptic_curve::Error),
}

/// Converts a [`PublicKey`] to an [`Address`].
pub fn public_key_to_address(public_key: PublicKey) -> Address {
    let public_key = public_key.to_encoded_point(/* compress = */ false);
    let hash = Keccak256::digest(public_key.as_bytes().get(1..).unwrap_or_default());

    // Only take the lower 160 bits of the hash
    Address::from_slice(hash.get(12..).unwrap_or_default())
}

/// Converts a [`SecretKey`] to the [`Address`] of its account.
pub fn secret_key_to_address(secret_key: &SecretKey) -> Address {
    public_key_to_address(secret_key.public_key())
}

/// Parses a hex string, with or without `0x` prefix, into a secret key.
pub fn secret_key_from_str(secret_key: &str) -> Result<SecretKey, SignatureError> {
    let stripped = secret_key.strip_prefix("0x").unwrap_or(secret_key);

    // Hex errors can leak characters of the key, so use an opaque one.
    let bytes = hex::decode(stripped).map_err(|_error| SignatureError::InvalidSecretKeyHex)?;
    let bytes = FieldBytes::from_exact_iter(bytes).ok_or(SignatureError::InvalidSecretKeyLength)?;

    Ok(SecretKey::from_bytes(&bytes)?)
}

#[cfg(test)]
mod tests {
    use devnet_primitives::address;

    use super::*;

    #[test]
    fn known_secret_key_to_address() -> Result<(), SignatureError> {
        let secret_key = secret_key_from_str(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )?;

        assert_eq!(
            secret_key_to_address(&secret_key),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );

        Ok(())
    }

    #[test]
    fn secret_key_without_prefix() -> Result<(), SignatureError> {
        let secret_key = secret_key_from_str(
            "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
        )?;

        assert_eq!(
            secret_key_to_address(&secret_key),
            address!("70997970C51812dc3A010C7d01b50e0d17dc79C8")
        );

        Ok(())
    }

    #[test]
    fn invalid_secret_keys() {
        assert!(matches!(
            secret_key_from_str("0xzz"),
            Err(SignatureError::InvalidSecretKeyHex)
        ));
        assert!(matches!(
            secret_key_from_str("0x0102"),
            Err(SignatureError::InvalidSecretKeyLength)
        ));
    }
}
