use devnet_primitives::{Address, B256, Bytes, TxKind, U256, keccak256};
use devnet_signer::{EcdsaSignature, FakeableSignature, SecretKey, SignatureError};

use crate::{Signed, encode_list};

/// An unsigned legacy transaction. When a chain ID is present, the
/// transaction is signed according to EIP-155.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Legacy {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub kind: TxKind,
    pub value: U256,
    pub input: Bytes,
    pub chain_id: Option<u64>,
}

impl Legacy {
    /// Computes the hash that is signed by the sender.
    pub fn signing_hash(&self) -> B256 {
        let encoded = if let Some(chain_id) = self.chain_id {
            encode_list(&[
                &self.nonce,
                &self.gas_price,
                &self.gas_limit,
                &self.kind,
                &self.value,
                &self.input,
                &chain_id,
                &0u8,
                &0u8,
            ])
        } else {
            encode_list(&[
                &self.nonce,
                &self.gas_price,
                &self.gas_limit,
                &self.kind,
                &self.value,
                &self.input,
            ])
        };

        keccak256(encoded)
    }

    /// Signs the transaction with the provided secret key.
    pub fn sign(self, secret_key: &SecretKey) -> Result<Signed, SignatureError> {
        let hash = self.signing_hash();
        let signature = EcdsaSignature::sign_hash(&hash, secret_key, self.chain_id)?;
        let signature = FakeableSignature::recover(signature, &hash)?;

        Ok(Signed::new(self, signature))
    }

    /// Signs the transaction with a fake signature for the provided caller,
    /// used for impersonated accounts and gas estimation.
    pub fn fake_sign(self, caller: Address) -> Signed {
        let v = self.chain_id.map(|chain_id| chain_id * 2 + 36);
        Signed::new(self, FakeableSignature::fake(caller, v))
    }
}

#[cfg(test)]
mod tests {
    use devnet_primitives::{address, b256};
    use devnet_signer::{secret_key_from_str, secret_key_to_address};

    use super::*;
    use crate::ExecutableTransaction as _;

    // Example from EIP-155
    fn eip155_example() -> Legacy {
        Legacy {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            kind: TxKind::Call(address!("3535353535353535353535353535353535353535")),
            value: U256::from(1_000_000_000_000_000_000u128),
            input: Bytes::new(),
            chain_id: Some(1),
        }
    }

    #[test]
    fn eip155_signing_hash() {
        assert_eq!(
            eip155_example().signing_hash(),
            b256!("daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53")
        );
    }

    #[test]
    fn eip155_sign() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(
            "0x4646464646464646464646464646464646464646464646464646464646464646",
        )?;

        let signed = eip155_example().sign(&secret_key)?;

        assert_eq!(*signed.caller(), secret_key_to_address(&secret_key));
        assert_eq!(signed.chain_id(), Some(1));
        assert!(signed.signature().v() == 37 || signed.signature().v() == 38);

        Ok(())
    }

    #[test]
    fn pre_eip155_sign() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )?;

        let request = Legacy {
            chain_id: None,
            ..eip155_example()
        };
        let signed = request.sign(&secret_key)?;

        assert_eq!(*signed.caller(), secret_key_to_address(&secret_key));
        assert_eq!(signed.chain_id(), None);

        Ok(())
    }
}
