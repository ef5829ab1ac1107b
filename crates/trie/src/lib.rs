#![warn(missing_docs)]
//! Merkle-Patricia trie root computation

use devnet_primitives::{B256, U256};
use hash256_std_hasher::Hash256StdHasher;
use sha3::{
    Digest, Keccak256,
    digest::generic_array::{GenericArray, typenum::consts::U32},
};

/// Generates a key-hashed (secure) trie root hash for a sequence of key-value
/// tuples.
pub fn sec_trie_root<I, K, V>(input: I) -> B256
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    B256::from_slice(triehash::sec_trie_root::<KeccakHasher, _, _, _>(input).as_ref())
}

/// Generates a trie root hash for a sequence of values, keyed by the RLP
/// encoding of their index.
pub fn ordered_trie_root<I, V>(input: I) -> B256
where
    I: IntoIterator<Item = V>,
    V: AsRef<[u8]>,
{
    B256::from_slice(triehash::ordered_trie_root::<KeccakHasher, I>(input).as_ref())
}

/// Computes the storage root of an account. Zero-valued slots are not part
/// of the trie.
pub fn storage_root<'a, I>(storage: I) -> B256
where
    I: IntoIterator<Item = (&'a U256, &'a U256)>,
{
    sec_trie_root(
        storage
            .into_iter()
            .filter(|(_index, value)| **value != U256::ZERO)
            .map(|(index, value)| {
                (
                    index.to_be_bytes::<32>(),
                    alloy_rlp::encode(value),
                )
            }),
    )
}

struct KeccakHasher;

impl hash_db::Hasher for KeccakHasher {
    type Out = GenericArray<u8, U32>;

    type StdHasher = Hash256StdHasher;

    const LENGTH: usize = 32;

    fn hash(x: &[u8]) -> Self::Out {
        Keccak256::digest(x)
    }
}

#[cfg(test)]
mod tests {
    use devnet_primitives::{KECCAK_NULL_RLP, keccak256};

    use super::*;

    #[test]
    fn empty_roots() {
        assert_eq!(sec_trie_root(Vec::<(Vec<u8>, Vec<u8>)>::new()), KECCAK_NULL_RLP);
        assert_eq!(ordered_trie_root(Vec::<Vec<u8>>::new()), KECCAK_NULL_RLP);
        assert_eq!(storage_root(std::iter::empty()), KECCAK_NULL_RLP);
    }

    #[test]
    fn storage_root_ignores_zero_slots() {
        let one = U256::from(1);
        let two = U256::from(2);

        let with_zero = [(one, two), (two, U256::ZERO)];
        let without_zero = [(one, two)];

        assert_eq!(
            storage_root(with_zero.iter().map(|(index, value)| (index, value))),
            storage_root(without_zero.iter().map(|(index, value)| (index, value)))
        );
        assert_ne!(
            storage_root(without_zero.iter().map(|(index, value)| (index, value))),
            KECCAK_NULL_RLP
        );
    }

    #[test]
    fn single_entry_secure_root() {
        // A single leaf is stored inline: [hp(keccak(key)), value]
        let key = [0x01u8];
        let value = [0x02u8];

        let mut leaf_key = vec![0x20];
        leaf_key.extend_from_slice(keccak256(key).as_slice());

        let mut encoded = Vec::new();
        alloy_rlp::Header {
            list: true,
            payload_length: alloy_rlp::Encodable::length(leaf_key.as_slice()) + 1,
        }
        .encode(&mut encoded);
        alloy_rlp::Encodable::encode(leaf_key.as_slice(), &mut encoded);
        encoded.push(0x02);

        assert_eq!(sec_trie_root([(key, value)]), keccak256(encoded));
    }
}
