use devnet_primitives::Address;
pub use devnet_signer::SecretKey;
use devnet_signer::secret_key_to_address;

/// Well-known development secret keys.
pub const TEST_SECRET_KEYS: [&str; 4] = [
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    "0x7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6",
];

/// Returns the development secret key with the provided index.
///
/// # Panics
///
/// Panics if the index is out of bounds.
pub fn test_secret_key(index: usize) -> SecretKey {
    devnet_signer::secret_key_from_str(TEST_SECRET_KEYS[index])
        .expect("development secret keys are valid")
}

/// Returns the address of the development secret key with the provided
/// index.
pub fn test_address(index: usize) -> Address {
    secret_key_to_address(&test_secret_key(index))
}
