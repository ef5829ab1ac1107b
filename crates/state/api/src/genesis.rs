use std::collections::BTreeMap;

use devnet_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Configuration of the accounts in a genesis state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisConfig {
    /// The accounts that exist at genesis
    pub accounts: Vec<GenesisAccountState>,
}

/// An account that exists at genesis.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisAccountState {
    /// The account's address
    pub address: Address,
    /// The account's balance
    pub balance: U256,
    /// The account's nonce
    #[serde(default)]
    pub nonce: u64,
    /// The account's code
    #[serde(default)]
    pub code: Bytes,
    /// The account's storage slots
    #[serde(default)]
    pub storage: BTreeMap<U256, U256>,
}

#[cfg(test)]
mod tests {
    use devnet_primitives::address;

    use super::*;

    #[test]
    fn deserialize_with_defaults() -> anyhow::Result<()> {
        let config: GenesisConfig = serde_json::from_str(
            r#"{
                "accounts": [
                    {
                        "address": "0x0000000000000000000000000000000000000001",
                        "balance": "0x3e8"
                    },
                    {
                        "address": "0x0000000000000000000000000000000000000002",
                        "balance": "0x0",
                        "nonce": 1,
                        "code": "0x6000",
                        "storage": { "0x1": "0x2" }
                    }
                ]
            }"#,
        )?;

        let [first, second] = config.accounts.as_slice() else {
            panic!("expected two accounts");
        };

        assert_eq!(first.address, address!("0000000000000000000000000000000000000001"));
        assert_eq!(first.balance, U256::from(1000));
        assert_eq!(first.nonce, 0);
        assert!(first.code.is_empty());

        assert_eq!(second.nonce, 1);
        assert_eq!(second.storage.get(&U256::from(1)), Some(&U256::from(2)));

        Ok(())
    }
}
