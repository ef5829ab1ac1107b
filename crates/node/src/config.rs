use std::{collections::BTreeMap, num::NonZeroU64, time::SystemTime};

use devnet_primitives::{Address, U256, address};
use rand::Rng as _;
use serde::{Deserialize, Serialize};

/// The default block gas limit.
// SAFETY: literal is non-zero
pub const DEFAULT_BLOCK_GAS_LIMIT: NonZeroU64 = unsafe { NonZeroU64::new_unchecked(30_000_000) };

/// The default chain ID.
pub const DEFAULT_CHAIN_ID: u64 = 31_337;

/// The default beneficiary of mined blocks.
pub const DEFAULT_COINBASE: Address = address!("c014ba5ec014ba5ec014ba5ec014ba5ec014ba5e");

/// Who controls a genesis account.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountOwner {
    /// An account whose secret key is known to the node, so it can sign
    /// transactions on the owner's behalf.
    SecretKey(String),
    /// An account that is only funded.
    Address(Address),
}

/// An account that is funded in the genesis state.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisAccount {
    /// The account's owner
    pub owner: AccountOwner,
    /// The account's initial balance
    pub balance: U256,
}

/// Configuration for interval mining.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum IntervalConfig {
    /// Mine a block every `interval` milliseconds.
    Fixed(NonZeroU64),
    /// Mine a block after a random number of milliseconds in the inclusive
    /// range.
    Range {
        /// The minimum interval
        min: u64,
        /// The maximum interval
        max: u64,
    },
}

impl IntervalConfig {
    /// Generates a (random) interval in milliseconds based on the
    /// configuration.
    pub fn generate_interval(&self) -> u64 {
        match self {
            IntervalConfig::Fixed(interval) => interval.get(),
            IntervalConfig::Range { min, max } => {
                if min >= max {
                    *min
                } else {
                    rand::rng().random_range(*min..=*max)
                }
            }
        }
    }
}

/// Configuration for forking a remote chain.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkConfig {
    /// URL of the remote JSON-RPC endpoint
    pub json_rpc_url: String,
    /// The block to fork from. Defaults to the remote's latest block.
    pub block_number: Option<u64>,
    /// Extra HTTP headers sent with every request
    #[serde(default)]
    pub http_headers: BTreeMap<String, String>,
}

/// Configuration of a node.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// The chain ID of local chains. Forked chains use the remote chain ID.
    pub chain_id: u64,
    /// The network ID
    pub network_id: u64,
    /// The gas limit of mined blocks
    pub block_gas_limit: NonZeroU64,
    /// The beneficiary of mined blocks
    pub coinbase: Address,
    /// Accounts that are funded in the genesis state
    #[serde(default)]
    pub genesis_accounts: Vec<GenesisAccount>,
    /// The name of the hardfork. Only informational, as gas metering is owned
    /// by the executor.
    pub hardfork: Option<String>,
    /// The timestamp of the genesis block. Defaults to the current time.
    pub initial_date: Option<SystemTime>,
    /// Whether to mine a block for every submitted transaction
    pub automine: bool,
    /// Configuration for interval mining, if enabled
    pub interval_mining: Option<IntervalConfig>,
    /// Configuration for forking a remote chain, if enabled
    pub fork: Option<ForkConfig>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            network_id: DEFAULT_CHAIN_ID,
            block_gas_limit: DEFAULT_BLOCK_GAS_LIMIT,
            coinbase: DEFAULT_COINBASE,
            genesis_accounts: Vec::new(),
            hardfork: None,
            initial_date: None,
            automine: true,
            interval_mining: None,
            fork: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_block_gas_limit() {
        assert_eq!(NodeConfig::default().block_gas_limit.get(), 30_000_000);
    }

    #[test]
    fn range_interval_is_bounded() {
        let config = IntervalConfig::Range { min: 10, max: 20 };

        for _ in 0..100 {
            let interval = config.generate_interval();
            assert!((10..=20).contains(&interval));
        }
    }

    #[test]
    fn deserialize_node_config() -> anyhow::Result<()> {
        let json = r#"{
            "chainId": 1337,
            "networkId": 1337,
            "blockGasLimit": 12000000,
            "coinbase": "0x0000000000000000000000000000000000000001",
            "genesisAccounts": [
                {
                    "owner": { "address": "0x0000000000000000000000000000000000000002" },
                    "balance": "0x3e8"
                }
            ],
            "automine": false,
            "intervalMining": { "range": { "min": 1000, "max": 2000 } },
            "fork": {
                "jsonRpcUrl": "http://localhost:8545",
                "blockNumber": 100
            }
        }"#;

        let config: NodeConfig = serde_json::from_str(json)?;

        assert_eq!(config.chain_id, 1337);
        assert_eq!(config.block_gas_limit.get(), 12_000_000);
        assert!(!config.automine);
        assert_eq!(
            config.genesis_accounts,
            vec![GenesisAccount {
                owner: AccountOwner::Address(Address::with_last_byte(2)),
                balance: U256::from(1000u64),
            }]
        );
        assert_eq!(
            config.interval_mining,
            Some(IntervalConfig::Range {
                min: 1000,
                max: 2000
            })
        );
        assert_eq!(
            config.fork.map(|fork| fork.block_number),
            Some(Some(100))
        );

        Ok(())
    }
}
