use devnet_primitives::{Address, B256, U64, U256};
use serde::{Serialize, Serializer, ser::SerializeSeq};

/// A block identifier for state queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockSpec {
    /// A block number
    Number(u64),
    /// The latest block
    Latest,
}

impl Serialize for BlockSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BlockSpec::Number(number) => U64::from(*number).serialize(serializer),
            BlockSpec::Latest => serializer.serialize_str("latest"),
        }
    }
}

/// The JSON-RPC methods used to access the remote chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum RequestMethod {
    /// `eth_blockNumber`
    #[serde(rename = "eth_blockNumber", serialize_with = "empty_params")]
    BlockNumber(()),
    /// `eth_chainId`
    #[serde(rename = "eth_chainId", serialize_with = "empty_params")]
    ChainId(()),
    /// `eth_getBalance`
    #[serde(rename = "eth_getBalance")]
    GetBalance(Address, BlockSpec),
    /// `eth_getBlockByHash`
    #[serde(rename = "eth_getBlockByHash")]
    GetBlockByHash(B256, bool),
    /// `eth_getBlockByNumber`
    #[serde(rename = "eth_getBlockByNumber")]
    GetBlockByNumber(BlockSpec, bool),
    /// `eth_getCode`
    #[serde(rename = "eth_getCode")]
    GetCode(Address, BlockSpec),
    /// `eth_getStorageAt`
    #[serde(rename = "eth_getStorageAt")]
    GetStorageAt(Address, U256, BlockSpec),
    /// `eth_getTransactionByHash`
    #[serde(rename = "eth_getTransactionByHash", serialize_with = "single_param")]
    GetTransactionByHash(B256),
    /// `eth_getTransactionCount`
    #[serde(rename = "eth_getTransactionCount")]
    GetTransactionCount(Address, BlockSpec),
}

impl RequestMethod {
    /// Whether the response to this request can never change, so it can be
    /// cached for the lifetime of the client.
    pub fn is_cacheable(&self) -> bool {
        match self {
            RequestMethod::BlockNumber(()) | RequestMethod::ChainId(()) => false,
            RequestMethod::GetBalance(_, block_spec)
            | RequestMethod::GetBlockByNumber(block_spec, _)
            | RequestMethod::GetCode(_, block_spec)
            | RequestMethod::GetStorageAt(_, _, block_spec)
            | RequestMethod::GetTransactionCount(_, block_spec) => {
                matches!(block_spec, BlockSpec::Number(_))
            }
            RequestMethod::GetBlockByHash(..) | RequestMethod::GetTransactionByHash(_) => true,
        }
    }
}

fn empty_params<S: Serializer>(_params: &(), serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_seq(Some(0))?.end()
}

fn single_param<S: Serializer, T: Serialize>(param: &T, serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(1))?;
    seq.serialize_element(param)?;
    seq.end()
}
