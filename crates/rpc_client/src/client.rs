use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use devnet_primitives::{Address, B256, Bytes, HashMap, U64, U256};
use parking_lot::Mutex;
use reqwest::{
    Client as HttpClient,
    header::{self, HeaderMap, HeaderValue},
};
use reqwest_middleware::{ClientBuilder as HttpClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::{BlockSpec, RequestMethod, RpcBlock, RpcTransaction, jsonrpc};

// Retry parameters for rate limited requests.
const EXPONENT_BASE: u32 = 2;
const MIN_RETRY_INTERVAL: Duration = Duration::from_secs(1);
const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(32);
const MAX_RETRIES: u32 = 9;

/// Specialized error types
#[derive(Debug, thiserror::Error)]
pub enum RpcClientError {
    /// The HTTP client could not be constructed
    #[error("Failed to construct HTTP client: {0}")]
    HttpClient(reqwest::Error),

    /// The message could not be sent to the remote node
    #[error(transparent)]
    FailedToSend(reqwest_middleware::Error),

    /// The remote node failed to reply with the body of the response
    #[error("The response text was corrupted: {0}.")]
    CorruptedResponse(reqwest::Error),

    /// The server returned an error code.
    #[error("The Http server returned error status code: {0}")]
    HttpStatus(reqwest::Error),

    /// The request cannot be serialized as JSON.
    #[error(transparent)]
    InvalidJsonRequest(serde_json::Error),

    /// The server returned an invalid JSON-RPC response.
    #[error(
        "Response '{response}' failed to parse with expected type '{expected_type}', due to error: '{error}'"
    )]
    InvalidResponse {
        /// The response text
        response: String,
        /// The expected type of the response
        expected_type: &'static str,
        /// The parse error
        error: serde_json::Error,
    },

    /// Invalid URL format
    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),

    /// The JSON-RPC returned an error.
    #[error("{error}. Request: {request}")]
    JsonRpcError {
        /// The JSON-RPC error
        error: jsonrpc::Error,
        /// The request JSON
        request: String,
    },
}

/// A client for executing RPC methods on a remote Ethereum node.
///
/// Responses to requests that are pinned to a block number or hash are kept
/// in an in-memory cache for the lifetime of the client.
#[derive(Debug)]
pub struct RpcClient {
    url: url::Url,
    chain_id: OnceCell<u64>,
    client: ClientWithMiddleware,
    next_id: AtomicU64,
    cache: Mutex<HashMap<String, serde_json::Value>>,
}

impl RpcClient {
    /// Creates a new instance, given a remote node URL and optional extra
    /// HTTP headers.
    pub fn new(url: &str, extra_headers: Option<HeaderMap>) -> Result<Self, RpcClientError> {
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(MIN_RETRY_INTERVAL, MAX_RETRY_INTERVAL)
            .base(EXPONENT_BASE)
            .build_with_max_retries(MAX_RETRIES);

        let mut headers = extra_headers.unwrap_or_default();
        headers.append(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.append(
            header::USER_AGENT,
            HeaderValue::from_static(concat!("devnet/", env!("CARGO_PKG_VERSION"))),
        );

        let client = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(RpcClientError::HttpClient)?;

        let client = HttpClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(RpcClient {
            url: url.parse()?,
            chain_id: OnceCell::new(),
            client,
            next_id: AtomicU64::new(0),
            cache: Mutex::new(HashMap::default()),
        })
    }

    /// Calls the provided JSON-RPC method and returns the result.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    pub async fn call<SuccessT: DeserializeOwned>(
        &self,
        method: RequestMethod,
    ) -> Result<SuccessT, RpcClientError> {
        let cache_key = if method.is_cacheable() {
            Some(serde_json::to_string(&method).map_err(RpcClientError::InvalidJsonRequest)?)
        } else {
            None
        };

        if let Some(cache_key) = &cache_key {
            let cached = self.cache.lock().get(cache_key).cloned();
            if let Some(value) = cached {
                match serde_json::from_value(value) {
                    Ok(result) => return Ok(result),
                    Err(error) => log::error!(
                        "Failed to deserialize item from RPC response cache. error: '{error}' key: '{cache_key}'"
                    ),
                }
            }
        }

        let request = self.serialize_request(&method)?;
        let value: serde_json::Value = self.send_request_and_extract_result(&request).await?;

        // Pending or unknown data may become available later
        if let Some(cache_key) = cache_key {
            if !value.is_null() {
                self.cache.lock().insert(cache_key, value.clone());
            }
        }

        serde_json::from_value(value.clone()).map_err(|error| RpcClientError::InvalidResponse {
            response: value.to_string(),
            expected_type: std::any::type_name::<SuccessT>(),
            error,
        })
    }

    /// Calls `eth_blockNumber` and returns the block number.
    pub async fn block_number(&self) -> Result<u64, RpcClientError> {
        self.call::<U64>(RequestMethod::BlockNumber(()))
            .await
            .map(|block_number| block_number.to::<u64>())
    }

    /// Calls `eth_chainId` and returns the chain ID. The result is memoized.
    pub async fn chain_id(&self) -> Result<u64, RpcClientError> {
        let chain_id = *self
            .chain_id
            .get_or_try_init(|| async {
                self.call::<U64>(RequestMethod::ChainId(()))
                    .await
                    .map(|chain_id| chain_id.to::<u64>())
            })
            .await?;

        Ok(chain_id)
    }

    /// Calls `eth_getBalance`.
    pub async fn get_balance(
        &self,
        address: Address,
        block: BlockSpec,
    ) -> Result<U256, RpcClientError> {
        self.call(RequestMethod::GetBalance(address, block)).await
    }

    /// Calls `eth_getTransactionCount`.
    pub async fn get_transaction_count(
        &self,
        address: Address,
        block: BlockSpec,
    ) -> Result<u64, RpcClientError> {
        self.call::<U64>(RequestMethod::GetTransactionCount(address, block))
            .await
            .map(|nonce| nonce.to::<u64>())
    }

    /// Calls `eth_getCode`.
    pub async fn get_code(
        &self,
        address: Address,
        block: BlockSpec,
    ) -> Result<Bytes, RpcClientError> {
        self.call(RequestMethod::GetCode(address, block)).await
    }

    /// Calls `eth_getStorageAt`.
    pub async fn get_storage_at(
        &self,
        address: Address,
        index: U256,
        block: BlockSpec,
    ) -> Result<U256, RpcClientError> {
        self.call(RequestMethod::GetStorageAt(address, index, block))
            .await
    }

    /// Calls `eth_getBlockByNumber` with full transactions.
    pub async fn get_block_by_number(
        &self,
        number: u64,
    ) -> Result<Option<RpcBlock<RpcTransaction>>, RpcClientError> {
        self.call(RequestMethod::GetBlockByNumber(
            BlockSpec::Number(number),
            true,
        ))
        .await
    }

    /// Calls `eth_getBlockByHash` with full transactions.
    pub async fn get_block_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<RpcBlock<RpcTransaction>>, RpcClientError> {
        self.call(RequestMethod::GetBlockByHash(hash, true)).await
    }

    /// Calls `eth_getTransactionByHash`.
    pub async fn get_transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<RpcTransaction>, RpcClientError> {
        self.call(RequestMethod::GetTransactionByHash(hash)).await
    }

    fn serialize_request(&self, method: &RequestMethod) -> Result<String, RpcClientError> {
        let id = jsonrpc::Id::Num(self.next_id.fetch_add(1, Ordering::Relaxed));

        serde_json::to_string(&jsonrpc::Request {
            version: jsonrpc::Version::V2_0,
            id,
            method,
        })
        .map_err(RpcClientError::InvalidJsonRequest)
    }

    fn parse_response_str<SuccessT: DeserializeOwned>(
        response: String,
    ) -> Result<jsonrpc::Response<SuccessT>, RpcClientError> {
        serde_json::from_str(&response).map_err(|error| RpcClientError::InvalidResponse {
            response,
            expected_type: std::any::type_name::<jsonrpc::Response<SuccessT>>(),
            error,
        })
    }

    async fn send_request_and_extract_result<SuccessT: DeserializeOwned>(
        &self,
        request: &str,
    ) -> Result<SuccessT, RpcClientError> {
        let result = self
            .send_request_body(request)
            .await
            .and_then(Self::parse_response_str)?
            .data
            .into_result();

        match result {
            Ok(result) => Ok(result),
            // Some providers have sporadic failures that are returned in the
            // JSON-RPC layer, so retry once at the application level.
            Err(error) if error.is_missing_trie_node() => {
                log::debug!("Retrying request after sporadic failure: {error}");

                self.send_request_body(request)
                    .await
                    .and_then(Self::parse_response_str)?
                    .data
                    .into_result()
                    .map_err(|error| RpcClientError::JsonRpcError {
                        error,
                        request: request.to_string(),
                    })
            }
            Err(error) => Err(RpcClientError::JsonRpcError {
                error,
                request: request.to_string(),
            }),
        }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
    async fn send_request_body(&self, request_body: &str) -> Result<String, RpcClientError> {
        self.client
            .post(self.url.clone())
            .body(request_body.to_string())
            .send()
            .await
            .map_err(RpcClientError::FailedToSend)?
            .error_for_status()
            .map_err(RpcClientError::HttpStatus)?
            .text()
            .await
            .map_err(RpcClientError::CorruptedResponse)
    }
}

#[cfg(test)]
mod tests {
    use devnet_primitives::address;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn pinned_requests_are_cached() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":0,"result":"0x64"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = RpcClient::new(&server.url(), None)?;

        let address = address!("0000000000000000000000000000000000000001");
        let first = client
            .get_balance(address, BlockSpec::Number(10))
            .await?;
        let second = client
            .get_balance(address, BlockSpec::Number(10))
            .await?;

        assert_eq!(first, U256::from(100));
        assert_eq!(second, U256::from(100));

        mock.assert_async().await;

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn retries_missing_trie_node_once() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let failure = server
            .mock("POST", "/")
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"jsonrpc":"2.0","id":0,"error":{"code":-32000,"message":"missing trie node 1234"}}"#,
            )
            .expect(1)
            .create_async()
            .await;
        let success = server
            .mock("POST", "/")
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":0,"result":"0x5"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = RpcClient::new(&server.url(), None)?;

        let nonce = client
            .get_transaction_count(
                address!("0000000000000000000000000000000000000002"),
                BlockSpec::Number(1),
            )
            .await?;

        assert_eq!(nonce, 5);

        failure.assert_async().await;
        success.assert_async().await;

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn json_rpc_errors_are_not_cached() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let failure = server
            .mock("POST", "/")
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"jsonrpc":"2.0","id":0,"error":{"code":-32602,"message":"invalid argument"}}"#,
            )
            .expect(1)
            .create_async()
            .await;
        let success = server
            .mock("POST", "/")
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x60"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = RpcClient::new(&server.url(), None)?;

        let address = address!("0000000000000000000000000000000000000003");
        let error = client
            .get_code(address, BlockSpec::Number(1))
            .await
            .expect_err("first request fails");
        assert!(matches!(error, RpcClientError::JsonRpcError { .. }));

        let code = client.get_code(address, BlockSpec::Number(1)).await?;
        assert_eq!(code, Bytes::from_static(&[0x60]));

        failure.assert_async().await;
        success.assert_async().await;

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn http_error_status() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(400)
            .with_header("content-type", "text/plain")
            .create_async()
            .await;

        let client = RpcClient::new(&server.url(), None)?;
        let error = client
            .block_number()
            .await
            .expect_err("request fails with a client error status");

        assert!(matches!(error, RpcClientError::HttpStatus(_)));

        mock.assert_async().await;

        Ok(())
    }

    #[cfg(feature = "test-remote")]
    #[tokio::test(flavor = "multi_thread")]
    async fn remote_chain_id() -> anyhow::Result<()> {
        let url = std::env::var("DEVNET_TEST_RPC_URL")?;
        let client = RpcClient::new(&url, None)?;

        assert_eq!(client.chain_id().await?, 1);

        Ok(())
    }
}
