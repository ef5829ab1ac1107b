use serde::{Deserialize, Serialize};

/// The JSON-RPC protocol version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Version {
    /// Version 2.0
    #[serde(rename = "2.0")]
    V2_0,
}

/// A JSON-RPC request or response identifier.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Id {
    /// Numeric identifier
    Num(u64),
    /// String identifier
    Str(String),
}

/// A JSON-RPC request. The method and its parameters are flattened into the
/// request object.
#[derive(Debug, Serialize)]
pub struct Request<'method, MethodT: Serialize> {
    /// The protocol version
    #[serde(rename = "jsonrpc")]
    pub version: Version,
    /// The request identifier
    pub id: Id,
    /// The method invocation
    #[serde(flatten)]
    pub method: &'method MethodT,
}

/// A JSON-RPC response.
#[derive(Debug, Deserialize)]
pub struct Response<SuccessT> {
    /// The protocol version
    #[serde(rename = "jsonrpc")]
    pub version: Version,
    /// The identifier of the corresponding request
    pub id: Id,
    /// The result or error of the request
    #[serde(flatten)]
    pub data: ResponseData<SuccessT>,
}

/// The payload of a JSON-RPC response.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ResponseData<SuccessT> {
    /// The request failed
    Error {
        /// The error
        error: Error,
    },
    /// The request succeeded
    Success {
        /// The result
        result: SuccessT,
    },
}

impl<SuccessT> ResponseData<SuccessT> {
    /// Converts the payload into a [`Result`].
    pub fn into_result(self) -> Result<SuccessT, Error> {
        match self {
            ResponseData::Success { result } => Ok(result),
            ResponseData::Error { error } => Err(error),
        }
    }
}

/// A JSON-RPC error object.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, thiserror::Error)]
#[error("The JSON-RPC server returned error code {code}: {message}")]
pub struct Error {
    /// The error code
    pub code: i64,
    /// The error message
    pub message: String,
    /// Additional error data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Error {
    /// Whether the error is a sporadic "missing trie node" failure, which
    /// some providers return for archive data that is briefly unavailable.
    pub fn is_missing_trie_node(&self) -> bool {
        self.code == -32000 && self.message.to_lowercase().contains("missing trie node")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_success() -> anyhow::Result<()> {
        let response: Response<Option<u64>> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":5}"#)?;

        assert_eq!(response.id, Id::Num(1));
        assert_eq!(response.data.into_result()?, Some(5));

        Ok(())
    }

    #[test]
    fn parse_null_result() -> anyhow::Result<()> {
        let response: Response<Option<u64>> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"a","result":null}"#)?;

        assert_eq!(response.id, Id::Str("a".to_string()));
        assert_eq!(response.data.into_result()?, None);

        Ok(())
    }

    #[test]
    fn parse_error() -> anyhow::Result<()> {
        let response: Response<Option<u64>> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32000,"message":"Missing trie node abc"}}"#,
        )?;

        let error = response
            .data
            .into_result()
            .expect_err("response contains an error");
        assert_eq!(error.code, -32000);
        assert!(error.is_missing_trie_node());

        Ok(())
    }
}
