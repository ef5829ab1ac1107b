use devnet_primitives::B256;
use devnet_rpc_client::RpcClientError;

/// Combinatorial error for the state API
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// `commit` or `revert` was called without an outstanding checkpoint
    #[error("{method} called when not checkpointed")]
    NotCheckpointed {
        /// The called method
        method: &'static str,
    },
    /// Specified state root was never registered
    #[error("Unknown state root `{0}`")]
    UnknownStateRoot(B256),
    /// The operation is not available for a forked state
    #[error("{action} is not supported when forking from remote network")]
    Unsupported {
        /// The unsupported operation
        action: &'static str,
    },
    /// Error from the underlying RPC client
    #[error(transparent)]
    Remote(#[from] RpcClientError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            StateError::NotCheckpointed { method: "revert" }.to_string(),
            "revert called when not checkpointed"
        );
        assert_eq!(
            StateError::Unsupported {
                action: "dump_storage"
            }
            .to_string(),
            "dump_storage is not supported when forking from remote network"
        );
    }
}
