use shekel_core::{Address, ShekelError};
use thiserror::Error;

/// Failures at the RPC boundary, before they are attributed to an
/// operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rejected { code: i64, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed rpc response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Core(#[from] ShekelError),

    #[error("{operation} rejected by the ledger: {reason}")]
    SubmissionRejected {
        operation: &'static str,
        reason: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("account {address} not found")]
    AccountNotFound { address: Address },

    #[error("at least one signer is required")]
    NoSigners,

    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Rpc(RpcError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl From<RpcError> for ClientError {
    /// Connectivity failures become [`ClientError::Transport`] whichever call
    /// hit them; node error objects and unreadable responses stay as RPC
    /// errors.
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Network(detail) => ClientError::Transport(detail),
            other => ClientError::Rpc(other),
        }
    }
}

impl ClientError {
    /// Attribute an RPC failure to the operation being submitted.
    pub(crate) fn from_submission(operation: &'static str, err: RpcError) -> Self {
        match err {
            RpcError::Rejected { code, message } => ClientError::SubmissionRejected {
                operation,
                reason: format!("{message} (code {code})"),
            },
            other => other.into(),
        }
    }
}
