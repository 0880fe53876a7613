//! IPC-specific error types.
//!
//! Every failed call surfaces as an [`IpcError`], whether the remote handler
//! reported an error or the transport itself failed. Callers cannot tell
//! those apart from the error type alone.

use std::time::Duration;
use thiserror::Error;

/// Errors returned by IPC calls and subscriptions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IpcError {
    /// The remote handler replied with an error message.
    #[error("{0}")]
    Remote(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No reply on {address} within {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The pending reply was dropped before a message arrived.
    #[error("Reply channel closed: {0}")]
    Closed(String),
}

impl From<serde_json::Error> for IpcError {
    fn from(err: serde_json::Error) -> Self {
        IpcError::Serialization(err.to_string())
    }
}

pub type IpcResult<T> = std::result::Result<T, IpcError>;
