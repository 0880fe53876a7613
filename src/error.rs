//! Error handling for lnsim-rs
//!
//! This module defines the crate-level error type and a Result alias.
//! The IPC layer has its own [`IpcError`](crate::ipc::IpcError), which is
//! wrapped here when it crosses into the rest of the application.

use crate::ipc::IpcError;
use thiserror::Error;

/// Main error type for lnsim-rs operations
#[derive(Error, Debug)]
pub enum LnSimError {
    /// Errors raised by the IPC correlator or dispatcher
    #[error("IPC error: {0}")]
    Ipc(#[from] IpcError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// A node adapter failed to produce data for a node
    #[error("Node '{node}' error: {message}")]
    Node { node: String, message: String },

    /// No adapter is registered for a node implementation
    #[error("No node service registered for {0}")]
    MissingService(String),

    /// Lightning channel lifecycle errors (unknown or invalid channel)
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LnSimError>,
    },
}

impl LnSimError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LnSimError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a node error for the named node
    pub fn node(node: impl Into<String>, message: impl Into<String>) -> Self {
        LnSimError::Node {
            node: node.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for LnSimError {
    fn from(err: serde_json::Error) -> Self {
        LnSimError::Serialization(err.to_string())
    }
}

/// Result type alias for lnsim-rs operations
pub type Result<T> = std::result::Result<T, LnSimError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, IpcError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| LnSimError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| LnSimError::from(e).with_context(f()))
    }
}
