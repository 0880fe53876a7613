//! IPC request/response correlation.
//!
//! The UI process talks to the privileged backend through a transport that
//! only offers named, fire-and-forget channels shared by every call site.
//! This module layers call semantics on top of it.
//!
//! # Components
//!
//! - [`Transport`] / [`MemoryTransport`] - the named-channel primitive
//! - [`IpcSender`] - UI side: correlated `send`, `subscribe`, `unsubscribe`
//! - [`IpcDispatcher`] - backend side: serves request channels and replies
//! - [`IpcError`] - the single error type every failed call resolves to

pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod transport;

pub use correlator::{
    correlation_id, reply_error, request_channel, response_channel, stream_channel, IpcSender,
    Subscription, ERROR_FIELD, REPLY_TO_FIELD,
};
pub use dispatcher::{IpcDispatcher, StreamSink};
pub use error::{IpcError, IpcResult};
pub use transport::{Listener, ListenerId, MemoryTransport, Transport};
