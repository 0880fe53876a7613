//! Node adapters and the data they return.
//!
//! - [`NodeService`] - per-implementation adapter contract
//! - [`IpcNodeService`] - adapter that asks the backend over IPC
//! - [`ServiceRegistry`] - implementation -> adapter lookup
//! - [`model`] - [`NodeSnapshot`], [`NodeInfo`] and the raw channel shapes

pub mod ipc;
pub mod model;
pub mod registry;
pub mod service;

pub use ipc::{IpcNodeService, GET_INFO_CHANNEL, LIST_CHANNELS_CHANNEL};
pub use model::{
    ChannelLists, ClosingChannel, ForceClosingChannel, NodeInfo, NodeSnapshot, OpenChannel,
    PendingChannel, PendingOpenChannel, SnapshotMap, WaitingCloseChannel,
};
pub use registry::ServiceRegistry;
pub use service::NodeService;
