//! # lnsim-rs: Lightning Network Designer Core
//!
//! The non-visual core of a desktop tool for designing and running local
//! Lightning Network test networks. The UI process never talks to node
//! containers itself: it asks a privileged backend over named IPC channels
//! and folds the answers into the chart the canvas draws.
//!
//! ## Architecture
//!
//! - **IPC**: request/response correlation and subscriptions over a
//!   fire-and-forget named-channel transport ([`ipc`])
//! - **Chart**: initial layout and topology reconciliation ([`chart`])
//! - **Nodes**: per-implementation adapters behind one trait ([`nodes`])
//! - **Designer**: the refresh cycle that polls nodes and publishes charts
//!   over crossbeam channels ([`designer`])
//!
//! ## Configuration
//!
//! Settings are stored as TOML in the platform-appropriate data directory
//! under `dev.lnsim.lnsim-rs` (see [`config`]).
//!
//! ## Example
//!
//! ```ignore
//! use lnsim_rs::{
//!     chart::{init_chart_from_network, update_chart_from_nodes},
//!     config::AppConfig,
//! };
//!
//! let config = AppConfig::load_or_default();
//! let chart = init_chart_from_network(&network, &config.layout);
//! let chart = update_chart_from_nodes(&chart, &snapshots, &config.layout);
//! ```

pub mod chart;
pub mod config;
pub mod designer;
pub mod error;
pub mod ipc;
pub mod nodes;
pub mod sim;
pub mod types;

// Re-export commonly used types
pub use chart::{init_chart_from_network, update_chart_from_nodes, Chart};
pub use config::AppConfig;
pub use designer::{DesignerBridge, DesignerCommand, DesignerMessage, DesignerWorker};
pub use error::{LnSimError, Result};
pub use ipc::{IpcDispatcher, IpcError, IpcSender, MemoryTransport, Transport};
pub use nodes::{IpcNodeService, NodeService, NodeSnapshot, ServiceRegistry};
pub use sim::SimulatedBackend;
pub use types::{BitcoinNode, LightningNode, Network, NodeImplementation, NodeStatus};
