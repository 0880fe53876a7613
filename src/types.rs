//! Core data types for lnsim-rs
//!
//! This module contains the static network definition that a chart is built
//! from: the base-layer (bitcoin) nodes and the channel-layer (lightning)
//! nodes running in local containers.
//!
//! # Main Types
//!
//! - [`Network`] - A named network with its node lists
//! - [`BitcoinNode`] - A base-layer node (chain backend)
//! - [`LightningNode`] - A channel-layer node backed by exactly one bitcoin node
//! - [`NodeStatus`] - Lifecycle status of a node container
//! - [`NodeImplementation`] - Which node software a lightning node runs
//!
//! Each node carries an ordinal `id` that is unique within its kind. The
//! initial chart layout is computed from it, so a freshly created network
//! always renders the same way.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a node container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Container is not running
    #[default]
    Stopped,
    /// Container is booting
    Starting,
    /// Container is running and the node is reachable
    Started,
    /// Container is shutting down
    Stopping,
    /// Container failed to start or crashed
    Error,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Stopped => "stopped",
            NodeStatus::Starting => "starting",
            NodeStatus::Started => "started",
            NodeStatus::Stopping => "stopping",
            NodeStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Node software implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeImplementation {
    /// bitcoind base-layer node
    Bitcoind,
    /// LND channel-layer node
    Lnd,
    /// Core Lightning channel-layer node
    #[serde(rename = "c-lightning")]
    CLightning,
    /// Eclair channel-layer node
    Eclair,
}

impl NodeImplementation {
    /// Display name of the implementation
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeImplementation::Bitcoind => "Bitcoin Core",
            NodeImplementation::Lnd => "LND",
            NodeImplementation::CLightning => "c-lightning",
            NodeImplementation::Eclair => "Eclair",
        }
    }

    /// Icon asset rendered on the chart node
    pub fn icon(&self) -> &'static str {
        match self {
            NodeImplementation::Bitcoind => "bitcoin.svg",
            NodeImplementation::Lnd => "lnd.png",
            NodeImplementation::CLightning => "clightning.png",
            NodeImplementation::Eclair => "eclair.png",
        }
    }
}

impl fmt::Display for NodeImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A base-layer node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitcoinNode {
    /// Ordinal index among the network's bitcoin nodes
    pub id: u32,
    /// Unique node name, also used as the chart node id
    pub name: String,
    pub status: NodeStatus,
    pub implementation: NodeImplementation,
    pub version: String,
}

impl BitcoinNode {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: NodeStatus::Stopped,
            implementation: NodeImplementation::Bitcoind,
            version: "27.0".to_string(),
        }
    }
}

/// A channel-layer node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightningNode {
    /// Ordinal index among the network's lightning nodes
    pub id: u32,
    /// Unique node name, also used as the chart node id
    pub name: String,
    pub status: NodeStatus,
    pub implementation: NodeImplementation,
    pub version: String,
    /// Name of the bitcoin node this node uses as its chain backend
    pub backend_name: String,
}

impl LightningNode {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        implementation: NodeImplementation,
        backend_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            status: NodeStatus::Stopped,
            implementation,
            version: "0.18.0".to_string(),
            backend_name: backend_name.into(),
        }
    }

    /// Set the status (builder style)
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }
}

/// Node lists of a network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkNodes {
    pub bitcoin: Vec<BitcoinNode>,
    pub lightning: Vec<LightningNode>,
}

/// A simulated network definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: u32,
    pub name: String,
    pub nodes: NetworkNodes,
}

impl Network {
    /// Create an empty network
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            nodes: NetworkNodes::default(),
        }
    }

    /// Find a lightning node by name
    pub fn lightning_node(&self, name: &str) -> Option<&LightningNode> {
        self.nodes.lightning.iter().find(|n| n.name == name)
    }

    /// Find a bitcoin node by name
    pub fn bitcoin_node(&self, name: &str) -> Option<&BitcoinNode> {
        self.nodes.bitcoin.iter().find(|n| n.name == name)
    }

    /// Lightning nodes whose containers are running
    pub fn started_lightning_nodes(&self) -> impl Iterator<Item = &LightningNode> {
        self.nodes
            .lightning
            .iter()
            .filter(|n| n.status == NodeStatus::Started)
    }
}
