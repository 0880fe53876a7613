//! Renderable chart state.
//!
//! A [`Chart`] is the node-and-link structure the designer canvas draws.
//! Node positions belong to the canvas; the reconciler only touches ports,
//! links and advisory sizes. The transient fields (`offset`, `selected`,
//! `hovered`) are carried through reconciliation untouched.
//!
//! Field names serialize in camelCase so the chart can be handed to a web
//! canvas as-is.

use crate::types::NodeStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Suffix that marks a link id as a permanent backend link.
pub const BACKEND_LINK_SUFFIX: &str = "-backend";

/// Id of the structural port linking a node to its chain backend.
pub const BACKEND_PORT: &str = "backend";

/// Placeholder port on the left of a lightning node.
pub const EMPTY_LEFT_PORT: &str = "empty-left";

/// Placeholder port on the right of a lightning node.
pub const EMPTY_RIGHT_PORT: &str = "empty-right";

/// 2D canvas coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rendered node size
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Canvas selection or hover target
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Selection {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Which layer a chart node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Base-layer (chain backend) node
    Bitcoin,
    /// Channel-layer node
    Lightning,
}

/// Side of a node a port is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    Left,
    Right,
    Input,
    Output,
}

/// A connection point on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(rename = "type")]
    pub side: PortSide,
}

impl Port {
    pub fn new(id: impl Into<String>, side: PortSide) -> Self {
        Self {
            id: id.into(),
            side,
        }
    }
}

/// Display-only node properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProperties {
    pub status: NodeStatus,
    pub icon: String,
}

/// A node on the chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartNode {
    /// Equal to the network node's name
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub position: Position,
    pub ports: BTreeMap<String, Port>,
    pub properties: NodeProperties,
    /// Rendered size. Sizing is opt-in: `None` is never filled in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
}

impl ChartNode {
    /// Number of ports drawn on the given side
    pub fn port_count(&self, side: PortSide) -> usize {
        self.ports.values().filter(|p| p.side == side).count()
    }

    pub fn add_port(&mut self, port: Port) {
        self.ports.insert(port.id.clone(), port);
    }
}

/// One end of a link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEnd {
    pub node_id: String,
    pub port_id: String,
}

impl LinkEnd {
    pub fn new(node_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            port_id: port_id.into(),
        }
    }
}

/// What a link represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    /// Lightning node to its bitcoin backend
    Backend,
    /// Channel that is opening or closing
    PendingChannel,
    /// Active channel
    OpenChannel,
}

/// Rendered arrow direction of a channel link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Source node is left of its peer
    Ltr,
    /// Source node is right of its peer
    Rtl,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ltr => f.write_str("ltr"),
            Direction::Rtl => f.write_str("rtl"),
        }
    }
}

/// Link properties. Amounts are opaque decimal strings passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkProperties {
    #[serde(rename = "type")]
    pub kind: LinkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl LinkProperties {
    pub fn backend() -> Self {
        Self {
            kind: LinkKind::Backend,
            capacity: None,
            from_balance: None,
            to_balance: None,
            direction: None,
        }
    }
}

/// A link between two node ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub from: LinkEnd,
    pub to: LinkEnd,
    pub properties: LinkProperties,
    /// Fields the canvas attached to the link; kept across reconciliation.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Link {
    pub fn new(id: impl Into<String>, from: LinkEnd, to: LinkEnd, properties: LinkProperties) -> Self {
        Self {
            id: id.into(),
            from,
            to,
            properties,
            extra: Map::new(),
        }
    }

    /// Whether `id` names a backend link
    pub fn is_backend_id(id: &str) -> bool {
        id.ends_with(BACKEND_LINK_SUFFIX)
    }

    pub fn is_backend(&self) -> bool {
        Self::is_backend_id(&self.id)
    }

    /// Backend link id for a lightning node
    pub fn backend_id(lightning_name: &str) -> String {
        format!("{}{}", lightning_name, BACKEND_LINK_SUFFIX)
    }
}

/// The renderable node-and-link graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Chart {
    pub offset: Position,
    pub nodes: BTreeMap<String, ChartNode>,
    pub links: BTreeMap<String, Link>,
    #[serde(default)]
    pub selected: Selection,
    #[serde(default)]
    pub hovered: Selection,
}

impl Chart {
    pub fn node(&self, id: &str) -> Option<&ChartNode> {
        self.nodes.get(id)
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.get(id)
    }

    /// Links that represent channels (everything but backend links)
    pub fn channel_links(&self) -> impl Iterator<Item = &Link> {
        self.links.values().filter(|l| !l.is_backend())
    }

    /// Copy of this chart with one node moved.
    ///
    /// Returns `None` if the node does not exist.
    pub fn with_node_position(&self, id: &str, position: Position) -> Option<Chart> {
        let mut chart = self.clone();
        chart.nodes.get_mut(id)?.position = position;
        Some(chart)
    }

    /// Copy of this chart with one node's size set.
    pub fn with_node_size(&self, id: &str, size: Option<Size>) -> Option<Chart> {
        let mut chart = self.clone();
        chart.nodes.get_mut(id)?.size = size;
        Some(chart)
    }
}
