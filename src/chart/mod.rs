//! Topology reconciliation for the designer canvas.
//!
//! The chart is created once per network by [`init_chart_from_network`] and
//! from then on only replaced wholesale by [`update_chart_from_nodes`],
//! which folds the latest per-node snapshots into a new chart.
//!
//! # Architecture
//!
//! ```text
//! Network ──► init_chart_from_network ──► Chart
//!                                           │
//! SnapshotMap ──► update_chart_from_nodes ◄─┘ ──► Chart (next pass)
//! ```
//!
//! # Design
//!
//! - **Stable link ids** - channel links are keyed by the tail of the funding
//!   outpoint, so repeated passes update links in place.
//! - **Positions belong to the canvas** - reconciliation reads x positions to
//!   pick port sides and never writes them.
//! - **Backend links are structural** - identified by the `-backend` suffix
//!   and never pruned.

pub mod channels;
pub mod layout;
pub mod model;
pub mod reconcile;

pub use channels::{channel_snapshots, known_link_ids, link_id, ChannelSnapshot, LINK_ID_LEN};
pub use layout::{
    bitcoin_position, create_backend_link, create_bitcoin_chart_node,
    create_lightning_chart_node, init_chart_from_network, lightning_position,
};
pub use model::{
    Chart, ChartNode, Direction, Link, LinkEnd, LinkKind, LinkProperties, NodeKind,
    NodeProperties, Port, PortSide, Position, Selection, Size, BACKEND_LINK_SUFFIX, BACKEND_PORT,
    EMPTY_LEFT_PORT, EMPTY_RIGHT_PORT,
};
pub use reconcile::update_chart_from_nodes;
