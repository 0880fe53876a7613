//! Initial chart for a newly defined network.
//!
//! Positions come from each node's ordinal, so a fresh network always lays
//! out the same way without stored coordinates. Lightning nodes alternate
//! between two rows by parity to keep neighbours from overlapping.

use crate::chart::model::{
    Chart, ChartNode, Link, LinkEnd, LinkProperties, NodeKind, NodeProperties, Port, PortSide,
    Position, BACKEND_PORT, EMPTY_LEFT_PORT, EMPTY_RIGHT_PORT,
};
use crate::config::LayoutSettings;
use crate::types::{BitcoinNode, LightningNode, Network};
use std::collections::BTreeMap;

/// Canvas position of a lightning node
pub fn lightning_position(id: u32, layout: &LayoutSettings) -> Position {
    let y = if id % 2 == 0 {
        layout.lightning_even_row
    } else {
        layout.lightning_odd_row
    };
    Position::new(id as f64 * layout.node_spacing + layout.lightning_x_offset, y)
}

/// Canvas position of a bitcoin node
pub fn bitcoin_position(id: u32, layout: &LayoutSettings) -> Position {
    Position::new(
        id as f64 * layout.node_spacing + layout.bitcoin_x_offset,
        layout.bitcoin_row,
    )
}

pub fn create_lightning_chart_node(node: &LightningNode, layout: &LayoutSettings) -> ChartNode {
    let ports: BTreeMap<String, Port> = [
        Port::new(EMPTY_LEFT_PORT, PortSide::Left),
        Port::new(EMPTY_RIGHT_PORT, PortSide::Right),
        Port::new(BACKEND_PORT, PortSide::Output),
    ]
    .into_iter()
    .map(|p| (p.id.clone(), p))
    .collect();

    ChartNode {
        id: node.name.clone(),
        kind: NodeKind::Lightning,
        position: lightning_position(node.id, layout),
        ports,
        properties: NodeProperties {
            status: node.status,
            icon: node.implementation.icon().to_string(),
        },
        size: None,
    }
}

pub fn create_bitcoin_chart_node(node: &BitcoinNode, layout: &LayoutSettings) -> ChartNode {
    let mut ports = BTreeMap::new();
    ports.insert(
        BACKEND_PORT.to_string(),
        Port::new(BACKEND_PORT, PortSide::Input),
    );

    ChartNode {
        id: node.name.clone(),
        kind: NodeKind::Bitcoin,
        position: bitcoin_position(node.id, layout),
        ports,
        properties: NodeProperties {
            status: node.status,
            icon: node.implementation.icon().to_string(),
        },
        size: None,
    }
}

/// Permanent link from a lightning node to its chain backend
pub fn create_backend_link(node: &LightningNode) -> Link {
    Link::new(
        Link::backend_id(&node.name),
        LinkEnd::new(node.name.clone(), BACKEND_PORT),
        LinkEnd::new(node.backend_name.clone(), BACKEND_PORT),
        LinkProperties::backend(),
    )
}

/// Build the chart for a network definition.
pub fn init_chart_from_network(network: &Network, layout: &LayoutSettings) -> Chart {
    let mut chart = Chart::default();

    for node in &network.nodes.bitcoin {
        chart
            .nodes
            .insert(node.name.clone(), create_bitcoin_chart_node(node, layout));
    }

    for node in &network.nodes.lightning {
        chart
            .nodes
            .insert(node.name.clone(), create_lightning_chart_node(node, layout));
        let link = create_backend_link(node);
        chart.links.insert(link.id.clone(), link);
    }

    tracing::debug!(
        "Initialized chart for network '{}': {} nodes, {} links",
        network.name,
        chart.nodes.len(),
        chart.links.len()
    );
    chart
}
