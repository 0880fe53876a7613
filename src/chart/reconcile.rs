//! Folding live node snapshots into the chart.
//!
//! [`update_chart_from_nodes`] is pure: it borrows the previous chart and
//! returns a new one, so callers always get a fresh value and the two never
//! share `nodes` or `links`. Passes must still be applied in order, since
//! each output is the next pass's input.
//!
//! # Pass
//!
//! 1. Index identity pubkeys to node names.
//! 2. Normalize every reporting node's channels (open channels only from
//!    the initiator).
//! 3. Upsert a port on each endpoint and the link itself. Port sides and the
//!    link direction come from the endpoints' current x positions.
//! 4. Prune channel links that were not seen, when an endpoint reported a
//!    channel list that no longer holds the channel in any shape. Ports are
//!    only dropped from nodes that reported. Backend links are never pruned.
//! 5. Resize nodes that opted into sizing.

use crate::chart::channels::{channel_snapshots, known_link_ids, ChannelSnapshot};
use crate::chart::model::{
    Chart, ChartNode, Direction, Link, LinkEnd, LinkKind, LinkProperties, Port, PortSide,
    BACKEND_PORT, EMPTY_LEFT_PORT, EMPTY_RIGHT_PORT,
};
use crate::config::LayoutSettings;
use crate::nodes::model::SnapshotMap;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Reconcile `chart` against the latest node snapshots.
pub fn update_chart_from_nodes(
    chart: &Chart,
    snapshots: &SnapshotMap,
    layout: &LayoutSettings,
) -> Chart {
    let mut nodes = chart.nodes.clone();
    let mut links = chart.links.clone();

    let pubkeys: HashMap<&str, &str> = snapshots
        .iter()
        .filter_map(|(name, snapshot)| snapshot.pubkey().map(|key| (key, name.as_str())))
        .collect();

    let mut seen: BTreeSet<String> = BTreeSet::new();
    for (from_name, snapshot) in snapshots {
        let Some(channels) = &snapshot.channels else {
            continue;
        };
        if !nodes.contains_key(from_name) {
            continue;
        }

        for channel in channel_snapshots(channels) {
            // Pending channels show up from both ends; first reporter wins.
            if seen.contains(&channel.unique_id) {
                continue;
            }
            let Some(&to_name) = pubkeys.get(channel.remote_pubkey.as_str()) else {
                continue;
            };
            if to_name == from_name || !nodes.contains_key(to_name) {
                continue;
            }

            upsert_link_and_ports(&mut nodes, &mut links, from_name, to_name, &channel);
            seen.insert(channel.unique_id);
        }
    }

    // Every link id each reporting node still lists, initiator or not
    let known: HashMap<&str, HashSet<String>> = snapshots
        .iter()
        .filter_map(|(name, s)| s.channels.as_ref().map(|c| (name.as_str(), known_link_ids(c))))
        .collect();
    prune_links(&mut nodes, &mut links, &seen, &known);

    for name in snapshots.keys() {
        if let Some(node) = nodes.get_mut(name) {
            resize_node(node, layout);
        }
    }

    Chart {
        offset: chart.offset,
        nodes,
        links,
        selected: chart.selected.clone(),
        hovered: chart.hovered.clone(),
    }
}

fn upsert_link_and_ports(
    nodes: &mut BTreeMap<String, ChartNode>,
    links: &mut BTreeMap<String, Link>,
    from_name: &str,
    to_name: &str,
    channel: &ChannelSnapshot,
) {
    let (Some(from_x), Some(to_x)) = (
        nodes.get(from_name).map(|n| n.position.x),
        nodes.get(to_name).map(|n| n.position.x),
    ) else {
        return;
    };
    let from_on_right = from_x > to_x;
    let (from_side, to_side, direction) = if from_on_right {
        (PortSide::Left, PortSide::Right, Direction::Rtl)
    } else {
        (PortSide::Right, PortSide::Left, Direction::Ltr)
    };

    let id = &channel.unique_id;
    if let Some(node) = nodes.get_mut(from_name) {
        node.add_port(Port::new(id.clone(), from_side));
    }
    if let Some(node) = nodes.get_mut(to_name) {
        node.add_port(Port::new(id.clone(), to_side));
    }

    let from = LinkEnd::new(from_name, id.clone());
    let to = LinkEnd::new(to_name, id.clone());
    let properties = LinkProperties {
        kind: if channel.pending {
            LinkKind::PendingChannel
        } else {
            LinkKind::OpenChannel
        },
        capacity: Some(channel.capacity.clone()),
        from_balance: Some(channel.local_balance.clone()),
        to_balance: Some(channel.remote_balance.clone()),
        direction: Some(direction),
    };

    match links.get_mut(id) {
        Some(link) => {
            link.from = from;
            link.to = to;
            link.properties = properties;
        }
        None => {
            links.insert(id.clone(), Link::new(id.clone(), from, to, properties));
        }
    }
}

fn prune_links(
    nodes: &mut BTreeMap<String, ChartNode>,
    links: &mut BTreeMap<String, Link>,
    seen: &BTreeSet<String>,
    known: &HashMap<&str, HashSet<String>>,
) {
    let stale: Vec<String> = links
        .values()
        .filter(|link| !link.is_backend() && !seen.contains(&link.id))
        .filter(|link| {
            let mut reporters = [&link.from, &link.to]
                .into_iter()
                .filter_map(|end| known.get(end.node_id.as_str()))
                .peekable();
            // Drop only on a report that lost the channel. A peer still
            // listing its copy means the funder is just silent.
            reporters.peek().is_some() && reporters.all(|ids| !ids.contains(&link.id))
        })
        .map(|link| link.id.clone())
        .collect();

    for id in stale {
        let Some(link) = links.remove(&id) else {
            continue;
        };
        tracing::debug!("Pruning link {} ({} -> {})", id, link.from.node_id, link.to.node_id);
        for end in [&link.from, &link.to] {
            if !known.contains_key(end.node_id.as_str()) {
                continue;
            }
            if let Some(node) = nodes.get_mut(&end.node_id) {
                node.ports.remove(&end.port_id);
            }
        }
    }

    // Ports kept on a silent node outlive their link; sweep them once the
    // node reports again.
    let attached: HashSet<(&str, &str)> = links
        .values()
        .flat_map(|link| [&link.from, &link.to])
        .map(|end| (end.node_id.as_str(), end.port_id.as_str()))
        .collect();
    for (name, node) in nodes.iter_mut() {
        if !known.contains_key(name.as_str()) {
            continue;
        }
        node.ports.retain(|port_id, _| {
            matches!(port_id.as_str(), EMPTY_LEFT_PORT | EMPTY_RIGHT_PORT | BACKEND_PORT)
                || attached.contains(&(name.as_str(), port_id.as_str()))
        });
    }
}

fn resize_node(node: &mut ChartNode, layout: &LayoutSettings) {
    let busiest = node
        .port_count(PortSide::Left)
        .max(node.port_count(PortSide::Right));
    if let Some(size) = node.size.as_mut() {
        size.height = layout.node_height(busiest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::layout::init_chart_from_network;
    use crate::chart::model::{Position, Size};
    use crate::nodes::model::{ChannelLists, NodeInfo, NodeSnapshot, OpenChannel};
    use crate::types::{BitcoinNode, LightningNode, Network, NodeImplementation};

    const POINT: &str = "f00dfeedbeef0123456789ab:0";

    fn chart_with(positions: &[(&str, f64)]) -> Chart {
        let mut network = Network::new(1, "test");
        network.nodes.bitcoin.push(BitcoinNode::new(0, "backend1"));
        for (i, (name, _)) in positions.iter().enumerate() {
            network.nodes.lightning.push(LightningNode::new(
                i as u32,
                *name,
                NodeImplementation::Lnd,
                "backend1",
            ));
        }
        let mut chart = init_chart_from_network(&network, &LayoutSettings::default());
        for (name, x) in positions {
            chart.nodes.get_mut(*name).unwrap().position = Position::new(*x, 100.0);
        }
        chart
    }

    fn info(key: &str) -> Option<NodeInfo> {
        Some(NodeInfo {
            identity_pubkey: key.to_string(),
            ..Default::default()
        })
    }

    fn open(remote: &str, initiator: bool) -> OpenChannel {
        OpenChannel {
            channel_point: POINT.to_string(),
            remote_pubkey: remote.to_string(),
            capacity: "1000".to_string(),
            local_balance: "400".to_string(),
            remote_balance: "600".to_string(),
            initiator,
            active: true,
        }
    }

    fn lists(open: Vec<OpenChannel>) -> Option<ChannelLists> {
        Some(ChannelLists {
            open,
            ..Default::default()
        })
    }

    fn snapshots(a: Option<ChannelLists>, b: Option<ChannelLists>) -> SnapshotMap {
        let mut map = SnapshotMap::new();
        map.insert("A".to_string(), NodeSnapshot::new(info("kA"), a));
        map.insert("B".to_string(), NodeSnapshot::new(info("kB"), b));
        map
    }

    #[test]
    fn test_open_channel_creates_link() {
        let chart = chart_with(&[("A", 0.0), ("B", 250.0)]);
        let snaps = snapshots(lists(vec![open("kB", true)]), lists(vec![]));

        let next = update_chart_from_nodes(&chart, &snaps, &LayoutSettings::default());
        let links: Vec<_> = next.channel_links().collect();
        assert_eq!(links.len(), 1);
        let link = links[0];
        assert_eq!(link.from.node_id, "A");
        assert_eq!(link.to.node_id, "B");
        assert_eq!(link.properties.kind, LinkKind::OpenChannel);
        assert_eq!(link.properties.direction, Some(Direction::Ltr));
        assert_eq!(link.properties.capacity.as_deref(), Some("1000"));
        assert_eq!(link.properties.from_balance.as_deref(), Some("400"));
        assert_eq!(link.properties.to_balance.as_deref(), Some("600"));

        assert_eq!(next.nodes["A"].ports[&link.id].side, PortSide::Right);
        assert_eq!(next.nodes["B"].ports[&link.id].side, PortSide::Left);
    }

    #[test]
    fn test_input_chart_untouched() {
        let chart = chart_with(&[("A", 0.0), ("B", 250.0)]);
        let before = chart.clone();
        let snaps = snapshots(lists(vec![open("kB", true)]), lists(vec![]));

        let _ = update_chart_from_nodes(&chart, &snaps, &LayoutSettings::default());
        assert_eq!(chart, before);
    }

    #[test]
    fn test_non_initiator_copy_ignored() {
        let chart = chart_with(&[("A", 0.0), ("B", 250.0)]);
        let snaps = snapshots(lists(vec![open("kB", false)]), lists(vec![open("kA", true)]));

        let next = update_chart_from_nodes(&chart, &snaps, &LayoutSettings::default());
        let links: Vec<_> = next.channel_links().collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].from.node_id, "B");
        assert_eq!(links[0].to.node_id, "A");
        assert_eq!(links[0].properties.direction, Some(Direction::Rtl));
    }

    #[test]
    fn test_unresolved_peer_skipped() {
        let chart = chart_with(&[("A", 0.0), ("B", 250.0)]);
        let snaps = snapshots(lists(vec![open("kZ", true)]), None);

        let next = update_chart_from_nodes(&chart, &snaps, &LayoutSettings::default());
        assert_eq!(next.channel_links().count(), 0);
    }

    #[test]
    fn test_snapshot_without_info_still_contributes_channels() {
        let chart = chart_with(&[("A", 0.0), ("B", 250.0)]);
        let mut snaps = snapshots(lists(vec![open("kB", true)]), None);
        snaps.get_mut("A").unwrap().info = None;

        let next = update_chart_from_nodes(&chart, &snaps, &LayoutSettings::default());
        assert_eq!(next.channel_links().count(), 1);
    }

    #[test]
    fn test_empty_list_prunes_and_absent_list_keeps() {
        let chart = chart_with(&[("A", 0.0), ("B", 250.0)]);
        let layout = LayoutSettings::default();
        let with_link = update_chart_from_nodes(
            &chart,
            &snapshots(lists(vec![open("kB", true)]), None),
            &layout,
        );
        let id = with_link.channel_links().next().unwrap().id.clone();

        let kept = update_chart_from_nodes(&with_link, &snapshots(None, None), &layout);
        assert!(kept.links.contains_key(&id));
        assert!(kept.nodes["A"].ports.contains_key(&id));

        let pruned = update_chart_from_nodes(&with_link, &snapshots(lists(vec![]), None), &layout);
        assert!(!pruned.links.contains_key(&id));
        assert!(!pruned.nodes["A"].ports.contains_key(&id));
        assert!(pruned.nodes["A"].ports.contains_key(BACKEND_PORT));
        // B said nothing, so its port stays until it reports
        assert!(pruned.nodes["B"].ports.contains_key(&id));

        let swept = update_chart_from_nodes(&pruned, &snapshots(None, lists(vec![])), &layout);
        assert!(!swept.nodes["B"].ports.contains_key(&id));
        assert!(swept.nodes["B"].ports.contains_key(BACKEND_PORT));
        assert!(swept.nodes["B"].ports.contains_key(EMPTY_LEFT_PORT));
    }

    #[test]
    fn test_absent_funder_keeps_link_and_ports() {
        let layout = LayoutSettings::default();
        let chart = chart_with(&[("A", 0.0), ("B", 250.0)]);
        let first = update_chart_from_nodes(
            &chart,
            &snapshots(lists(vec![open("kB", true)]), lists(vec![open("kA", false)])),
            &layout,
        );
        let id = first.channel_links().next().unwrap().id.clone();

        // A is down; B still lists its non-initiator copy
        let next = update_chart_from_nodes(
            &first,
            &snapshots(None, lists(vec![open("kA", false)])),
            &layout,
        );
        assert_eq!(next.links[&id], first.links[&id]);
        assert!(next.nodes["A"].ports.contains_key(&id));
        assert!(next.nodes["B"].ports.contains_key(&id));
        assert_eq!(next, first);

        // Same when A drops out of the batch entirely
        let mut only_b = SnapshotMap::new();
        only_b.insert(
            "B".to_string(),
            NodeSnapshot::new(info("kB"), lists(vec![open("kA", false)])),
        );
        assert_eq!(update_chart_from_nodes(&first, &only_b, &layout), first);
    }

    #[test]
    fn test_backend_links_never_pruned() {
        let chart = chart_with(&[("A", 0.0), ("B", 250.0)]);
        let next = update_chart_from_nodes(
            &chart,
            &snapshots(lists(vec![]), lists(vec![])),
            &LayoutSettings::default(),
        );
        assert!(next.links.contains_key("A-backend"));
        assert!(next.links.contains_key("B-backend"));
    }

    #[test]
    fn test_direction_flips_with_position() {
        let layout = LayoutSettings::default();
        let chart = chart_with(&[("A", 100.0), ("B", 200.0)]);
        let snaps = snapshots(lists(vec![open("kB", true)]), None);

        let first = update_chart_from_nodes(&chart, &snaps, &layout);
        let id = first.channel_links().next().unwrap().id.clone();
        assert_eq!(first.links[&id].properties.direction, Some(Direction::Ltr));

        let moved = first
            .with_node_position("A", Position::new(300.0, 100.0))
            .unwrap();
        let second = update_chart_from_nodes(&moved, &snaps, &layout);
        assert_eq!(second.links[&id].properties.direction, Some(Direction::Rtl));
        assert_eq!(second.nodes["A"].ports[&id].side, PortSide::Left);
        assert_eq!(second.nodes["B"].ports[&id].side, PortSide::Right);
        assert_eq!(second.channel_links().count(), 1);
    }

    #[test]
    fn test_extra_link_fields_preserved() {
        let layout = LayoutSettings::default();
        let chart = chart_with(&[("A", 0.0), ("B", 250.0)]);
        let snaps = snapshots(lists(vec![open("kB", true)]), None);

        let mut first = update_chart_from_nodes(&chart, &snaps, &layout);
        let id = first.channel_links().next().unwrap().id.clone();
        first
            .links
            .get_mut(&id)
            .unwrap()
            .extra
            .insert("highlight".to_string(), serde_json::json!(true));

        let second = update_chart_from_nodes(&first, &snaps, &layout);
        assert_eq!(second.links[&id].extra["highlight"], serde_json::json!(true));
    }

    #[test]
    fn test_sizing_is_opt_in() {
        let layout = LayoutSettings::default();
        let mut chart = chart_with(&[("A", 0.0), ("B", 250.0), ("C", 500.0)]);
        chart.nodes.get_mut("A").unwrap().size = Some(Size {
            width: 200.0,
            height: 0.0,
        });
        let mut snaps = snapshots(lists(vec![open("kB", true)]), None);
        snaps.insert("C".to_string(), NodeSnapshot::new(info("kC"), None));

        let next = update_chart_from_nodes(&chart, &snaps, &layout);
        // empty-right plus the channel port
        assert_eq!(
            next.nodes["A"].size,
            Some(Size {
                width: 200.0,
                height: layout.node_height(2),
            })
        );
        assert_eq!(next.nodes["B"].size, None);
        assert_eq!(next.nodes["C"].size, None);
    }

    #[test]
    fn test_transient_fields_carried_over() {
        let mut chart = chart_with(&[("A", 0.0), ("B", 250.0)]);
        chart.offset = Position::new(-40.0, 12.0);
        chart.selected.kind = Some("node".to_string());
        chart.selected.id = Some("A".to_string());

        let next = update_chart_from_nodes(
            &chart,
            &snapshots(lists(vec![open("kB", true)]), None),
            &LayoutSettings::default(),
        );
        assert_eq!(next.offset, chart.offset);
        assert_eq!(next.selected, chart.selected);
        assert_eq!(next.hovered, chart.hovered);
    }

    #[test]
    fn test_reconcile_is_fixed_point() {
        let layout = LayoutSettings::default();
        let chart = chart_with(&[("A", 0.0), ("B", 250.0)]);
        let snaps = snapshots(lists(vec![open("kB", true)]), lists(vec![open("kA", false)]));

        let once = update_chart_from_nodes(&chart, &snaps, &layout);
        let twice = update_chart_from_nodes(&once, &snaps, &layout);
        assert_eq!(once, twice);
    }
}
