//! Test data builders for networks and node snapshots

use lnsim_rs::nodes::{
    ChannelLists, ClosingChannel, NodeInfo, NodeSnapshot, OpenChannel, PendingChannel,
    PendingOpenChannel, WaitingCloseChannel,
};
use lnsim_rs::types::{BitcoinNode, LightningNode, Network, NodeImplementation, NodeStatus};

/// Channel point whose 12-character tail is unique per `n`.
pub fn channel_point(n: u64) -> String {
    format!("{:064x}:0", n)
}

/// Builder for test networks. Lightning nodes are numbered in insertion order.
pub struct NetworkBuilder {
    network: Network,
}

impl NetworkBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            network: Network::new(1, name),
        }
    }

    pub fn bitcoin(mut self, name: &str) -> Self {
        let id = self.network.nodes.bitcoin.len() as u32;
        self.network.nodes.bitcoin.push(BitcoinNode::new(id, name));
        self
    }

    /// Add a started LND node backed by the first bitcoin node.
    pub fn lightning(self, name: &str) -> Self {
        self.lightning_with(name, NodeImplementation::Lnd, NodeStatus::Started)
    }

    pub fn lightning_with(
        mut self,
        name: &str,
        implementation: NodeImplementation,
        status: NodeStatus,
    ) -> Self {
        let id = self.network.nodes.lightning.len() as u32;
        let backend = self
            .network
            .nodes
            .bitcoin
            .first()
            .map(|b| b.name.clone())
            .unwrap_or_else(|| "backend1".to_string());
        self.network
            .nodes
            .lightning
            .push(LightningNode::new(id, name, implementation, backend).with_status(status));
        self
    }

    pub fn build(self) -> Network {
        self.network
    }
}

/// Builder for one node's snapshot
pub struct SnapshotBuilder {
    pubkey: String,
    channels: Option<ChannelLists>,
}

impl SnapshotBuilder {
    pub fn new(pubkey: &str) -> Self {
        Self {
            pubkey: pubkey.to_string(),
            channels: Some(ChannelLists::default()),
        }
    }

    /// The node answered identity but not its channel list.
    pub fn without_channels(mut self) -> Self {
        self.channels = None;
        self
    }

    pub fn open(mut self, point: &str, remote: &str, initiator: bool, capacity: u64, local: u64) -> Self {
        self.lists().open.push(OpenChannel {
            channel_point: point.to_string(),
            remote_pubkey: remote.to_string(),
            capacity: capacity.to_string(),
            local_balance: local.to_string(),
            remote_balance: capacity.saturating_sub(local).to_string(),
            initiator,
            active: true,
        });
        self
    }

    pub fn opening(mut self, point: &str, remote: &str, capacity: u64) -> Self {
        let channel = pending(point, remote, capacity);
        self.lists().opening.push(PendingOpenChannel {
            channel,
            confirmation_height: 0,
            commit_fee: "0".to_string(),
        });
        self
    }

    pub fn closing(mut self, point: &str, remote: &str, capacity: u64) -> Self {
        let channel = pending(point, remote, capacity);
        self.lists().closing.push(ClosingChannel {
            channel,
            closing_txid: "ff".repeat(32),
        });
        self
    }

    pub fn waiting_close(mut self, point: &str, remote: &str, capacity: u64) -> Self {
        let channel = pending(point, remote, capacity);
        self.lists().waiting_close.push(WaitingCloseChannel {
            channel,
            limbo_balance: capacity.to_string(),
        });
        self
    }

    pub fn build(self) -> NodeSnapshot {
        let info = NodeInfo {
            identity_pubkey: self.pubkey,
            synced_to_chain: true,
            ..Default::default()
        };
        NodeSnapshot::new(Some(info), self.channels)
    }

    fn lists(&mut self) -> &mut ChannelLists {
        self.channels.get_or_insert_with(ChannelLists::default)
    }
}

fn pending(point: &str, remote: &str, capacity: u64) -> PendingChannel {
    PendingChannel {
        remote_node_pub: remote.to_string(),
        channel_point: point.to_string(),
        capacity: capacity.to_string(),
        local_balance: capacity.to_string(),
        remote_balance: "0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_builder() {
        let network = NetworkBuilder::new("net")
            .bitcoin("backend1")
            .lightning("alice")
            .lightning("bob")
            .build();

        assert_eq!(network.nodes.lightning[1].id, 1);
        assert_eq!(network.nodes.lightning[1].backend_name, "backend1");
        assert_eq!(network.started_lightning_nodes().count(), 2);
    }

    #[test]
    fn test_snapshot_builder() {
        let snapshot = SnapshotBuilder::new("kA")
            .open(&channel_point(1), "kB", true, 1000, 400)
            .build();
        assert_eq!(snapshot.pubkey(), Some("kA"));
        assert_eq!(snapshot.channels.unwrap().open[0].remote_balance, "600");
    }
}
