//! Data returned by node adapters.
//!
//! A [`NodeSnapshot`] is one node's reported identity plus its channel lists,
//! partitioned by lifecycle state the way node RPCs report them. Amounts stay
//! decimal strings; nothing here does arithmetic on them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-node snapshots keyed by node name.
pub type SnapshotMap = BTreeMap<String, NodeSnapshot>;

/// Identity and sync state reported by a lightning node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeInfo {
    /// The node's own identity public key
    pub identity_pubkey: String,
    pub alias: String,
    pub block_height: u32,
    pub synced_to_chain: bool,
    pub num_active_channels: u32,
    pub num_pending_channels: u32,
}

/// An active channel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenChannel {
    /// Funding outpoint, `<txid>:<index>`
    pub channel_point: String,
    pub remote_pubkey: String,
    pub capacity: String,
    pub local_balance: String,
    pub remote_balance: String,
    /// Whether the reporting node opened the channel
    pub initiator: bool,
    pub active: bool,
}

/// Fields shared by every pending channel shape
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PendingChannel {
    pub remote_node_pub: String,
    pub channel_point: String,
    pub capacity: String,
    pub local_balance: String,
    pub remote_balance: String,
}

/// A channel whose funding transaction is not yet confirmed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PendingOpenChannel {
    pub channel: PendingChannel,
    pub confirmation_height: u32,
    pub commit_fee: String,
}

/// A cooperatively closing channel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClosingChannel {
    pub channel: PendingChannel,
    pub closing_txid: String,
}

/// A unilaterally closing channel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForceClosingChannel {
    pub channel: PendingChannel,
    pub closing_txid: String,
    pub limbo_balance: String,
    pub maturity_height: u32,
}

/// A channel waiting for its closing transaction to confirm
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaitingCloseChannel {
    pub channel: PendingChannel,
    pub limbo_balance: String,
}

/// A node's channels partitioned by lifecycle state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelLists {
    pub open: Vec<OpenChannel>,
    pub opening: Vec<PendingOpenChannel>,
    pub closing: Vec<ClosingChannel>,
    pub force_closing: Vec<ForceClosingChannel>,
    pub waiting_close: Vec<WaitingCloseChannel>,
}

impl ChannelLists {
    /// Total number of channels in every state
    pub fn len(&self) -> usize {
        self.open.len()
            + self.opening.len()
            + self.closing.len()
            + self.force_closing.len()
            + self.waiting_close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Point-in-time read of one node.
///
/// `channels: None` means the node gave no channel information this pass,
/// which is different from an empty list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeSnapshot {
    pub info: Option<NodeInfo>,
    pub channels: Option<ChannelLists>,
}

impl NodeSnapshot {
    pub fn new(info: Option<NodeInfo>, channels: Option<ChannelLists>) -> Self {
        Self { info, channels }
    }

    /// Identity key, if the node reported one
    pub fn pubkey(&self) -> Option<&str> {
        self.info
            .as_ref()
            .map(|i| i.identity_pubkey.as_str())
            .filter(|k| !k.is_empty())
    }
}
