//! Normalization of raw channel shapes.
//!
//! Node RPCs report channels in five lifecycle shapes. Each maps into one
//! [`ChannelSnapshot`] so reconciliation has a single code path.

use std::collections::HashSet;

use crate::nodes::model::{
    ChannelLists, ClosingChannel, ForceClosingChannel, OpenChannel, PendingChannel,
    PendingOpenChannel, WaitingCloseChannel,
};

/// Number of trailing channel-point characters used as a link id.
pub const LINK_ID_LEN: usize = 12;

/// Stable link id for a channel: the tail of its funding outpoint.
pub fn link_id(channel_point: &str) -> String {
    let len = channel_point.chars().count();
    channel_point
        .chars()
        .skip(len.saturating_sub(LINK_ID_LEN))
        .collect()
}

/// A channel in any lifecycle state, as seen from the reporting node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub pending: bool,
    /// Link id derived from the channel point
    pub unique_id: String,
    pub remote_pubkey: String,
    pub capacity: String,
    pub local_balance: String,
    pub remote_balance: String,
}

impl From<&OpenChannel> for ChannelSnapshot {
    fn from(chan: &OpenChannel) -> Self {
        Self {
            pending: false,
            unique_id: link_id(&chan.channel_point),
            remote_pubkey: chan.remote_pubkey.clone(),
            capacity: chan.capacity.clone(),
            local_balance: chan.local_balance.clone(),
            remote_balance: chan.remote_balance.clone(),
        }
    }
}

impl From<&PendingChannel> for ChannelSnapshot {
    fn from(chan: &PendingChannel) -> Self {
        Self {
            pending: true,
            unique_id: link_id(&chan.channel_point),
            remote_pubkey: chan.remote_node_pub.clone(),
            capacity: chan.capacity.clone(),
            local_balance: chan.local_balance.clone(),
            remote_balance: chan.remote_balance.clone(),
        }
    }
}

impl From<&PendingOpenChannel> for ChannelSnapshot {
    fn from(chan: &PendingOpenChannel) -> Self {
        Self::from(&chan.channel)
    }
}

impl From<&ClosingChannel> for ChannelSnapshot {
    fn from(chan: &ClosingChannel) -> Self {
        Self::from(&chan.channel)
    }
}

impl From<&ForceClosingChannel> for ChannelSnapshot {
    fn from(chan: &ForceClosingChannel) -> Self {
        Self::from(&chan.channel)
    }
}

impl From<&WaitingCloseChannel> for ChannelSnapshot {
    fn from(chan: &WaitingCloseChannel) -> Self {
        Self::from(&chan.channel)
    }
}

/// Flatten a node's channel lists.
///
/// Open channels are reported by both endpoints, so only the initiator's
/// copy is kept.
pub fn channel_snapshots(lists: &ChannelLists) -> Vec<ChannelSnapshot> {
    let open = lists
        .open
        .iter()
        .filter(|c| c.initiator)
        .map(ChannelSnapshot::from);
    let opening = lists.opening.iter().map(ChannelSnapshot::from);
    let closing = lists.closing.iter().map(ChannelSnapshot::from);
    let force_closing = lists.force_closing.iter().map(ChannelSnapshot::from);
    let waiting_close = lists.waiting_close.iter().map(ChannelSnapshot::from);

    open.chain(opening)
        .chain(closing)
        .chain(force_closing)
        .chain(waiting_close)
        .collect()
}

/// Link ids of every channel a node lists, whichever side funded it.
pub fn known_link_ids(lists: &ChannelLists) -> HashSet<String> {
    let open = lists.open.iter().map(|c| c.channel_point.as_str());
    let opening = lists.opening.iter().map(|c| c.channel.channel_point.as_str());
    let closing = lists.closing.iter().map(|c| c.channel.channel_point.as_str());
    let force_closing = lists
        .force_closing
        .iter()
        .map(|c| c.channel.channel_point.as_str());
    let waiting_close = lists
        .waiting_close
        .iter()
        .map(|c| c.channel.channel_point.as_str());

    open.chain(opening)
        .chain(closing)
        .chain(force_closing)
        .chain(waiting_close)
        .map(link_id)
        .collect()
}
