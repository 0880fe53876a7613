//! Simulated Node Backend
//!
//! This module provides an in-process stand-in for the privileged backend
//! process. It keeps canned identity and channel data for a set of named
//! lightning nodes and serves it over an [`IpcDispatcher`], so the refresh
//! cycle can run end to end without any node containers.
//!
//! # Features
//!
//! - **Channel lifecycle**: open, pending open, confirmation, close
//! - **Mining**: advancing the chain confirms every pending open
//! - **Offline nodes**: requests for an offline node fail with a remote error
//! - **Event stream**: every lifecycle change is pushed to `channel-events`
//!   subscribers
//!
//! # Example
//!
//! ```ignore
//! let sim = SimulatedBackend::new();
//! sim.add_node("alice", "02aa..");
//! sim.add_node("bob", "03bb..");
//! let point = sim.open_channel("alice", "bob", 250_000, 0)?;
//!
//! let dispatcher = IpcDispatcher::new(transport, "lnsim")?;
//! sim.serve(&dispatcher);
//! ```

use crate::error::{LnSimError, Result};
use crate::ipc::{IpcDispatcher, StreamSink};
use crate::nodes::{
    ChannelLists, NodeInfo, OpenChannel, PendingChannel, PendingOpenChannel, GET_INFO_CHANNEL,
    LIST_CHANNELS_CHANNEL,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Streaming channel that pushes channel lifecycle events
pub const CHANNEL_EVENTS_CHANNEL: &str = "channel-events";

/// Starting chain height of a fresh simulation
const GENESIS_HEIGHT: u32 = 100;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct SimNode {
    info: NodeInfo,
    channels: ChannelLists,
    online: bool,
}

#[derive(Debug, Default)]
struct SimState {
    nodes: HashMap<String, SimNode>,
    /// Channel point -> name of the node that funded it
    initiators: HashMap<String, String>,
    next_funding: u64,
    block_height: u32,
}

impl SimState {
    fn node(&self, name: &str) -> Result<&SimNode> {
        self.nodes
            .get(name)
            .ok_or_else(|| LnSimError::node(name, "unknown node"))
    }

    fn node_mut(&mut self, name: &str) -> Result<&mut SimNode> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| LnSimError::node(name, "unknown node"))
    }

    fn pubkey(&self, name: &str) -> Result<String> {
        Ok(self.node(name)?.info.identity_pubkey.clone())
    }

    /// Deterministic funding outpoint, unique within the simulation.
    fn next_channel_point(&mut self) -> String {
        self.next_funding += 1;
        format!("{:064x}:0", self.next_funding)
    }

    fn refresh_counts(&mut self) {
        let height = self.block_height;
        for node in self.nodes.values_mut() {
            node.info.block_height = height;
            node.info.num_active_channels = node.channels.open.len() as u32;
            node.info.num_pending_channels = node.channels.opening.len() as u32
                + node.channels.closing.len() as u32
                + node.channels.force_closing.len() as u32
                + node.channels.waiting_close.len() as u32;
        }
    }

    fn confirm(&mut self, channel_point: &str) -> bool {
        let Some(initiator) = self.initiators.get(channel_point).cloned() else {
            return false;
        };
        let mut confirmed = false;
        for (name, node) in self.nodes.iter_mut() {
            let Some(idx) = node
                .channels
                .opening
                .iter()
                .position(|c| c.channel.channel_point == channel_point)
            else {
                continue;
            };
            let pending = node.channels.opening.remove(idx).channel;
            node.channels.open.push(OpenChannel {
                channel_point: pending.channel_point,
                remote_pubkey: pending.remote_node_pub,
                capacity: pending.capacity,
                local_balance: pending.local_balance,
                remote_balance: pending.remote_balance,
                initiator: *name == initiator,
                active: true,
            });
            confirmed = true;
        }
        confirmed
    }
}

/// In-process backend serving simulated lightning nodes.
#[derive(Clone)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
    events: broadcast::Sender<Value>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SimState {
                block_height: GENESIS_HEIGHT,
                ..Default::default()
            })),
            events,
        }
    }

    /// Add an online node. Re-adding a name resets it.
    pub fn add_node(&self, name: impl Into<String>, pubkey: impl Into<String>) {
        let name = name.into();
        let mut state = self.lock();
        let info = NodeInfo {
            identity_pubkey: pubkey.into(),
            alias: name.clone(),
            block_height: state.block_height,
            synced_to_chain: true,
            ..Default::default()
        };
        state.nodes.insert(
            name,
            SimNode {
                info,
                channels: ChannelLists::default(),
                online: true,
            },
        );
    }

    /// Take a node offline or bring it back.
    pub fn set_online(&self, name: &str, online: bool) -> Result<()> {
        self.lock().node_mut(name)?.online = online;
        tracing::debug!("Simulated node {} online={}", name, online);
        Ok(())
    }

    /// Open a confirmed channel funded by `from`. Returns its channel point.
    pub fn open_channel(&self, from: &str, to: &str, capacity: u64, push_amount: u64) -> Result<String> {
        let point = {
            let mut state = self.lock();
            let (from_key, to_key) = endpoint_keys(&state, from, to)?;
            let local = capacity.saturating_sub(push_amount);
            let point = state.next_channel_point();

            state.node_mut(from)?.channels.open.push(OpenChannel {
                channel_point: point.clone(),
                remote_pubkey: to_key,
                capacity: capacity.to_string(),
                local_balance: local.to_string(),
                remote_balance: push_amount.to_string(),
                initiator: true,
                active: true,
            });
            state.node_mut(to)?.channels.open.push(OpenChannel {
                channel_point: point.clone(),
                remote_pubkey: from_key,
                capacity: capacity.to_string(),
                local_balance: push_amount.to_string(),
                remote_balance: local.to_string(),
                initiator: false,
                active: true,
            });
            state.initiators.insert(point.clone(), from.to_string());
            state.refresh_counts();
            point
        };

        tracing::info!("Opened channel {} from {} to {}", point, from, to);
        self.emit("open", &point);
        Ok(point)
    }

    /// Open a channel that waits for confirmation. Both endpoints report it.
    pub fn open_pending_channel(&self, from: &str, to: &str, capacity: u64) -> Result<String> {
        let point = {
            let mut state = self.lock();
            let (from_key, to_key) = endpoint_keys(&state, from, to)?;
            let point = state.next_channel_point();
            let height = state.block_height;

            let pending = |remote: String, local: u64, remote_balance: u64| PendingOpenChannel {
                channel: PendingChannel {
                    remote_node_pub: remote,
                    channel_point: point.clone(),
                    capacity: capacity.to_string(),
                    local_balance: local.to_string(),
                    remote_balance: remote_balance.to_string(),
                },
                confirmation_height: height + 1,
                commit_fee: "0".to_string(),
            };
            let from_side = pending(to_key, capacity, 0);
            let to_side = pending(from_key, 0, capacity);

            state.node_mut(from)?.channels.opening.push(from_side);
            state.node_mut(to)?.channels.opening.push(to_side);
            state.initiators.insert(point.clone(), from.to_string());
            state.refresh_counts();
            point
        };

        tracing::info!("Pending channel {} from {} to {}", point, from, to);
        self.emit("pending", &point);
        Ok(point)
    }

    /// Confirm one pending channel on both endpoints.
    pub fn confirm_channel(&self, channel_point: &str) -> Result<()> {
        let confirmed = {
            let mut state = self.lock();
            let confirmed = state.confirm(channel_point);
            state.refresh_counts();
            confirmed
        };
        if !confirmed {
            return Err(LnSimError::Channel(format!(
                "no pending channel {}",
                channel_point
            )));
        }
        self.emit("confirmed", channel_point);
        Ok(())
    }

    /// Advance the chain by `blocks`, confirming every pending open.
    pub fn mine_blocks(&self, blocks: u32) -> Vec<String> {
        let confirmed: Vec<String> = {
            let mut state = self.lock();
            state.block_height += blocks;
            let pending: Vec<String> = state
                .nodes
                .values()
                .flat_map(|n| n.channels.opening.iter())
                .map(|c| c.channel.channel_point.clone())
                .collect();
            let mut confirmed = Vec::new();
            for point in pending {
                if state.confirm(&point) {
                    confirmed.push(point);
                }
            }
            state.refresh_counts();
            confirmed
        };

        tracing::debug!("Mined {} block(s), {} channel(s) confirmed", blocks, confirmed.len());
        for point in &confirmed {
            self.emit("confirmed", point);
        }
        confirmed
    }

    /// Close a channel cooperatively; it disappears from both endpoints.
    pub fn close_channel(&self, channel_point: &str) -> Result<()> {
        let removed = {
            let mut state = self.lock();
            let mut removed = false;
            for node in state.nodes.values_mut() {
                let before = node.channels.len();
                node.channels.open.retain(|c| c.channel_point != channel_point);
                node.channels
                    .opening
                    .retain(|c| c.channel.channel_point != channel_point);
                removed |= node.channels.len() != before;
            }
            state.initiators.remove(channel_point);
            state.refresh_counts();
            removed
        };
        if !removed {
            return Err(LnSimError::Channel(format!("no channel {}", channel_point)));
        }

        tracing::info!("Closed channel {}", channel_point);
        self.emit("closed", channel_point);
        Ok(())
    }

    /// Identity of a node, as the `get-info` channel would return it.
    pub fn get_info(&self, name: &str) -> Result<NodeInfo> {
        let state = self.lock();
        let node = online_node(&state, name)?;
        Ok(node.info.clone())
    }

    /// Channels of a node, as the `list-channels` channel would return them.
    pub fn list_channels(&self, name: &str) -> Result<ChannelLists> {
        let state = self.lock();
        let node = online_node(&state, name)?;
        Ok(node.channels.clone())
    }

    /// Serve `get-info`, `list-channels` and `channel-events` on `dispatcher`.
    pub fn serve(&self, dispatcher: &IpcDispatcher) {
        let sim = self.clone();
        dispatcher.handle(GET_INFO_CHANNEL, move |payload: Value| {
            let sim = sim.clone();
            async move {
                let name = requested_node(&payload)?;
                let info = sim.get_info(&name).map_err(|e| e.to_string())?;
                serde_json::to_value(info).map_err(|e| e.to_string())
            }
        });

        let sim = self.clone();
        dispatcher.handle(LIST_CHANNELS_CHANNEL, move |payload: Value| {
            let sim = sim.clone();
            async move {
                let name = requested_node(&payload)?;
                let channels = sim.list_channels(&name).map_err(|e| e.to_string())?;
                serde_json::to_value(channels).map_err(|e| e.to_string())
            }
        });

        let events = self.events.clone();
        dispatcher.handle_stream(CHANNEL_EVENTS_CHANNEL, move |_payload: Value, sink: StreamSink| {
            let rx = events.subscribe();
            forward_events(rx, sink)
        });
    }

    fn emit(&self, kind: &str, channel_point: &str) {
        // No subscribers is not an error.
        let _ = self.events.send(json!({
            "type": kind,
            "channelPoint": channel_point,
        }));
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn endpoint_keys(state: &SimState, from: &str, to: &str) -> Result<(String, String)> {
    if from == to {
        return Err(LnSimError::Channel(format!("{} cannot open a channel to itself", from)));
    }
    Ok((state.pubkey(from)?, state.pubkey(to)?))
}

fn online_node<'a>(state: &'a SimState, name: &str) -> Result<&'a SimNode> {
    let node = state.node(name)?;
    if !node.online {
        return Err(LnSimError::node(name, "node is not running"));
    }
    Ok(node)
}

/// Name of the node a request targets, from its `node` field.
fn requested_node(payload: &Value) -> std::result::Result<String, String> {
    payload["node"]["name"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| "request has no node name".to_string())
}

async fn forward_events(mut rx: broadcast::Receiver<Value>, sink: StreamSink) {
    tracing::debug!("Streaming channel events to {}", sink.address());
    loop {
        match rx.recv().await {
            Ok(event) => {
                if !sink.is_open() || sink.send(event).is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Channel event stream lagged by {} event(s)", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::debug!("Channel event stream to {} ended", sink.address());
}
