//! Settings groups that make up [`AppConfig`](super::AppConfig)
//!
//! # Main Types
//!
//! - [`IpcSettings`] - Channel prefix, call timeout and log elision
//! - [`PollSettings`] - Interval and batching policy of the refresh cycle
//! - [`LayoutSettings`] - Initial layout formula and node sizing constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default channel name prefix
pub const DEFAULT_IPC_PREFIX: &str = "lnsim";

/// Default timeout for a request/response call in milliseconds
pub const DEFAULT_IPC_TIMEOUT_MS: u64 = 30_000;

/// Default refresh interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// IPC correlator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcSettings {
    /// Prefix prepended to every logical channel name
    pub prefix: String,

    /// Call timeout. `0` waits forever and never removes the reply listener.
    pub timeout_ms: u64,

    /// Payload fields replaced with a marker in the diagnostic log
    pub elided_fields: Vec<String>,
}

impl Default for IpcSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_IPC_PREFIX.to_string(),
            timeout_ms: DEFAULT_IPC_TIMEOUT_MS,
            elided_fields: vec!["node".to_string()],
        }
    }
}

impl IpcSettings {
    /// Call timeout as a [`Duration`]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Set the prefix (builder style)
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the timeout (builder style). Non-zero durations round up to at
    /// least one millisecond so they never turn into "wait forever".
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout_ms = match timeout {
            Some(d) if !d.is_zero() => u64::try_from(d.as_millis().max(1)).unwrap_or(u64::MAX),
            _ => 0,
        };
        self
    }
}

/// Refresh cycle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Time between automatic refreshes
    pub interval_ms: u64,

    /// Skip reconciliation for a pass in which any node failed to reply.
    /// When false, failed nodes are left out of the pass and keep their
    /// previous ports and links.
    pub require_complete_batch: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            require_complete_batch: false,
        }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Initial layout and sizing constants for the chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Horizontal distance between nodes of the same kind
    pub node_spacing: f64,

    /// X offset of the first lightning node
    pub lightning_x_offset: f64,

    /// Y of lightning nodes with an even ordinal
    pub lightning_even_row: f64,

    /// Y of lightning nodes with an odd ordinal
    pub lightning_odd_row: f64,

    /// X offset of the first bitcoin node
    pub bitcoin_x_offset: f64,

    /// Y of bitcoin nodes
    pub bitcoin_row: f64,

    /// Height added per port on the busier side of a node
    pub port_pitch: f64,

    /// Fixed height added to every sized node
    pub node_margin: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            node_spacing: 250.0,
            lightning_x_offset: 50.0,
            lightning_even_row: 100.0,
            lightning_odd_row: 200.0,
            bitcoin_x_offset: 200.0,
            bitcoin_row: 400.0,
            port_pitch: 24.0,
            node_margin: 36.0,
        }
    }
}

impl LayoutSettings {
    /// Height of a node with `ports` ports on its busier side
    pub fn node_height(&self, ports: usize) -> f64 {
        ports.max(1) as f64 * self.port_pitch + self.node_margin
    }
}
