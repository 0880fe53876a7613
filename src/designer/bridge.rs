//! Thread boundary between the refresh worker and the canvas.
//!
//! The worker owns the current chart and publishes every new pass as a fresh
//! `Arc<Chart>`; the canvas can compare with `Arc::ptr_eq` to detect change.

use crate::chart::{Chart, Position, Size};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;

/// Messages sent from the worker to the canvas.
#[derive(Debug, Clone)]
pub enum DesignerMessage {
    /// A reconciliation pass produced a new chart.
    Chart(Arc<Chart>),

    /// Polling a node failed this pass.
    NodeError { node: String, message: String },

    /// Worker is shutting down.
    Shutdown,
}

/// Commands sent from the canvas to the worker.
#[derive(Debug, Clone)]
pub enum DesignerCommand {
    /// Poll every node and reconcile now.
    Refresh,
    /// The user dragged a node.
    MoveNode { id: String, position: Position },
    /// Opt a node in or out of automatic sizing.
    SetNodeSize { id: String, size: Option<Size> },
    /// Stop the worker.
    Shutdown,
}

/// Channel capacity for commands (canvas → worker).
const CMD_CHANNEL_CAPACITY: usize = 64;
/// Channel capacity for messages (worker → canvas).
const MSG_CHANNEL_CAPACITY: usize = 256;

/// Canvas-side handle for communicating with the refresh worker.
pub struct DesignerBridge {
    pub cmd_tx: Sender<DesignerCommand>,
    pub msg_rx: Receiver<DesignerMessage>,
}

impl DesignerBridge {
    /// Create a new bridge pair: `(bridge_for_canvas, cmd_rx, msg_tx)`.
    ///
    /// The worker owns `cmd_rx` and `msg_tx`.
    pub fn new() -> (Self, Receiver<DesignerCommand>, Sender<DesignerMessage>) {
        let (cmd_tx, cmd_rx) = bounded(CMD_CHANNEL_CAPACITY);
        let (msg_tx, msg_rx) = bounded(MSG_CHANNEL_CAPACITY);
        (Self { cmd_tx, msg_rx }, cmd_rx, msg_tx)
    }

    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<DesignerMessage> {
        let mut msgs = Vec::new();
        while let Ok(msg) = self.msg_rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    /// Latest chart among the pending messages, discarding the rest.
    pub fn latest_chart(&self) -> Option<Arc<Chart>> {
        self.drain().into_iter().rev().find_map(|msg| match msg {
            DesignerMessage::Chart(chart) => Some(chart),
            _ => None,
        })
    }

    pub fn send_command(&self, cmd: DesignerCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }

    pub fn refresh(&self) {
        let _ = self.cmd_tx.send(DesignerCommand::Refresh);
    }

    pub fn move_node(&self, id: impl Into<String>, position: Position) {
        let _ = self.cmd_tx.send(DesignerCommand::MoveNode {
            id: id.into(),
            position,
        });
    }

    pub fn set_node_size(&self, id: impl Into<String>, size: Option<Size>) {
        let _ = self.cmd_tx.send(DesignerCommand::SetNodeSize {
            id: id.into(),
            size,
        });
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(DesignerCommand::Shutdown);
    }
}
