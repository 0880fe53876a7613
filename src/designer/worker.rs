//! Refresh Worker Implementation
//!
//! This module contains the loop that keeps the chart in step with the
//! running nodes. It communicates with the canvas through crossbeam channels.
//!
//! # Responsibilities
//!
//! - **Command processing**: refresh requests, node moves, sizing changes
//! - **Fan-out polling**: every started lightning node is queried
//!   concurrently through its registered [`NodeService`]
//! - **Reconciliation**: one pass per completed batch, in call order
//! - **Error reporting**: failed nodes are reported and left out of the pass
//!
//! [`NodeService`]: crate::nodes::NodeService

use crate::chart::{init_chart_from_network, update_chart_from_nodes, Chart};
use crate::config::{AppConfig, LayoutSettings, PollSettings};
use crate::designer::bridge::{DesignerCommand, DesignerMessage};
use crate::error::LnSimError;
use crate::nodes::{ServiceRegistry, SnapshotMap};
use crate::types::Network;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// How often the loop checks for commands between refreshes.
const COMMAND_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Result of polling every started node once.
#[derive(Debug, Default)]
pub struct PollOutcome {
    pub snapshots: SnapshotMap,
    pub failures: Vec<(String, LnSimError)>,
}

/// Owns the current chart and drives the refresh cycle.
pub struct DesignerWorker {
    network: Network,
    chart: Arc<Chart>,
    registry: ServiceRegistry,
    layout: LayoutSettings,
    poll: PollSettings,
    cmd_rx: Receiver<DesignerCommand>,
    msg_tx: Sender<DesignerMessage>,
}

impl DesignerWorker {
    /// Create a worker. Without a stored chart the initial layout is built
    /// from the network definition.
    pub fn new(
        network: Network,
        chart: Option<Chart>,
        registry: ServiceRegistry,
        config: &AppConfig,
        cmd_rx: Receiver<DesignerCommand>,
        msg_tx: Sender<DesignerMessage>,
    ) -> Self {
        let chart = chart.unwrap_or_else(|| init_chart_from_network(&network, &config.layout));
        Self {
            network,
            chart: Arc::new(chart),
            registry,
            layout: config.layout.clone(),
            poll: config.poll.clone(),
            cmd_rx,
            msg_tx,
        }
    }

    pub fn chart(&self) -> &Arc<Chart> {
        &self.chart
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Query every started lightning node concurrently.
    pub async fn poll_nodes(&self) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        let mut tasks = JoinSet::new();

        for node in self.network.started_lightning_nodes() {
            let service = match self.registry.get(node.implementation) {
                Ok(service) => service,
                Err(e) => {
                    outcome.failures.push((node.name.clone(), e));
                    continue;
                }
            };
            let node = node.clone();
            tasks.spawn(async move {
                let result = service.snapshot(&node).await;
                (node.name, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(snapshot))) => {
                    outcome.snapshots.insert(name, snapshot);
                }
                Ok((name, Err(e))) => outcome.failures.push((name, e)),
                Err(e) => tracing::error!("Node poll task failed: {}", e),
            }
        }

        outcome
    }

    /// Reconcile the current chart with `snapshots` and publish the result.
    pub fn apply_snapshots(&mut self, snapshots: &SnapshotMap) -> Arc<Chart> {
        let next = update_chart_from_nodes(&self.chart, snapshots, &self.layout);
        self.chart = Arc::new(next);
        self.publish(DesignerMessage::Chart(self.chart.clone()));
        self.chart.clone()
    }

    /// Poll all nodes and reconcile once the batch is in.
    ///
    /// Returns the new chart, or `None` if the pass was skipped.
    pub async fn refresh(&mut self) -> Option<Arc<Chart>> {
        let outcome = self.poll_nodes().await;

        for (node, err) in &outcome.failures {
            tracing::warn!("Failed to poll node {}: {}", node, err);
            self.publish(DesignerMessage::NodeError {
                node: node.clone(),
                message: err.to_string(),
            });
        }

        if self.poll.require_complete_batch && !outcome.failures.is_empty() {
            tracing::debug!(
                "Skipping reconciliation, {} node(s) failed",
                outcome.failures.len()
            );
            return None;
        }

        tracing::trace!("Reconciling {} node snapshot(s)", outcome.snapshots.len());
        Some(self.apply_snapshots(&outcome.snapshots))
    }

    /// Handle one command. Returns false when the worker should stop.
    pub async fn handle_command(&mut self, cmd: DesignerCommand) -> bool {
        match cmd {
            DesignerCommand::Refresh => {
                self.refresh().await;
            }
            DesignerCommand::MoveNode { id, position } => {
                match self.chart.with_node_position(&id, position) {
                    Some(chart) => self.replace_chart(chart),
                    None => tracing::warn!("MoveNode for unknown node {}", id),
                }
            }
            DesignerCommand::SetNodeSize { id, size } => match self.chart.with_node_size(&id, size) {
                Some(chart) => self.replace_chart(chart),
                None => tracing::warn!("SetNodeSize for unknown node {}", id),
            },
            DesignerCommand::Shutdown => return false,
        }
        true
    }

    /// Main loop: process commands and refresh on the configured interval.
    pub async fn run(mut self) {
        tracing::info!(
            "Designer worker started for network '{}' ({} ms interval)",
            self.network.name,
            self.poll.interval_ms
        );
        self.publish(DesignerMessage::Chart(self.chart.clone()));

        let interval = self.poll.interval();
        let mut next_refresh = Instant::now();

        'outer: loop {
            loop {
                match self.cmd_rx.try_recv() {
                    Ok(cmd) => {
                        if !self.handle_command(cmd).await {
                            break 'outer;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        tracing::info!("Command channel closed");
                        break 'outer;
                    }
                }
            }

            if Instant::now() >= next_refresh {
                self.refresh().await;
                next_refresh = Instant::now() + interval;
            }

            let wait = next_refresh.saturating_duration_since(Instant::now());
            tokio::time::sleep(wait.min(COMMAND_POLL_INTERVAL)).await;
        }

        tracing::info!("Designer worker shutting down");
        self.publish(DesignerMessage::Shutdown);
    }

    fn replace_chart(&mut self, chart: Chart) {
        self.chart = Arc::new(chart);
        self.publish(DesignerMessage::Chart(self.chart.clone()));
    }

    fn publish(&self, msg: DesignerMessage) {
        match self.msg_tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => tracing::warn!("Designer message queue full, dropping"),
            Err(TrySendError::Disconnected(_)) => tracing::trace!("Canvas gone, message dropped"),
        }
    }
}
