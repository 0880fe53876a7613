//! lnsim - Main Entry Point
//!
//! Runs a small simulated network through the full refresh cycle: the
//! simulated backend serves node data over the in-process transport, the
//! designer worker polls it and this thread plays the canvas.

use anyhow::Context;
use lnsim_rs::{
    chart::Chart,
    config::AppConfig,
    designer::{DesignerBridge, DesignerMessage, DesignerWorker},
    ipc::{IpcDispatcher, IpcSender, MemoryTransport, Transport},
    nodes::{IpcNodeService, NodeService, ServiceRegistry},
    sim::{SimulatedBackend, CHANNEL_EVENTS_CHANNEL},
    types::{BitcoinNode, LightningNode, Network, NodeImplementation, NodeStatus},
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How long the canvas waits for the worker before giving up on a step
const STEP_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_or_default();
    let _log_guard = init_logging(&config);

    tracing::info!("Starting lnsim");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    // Backend side: simulated nodes served over the in-process transport
    let transport: Arc<dyn Transport> = MemoryTransport::shared();
    let sim = SimulatedBackend::new();
    let network = demo_network(&sim);
    let dispatcher =
        IpcDispatcher::with_runtime(transport.clone(), config.ipc.prefix.clone(), runtime.handle().clone());
    sim.serve(&dispatcher);

    // UI side: one adapter for every implementation, all asking the backend
    let service: Arc<dyn NodeService> = Arc::new(IpcNodeService::new(IpcSender::new(
        "nodes",
        transport.clone(),
        config.ipc.clone(),
    )));
    let registry = [
        NodeImplementation::Lnd,
        NodeImplementation::CLightning,
        NodeImplementation::Eclair,
    ]
    .into_iter()
    .fold(ServiceRegistry::new(), |registry, implementation| {
        registry.with(implementation, service.clone())
    });

    let events = IpcSender::new("events", transport.clone(), config.ipc.clone());
    let subscription = events
        .subscribe(CHANNEL_EVENTS_CHANNEL, json!({}), |event| {
            tracing::info!("Channel event: {}", event);
        })
        .context("Failed to subscribe to channel events")?;

    let (bridge, cmd_rx, msg_tx) = DesignerBridge::new();
    let worker = DesignerWorker::new(network, None, registry, &config, cmd_rx, msg_tx);
    let worker_handle = runtime.spawn(worker.run());

    let initial = wait_for_chart(&bridge).context("No initial chart from designer worker")?;
    log_chart("initial", &initial);

    let first = sim.open_channel("alice", "bob", 250_000, 50_000)?;
    refresh_and_log(&bridge, "alice -> bob opened")?;

    sim.open_pending_channel("bob", "carol", 100_000)?;
    refresh_and_log(&bridge, "bob -> carol pending")?;

    sim.mine_blocks(6);
    refresh_and_log(&bridge, "blocks mined")?;

    sim.set_online("carol", false)?;
    sim.close_channel(&first)?;
    refresh_and_log(&bridge, "carol offline, alice -> bob closed")?;

    // Signal the worker to stop and wait for it
    tracing::info!("Shutting down...");
    events.unsubscribe(&subscription);
    bridge.shutdown();
    runtime
        .block_on(worker_handle)
        .context("Designer worker panicked")?;
    dispatcher.shutdown();

    Ok(())
}

fn init_logging(config: &AppConfig) -> Option<WorkerGuard> {
    let (file_layer, guard) = match config.resolved_log_dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "lnsim.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,lnsim_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn demo_network(sim: &SimulatedBackend) -> Network {
    let mut network = Network::new(1, "demo");
    network.nodes.bitcoin.push(BitcoinNode::new(0, "backend1"));

    let nodes = [
        ("alice", NodeImplementation::Lnd),
        ("bob", NodeImplementation::CLightning),
        ("carol", NodeImplementation::Eclair),
    ];
    for (id, (name, implementation)) in nodes.into_iter().enumerate() {
        network.nodes.lightning.push(
            LightningNode::new(id as u32, name, implementation, "backend1")
                .with_status(NodeStatus::Started),
        );
        sim.add_node(name, format!("{:02x}{:064x}", 2 + id, id + 1));
    }

    network
}

fn refresh_and_log(bridge: &DesignerBridge, step: &str) -> anyhow::Result<()> {
    bridge.refresh();
    let chart = wait_for_chart(bridge).with_context(|| format!("No chart after '{}'", step))?;
    log_chart(step, &chart);
    Ok(())
}

/// Block until the worker publishes its next chart.
fn wait_for_chart(bridge: &DesignerBridge) -> Option<Arc<Chart>> {
    loop {
        match bridge.msg_rx.recv_timeout(STEP_TIMEOUT).ok()? {
            DesignerMessage::Chart(chart) => return Some(chart),
            DesignerMessage::NodeError { node, message } => {
                tracing::warn!("Node {} unavailable: {}", node, message);
            }
            DesignerMessage::Shutdown => return None,
        }
    }
}

fn log_chart(step: &str, chart: &Chart) {
    tracing::info!(
        "[{}] {} node(s), {} link(s)",
        step,
        chart.nodes.len(),
        chart.links.len()
    );
    for link in chart.channel_links() {
        tracing::info!(
            "  {} {} -> {} {:?} capacity={}",
            link.id,
            link.from.node_id,
            link.to.node_id,
            link.properties.kind,
            link.properties.capacity.as_deref().unwrap_or("-")
        );
    }
}
