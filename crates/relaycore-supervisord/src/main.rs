//! Composition root for the relaycore remote supervisor (spec §2 item 10).
//!
//! Loads configuration, wires every subsystem crate together, launches the
//! concurrent supervisors named in spec §5, and shuts down cleanly on
//! SIGTERM/SIGINT.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use relaycore_bus::{Broker, InProcessBus, LocalBus};
use relaycore_cloud::{CloudChannel, HttpAuthProvider, WebSocketTransport};
use relaycore_config::Config;
use relaycore_connectivity::{ConnectivitySupervisor, HttpProbe};
use relaycore_core::{ComponentKey, ComponentType};
use relaycore_ntp::NtpMonitor;
use relaycore_routing::{ComponentHealthRegistry, HeartbeatSupervisor, Router, SystemInfoModel};
use relaycore_telemetry::{setup_logging, LogFormat};
use relaycore_updater::{ContainerFetcher, PythonAppFetcher, SelfVersionFetcher, UpdateOrchestrator, VersionFetcher};
use tokio::sync::mpsc;
use tracing::info;

/// Shared-volume default for the update-request side of the filesystem RPC
/// (spec §6), overridable for local development and tests.
const DEFAULT_UPDATE_REQUEST_DIR: &str = "/var/relaycore/updates/requests";
/// Shared-volume default for the update-status side of the filesystem RPC.
const DEFAULT_UPDATE_STATUS_DIR: &str = "/var/relaycore/updates/status";

const INBOUND_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        // ConfigurationError and any other startup failure is fatal (spec
        // §7); a plain eprintln covers the case where logging itself
        // failed to initialize.
        eprintln!("relaycore-supervisord: fatal startup error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config_path = std::env::var("RELAYCORE_CONFIG").ok().map(PathBuf::from);
    let secrets_dir = std::env::var("RELAYCORE_SECRETS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| relaycore_config::default_secrets_dir());

    let config = relaycore_config::load(config_path.as_deref(), &secrets_dir).context("loading configuration")?;

    setup_logging(&config.log.level, LogFormat::Compact).context("initializing logging")?;
    info!(?config, "relaycore-supervisord starting");

    let broker = Arc::new(Broker::new());
    let controller_bus: Arc<dyn LocalBus> =
        Arc::new(InProcessBus::new(config.message_queue.subject_root.clone(), "controller", Arc::clone(&broker)));

    let connectivity = Arc::new(ConnectivitySupervisor::new(
        HttpProbe::new(config.websocket.test_domain.clone(), config.websocket.connection_timeout),
        config.websocket.connection_interval,
    ));
    let connectivity_join = connectivity.start().await;

    let ntp = Arc::new(NtpMonitor::new(config.ntp.servers.clone(), config.ntp.check_interval, config.ntp.timeout));

    let updater = Arc::new(build_orchestrator(&config));

    let system_info = Arc::new(SystemInfoModel::new());
    let health = Arc::new(ComponentHealthRegistry::new());

    let (inbound_tx, mut inbound_rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);

    let auth = Arc::new(HttpAuthProvider::new(
        config.auth.auth_url.clone(),
        config.auth.client_id.clone(),
        config.auth.client_secret.clone(),
        config.auth.username.clone(),
        config.auth.password.clone(),
    ));
    let cloud = CloudChannel::new(
        auth,
        Arc::new(WebSocketTransport),
        Arc::clone(&connectivity) as Arc<dyn relaycore_cloud::ConnectivityGate>,
        config.websocket.group_name.clone(),
        config.websocket.broadcast_initial_state,
        inbound_tx,
    );

    let heartbeat =
        HeartbeatSupervisor::new(Arc::clone(&cloud), config.websocket.heartbeat_every, config.websocket.heartbeat_loop_duration);

    let router = Router::new(
        Arc::clone(&controller_bus),
        Arc::clone(&cloud),
        Arc::clone(&updater),
        Arc::clone(&ntp),
        system_info,
        health,
        Arc::clone(&heartbeat),
    );

    controller_bus
        .start_listener(Arc::clone(&router) as Arc<dyn relaycore_bus::BusHandler>)
        .await
        .context("starting local bus listener")?;

    {
        let router_for_join = Arc::clone(&router);
        cloud.on_joined(move || router_for_join.publish_system_info_on_joined());
    }

    if config.websocket.enabled {
        cloud.start().await;
    }

    let ntp_join = Arc::clone(&ntp).start(router.ntp_sink()).await;
    let (alive_join, countdown_join) = heartbeat.start();
    let component_heartbeat_join =
        relaycore_routing::spawn_component_heartbeat_loop(Arc::clone(&controller_bus), ComponentKey::Remote);
    let update_check_join = Arc::clone(&updater).run_periodic_checks().await;

    let router_for_loop = Arc::clone(&router);
    let main_loop = tokio::spawn(async move {
        while let Some(envelope) = inbound_rx.recv().await {
            router_for_loop.handle_cloud_inbound(envelope).await;
        }
    });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, tearing down");

    cloud.stop().await;

    for handle in [
        connectivity_join,
        ntp_join,
        alive_join,
        countdown_join,
        component_heartbeat_join,
        update_check_join,
        main_loop,
    ] {
        handle.abort();
    }

    info!("relaycore-supervisord stopped cleanly");
    Ok(())
}

fn build_orchestrator(config: &Config) -> UpdateOrchestrator {
    let mut fetchers: HashMap<ComponentKey, (ComponentType, Arc<dyn VersionFetcher>)> = HashMap::new();
    fetchers.insert(
        ComponentKey::Core,
        (
            ComponentType::PythonApp,
            Arc::new(PythonAppFetcher::new(config.updater.core_install_path.clone())) as Arc<dyn VersionFetcher>,
        ),
    );
    fetchers.insert(
        ComponentKey::Scheduler,
        (
            ComponentType::Container,
            Arc::new(ContainerFetcher::new(config.updater.docker_compose_path.clone(), "scheduler")) as Arc<dyn VersionFetcher>,
        ),
    );
    fetchers.insert(
        ComponentKey::Remote,
        (
            ComponentType::Container,
            Arc::new(SelfVersionFetcher::new(env!("CARGO_PKG_VERSION"))) as Arc<dyn VersionFetcher>,
        ),
    );

    let update_request_dir =
        std::env::var("RELAYCORE_UPDATE_REQUEST_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(DEFAULT_UPDATE_REQUEST_DIR));
    let update_status_dir =
        std::env::var("RELAYCORE_UPDATE_STATUS_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(DEFAULT_UPDATE_STATUS_DIR));

    UpdateOrchestrator::new(
        fetchers,
        config.updater.github_account.clone(),
        config.updater.include_prerelease,
        config.updater.check_interval,
        update_request_dir,
        update_status_dir,
    )
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
