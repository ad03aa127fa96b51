//! # vigil
//!
//! vigil server binary: loads settings, wires the capability adapters into
//! the server and runs until SIGINT/SIGTERM.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vigil_capabilities::{
    BroadcastEventBus, EventBus, HttpEventBus, HttpIntelligence, HttpPhysicalControl, HttpSabotageDispatcher,
    IntelligenceTimeouts, MemoryBlacklist, spawn_blacklist_sync,
};
use vigil_server::shutdown::{ShutdownCoordinator, wait_for_signal};
use vigil_server::{Capabilities, ServerConfig, VigilServer};
use vigil_settings::{EventBusKind, VigilSettings};

/// vigil attention server.
#[derive(Parser, Debug)]
#[command(name = "vigil", about = "vigil attention server")]
struct Cli {
    /// Settings file (defaults to `~/.vigil/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,
}

impl Cli {
    fn settings_path(&self) -> PathBuf {
        self.settings.clone().unwrap_or_else(vigil_settings::settings_path)
    }

    fn apply(&self, settings: &mut VigilSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
    }
}

fn build_event_bus(settings: &VigilSettings) -> Option<Arc<dyn EventBus>> {
    let bus = &settings.event_bus;
    match bus.kind {
        EventBusKind::Disabled => None,
        EventBusKind::Local => Some(Arc::new(BroadcastEventBus::new(bus.topic.as_str(), bus.local_capacity))),
        EventBusKind::Http => bus.relay_endpoint().map(|url| {
            Arc::new(HttpEventBus::new(
                url,
                bus.topic.as_str(),
                settings.capabilities.routing_timeout(),
            )) as Arc<dyn EventBus>
        }),
    }
}

fn build_capabilities(settings: &VigilSettings, blacklist: Arc<MemoryBlacklist>) -> Capabilities {
    let caps = &settings.capabilities;
    let endpoint = |value: Option<&str>| value.map(str::to_owned);

    Capabilities {
        blacklist,
        sabotage: Arc::new(HttpSabotageDispatcher::new(
            endpoint(caps.sabotage_endpoint()),
            caps.routing_timeout(),
        )),
        physical: Arc::new(HttpPhysicalControl::new(
            endpoint(caps.physical_control_endpoint()),
            caps.routing_timeout(),
        )),
        intelligence: Arc::new(HttpIntelligence::new(
            endpoint(caps.intelligence_endpoint()),
            IntelligenceTimeouts {
                analysis: caps.analysis_timeout(),
                classify: caps.classify_timeout(),
                app_list: caps.app_list_timeout(),
            },
        )),
        event_bus: build_event_bus(settings),
    }
}

/// Start the blacklist sync when a URL is configured. The task gives up
/// when shutdown begins.
fn start_blacklist_sync(
    settings: &VigilSettings,
    blacklist: Arc<MemoryBlacklist>,
    shutdown: &ShutdownCoordinator,
) -> Option<JoinHandle<()>> {
    let url = settings.blacklist.sync_endpoint()?.to_owned();
    let sync = spawn_blacklist_sync(blacklist, url, settings.blacklist.sync_delay());
    let token = shutdown.token();

    Some(tokio::spawn(async move {
        tokio::select! {
            outcome = sync => match outcome {
                Ok(Ok(count)) => info!(count, "blacklist sync complete"),
                Ok(Err(error)) => warn!(%error, "blacklist sync failed"),
                Err(error) => warn!(%error, "blacklist sync task failed"),
            },
            () = token.cancelled() => info!("blacklist sync abandoned on shutdown"),
        }
    }))
}

fn log_capabilities(settings: &VigilSettings) {
    let caps = &settings.capabilities;
    for (name, endpoint) in [
        ("sabotage", caps.sabotage_endpoint()),
        ("physical_control", caps.physical_control_endpoint()),
        ("intelligence", caps.intelligence_endpoint()),
    ] {
        match endpoint {
            Some(endpoint) => info!(capability = name, endpoint, "capability configured"),
            None => warn!(capability = name, "capability not configured, calls will fail"),
        }
    }
    info!(kind = ?settings.event_bus.kind, topic = %settings.event_bus.topic, "event bus");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli.settings_path();
    let mut settings = vigil_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;
    cli.apply(&mut settings);

    vigil_logging::init_subscriber(&settings.logging.level, settings.logging.json);
    info!(path = %settings_path.display(), version = %settings.version, "settings loaded");
    log_capabilities(&settings);

    let prometheus = vigil_server::metrics::install_recorder().context("failed to install metrics recorder")?;

    let blacklist = Arc::new(MemoryBlacklist::with_entries(
        &settings.blacklist.apps,
        &settings.blacklist.urls,
    ));
    info!(
        apps = blacklist.app_count(),
        urls = blacklist.url_count(),
        "blacklist seeded"
    );

    let config = ServerConfig::from_settings(&settings);
    let shutdown_timeout = config.shutdown_timeout;
    let server = VigilServer::new(config, build_capabilities(&settings, blacklist.clone())).with_metrics(prometheus);

    let listener = server
        .bind()
        .await
        .with_context(|| format!("failed to bind {}", server.config().bind_addr()))?;
    let (addr, server_task) = server.spawn(listener).context("failed to start listener")?;
    info!(%addr, "vigil ready");

    let mut tasks = vec![server_task];
    tasks.extend(start_blacklist_sync(&settings, blacklist, server.shutdown()));

    wait_for_signal().await;
    info!("shutting down");
    server
        .shutdown()
        .graceful_shutdown(tasks, Some(shutdown_timeout))
        .await;
    info!("shutdown complete");
    Ok(())
}
