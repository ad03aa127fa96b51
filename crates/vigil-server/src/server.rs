//! `VigilServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use vigil_capabilities::{
    Blacklist, EventBus, HttpIntelligence, HttpPhysicalControl, HttpSabotageDispatcher, Intelligence,
    IntelligenceTimeouts, MemoryBlacklist, PhysicalControl, SabotageDispatcher, ScreenControl,
};

use crate::api;
use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::intervention::InterventionEmitter;
use crate::pipeline::HeartbeatPipeline;
use crate::reflex::ReflexPath;
use crate::registry::SessionRegistry;
use crate::routing::{CommandRouter, RegistryScreenControl, SolutionRouter};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::run_ws_session;

/// External collaborators injected at the composition root.
#[derive(Clone)]
pub struct Capabilities {
    /// Blacklist lookups for the reflex path.
    pub blacklist: Arc<dyn Blacklist>,
    /// Sabotage peer for blacklist hits.
    pub sabotage: Arc<dyn SabotageDispatcher>,
    /// Physical actuator peer.
    pub physical: Arc<dyn PhysicalControl>,
    /// Analysis and classification peer.
    pub intelligence: Arc<dyn Intelligence>,
    /// Activity relay; `None` skips relaying.
    pub event_bus: Option<Arc<dyn EventBus>>,
}

impl Capabilities {
    /// Empty blacklist, no event bus, and peers with no endpoint. Every peer
    /// call fails with `Unavailable`.
    pub fn unconfigured() -> Self {
        let timeout = ServerConfig::default().routing_timeout;
        Self {
            blacklist: Arc::new(MemoryBlacklist::default()),
            sabotage: Arc::new(HttpSabotageDispatcher::new(None, timeout)),
            physical: Arc::new(HttpPhysicalControl::new(None, timeout)),
            intelligence: Arc::new(HttpIntelligence::new(None, IntelligenceTimeouts::default())),
            event_bus: None,
        }
    }
}

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions.
    pub registry: Arc<SessionRegistry>,
    /// Heartbeat pipeline shared by all sessions.
    pub pipeline: HeartbeatPipeline,
    /// Blacklist fast-path for posted activity events.
    pub reflex: ReflexPath,
    /// Peer action dispatch.
    pub commands: CommandRouter,
    /// Result display.
    pub solutions: SolutionRouter,
    /// Analysis and classification peer.
    pub intelligence: Arc<dyn Intelligence>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// When the server started.
    pub start_time: Instant,
}

/// The vigil server.
pub struct VigilServer {
    state: AppState,
    shutdown: Arc<ShutdownCoordinator>,
}

impl VigilServer {
    /// Wire the registry, pipeline and routers over `capabilities`.
    pub fn new(config: ServerConfig, capabilities: Capabilities) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let screen: Arc<dyn ScreenControl> = Arc::new(RegistryScreenControl::new(registry.clone()));

        let reflex = ReflexPath::new(
            capabilities.blacklist,
            capabilities.sabotage,
            capabilities.event_bus,
            config.routing_timeout,
        );
        let emitter = InterventionEmitter::new(registry.clone(), config.alert_cooldown);
        let pipeline = HeartbeatPipeline::new(registry.clone(), reflex.clone(), emitter);
        let commands = CommandRouter::new(capabilities.physical, screen.clone(), config.routing_timeout);

        Self {
            state: AppState {
                registry,
                pipeline,
                reflex,
                commands,
                solutions: SolutionRouter::new(screen),
                intelligence: capabilities.intelligence,
                config: Arc::new(config),
                metrics: None,
                start_time: Instant::now(),
            },
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .merge(api::routes())
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(self.state.config.bind_addr()).await
    }

    /// Serve on `listener` in a background task until shutdown is initiated.
    pub fn spawn(&self, listener: TcpListener) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();
        info!(%addr, "vigil server listening");

        let task = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(%error, "server error");
            }
            info!("listener stopped");
        });
        Ok((addr, task))
    }

    /// Live sessions.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.state.registry
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let pipeline = state.pipeline.clone();
    let buffer = state.config.outbound_buffer;
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let _ = run_ws_session(socket, pipeline, buffer).await;
        })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, state.registry.stats().await))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => crate::metrics::render(handle).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}
