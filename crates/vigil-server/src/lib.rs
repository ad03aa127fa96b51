//! # vigil-server
//!
//! The vigil decision core behind an Axum server.
//!
//! - [`registry`]: client identity → outbound channel, shared by every task
//! - [`pipeline`]: one task per WebSocket session, heartbeats in order
//! - [`intervention`]: cooldown-gated alerts sent back through the registry
//! - [`reflex`]: blacklist short-circuit and best-effort activity relay
//! - [`routing`]: peer commands and results into live sessions
//! - [`api`], [`health`], [`metrics`]: HTTP surface
//! - [`shutdown`]: `CancellationToken`-based graceful shutdown

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod health;
pub mod intervention;
pub mod metrics;
pub mod pipeline;
pub mod reflex;
pub mod registry;
pub mod routing;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use pipeline::{HeartbeatPipeline, SessionEnd, SessionState};
pub use registry::{Delivery, SessionHandle, SessionRegistry, SessionStats, TransportError};
pub use routing::{CommandRouter, RegistryScreenControl, SolutionRouter};
pub use server::{AppState, Capabilities, VigilServer};
pub use shutdown::ShutdownCoordinator;
