//! # vigil-capabilities
//!
//! Interfaces to everything the vigil core depends on but does not own:
//!
//! - [`Blacklist`] lookup/insert, with [`MemoryBlacklist`] and the
//!   [`spawn_blacklist_sync`] initialisation task
//! - [`EventBus`] relay, with [`HttpEventBus`] and [`BroadcastEventBus`]
//! - [`SabotageDispatcher`], [`PhysicalControl`] and [`Intelligence`] peers,
//!   reached through lazily connected HTTP adapters
//! - [`ScreenControl`], implemented by the server over its session registry
//!
//! Every failure is a [`CapabilityError`]; the core logs these and keeps
//! processing heartbeats.

#![deny(unsafe_code)]

pub mod adapters;
pub mod blacklist;
pub mod connection;
pub mod errors;
pub mod event_bus;
pub mod traits;

pub use adapters::{HttpIntelligence, HttpPhysicalControl, HttpSabotageDispatcher, IntelligenceTimeouts};
pub use blacklist::{MemoryBlacklist, spawn_blacklist_sync};
pub use connection::{ConnectionState, HttpHandle, LazyConnection};
pub use errors::{CapabilityError, Result};
pub use event_bus::{BroadcastEventBus, BusMessage, HttpEventBus};
pub use traits::{
    AppListVerdict, Blacklist, EventBus, Intelligence, PhysicalControl, SabotageDispatcher,
    ScreenControl,
};
