//! WebSocket transport for heartbeat sessions.

pub mod frame;
pub mod session;

pub use frame::{decode_heartbeat, encode_command, heartbeat_stream};
pub use session::run_ws_session;
