//! WebSocket infrastructure for the live monitor.
//!
//! Provides connection and group management, heartbeat pings, and the HTTP
//! upgrade handler. [`WsManager`] is also the [`pulseward_events::VitalsHub`]
//! the simulation publishes through.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::{handle_client_message, ws_handler, ClientMessage};
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
