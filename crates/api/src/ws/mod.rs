//! Live locker sockets.
//!
//! Provides connection management, heartbeat pings, and the HTTP upgrade
//! handler that streams a locker's snapshot and deltas to a viewer.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::live_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
