//! Domain vocabulary shared by every lockerdesk crate.
//!
//! Nothing in here performs I/O. The store, the live channel and the HTTP
//! layer all speak in terms of these types so that a door's status, its
//! assignee and the deltas describing its changes mean the same thing on
//! both sides of every boundary.

pub mod assignee;
pub mod delta;
pub mod door;
pub mod error;
pub mod types;
