//! Door Occupancy Engine and everything that keeps viewers consistent
//! with it.
//!
//! Data flows one way:
//!
//! ```text
//! caller -> AssignmentOrchestrator -> (GuestResolver) -> OccupancyEngine
//!        -> OccupancyStore (atomic conditional update)
//!        -> LiveSyncChannel (best-effort broadcast)
//!        -> ViewerReconciler (every open view)
//! ```
//!
//! Mutual exclusion comes from the store's conditional update, never from
//! locking in this crate: the engine may be called concurrently from any
//! number of tasks.

pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod reconciler;
pub mod resolver;
pub mod retry;
pub mod store;

pub use engine::OccupancyEngine;
pub use error::{OccupancyError, ResolveError, StoreError};
pub use orchestrator::AssignmentOrchestrator;
pub use reconciler::{ConnectionStatus, DoorCache, SnapshotSource, ViewerReconciler};
pub use resolver::{GuestResolver, ResolvedGuest};
pub use retry::RetryPolicy;
pub use store::memory::InMemoryStore;
pub use store::postgres::PgOccupancyStore;
pub use store::OccupancyStore;
