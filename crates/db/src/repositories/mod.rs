//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod client_repo;
pub mod door_repo;
pub mod guest_repo;
pub mod locker_repo;

pub use client_repo::ClientRepo;
pub use door_repo::DoorRepo;
pub use guest_repo::GuestRepo;
pub use locker_repo::LockerRepo;
