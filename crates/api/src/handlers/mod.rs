pub mod doors;
pub mod lockers;
