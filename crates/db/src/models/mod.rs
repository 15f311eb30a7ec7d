pub mod door;
pub mod guest;
pub mod locker;
