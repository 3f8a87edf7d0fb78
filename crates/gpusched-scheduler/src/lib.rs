//! gpusched-scheduler: GPU slot allocation and dispatch
//!
//! This crate places commands onto devices:
//! - First-fit slot allocation over the slot table
//! - The dispatch loop that admits commands in order and waits for free slots

pub mod allocator;
pub mod dispatch;

pub use allocator::Allocator;
pub use dispatch::{Dispatched, Dispatcher};
