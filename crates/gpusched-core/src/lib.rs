//! gpusched-core: Core types for the gpusched dispatcher
//!
//! This crate provides the fundamental types used throughout gpusched:
//! - Device identifiers and device list parsing
//! - Jobs and the command queue
//! - The per-device slot table
//! - Configuration types
//! - Error handling

pub mod config;
pub mod error;
pub mod gpu;
pub mod job;
pub mod queue;
pub mod slots;

pub use config::*;
pub use error::*;
pub use gpu::*;
pub use job::*;
pub use queue::CommandQueue;
pub use slots::{DeviceLoad, SlotTable};
