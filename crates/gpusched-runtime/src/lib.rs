//! gpusched-runtime: Job runner
//!
//! This crate launches admitted commands and returns their slots:
//! - The `Launcher` trait and `JobHandle`
//! - Process-based launcher running commands through a shell

pub mod process;
pub mod traits;

pub use process::{ProcessLauncher, ProcessLauncherConfig};
pub use traits::{JobHandle, Launcher};
