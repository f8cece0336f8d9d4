//! Command execution
//!
//! Runs plan commands through the configured shell with optional timeout
//! and bounded output capture.

pub mod process;

pub use process::*;
