//! Configuration module for bscf
//!
//! Provides XDG-compliant layered loading of tool settings.

pub mod loader;
pub mod model;

pub use loader::{config_paths, load_config};
pub use model::*;
