//! CLI module for bscf
//!
//! A single command taking a project directory followed by command tokens,
//! e.g. `bscf . clean echo build`.

pub mod commands;

pub use commands::{Cli, OutputFormat};
