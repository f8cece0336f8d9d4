//! Project descriptions
//!
//! Everything needed to turn a `proj.bscf` tree into a flat list of
//! [`Target`]s: the directive language, `IF` conditions, source scans and
//! retrieval of remote sub-projects.

pub mod condition;
pub mod directive;
pub mod fetch;
pub mod parser;
pub mod sources;
pub mod target;

pub use condition::{HostEnv, HostOs};
pub use fetch::{Fetcher, GitFetcher, Source};
pub use parser::{Diagnostic, Parser, ProjectGraph};
pub use target::{Target, TargetKind};
