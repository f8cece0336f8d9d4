//! Target building: engine, runners and reports

pub mod engine;
pub mod report;
pub mod runner;

pub use engine::Builder;
pub use report::{BuildReport, Outcome, TargetReport};
pub use runner::{CommandRunner, ShellRunner};
