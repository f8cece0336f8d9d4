//! bscf - build configuration engine for C and C++ projects
//!
//! Reads a line-oriented `proj.bscf` description of targets (executables,
//! static and dynamic libraries, interface targets), expands sub-projects
//! pulled in by path, git URL or builtin name, resolves the dependency
//! graph, and drives the host toolchain to build everything with
//! content-hash based incremental rebuilds.
//!
//! ## Pipeline
//!
//! - [`project`] - parse and expand project files into a target graph
//! - [`resolver`] - include sets and dependency validation
//! - [`plan`] - per-target compile, archive and link steps
//! - [`cache`] - fingerprints and up-to-date decisions
//! - [`build`] - depth-first execution with per-target outcomes
//! - [`session`] - command tokens applied left to right

pub mod build;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod plan;
pub mod project;
pub mod resolver;
pub mod session;
pub mod toolchain;

pub use build::{BuildReport, Builder, CommandRunner, Outcome, ShellRunner, TargetReport};
pub use cli::{Cli, OutputFormat};
pub use config::Config;
pub use error::{BuildError, ErrorInfo, ProjectError, ResolveError};
pub use executor::{run_shell, ExecOptions, ShellOutput};
pub use plan::{CommandPlan, PlanStep, Planner};
pub use project::{Fetcher, GitFetcher, Parser, ProjectGraph, Target, TargetKind};
pub use resolver::{Resolution, Resolver};
pub use session::{Session, SessionReport, Token};
pub use toolchain::{Toolchain, ToolchainId};
