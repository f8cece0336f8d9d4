//! Error types for bscf
//!
//! Errors are layered: parsing ([`ProjectError`]), dependency resolution
//! ([`ResolveError`]) and the top-level [`BuildError`] that wraps both and
//! adds execution failures. Failures of external commands carry a suggestion
//! derived from their stderr.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while reading and expanding project descriptions
#[derive(Error, Debug)]
pub enum ProjectError {
    /// The root project has no configuration file
    #[error("{file} does not exist in {}", dir.display())]
    MissingConfig { dir: PathBuf, file: String },

    /// A project includes itself, directly or through other projects
    #[error("Cyclic include: {}", chain.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(" -> "))]
    CyclicInclude { chain: Vec<PathBuf> },

    /// A remote or builtin sub-project could not be retrieved
    #[error("Failed to fetch '{name}' from {url}")]
    FetchFailed { name: String, url: String },

    /// A builtin name that the registry does not know
    #[error("Unknown builtin: {0}")]
    UnknownBuiltin(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while resolving the dependency graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A DEPEND names a target that is not part of the build
    #[error("Target '{target}' depends on unknown target '{dependency}'")]
    MissingDependency { target: String, dependency: String },

    /// Dependency edges form a cycle
    #[error("Cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// Two targets share a name
    #[error("Target '{name}' is declared in both {first} and {second}")]
    DuplicateTarget {
        name: String,
        first: String,
        second: String,
    },
}

/// Main error type for build operations
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// No usable compiler toolchain was found on this machine
    #[error("No compiler toolchain found (tried {})", tried.join(", "))]
    NoToolchain { tried: Vec<String> },

    /// Requested target is not declared anywhere in the project tree
    #[error("Target '{name}' not found")]
    TargetNotFound {
        name: String,
        available: Vec<String>,
    },

    /// Command execution failed
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
        suggestion: Option<String>,
    },

    /// Failed to spawn the command
    #[error("Failed to spawn command: {command}")]
    SpawnFailed { command: String, error: String },

    /// Command timed out
    #[error("Command timed out after {timeout_secs}s: {command}")]
    Timeout { command: String, timeout_secs: u64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializable error info used in JSON build reports
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl From<&BuildError> for ErrorInfo {
    fn from(err: &BuildError) -> Self {
        let (error_type, suggestion, exit_code) = match err {
            BuildError::Project(ProjectError::MissingConfig { file, .. }) => (
                "missing_config",
                Some(format!("Create a {} in the project root", file)),
                None,
            ),
            BuildError::Project(_) => ("project_error", None, None),
            BuildError::Resolve(ResolveError::MissingDependency { dependency, .. }) => (
                "missing_dependency",
                Some(format!(
                    "Declare '{}' with TARGET or INCLUDE the project that provides it",
                    dependency
                )),
                None,
            ),
            BuildError::Resolve(_) => ("resolve_error", None, None),
            BuildError::NoToolchain { .. } => (
                "no_toolchain",
                Some("Install gcc, clang or MSVC, or configure [toolchains] paths".to_string()),
                None,
            ),
            BuildError::TargetNotFound { available, .. } => (
                "target_not_found",
                suggest_target(available),
                None,
            ),
            BuildError::CommandFailed {
                exit_code,
                suggestion,
                ..
            } => ("command_failed", suggestion.clone(), *exit_code),
            BuildError::SpawnFailed { error, .. } => (
                "spawn_failed",
                Some(format!("Check that the shell is available: {}", error)),
                None,
            ),
            BuildError::Timeout { .. } => (
                "timeout",
                Some("Raise [execution].timeout_secs or check for a hung command".to_string()),
                None,
            ),
            BuildError::Config(_) => (
                "config_error",
                Some("Check your bscf configuration file".to_string()),
                None,
            ),
            BuildError::Io(_) => ("io_error", None, None),
        };

        ErrorInfo {
            message: err.to_string(),
            error_type: error_type.to_string(),
            suggestion,
            exit_code,
        }
    }
}

fn suggest_target(available: &[String]) -> Option<String> {
    if available.is_empty() {
        None
    } else {
        Some(format!("Available targets: {}", available.join(", ")))
    }
}

/// Matches "fatal error: foo.h: No such file or directory" from gcc/clang
static MISSING_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:fatal error|error):\s*'?([^':\s]+\.(?:h|hh|hpp|hxx|inl))'?(?::| file not found)")
        .unwrap()
});

/// Matches "cannot find -lfoo" from ld
static MISSING_LIB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"cannot find -l([A-Za-z0-9_.+-]+)").unwrap());

/// Suggest fixes for common compiler, linker and shell failures
pub fn suggest_fix(command: &str, stderr: &str) -> Option<String> {
    if let Some(caps) = MISSING_HEADER_RE.captures(stderr) {
        return Some(format!(
            "Header '{}' not found. Add an INCDIR for it or DEPEND on the target that provides it.",
            &caps[1]
        ));
    }

    if let Some(caps) = MISSING_LIB_RE.captures(stderr) {
        return Some(format!(
            "Linker cannot find library '{}'. Check the LIB directive or build the library target first.",
            &caps[1]
        ));
    }

    if stderr.contains("undefined reference") || stderr.contains("Undefined symbols") {
        return Some(
            "Unresolved symbols at link time. Add the missing LIB or DEPEND directive.".to_string(),
        );
    }

    if stderr.contains("Permission denied") {
        return Some(
            "Permission denied. Check file permissions or run with appropriate access.".to_string(),
        );
    }

    if stderr.contains("command not found") || stderr.contains("not recognized as") {
        let program = command.split_whitespace().next().unwrap_or(command);
        return Some(format!(
            "'{}' not found. Install it or select another toolchain (gnu, clang, msvc).",
            program
        ));
    }

    if stderr.contains("No such file") {
        return Some("File not found. Check the source paths in proj.bscf.".to_string());
    }

    None
}
