//! Remote sub-project retrieval
//!
//! `GITINCLUDE` and `BUILTIN` pull sub-projects into `lib/<name>` before
//! they are parsed. Retrieval goes through the [`Fetcher`] trait so parsing
//! can be exercised without network access.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::ProjectError;

/// Where to fetch a sub-project from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub url: String,
    pub branch: Option<String>,
}

impl Source {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

/// Retrieves a source tree into a destination directory
///
/// Implementations must leave an existing checkout usable when they fail.
#[cfg_attr(test, mockall::automock)]
pub trait Fetcher {
    /// Clone `source` into `dest`, or update `dest` if it already exists.
    /// Returns whether the tree is now current.
    fn fetch(&self, source: &Source, dest: &Path) -> bool;
}

/// Fetcher backed by the `git` command line
#[derive(Debug, Clone)]
pub struct GitFetcher {
    git_command: String,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl GitFetcher {
    pub fn new() -> Self {
        Self {
            git_command: "git".to_string(),
        }
    }

    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            git_command: command.into(),
        }
    }

    fn git(&self, args: &[&str]) -> bool {
        tracing::debug!("{} {}", self.git_command, args.join(" "));
        match Command::new(&self.git_command)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::warn!("Failed to run {}: {}", self.git_command, e);
                false
            }
        }
    }
}

impl Fetcher for GitFetcher {
    fn fetch(&self, source: &Source, dest: &Path) -> bool {
        if which::which(&self.git_command).is_err() {
            tracing::warn!("{} is not installed", self.git_command);
            return false;
        }

        let dest_str = dest.to_string_lossy();
        if dest.exists() {
            let mut pull = vec!["-C", dest_str.as_ref(), "pull"];
            if let Some(branch) = &source.branch {
                pull.extend(["origin", branch.as_str()]);
            }
            self.git(&["-C", dest_str.as_ref(), "reset", "--hard"]) && self.git(&pull)
        } else {
            let mut clone = vec!["clone"];
            if let Some(branch) = &source.branch {
                clone.extend(["--branch", branch.as_str()]);
            }
            clone.extend([source.url.as_str(), dest_str.as_ref()]);
            self.git(&clone)
        }
    }
}

/// A sub-project known by name to `BUILTIN`
///
/// The library sources and its project description live in separate
/// repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    /// Upstream library sources
    pub repository: &'static str,
    /// Repository holding the matching project description
    pub description: &'static str,
}

const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "glfw",
        repository: "https://github.com/glfw/glfw",
        description: "https://github.com/bscf-db/glfw",
    },
    Builtin {
        name: "whereami",
        repository: "https://github.com/gpakosz/whereami",
        description: "https://github.com/bscf-db/whereami",
    },
];

/// Staging directory for the description repository inside a builtin
const DESCRIPTION_STAGING: &str = "bscf-db";

pub fn lookup_builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// Fetch a builtin into `lib_dir/<name>` and install its project description
pub fn fetch_builtin(
    fetcher: &dyn Fetcher,
    name: &str,
    lib_dir: &Path,
    config_file: &str,
) -> Result<PathBuf, ProjectError> {
    let builtin = lookup_builtin(name).ok_or_else(|| ProjectError::UnknownBuiltin(name.to_string()))?;

    let dest = lib_dir.join(builtin.name);
    if !fetcher.fetch(&Source::new(builtin.repository), &dest) {
        return Err(ProjectError::FetchFailed {
            name: builtin.name.to_string(),
            url: builtin.repository.to_string(),
        });
    }

    let staging = dest.join(DESCRIPTION_STAGING);
    if !fetcher.fetch(&Source::new(builtin.description), &staging) {
        return Err(ProjectError::FetchFailed {
            name: builtin.name.to_string(),
            url: builtin.description.to_string(),
        });
    }

    fs::copy(staging.join(config_file), dest.join(config_file))?;
    if let Err(e) = fs::remove_dir_all(&staging) {
        tracing::debug!("Could not remove {}: {}", staging.display(), e);
    }

    Ok(dest)
}
