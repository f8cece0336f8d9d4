//! Target model
//!
//! A [`Target`] is one buildable unit declared by a `TARGET` directive and
//! refined by the directives that follow it.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// What a target produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TargetKind {
    /// Linked executable binary
    Executable,
    /// Static archive
    StaticLibrary,
    /// Shared object / DLL
    DynamicLibrary,
    /// No artifact; only propagates libraries to dependents
    Interface,
}

impl TargetKind {
    /// Parse the kind keyword used in `TARGET <kind> <name>`
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "EXEC" => Some(TargetKind::Executable),
            "SLIB" => Some(TargetKind::StaticLibrary),
            "DLIB" => Some(TargetKind::DynamicLibrary),
            "INTERFACE" | "IFACE" => Some(TargetKind::Interface),
            _ => None,
        }
    }

    /// Keyword for this kind as written in `proj.bscf`
    pub fn keyword(&self) -> &'static str {
        match self {
            TargetKind::Executable => "EXEC",
            TargetKind::StaticLibrary => "SLIB",
            TargetKind::DynamicLibrary => "DLIB",
            TargetKind::Interface => "INTERFACE",
        }
    }

    /// Whether building this kind produces a file on disk
    pub fn produces_artifact(&self) -> bool {
        !matches!(self, TargetKind::Interface)
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A buildable unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub kind: TargetKind,
    pub name: String,
    /// Directory of the project that declared this target
    pub root: PathBuf,
    pub sources: Vec<PathBuf>,
    /// Names of targets this one depends on, in link order
    pub dependencies: Vec<String>,
    pub prebuild: Vec<String>,
    pub postbuild: Vec<String>,
    pub defines: Vec<String>,
    /// External libraries passed to the linker as `-l<name>`
    pub libraries: Vec<String>,
    /// Include directories exposed to this target and its dependents
    pub include_dirs: Vec<PathBuf>,
    /// Vendored or fetched target; an existing artifact counts as built
    pub is_external: bool,
}

impl Target {
    pub fn new(kind: TargetKind, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            name: name.into(),
            root: root.into(),
            sources: Vec::new(),
            dependencies: Vec::new(),
            prebuild: Vec::new(),
            postbuild: Vec::new(),
            defines: Vec::new(),
            libraries: Vec::new(),
            include_dirs: Vec::new(),
            is_external: false,
        }
    }

    pub fn with_sources<I, P>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let root = self.root.clone();
        self.sources
            .extend(sources.into_iter().map(|s| root.join(s.as_ref())));
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    pub fn with_library(mut self, name: impl Into<String>) -> Self {
        self.libraries.push(name.into());
        self
    }

    pub fn with_include_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = self.root.join(dir.as_ref());
        self.include_dirs.push(dir);
        self
    }

    pub fn external(mut self) -> Self {
        self.is_external = true;
        self
    }

    /// Add a include directory unless it is already present
    pub(crate) fn add_include_dir(&mut self, dir: PathBuf) {
        if !self.include_dirs.contains(&dir) {
            self.include_dirs.push(dir);
        }
    }
}
