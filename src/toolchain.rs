//! Compiler toolchains
//!
//! A [`Toolchain`] is the four commands a plan needs: C compiler, C++
//! compiler, linker and archiver. Detection only searches `PATH`; it never
//! validates compiler behavior.

use serde::Serialize;

use crate::error::BuildError;

/// Toolchain family, also the identifier used by `IF COMPILER`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainId {
    Gnu,
    Clang,
    Msvc,
}

impl ToolchainId {
    /// Detection order (first available wins)
    pub const PREFERENCE: [ToolchainId; 3] = [ToolchainId::Gnu, ToolchainId::Clang, ToolchainId::Msvc];

    /// Parse a lowercase identifier (`gnu`, `clang`, `msvc`)
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gnu" => Some(ToolchainId::Gnu),
            "clang" => Some(ToolchainId::Clang),
            "msvc" => Some(ToolchainId::Msvc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainId::Gnu => "gnu",
            ToolchainId::Clang => "clang",
            ToolchainId::Msvc => "msvc",
        }
    }
}

impl std::fmt::Display for ToolchainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands used to compile, link and archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toolchain {
    pub id: ToolchainId,
    pub cc: String,
    pub cxx: String,
    pub link: String,
    pub ar: String,
}

impl Toolchain {
    pub fn gnu() -> Self {
        Self {
            id: ToolchainId::Gnu,
            cc: "gcc".to_string(),
            cxx: "g++".to_string(),
            link: "g++".to_string(),
            ar: "ar".to_string(),
        }
    }

    pub fn clang() -> Self {
        Self {
            id: ToolchainId::Clang,
            cc: "clang".to_string(),
            cxx: "clang++".to_string(),
            link: "clang++".to_string(),
            ar: "ar".to_string(),
        }
    }

    pub fn msvc() -> Self {
        Self {
            id: ToolchainId::Msvc,
            cc: "cl".to_string(),
            cxx: "cl".to_string(),
            link: "link".to_string(),
            ar: "lib".to_string(),
        }
    }

    /// Whether the C compiler of this toolchain can be found on `PATH`
    pub fn is_available(&self) -> bool {
        which::which(&self.cc).is_ok()
    }
}

/// Pick the first available toolchain in [`ToolchainId::PREFERENCE`] order
///
/// `resolve` maps an identifier to the concrete commands (usually
/// [`crate::config::Config::toolchain`], so configured overrides are checked).
pub fn detect_toolchain(resolve: impl Fn(ToolchainId) -> Toolchain) -> Result<Toolchain, BuildError> {
    let mut tried = Vec::new();
    for id in ToolchainId::PREFERENCE {
        let toolchain = resolve(id);
        if toolchain.is_available() {
            tracing::debug!("Detected {} toolchain ({})", id, toolchain.cc);
            return Ok(toolchain);
        }
        tried.push(toolchain.cc);
    }
    Err(BuildError::NoToolchain { tried })
}
