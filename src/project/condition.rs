//! `IF` condition evaluation
//!
//! Conditions test the host platform or the active toolchain:
//! `IF [NOT] PLATFORM <windows|linux|macos|bsd|unix>` and
//! `IF [NOT] COMPILER <gnu|msvc|clang>`.

use crate::toolchain::ToolchainId;

/// Operating system family of the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    Linux,
    MacOs,
    Bsd,
    Other,
}

impl HostOs {
    /// OS this binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            HostOs::Windows
        } else if cfg!(target_os = "linux") {
            HostOs::Linux
        } else if cfg!(target_os = "macos") {
            HostOs::MacOs
        } else if cfg!(any(
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly"
        )) {
            HostOs::Bsd
        } else {
            HostOs::Other
        }
    }

    pub fn is_unix(&self) -> bool {
        matches!(self, HostOs::Linux | HostOs::MacOs | HostOs::Bsd)
    }
}

/// Environment conditions are evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEnv {
    pub os: HostOs,
    pub toolchain: ToolchainId,
}

impl HostEnv {
    pub fn new(os: HostOs, toolchain: ToolchainId) -> Self {
        Self { os, toolchain }
    }

    /// `None` if `id` is not a known platform identifier
    pub fn matches_platform(&self, id: &str) -> Option<bool> {
        let matched = match id {
            "windows" => self.os == HostOs::Windows,
            "linux" => self.os == HostOs::Linux,
            "macos" => self.os == HostOs::MacOs,
            "bsd" => self.os == HostOs::Bsd,
            "unix" => self.os.is_unix(),
            _ => return None,
        };
        Some(matched)
    }

    /// `None` if `id` is not a known toolchain identifier
    pub fn matches_toolchain(&self, id: &str) -> Option<bool> {
        ToolchainId::from_token(id).map(|t| t == self.toolchain)
    }
}

/// Evaluate the tokens following `IF`
///
/// Returns whether the block is taken. Unknown tokens produce an `Err`
/// carrying the warning text; callers treat that as "not taken".
pub fn evaluate(tokens: &[&str], host: &HostEnv) -> Result<bool, String> {
    let (negate, rest) = match tokens.first() {
        Some(&"NOT") => (true, &tokens[1..]),
        _ => (false, tokens),
    };

    let (kind, value) = match rest {
        [kind, value, ..] => (*kind, *value),
        [kind] => return Err(format!("Missing value for IF {}", kind)),
        [] => return Err("Empty IF condition".to_string()),
    };

    let matched = match kind {
        "PLATFORM" => host
            .matches_platform(value)
            .ok_or_else(|| format!("Invalid platform: {}", value))?,
        "COMPILER" => host
            .matches_toolchain(value)
            .ok_or_else(|| format!("Invalid compiler: {}", value))?,
        other => return Err(format!("Invalid if command: {}", other)),
    };

    Ok(matched != negate)
}
