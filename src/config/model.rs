//! Configuration model for bscf
//!
//! Tool settings only. The project description itself lives in `proj.bscf`
//! and is handled by [`crate::project`].

use serde::{Deserialize, Serialize};

use crate::toolchain::{Toolchain, ToolchainId};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Initial values for the CLI session state
    #[serde(default)]
    pub defaults: Defaults,

    /// Names of the files and directories that make up a project
    #[serde(default)]
    pub layout: LayoutConfig,

    /// How plan commands are executed
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Commands used for each toolchain
    #[serde(default)]
    pub toolchains: ToolchainsConfig,
}

/// Initial session state, overridable by CLI tokens
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Toolchain to use: "auto", "gnu", "clang" or "msvc"
    #[serde(default = "default_toolchain")]
    pub toolchain: String,

    /// Print each command before running it
    #[serde(default)]
    pub echo: bool,

    /// Ignore the incremental cache
    #[serde(default)]
    pub force: bool,
}

fn default_toolchain() -> String {
    "auto".to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            toolchain: default_toolchain(),
            echo: false,
            force: false,
        }
    }
}

/// Project layout names
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Project description file name
    #[serde(default = "default_config_file")]
    pub config_file: String,

    /// Per-project output directory
    #[serde(default = "default_build_dir")]
    pub build_dir: String,

    /// Directory holding sub-projects
    #[serde(default = "default_lib_dir")]
    pub lib_dir: String,

    /// Directory scanned by `ALL`
    #[serde(default = "default_src_dir")]
    pub src_dir: String,
}

fn default_config_file() -> String {
    "proj.bscf".to_string()
}

fn default_build_dir() -> String {
    "build".to_string()
}

fn default_lib_dir() -> String {
    "lib".to_string()
}

fn default_src_dir() -> String {
    "src".to_string()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            config_file: default_config_file(),
            build_dir: default_build_dir(),
            lib_dir: default_lib_dir(),
            src_dir: default_src_dir(),
        }
    }
}

/// Command execution settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Shell used to run plan commands
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Per-command timeout in seconds (0 = wait forever)
    #[serde(default)]
    pub timeout_secs: u64,

    /// Maximum captured output per stream before truncation
    #[serde(default = "default_max_output")]
    pub max_output: usize,
}

fn default_shell() -> String {
    if cfg!(windows) {
        "cmd".to_string()
    } else {
        "sh".to_string()
    }
}

fn default_max_output() -> usize {
    100_000
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            timeout_secs: 0,
            max_output: default_max_output(),
        }
    }
}

/// Commands for a single toolchain
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ToolchainCommands {
    pub cc: String,
    pub cxx: String,
    pub link: String,
    pub ar: String,
}

/// Per-toolchain command overrides
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolchainsConfig {
    #[serde(default = "default_gnu")]
    pub gnu: ToolchainCommands,

    #[serde(default = "default_clang")]
    pub clang: ToolchainCommands,

    #[serde(default = "default_msvc")]
    pub msvc: ToolchainCommands,
}

fn commands_of(toolchain: Toolchain) -> ToolchainCommands {
    ToolchainCommands {
        cc: toolchain.cc,
        cxx: toolchain.cxx,
        link: toolchain.link,
        ar: toolchain.ar,
    }
}

fn default_gnu() -> ToolchainCommands {
    commands_of(Toolchain::gnu())
}

fn default_clang() -> ToolchainCommands {
    commands_of(Toolchain::clang())
}

fn default_msvc() -> ToolchainCommands {
    commands_of(Toolchain::msvc())
}

impl Default for ToolchainsConfig {
    fn default() -> Self {
        Self {
            gnu: default_gnu(),
            clang: default_clang(),
            msvc: default_msvc(),
        }
    }
}

impl Config {
    /// Toolchain record for `id` with any configured command overrides
    pub fn toolchain(&self, id: ToolchainId) -> Toolchain {
        let commands = match id {
            ToolchainId::Gnu => &self.toolchains.gnu,
            ToolchainId::Clang => &self.toolchains.clang,
            ToolchainId::Msvc => &self.toolchains.msvc,
        };
        Toolchain {
            id,
            cc: commands.cc.clone(),
            cxx: commands.cxx.clone(),
            link: commands.link.clone(),
            ar: commands.ar.clone(),
        }
    }

    /// Toolchain explicitly requested by `defaults.toolchain`, if any
    ///
    /// Returns `Ok(None)` for "auto".
    pub fn preferred_toolchain(&self) -> Result<Option<ToolchainId>, String> {
        match self.defaults.toolchain.to_lowercase().as_str() {
            "auto" | "" => Ok(None),
            other => ToolchainId::from_token(other)
                .map(Some)
                .ok_or_else(|| format!("unknown toolchain '{}'", other)),
        }
    }
}
