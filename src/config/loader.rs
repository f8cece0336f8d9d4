//! Configuration loader with XDG-compliant path resolution
//!
//! Loads configuration from multiple locations with layered priority:
//! 1. `/etc/bscf/config.toml` (lowest priority)
//! 2. `~/.config/bscf/config.toml`
//! 3. `~/.bscf.toml`
//! 4. `<project>/.bscf.toml` (highest priority)
//!
//! followed by an explicit `--config` file and `BSCF_*` environment
//! variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use super::model::Config;

/// Application name used for XDG directories
const APP_NAME: &str = "bscf";

/// Config search paths for `project` in priority order (lowest to highest)
pub fn config_paths(project: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from(format!("/etc/{}/config.toml", APP_NAME)));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(APP_NAME).join("config.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(format!(".{}.toml", APP_NAME)));
    }

    paths.push(project.join(format!(".{}.toml", APP_NAME)));

    paths
}

/// Load configuration with XDG layering
///
/// Later files override earlier ones. Environment variables with prefix
/// `BSCF_` override all file-based configuration, using `__` as the section
/// separator (`BSCF_DEFAULTS__ECHO=true` sets `defaults.echo`).
///
/// # Arguments
/// * `project` - Project directory whose `.bscf.toml` is layered last
/// * `override_path` - Optional path to a config file that takes highest file priority
pub fn load_config(project: &Path, override_path: Option<&str>) -> Result<Config> {
    let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

    for path in config_paths(project) {
        if path.exists() {
            tracing::debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(&path));
        }
    }

    if let Some(path) = override_path {
        let path = PathBuf::from(path);
        if path.exists() {
            tracing::debug!("Loading override config from: {}", path.display());
            figment = figment.merge(Toml::file(&path));
        } else {
            tracing::warn!("Override config not found: {}", path.display());
        }
    }

    figment = figment.merge(Env::prefixed("BSCF_").split("__"));

    figment.extract().context("Failed to load configuration")
}
