//! Centralized path resolution for hoststate
//!
//! # Environment Variables
//!
//! - `HOSTSTATE_CONFIG` - Path to the recipes file itself
//! - `HOSTSTATE_CONFIG_DIR` - Override config directory
//!
//! # Recipes File Resolution Priority
//!
//! 1. `--config PATH`
//! 2. `HOSTSTATE_CONFIG`
//! 3. `recipes.toml` in `config_dir()`, if it exists
//! 4. None: the built-in recipes are used
//!
//! For config_dir():
//! 1. `HOSTSTATE_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/hoststate` (if set)
//! 3. `~/.config/hoststate`

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// Environment variable naming the recipes file
pub const ENV_CONFIG: &str = "HOSTSTATE_CONFIG";

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "HOSTSTATE_CONFIG_DIR";

/// Recipes file name inside the config directory
pub const RECIPES_FILE: &str = "recipes.toml";

/// Get the hoststate config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("hoststate");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("hoststate");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Locate the recipes file, or `None` to fall back to the built-in recipes
///
/// An explicitly named file (flag or `HOSTSTATE_CONFIG`) must exist.
pub fn recipes_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        return require_file(path.to_path_buf(), "--config");
    }

    if let Ok(file) = std::env::var(ENV_CONFIG) {
        return require_file(expand(&file), ENV_CONFIG);
    }

    let path = config_dir()?.join(RECIPES_FILE);
    if path.is_file() {
        log::debug!("Using recipes file: {}", path.display());
        Ok(Some(path))
    } else {
        log::debug!("No {} found, using built-in recipes", path.display());
        Ok(None)
    }
}

fn require_file(path: PathBuf, origin: &str) -> Result<Option<PathBuf>> {
    if !path.is_file() {
        bail!("Recipes file from {} not found: {}", origin, path.display());
    }
    log::debug!("Using recipes file from {}: {}", origin, path.display());
    Ok(Some(path))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
