//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `bar-configure` command-line tool. Each subcommand is defined in its own
//! file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `bar_configure` library.

pub mod analyze;
pub mod configure;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use bar_configure::config::{self, ProjectConfig};
use bar_configure::defaults;
use bar_configure::overrides::Overrides;

/// Load the project configuration.
///
/// An explicitly given file must exist. Without one, `.bar-configure.yaml`
/// in the working directory is used if present, otherwise an empty
/// configuration. Returns the directory relative paths in the file are
/// resolved against.
pub(crate) fn load_config(path: Option<&Path>) -> Result<(ProjectConfig, PathBuf)> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    let path = match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let default = cwd.join(defaults::CONFIG_FILE);
            if !default.exists() {
                log::debug!("No {} found, using an empty configuration", defaults::CONFIG_FILE);
                return Ok((ProjectConfig::default(), cwd));
            }
            default
        }
    };

    let project = config::from_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or(cwd);
    Ok((project, base_dir))
}

/// Collect `-D key=value` flags into ordered overrides
pub(crate) fn command_line_overrides(pairs: &[(String, String)]) -> Overrides {
    pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}
