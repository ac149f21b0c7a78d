//! Configuration file loading
//!
//! Any `serde` type can be read from TOML or YAML. The format follows the file
//! extension; files without a known extension are tried as TOML, then YAML.

use crate::error::{RescueError, RescueResult};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Guess the format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Some(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }
}

/// Parse a TOML document
pub fn from_toml<T: DeserializeOwned>(contents: &str) -> RescueResult<T> {
    Ok(toml::from_str(contents)?)
}

/// Parse a YAML document
pub fn from_yaml<T: DeserializeOwned>(contents: &str) -> RescueResult<T> {
    Ok(serde_yaml::from_str(contents)?)
}

/// Load a config file, auto-detecting its format
pub fn from_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> RescueResult<T> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        RescueError::config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    match ConfigFormat::from_path(path) {
        Some(ConfigFormat::Toml) => from_toml(&contents),
        Some(ConfigFormat::Yaml) => from_yaml(&contents),
        None => from_toml(&contents).or_else(|_| from_yaml(&contents)),
    }
}

/// Candidate locations for `<stem>.toml` / `<stem>.yaml`
///
/// Search order: the working directory, then `~/.config/<stem>/`.
pub fn search_paths(stem: &str) -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(format!("{}.toml", stem)),
        PathBuf::from(format!("{}.yaml", stem)),
    ];
    if let Some(home) = dirs::home_dir() {
        let dir = home.join(".config").join(stem);
        paths.push(dir.join("config.toml"));
        paths.push(dir.join("config.yaml"));
    }
    paths
}

/// Load the first config file that exists on the search path
pub fn find_and_load<T: DeserializeOwned>(stem: &str) -> RescueResult<Option<T>> {
    for path in search_paths(stem) {
        if path.exists() {
            log::info!("Loading configuration from {}", path.display());
            return from_file(&path).map(Some);
        }
    }
    Ok(None)
}
