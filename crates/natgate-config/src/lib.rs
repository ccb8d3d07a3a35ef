//! Manifest discovery and loading for natgate

pub mod error;
pub mod manifest;

pub use error::*;
pub use manifest::{GatewaySpec, Manifest, WaitOverrides, WaitSettings, load_manifest};

use std::path::PathBuf;

/// Environment variable pointing directly at a manifest
pub const CONFIG_PATH_ENV: &str = "NATGATE_CONFIG_PATH";

const MANIFEST_CANDIDATES: [&str; 4] = [
    "natgate.local.yaml",
    ".natgate.local.yaml",
    "natgate.yaml",
    ".natgate.yaml",
];

/// Global natgate config directory, created on first use
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("natgate");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Locate the project manifest
///
/// Search order:
/// 1. `NATGATE_CONFIG_PATH`
/// 2. current directory: natgate.local.yaml, .natgate.local.yaml, natgate.yaml, .natgate.yaml
/// 3. the same names under `./.natgate/`
/// 4. `~/.config/natgate/natgate.yaml`
pub fn find_manifest_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points at missing file {}", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;

    for filename in &MANIFEST_CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let natgate_dir = current_dir.join(".natgate");
    if natgate_dir.is_dir() {
        for filename in &MANIFEST_CANDIDATES {
            let path = natgate_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("natgate").join("natgate.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ManifestNotFound)
}
