pub mod types;

pub use types::{AiConfig, AnalysisDefaults, Config};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = ".kube-doctor.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not determine the home directory")]
    NoHomeDir,
}

/// Get the global config file path (~/.kube-doctor.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// The explicit path, else the global one.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => global_config_path().ok_or(ConfigError::NoHomeDir),
    }
}

/// Load configuration, falling back to defaults when the file does not exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = resolve_path(explicit)?;

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
}

/// Save configuration, returning the path written.
pub fn save_config(config: &Config, explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = resolve_path(explicit)?;
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
    }
    fs::write(&path, content).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}
