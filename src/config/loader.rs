//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{app_dir, ConfigFile, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// File name of the config inside the application directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to render default config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `~/.config/hyperatomic/config.toml`.
pub fn default_config_path() -> PathBuf {
    app_dir().join(CONFIG_FILE_NAME)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(content)?;
    validate_config(&file.hyperatomic).map_err(ConfigError::Validation)?;
    Ok(file.hyperatomic)
}

/// Write the default configuration to `path` unless a file already exists.
///
/// Creates the parent directory as needed. Returns `true` when a new file was
/// written.
pub fn ensure_config_exists(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let rendered = toml::to_string_pretty(&ConfigFile::default())?;
    fs::write(path, rendered).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), "Wrote default configuration");
    Ok(true)
}

/// First-run aware load: create the default file if missing, then load it.
pub fn load_or_init(path: &Path) -> Result<ServiceConfig, ConfigError> {
    ensure_config_exists(path)?;
    let config = load_config(path)?;

    if config.log_threshold().is_none() {
        tracing::warn!(
            log_level = %config.logging.log_level,
            "Unrecognized log level, every record will be emitted"
        );
    }

    Ok(config)
}
