use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_PORT: &str = "47731";
pub const DEFAULT_SCRIPT_PATH: &str = "docker-backup.sh";

/// Settings for the backup callback service
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: String,
    pub script_path: String,
    pub callback_secret: String,
    /// Not read from the config file; filled in by whoever sends callbacks.
    pub callback_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            script_path: DEFAULT_SCRIPT_PATH.to_string(),
            callback_secret: String::new(),
            callback_url: String::new(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("port", &self.port)
            .field("script_path", &self.script_path)
            .field("callback_secret", &"***")
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{key} not found in config file")]
    Validation { key: &'static str },
}

/// Load settings from a `key = value` file.
///
/// Blank lines and lines starting with `#` are skipped, as are lines without
/// an `=`. Only `port`, `scriptpath` and `callback_secret` are recognized;
/// later lines overwrite earlier ones. Fails if `callback_secret` ends up empty.
pub fn load_config(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let settings = parse_settings(&content)?;
    debug!(
        "Loaded config from {} (port {}, script {})",
        path.display(),
        settings.port,
        settings.script_path
    );
    Ok(settings)
}

/// Parse config file content on top of the defaults.
pub fn parse_settings(content: &str) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    for line in content.split('\n') {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "port" => settings.port = value.to_string(),
            "scriptpath" => settings.script_path = value.to_string(),
            "callback_secret" => settings.callback_secret = value.to_string(),
            other => debug!("Ignoring unknown config key {:?}", other),
        }
    }

    if settings.callback_secret.is_empty() {
        return Err(ConfigError::Validation {
            key: "callback_secret",
        });
    }

    Ok(settings)
}
