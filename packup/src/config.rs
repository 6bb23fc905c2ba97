//! Persistent settings in `~/.packup/config.ini`.
//!
//! ```ini
//! [download]
//! parallel = 4
//! retries = 3
//! timeout = 300
//! cache_dir = /home/user/.packup/cache
//!
//! [logging]
//! file = /home/user/.packup/packup.log
//! ```
//!
//! Missing keys fall back to their defaults; unknown keys are ignored.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::download::{QueueConfig, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS};

/// Name of the per-user configuration directory.
pub const CONFIG_DIR_NAME: &str = ".packup";

/// Name of the configuration file inside [`config_dir`].
pub const CONFIG_FILE_NAME: &str = "config.ini";

const DOWNLOAD_SECTION: &str = "download";
const LOGGING_SECTION: &str = "logging";

/// Errors from reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("failed to write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {section}.{key}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
    },

    #[error("could not determine home directory")]
    NoHomeDir,
}

/// `~/.packup`
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR_NAME))
        .ok_or(ConfigError::NoHomeDir)
}

/// `~/.packup/config.ini`
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Concurrent transfers per queue.
    pub parallel: usize,
    /// Attempts per file.
    pub retries: u32,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Content cache shared between install directories.
    pub cache_dir: Option<PathBuf>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            parallel: DEFAULT_CONCURRENCY,
            retries: DEFAULT_MAX_ATTEMPTS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_dir: None,
        }
    }
}

impl DownloadSettings {
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Queue settings derived from these values.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::default()
            .with_concurrency(self.parallel)
            .with_max_attempts(self.retries)
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Also write logs to this file.
    pub file: Option<PathBuf>,
}

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub download: DownloadSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location, or defaults if the file is missing.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(DOWNLOAD_SECTION)) {
            if let Some(v) = section.get("parallel") {
                config.download.parallel = parse_value(DOWNLOAD_SECTION, "parallel", v)?;
            }
            if let Some(v) = section.get("retries") {
                config.download.retries = parse_value(DOWNLOAD_SECTION, "retries", v)?;
            }
            if let Some(v) = section.get("timeout") {
                config.download.timeout_secs = parse_value(DOWNLOAD_SECTION, "timeout", v)?;
            }
            config.download.cache_dir = non_empty_path(section.get("cache_dir"));
        }

        if let Some(section) = ini.section(Some(LOGGING_SECTION)) {
            config.logging.file = non_empty_path(section.get("file"));
        }

        // Zero would stall every queue
        config.download = config
            .download
            .clone()
            .with_parallel(config.download.parallel)
            .with_retries(config.download.retries);

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some(DOWNLOAD_SECTION))
            .set("parallel", self.download.parallel.to_string())
            .set("retries", self.download.retries.to_string())
            .set("timeout", self.download.timeout_secs.to_string());
        if let Some(cache_dir) = &self.download.cache_dir {
            ini.with_section(Some(DOWNLOAD_SECTION))
                .set("cache_dir", cache_dir.display().to_string());
        }
        if let Some(file) = &self.logging.file {
            ini.with_section(Some(LOGGING_SECTION))
                .set("file", file.display().to_string());
        }
        ini
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path()?)
    }

    /// Save to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        self.to_ini()
            .write_to_file(path)
            .map_err(|e| ConfigError::Write {
                path: path.to_path_buf(),
                source: e,
            })
    }
}

fn parse_value<T: std::str::FromStr>(
    section: &'static str,
    key: &'static str,
    value: &str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        section,
        key,
        value: value.to_string(),
    })
}

fn non_empty_path(value: Option<&str>) -> Option<PathBuf> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.download.parallel, 4);
        assert_eq!(config.download.retries, 3);
        assert_eq!(config.download.timeout_secs, 300);
        assert!(config.download.cache_dir.is_none());
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[download]\nparallel = 8\ncache_dir = /tmp/cache\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.download.parallel, 8);
        assert_eq!(config.download.retries, 3);
        assert_eq!(config.download.cache_dir, Some(PathBuf::from("/tmp/cache")));
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.ini");

        let mut config = ConfigFile::default();
        config.download = config.download.with_parallel(2).with_retries(5);
        config.logging.file = Some(PathBuf::from("/var/log/packup.log"));
        config.save_to(&path).unwrap();

        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_number() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[download]\nretries = many\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "retries", .. }));
    }

    #[test]
    fn test_zero_values_are_raised() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[download]\nparallel = 0\nretries = 0\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.download.parallel, 1);
        assert_eq!(config.download.retries, 1);
    }

    #[test]
    fn test_queue_config() {
        let settings = DownloadSettings::default().with_parallel(6).with_retries(2);
        let queue = settings.queue_config();
        assert_eq!(queue.concurrency, 6);
        assert_eq!(queue.max_attempts, 2);
    }

    #[test]
    fn test_missing_file_is_error_for_explicit_path() {
        let temp = TempDir::new().unwrap();
        let result = ConfigFile::load_from(&temp.path().join("absent.ini"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
