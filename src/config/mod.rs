//! Configuration management
//!
//! Optional TOML file with typing, keymap and logging settings. What to type
//! always comes from the command line; the file only tunes how.
//!
//! Lookup order:
//! - `$WTYPE_CONFIG`
//! - `<config dir>/wtype/config.toml` (usually `~/.config/wtype/config.toml`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::engine::TimingConfig;
use crate::keymap::KeymapOptions;

pub mod types;

pub use types::{KeymapConfig, LoggingConfig, TypingConfig};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "WTYPE_CONFIG";

/// Where the active configuration came from
#[derive(Debug)]
pub enum ConfigSource {
    /// No config file; built-in defaults
    Defaults,
    /// Loaded from this file
    File(PathBuf),
    /// This file exists but could not be used; defaults apply
    Invalid(PathBuf, anyhow::Error),
}

impl ConfigSource {
    /// Log how the configuration was obtained
    pub fn log(&self) {
        match self {
            ConfigSource::Defaults => debug!("No config file, using defaults"),
            ConfigSource::File(path) => debug!("Loaded config from {}", path.display()),
            ConfigSource::Invalid(path, e) => {
                warn!("Ignoring config file {}: {:#}", path.display(), e);
            }
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Typing configuration
    pub typing: TypingConfig,
    /// Keymap configuration
    pub keymap: KeymapConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Config file location, if one can be determined
    pub fn path() -> Option<PathBuf> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => dirs::config_dir().map(|dir| dir.join("wtype").join("config.toml")),
        }
    }

    /// Find and load the config file, falling back to defaults
    ///
    /// A missing file is normal. A broken one is reported through the
    /// returned [`ConfigSource`] and ignored so a typo in the config never
    /// stops typing. Nothing is logged here: this runs before logging is
    /// set up from the result.
    pub fn discover() -> (Self, ConfigSource) {
        match Self::path() {
            Some(path) => Self::discover_at(path),
            None => (Self::default_config(), ConfigSource::Defaults),
        }
    }

    /// Load `path`, falling back to defaults if it is missing or invalid
    pub fn discover_at(path: PathBuf) -> (Self, ConfigSource) {
        if !path.exists() {
            return (Self::default_config(), ConfigSource::Defaults);
        }

        match Self::load(&path) {
            Ok(config) => (config, ConfigSource::File(path)),
            Err(e) => (Self::default_config(), ConfigSource::Invalid(path, e)),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.typing.stream_batch == 0 {
            anyhow::bail!("typing.stream_batch must be at least 1");
        }

        if self.typing.settle_ms > 1000 {
            anyhow::bail!(
                "typing.settle_ms ({}) cannot exceed 1000",
                self.typing.settle_ms
            );
        }

        match self.logging.format.as_str() {
            "compact" | "pretty" | "json" => {}
            _ => anyhow::bail!("Invalid log format: {}", self.logging.format),
        }

        validate_log_level(&self.logging.level)?;

        Ok(())
    }

    /// Engine timing derived from `[typing]`
    pub fn timing(&self) -> TimingConfig {
        TimingConfig {
            settle: Duration::from_millis(self.typing.settle_ms),
            stream_batch: self.typing.stream_batch,
        }
    }

    /// Delay between keystrokes before any `-d`
    pub fn default_delay(&self) -> Duration {
        Duration::from_millis(self.typing.default_delay_ms)
    }

    /// Synthesizer options derived from `[keymap]`
    pub fn keymap_options(&self) -> KeymapOptions {
        KeymapOptions {
            include_complete: self.keymap.include_complete,
        }
    }
}

/// Check a `logging.level` filter
///
/// Directives use `EnvFilter` syntax, but a bare word must name a level:
/// `EnvFilter` would otherwise take a typo such as `loud` as a target and
/// silence everything else.
fn validate_log_level(level: &str) -> Result<()> {
    EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {}", level))?;

    for directive in level.split(',').map(str::trim) {
        if directive.is_empty() || directive.contains('=') {
            continue;
        }
        if directive.parse::<LevelFilter>().is_err() {
            anyhow::bail!("Invalid log level: {}", directive);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.typing.settle_ms, 2);
        assert_eq!(config.typing.default_delay_ms, 0);
        assert_eq!(config.typing.stream_batch, 100);
        assert!(config.keymap.include_complete);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "compact");
        assert!(config.logging.file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let file = write_config(
            r#"
[typing]
default_delay_ms = 15

[logging]
format = "json"
"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.default_delay(), Duration::from_millis(15));
        assert_eq!(config.typing.stream_batch, 100);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_derived_settings() {
        let file = write_config(
            r#"
[typing]
settle_ms = 5
stream_batch = 10

[keymap]
include_complete = false
"#,
        );

        let config = Config::load(file.path()).unwrap();
        let timing = config.timing();
        assert_eq!(timing.settle, Duration::from_millis(5));
        assert_eq!(timing.stream_batch, 10);
        assert!(!config.keymap_options().include_complete);
    }

    #[test]
    fn test_config_validation_zero_batch() {
        let mut config = Config::default_config();
        config.typing.stream_batch = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_settle_too_long() {
        let mut config = Config::default_config();
        config.typing.settle_ms = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_format() {
        let mut config = Config::default_config();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_log_level() {
        let mut config = Config::default_config();
        for level in ["debug", "off", "info,lamco_wtype=trace", "lamco_wtype::engine=debug"] {
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "level {:?}", level);
        }

        for level in ["loud", "warn,verbose"] {
            config.logging.level = level.to_string();
            assert!(config.validate().is_err(), "level {:?}", level);
        }
    }

    #[test]
    fn test_misspelled_level_falls_back_to_defaults() {
        let file = write_config("[logging]\nlevel = \"loud\"\n");

        let (config, source) = Config::discover_at(file.path().to_path_buf());
        assert_eq!(config.logging.level, "warn");
        assert!(matches!(source, ConfigSource::Invalid(..)));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let file = write_config("[typing]\nstream_batch = \"many\"\n");
        assert!(Config::load(file.path()).is_err());

        let (config, source) = Config::discover_at(file.path().to_path_buf());
        assert_eq!(config.typing.stream_batch, 100);
        assert!(matches!(source, ConfigSource::Invalid(..)));
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let file = write_config("[typing]\nstream_batch = 0\n");
        let (config, source) = Config::discover_at(file.path().to_path_buf());
        assert_eq!(config.typing.stream_batch, 100);
        assert!(matches!(source, ConfigSource::Invalid(..)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, source) = Config::discover_at(dir.path().join("config.toml"));
        assert_eq!(config.logging.level, "warn");
        assert!(matches!(source, ConfigSource::Defaults));
    }

    #[test]
    fn test_valid_file_source() {
        let file = write_config("[logging]\nlevel = \"debug\"\n");
        let (config, source) = Config::discover_at(file.path().to_path_buf());
        assert_eq!(config.logging.level, "debug");
        assert!(matches!(source, ConfigSource::File(path) if path == file.path()));
    }
}
