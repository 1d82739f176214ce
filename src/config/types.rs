//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Typing behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    /// Pause after each press and each release, in milliseconds
    pub settle_ms: u64,

    /// Delay between keystrokes before any `-d` flag, in milliseconds
    pub default_delay_ms: u64,

    /// Characters typed per keymap upload when reading stdin
    pub stream_batch: usize,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 2,
            default_delay_ms: 0,
            stream_batch: 100,
        }
    }
}

/// Keymap generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeymapConfig {
    /// Include the stock "complete" types and compatibility sets
    pub include_complete: bool,
}

impl Default for KeymapConfig {
    fn default() -> Self {
        Self {
            include_complete: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    pub level: String,

    /// Output format ("compact", "pretty", "json")
    pub format: String,

    /// Also write logs to this file (None = stderr only)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
            file: None,
        }
    }
}
