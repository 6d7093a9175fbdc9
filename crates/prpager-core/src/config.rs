//! Configuration management for prpager
//!
//! Supports feature-specific configuration sections:
//! - [chunking] - diff segmentation settings
//! - [pagination] - continuation token settings
//! - [logging] - log level and optional file output

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: &str = "1";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version for tracking schema changes
    #[serde(default = "default_config_version")]
    pub version: String,

    /// Diff segmentation configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Continuation token configuration
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            chunking: ChunkingConfig::default(),
            pagination: PaginationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration for diff segmentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Soft token budget per chunk
    #[serde(default = "default_max_tokens_per_chunk")]
    pub max_tokens_per_chunk: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: default_max_tokens_per_chunk(),
        }
    }
}

/// Configuration for continuation tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Default time-to-live for issued tokens, in minutes
    #[serde(default = "default_ttl_minutes")]
    pub default_ttl_minutes: u64,

    /// Token encryption key as 64 hex characters (32 bytes).
    /// When absent an ephemeral per-process key is generated, which means
    /// outstanding tokens do not survive a restart.
    #[serde(default)]
    pub encryption_key: Option<String>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_ttl_minutes: default_ttl_minutes(),
            encryption_key: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rotating log files; stderr-only when absent
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_config_version() -> String {
    CURRENT_CONFIG_VERSION.to_string()
}

fn default_max_tokens_per_chunk() -> usize {
    4000
}

fn default_ttl_minutes() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the user config directory, then apply
    /// environment overrides
    pub fn load() -> Self {
        let mut config = Config::default();

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("prpager").join("config.toml");
            if path.exists() {
                if let Ok(loaded) = Self::load_from_file(&path) {
                    config = loaded;
                }
            }
        }

        config.apply_env_overrides();
        config
    }

    /// Environment variables win over file values; malformed values are
    /// ignored and the existing value is kept
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("MAX_TOKENS_PER_CHUNK") {
            if let Ok(parsed) = value.parse::<usize>() {
                self.chunking.max_tokens_per_chunk = parsed;
            }
        }

        if let Ok(value) = env::var("ENCRYPTION_KEY") {
            if !value.is_empty() {
                self.pagination.encryption_key = Some(value);
            }
        }

        if let Ok(value) = env::var("LOG_LEVEL") {
            if !value.is_empty() {
                self.logging.level = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, CURRENT_CONFIG_VERSION);
        assert_eq!(config.chunking.max_tokens_per_chunk, 4000);
        assert_eq!(config.pagination.default_ttl_minutes, 30);
        assert!(config.pagination.encryption_key.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
            [chunking]
            max_tokens_per_chunk = 2000
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.chunking.max_tokens_per_chunk, 2000);
        // Untouched sections keep their defaults
        assert_eq!(config.pagination.default_ttl_minutes, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            version = "1"

            [chunking]
            max_tokens_per_chunk = 8000

            [pagination]
            default_ttl_minutes = 10
            encryption_key = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff"

            [logging]
            level = "debug"
            log_dir = "/tmp/prpager-logs"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.chunking.max_tokens_per_chunk, 8000);
        assert_eq!(config.pagination.default_ttl_minutes, 10);
        assert_eq!(
            config.pagination.encryption_key.as_deref().map(str::len),
            Some(64)
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.log_dir.as_deref(), Some("/tmp/prpager-logs"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pagination]\ndefault_ttl_minutes = 5").unwrap();

        let path = file.path().to_path_buf();
        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.pagination.default_ttl_minutes, 5);
    }

    #[test]
    fn test_load_from_missing_file() {
        let path = PathBuf::from("/nonexistent/prpager/config.toml");
        assert!(Config::load_from_file(&path).is_err());
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.chunking.max_tokens_per_chunk = 1234;

        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.chunking.max_tokens_per_chunk, 1234);
    }
}
