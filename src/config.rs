//! Configuration for the lookbook client
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/lookbook/config.toml)
//! 3. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the outfit-analysis backend
    pub api_url: String,

    /// Bearer token supplied via env (overrides the token file)
    pub token: Option<String>,

    /// Status poll cadence while an analysis runs
    pub poll_interval: Duration,

    /// Pause between completion and showing the board
    pub completion_delay: Duration,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set
    pub level: String,
    /// Also write JSON logs to rotating files
    pub file_enabled: bool,
    /// Directory for log files
    pub file_dir: PathBuf,
    /// Log file name prefix
    pub file_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            poll_interval: Duration::from_secs(2),
            completion_delay: Duration::from_millis(1500),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            file_dir: config_dir().join("logs"),
            file_prefix: "lookbook.log".to_string(),
        }
    }
}

/// Config-file mirror of `Config`. Every field is optional so users only
/// write the values they want to override.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub completion_delay_ms: Option<u64>,
    #[serde(default)]
    pub logging: FileLogging,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileLogging {
    pub level: Option<String>,
    pub file_enabled: Option<bool>,
    pub file_dir: Option<PathBuf>,
    pub file_prefix: Option<String>,
}

/// Env-var overrides, separated from `load` so merging stays testable.
#[derive(Debug, Default)]
pub struct EnvOverrides {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub log_level: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("LOOKBOOK_API_URL").ok(),
            token: std::env::var("LOOKBOOK_TOKEN").ok(),
            log_level: std::env::var("LOOKBOOK_LOG").ok(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the config file, then env vars.
    pub fn load() -> Self {
        let file = read_config_file().unwrap_or_default();
        Self::from_parts(file, EnvOverrides::from_env())
    }

    /// Merge the three layers. Pure, so the precedence is unit-testable.
    pub fn from_parts(file: FileConfig, env: EnvOverrides) -> Self {
        let mut config = Config::default();

        if let Some(api_url) = file.api_url {
            config.api_url = api_url;
        }
        if let Some(secs) = file.poll_interval_secs {
            config.poll_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(ms) = file.completion_delay_ms {
            config.completion_delay = Duration::from_millis(ms);
        }
        if let Some(level) = file.logging.level {
            config.logging.level = level;
        }
        if let Some(enabled) = file.logging.file_enabled {
            config.logging.file_enabled = enabled;
        }
        if let Some(dir) = file.logging.file_dir {
            config.logging.file_dir = dir;
        }
        if let Some(prefix) = file.logging.file_prefix {
            config.logging.file_prefix = prefix;
        }

        if let Some(api_url) = env.api_url {
            config.api_url = api_url;
        }
        if let Some(level) = env.log_level {
            config.logging.level = level;
        }
        config.token = env.token;

        config
    }

    /// Write a commented template on first run so users can discover the
    /// available options. Existing files are left alone.
    pub fn ensure_config_exists() {
        let path = config_path();
        if path.exists() {
            return;
        }
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Warning: could not create config directory {:?}: {}", parent, e);
                return;
            }
        }
        if let Err(e) = std::fs::write(&path, CONFIG_TEMPLATE) {
            eprintln!("Warning: could not write config template {:?}: {}", path, e);
        }
    }
}

/// Directory holding the config file, token file, and default log dir.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lookbook")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn token_path() -> PathBuf {
    config_dir().join("token")
}

fn read_config_file() -> Option<FileConfig> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str(&contents) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            eprintln!("Warning: ignoring malformed config {:?}: {}", path, e);
            None
        }
    }
}

pub const CONFIG_TEMPLATE: &str = r#"# lookbook configuration
# Values here override the built-in defaults; environment variables
# (LOOKBOOK_API_URL, LOOKBOOK_TOKEN, LOOKBOOK_LOG) override this file.

# Base URL of the outfit-analysis backend.
# api_url = "http://localhost:8000"

# Seconds between analysis status polls (minimum 1).
# poll_interval_secs = 2

# Milliseconds between completion and showing the board.
# completion_delay_ms = 1500

[logging]
# Default level when RUST_LOG is not set: trace, debug, info, warn, error.
# level = "info"

# Also write JSON logs to daily-rotating files.
# file_enabled = false
# file_prefix = "lookbook.log"
"#;
