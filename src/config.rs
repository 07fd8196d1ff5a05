//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::ApiConfig;
use crate::window::{LatePolicy, WindowConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub window: WindowSettings,

    #[serde(default)]
    pub tokenizer: TokenizerSettings,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub report: ReportSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sliding window configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WindowSettings {
    #[serde(default = "default_duration")]
    pub duration_secs: i64,

    #[serde(default = "default_bucket_step")]
    pub bucket_step_secs: i64,

    #[serde(default = "default_min_term_len")]
    pub min_term_len: usize,

    #[serde(default)]
    pub late_policy: LatePolicy,

    /// Unset keeps every term ever seen
    pub vocabulary_limit: Option<usize>,

    #[serde(default = "default_shards")]
    pub shards: usize,
}

fn default_duration() -> i64 {
    300 // 5 minutes
}

fn default_bucket_step() -> i64 {
    1
}

fn default_min_term_len() -> usize {
    3
}

fn default_shards() -> usize {
    1
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            duration_secs: default_duration(),
            bucket_step_secs: default_bucket_step(),
            min_term_len: default_min_term_len(),
            late_policy: LatePolicy::default(),
            vocabulary_limit: None,
            shards: default_shards(),
        }
    }
}

impl WindowSettings {
    pub fn to_window_config(&self) -> WindowConfig {
        WindowConfig {
            window_duration_secs: self.duration_secs,
            bucket_step_secs: self.bucket_step_secs,
            min_term_len: self.min_term_len,
            late_policy: self.late_policy,
            vocabulary_limit: self.vocabulary_limit,
        }
    }
}

/// Tokenizer resources
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenizerSettings {
    /// Dictionary directory; unset uses the built-in stop words
    pub dict_dir: Option<String>,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_k")]
    pub default_k: usize,

    #[serde(default = "default_max_k")]
    pub max_k: usize,

    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    /// Maximum message length in bytes
    #[serde(default = "default_max_content_len")]
    pub max_content_len: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_k() -> usize {
    10
}

fn default_max_k() -> usize {
    1000
}

fn default_max_batch() -> usize {
    10_000
}

fn default_max_content_len() -> usize {
    64 * 1024 // 64KB
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_k: default_k(),
            max_k: default_max_k(),
            max_batch: default_max_batch(),
            max_content_len: default_max_content_len(),
        }
    }
}

impl ApiSettings {
    pub fn to_api_config(&self) -> ApiConfig {
        ApiConfig {
            host: self.host.clone(),
            port: self.port,
            default_k: self.default_k,
            max_k: self.max_k,
            max_batch: self.max_batch,
            max_content_len: self.max_content_len,
        }
    }
}

/// Periodic top-K reporting
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_report_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_report_interval() -> u64 {
    60
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_report_interval(),
            k: default_k(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("trendwatch").join("config.toml")),
            Some(PathBuf::from("/etc/trendwatch/config.toml")),
            Some(PathBuf::from("./trendwatch.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Window overrides
        if let Some(secs) = env_parse("TRENDWATCH_WINDOW_SECS") {
            self.window.duration_secs = secs;
        }
        if let Some(step) = env_parse("TRENDWATCH_BUCKET_STEP_SECS") {
            self.window.bucket_step_secs = step;
        }
        if let Some(policy) = env_parse("TRENDWATCH_LATE_POLICY") {
            self.window.late_policy = policy;
        }
        if let Some(limit) = env_parse("TRENDWATCH_VOCABULARY_LIMIT") {
            self.window.vocabulary_limit = Some(limit);
        }
        if let Some(shards) = env_parse("TRENDWATCH_SHARDS") {
            self.window.shards = shards;
        }

        // Tokenizer overrides
        if let Ok(dir) = std::env::var("TRENDWATCH_DICT_DIR") {
            self.tokenizer.dict_dir = Some(dir);
        }

        // API overrides
        if let Ok(host) = std::env::var("TRENDWATCH_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = env_parse("TRENDWATCH_API_PORT") {
            self.api.port = port;
        }
        if let Some(max_batch) = env_parse("TRENDWATCH_API_MAX_BATCH") {
            self.api.max_batch = max_batch;
        }
        if let Some(max_len) = env_parse("TRENDWATCH_API_MAX_CONTENT_LEN") {
            self.api.max_content_len = max_len;
        }

        // Report overrides
        if let Some(interval) = env_parse("TRENDWATCH_REPORT_INTERVAL_SECS") {
            self.report.enabled = true;
            self.report.interval_secs = interval;
        }

        // Logging overrides
        if let Ok(level) = std::env::var("TRENDWATCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TRENDWATCH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %value, "Ignoring unparseable environment override");
            None
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# trendwatch Configuration
#
# Environment variables override these settings:
# - TRENDWATCH_WINDOW_SECS
# - TRENDWATCH_BUCKET_STEP_SECS
# - TRENDWATCH_LATE_POLICY
# - TRENDWATCH_VOCABULARY_LIMIT
# - TRENDWATCH_SHARDS
# - TRENDWATCH_DICT_DIR
# - TRENDWATCH_API_HOST
# - TRENDWATCH_API_PORT
# - TRENDWATCH_REPORT_INTERVAL_SECS
# - TRENDWATCH_LOG_LEVEL
# - TRENDWATCH_LOG_FORMAT

[window]
# Trailing span counted, in seconds
duration_secs = 300

# Bucket width, in seconds
bucket_step_secs = 1

# Terms shorter than this many bytes are ignored
min_term_len = 3

# Messages older than the newest bucket: drop, clamp_to_latest (or clamp) or backfill
late_policy = "drop"

# Forget expired terms once this many are interned (unset = never)
# vocabulary_limit = 1000000

# Independently locked partitions (1 = single lock)
shards = 1

[tokenizer]
# Directory holding stop_words.txt (unset = built-in stop words)
# dict_dir = "/usr/share/trendwatch/dict"

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Terms returned when a query gives no k
default_k = 10

# Largest k a query may ask for
max_k = 1000

# Maximum messages per batch request
max_batch = 10000

# Maximum message length in bytes
max_content_len = 65536

[report]
# Periodically log the current ranking
enabled = false

# Seconds between reports
interval_secs = 60

# Terms per report
k = 10

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/trendwatch/trendwatch.log"
"#
    .to_string()
}
