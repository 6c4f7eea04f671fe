use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for the term-chain engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TermChainConfig {
    /// Where seed data is read from
    #[serde(default)]
    pub data: DataConfig,

    /// Route generation bounds
    #[serde(default)]
    pub route: RouteConfig,

    /// Distractor generation settings
    #[serde(default)]
    pub distractor: DistractorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Seed data location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding `terms.json` and `edges.json`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Route generation configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteConfig {
    /// Number of distinct start terms tried before giving up on a full-length route
    #[serde(default = "default_max_start_retries")]
    pub max_start_retries: usize,

    /// Number of walks attempted from the same start term
    #[serde(default = "default_max_same_start_retries")]
    pub max_same_start_retries: usize,

    /// Route length used when a game request does not name one
    #[serde(default = "default_route_length")]
    pub default_length: usize,

    /// Smallest route length a game request may ask for
    #[serde(default = "default_min_route_length")]
    pub min_length: usize,

    /// Largest route length a game request may ask for
    #[serde(default = "default_max_route_length")]
    pub max_length: usize,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            max_start_retries: default_max_start_retries(),
            max_same_start_retries: default_max_same_start_retries(),
            default_length: default_route_length(),
            min_length: default_min_route_length(),
            max_length: default_max_route_length(),
        }
    }
}

/// Distractor generation configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistractorConfig {
    /// Wrong answers offered next to the correct one
    #[serde(default = "default_distractor_count")]
    pub count: usize,
}

impl Default for DistractorConfig {
    fn default() -> Self {
        Self {
            count: default_distractor_count(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_max_start_retries() -> usize {
    10
}
fn default_max_same_start_retries() -> usize {
    10
}
fn default_route_length() -> usize {
    20
}
fn default_min_route_length() -> usize {
    5
}
fn default_max_route_length() -> usize {
    50
}
fn default_distractor_count() -> usize {
    3
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with layered sources
pub struct ConfigManager {
    config: TermChainConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.termchain.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("🔧 Loading term-chain configuration...");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        Self::log_summary(&config, config_path.as_deref());
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load from an explicit file, still honouring environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let config = Self::read_toml_file(path)?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        Self::log_summary(&config, Some(path));
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    fn log_summary(config: &TermChainConfig, path: Option<&Path>) {
        info!("✅ Configuration loaded successfully");
        match path {
            Some(path) => info!("   📄 Config file: {}", path.display()),
            None => info!("   📄 Config file: NONE (using defaults)"),
        }
        info!("   📂 Data directory: {}", config.data.data_dir.display());
        info!(
            "   🔁 Route retries: {} starts x {} walks",
            config.route.max_start_retries, config.route.max_same_start_retries
        );
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("📋 Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".termchain.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .termchain.env: {}", e);
                } else {
                    info!("📋 Loaded .termchain.env from home directory");
                }
            }
        }
    }

    /// Find and load config file
    /// Search order:
    /// 1. ./.termchain.toml (current directory)
    /// 2. ~/.termchain/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(TermChainConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".termchain.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".termchain").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("📋 No config file found, using defaults");
        Ok((TermChainConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<TermChainConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(config: TermChainConfig) -> TermChainConfig {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// Apply `TERMCHAIN_*` overrides read through `lookup`.
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_overrides_from<F>(mut config: TermChainConfig, lookup: F) -> TermChainConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse_usize(key: &str, raw: String) -> Option<usize> {
            match raw.trim().parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring {}={:?}: not a non-negative integer", key, raw);
                    None
                }
            }
        }

        if let Some(dir) = lookup("TERMCHAIN_DATA_DIR") {
            config.data.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = lookup("TERMCHAIN_MAX_START_RETRIES")
            .and_then(|raw| parse_usize("TERMCHAIN_MAX_START_RETRIES", raw))
        {
            config.route.max_start_retries = v;
        }
        if let Some(v) = lookup("TERMCHAIN_MAX_SAME_START_RETRIES")
            .and_then(|raw| parse_usize("TERMCHAIN_MAX_SAME_START_RETRIES", raw))
        {
            config.route.max_same_start_retries = v;
        }
        if let Some(v) = lookup("TERMCHAIN_ROUTE_LENGTH")
            .and_then(|raw| parse_usize("TERMCHAIN_ROUTE_LENGTH", raw))
        {
            config.route.default_length = v;
        }
        if let Some(v) = lookup("TERMCHAIN_DISTRACTOR_COUNT")
            .and_then(|raw| parse_usize("TERMCHAIN_DISTRACTOR_COUNT", raw))
        {
            config.distractor.count = v;
        }

        if let Some(level) = lookup("TERMCHAIN_LOG_LEVEL") {
            config.logging.level = level.to_lowercase();
        }
        if let Some(format) = lookup("TERMCHAIN_LOG_FORMAT") {
            config.logging.format = format.to_lowercase();
        }

        config
    }

    pub fn validate_config(config: &TermChainConfig) -> Result<(), ConfigError> {
        let route = &config.route;
        if route.max_start_retries == 0 || route.max_same_start_retries == 0 {
            return Err(ConfigError::ValidationError(
                "route retry bounds must be at least 1".to_string(),
            ));
        }
        if route.min_length == 0 || route.min_length > route.max_length {
            return Err(ConfigError::ValidationError(format!(
                "route length bounds are inconsistent: min={} max={}",
                route.min_length, route.max_length
            )));
        }
        if route.default_length < route.min_length || route.default_length > route.max_length {
            return Err(ConfigError::ValidationError(format!(
                "default route length {} is outside [{}, {}]",
                route.default_length, route.min_length, route.max_length
            )));
        }

        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &TermChainConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = TermChainConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TermChainConfig::default();
        assert_eq!(config.route.max_start_retries, 10);
        assert_eq!(config.route.max_same_start_retries, 10);
        assert_eq!(config.distractor.count, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        let config = TermChainConfig::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        let mut bad_config = config.clone();
        bad_config.route.max_same_start_retries = 0;
        assert!(ConfigManager::validate_config(&bad_config).is_err());

        let mut bad_config = config.clone();
        bad_config.route.min_length = 60;
        assert!(ConfigManager::validate_config(&bad_config).is_err());

        let mut bad_config = config;
        bad_config.logging.format = "xml".to_string();
        assert!(ConfigManager::validate_config(&bad_config).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TERMCHAIN_DATA_DIR", "/srv/seed"),
            ("TERMCHAIN_MAX_START_RETRIES", "4"),
            ("TERMCHAIN_DISTRACTOR_COUNT", "not-a-number"),
            ("TERMCHAIN_LOG_LEVEL", "DEBUG"),
        ]
        .into_iter()
        .collect();

        let config = ConfigManager::apply_overrides_from(TermChainConfig::default(), |key| {
            env.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.data.data_dir, PathBuf::from("/srv/seed"));
        assert_eq!(config.route.max_start_retries, 4);
        assert_eq!(config.distractor.count, 3);
        assert_eq!(config.logging.level, "debug");
    }
}
