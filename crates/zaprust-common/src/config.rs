//! Configuration for ZapRust

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Dispatch processor configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Secrets configuration
    #[serde(default)]
    pub secrets: SecretsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hostname
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            bind_address: default_bind_address(),
        }
    }
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (PostgreSQL)
    pub url: String,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API port
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_api_port() -> u16 {
    8080
}

/// Dispatch processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Start the periodic ticker on boot
    #[serde(default = "default_autostart")]
    pub autostart: bool,

    /// Seconds between queue polling ticks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum tasks claimed per tick
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,

    /// Seconds before a task stuck in `sending` is requeued
    #[serde(default = "default_lease_timeout")]
    pub lease_timeout_secs: i64,

    /// Provider HTTP request timeout in seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            autostart: default_autostart(),
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
            lease_timeout_secs: default_lease_timeout(),
            send_timeout_secs: default_send_timeout(),
        }
    }
}

fn default_autostart() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    10
}

fn default_batch_size() -> i64 {
    10
}

fn default_lease_timeout() -> i64 {
    300
}

fn default_send_timeout() -> u64 {
    10
}

/// Secrets configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecretsConfig {
    /// Base64-encoded 32-byte key for provider token encryption.
    /// Falls back to the ZAPRUST_TOKEN_KEY environment variable.
    pub token_key: Option<String>,
}

impl SecretsConfig {
    /// Resolve the token encryption key from config or environment
    pub fn resolve_token_key(&self) -> crate::Result<String> {
        if let Some(key) = &self.token_key {
            return Ok(key.clone());
        }
        std::env::var("ZAPRUST_TOKEN_KEY").map_err(|_| {
            crate::Error::Config(
                "No token encryption key configured (secrets.token_key or ZAPRUST_TOKEN_KEY)"
                    .to_string(),
            )
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
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

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./config.toml"),
            std::path::PathBuf::from("/etc/zaprust/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(crate::Error::Config(
            "No configuration file found".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let server = ServerConfig::default();
        assert_eq!(server.hostname, "localhost");
        assert_eq!(server.bind_address, "0.0.0.0");

        let dispatch = DispatchConfig::default();
        assert_eq!(dispatch.poll_interval_secs, 10);
        assert_eq!(dispatch.batch_size, 10);
        assert_eq!(dispatch.lease_timeout_secs, 300);
        assert_eq!(dispatch.send_timeout_secs, 10);
        assert!(dispatch.autostart);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
hostname = "zap.example.com"

[database]
url = "postgres://localhost/zaprust"

[dispatch]
poll_interval_secs = 30
batch_size = 5

[api]
port = 9090
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.hostname, "zap.example.com");
        assert_eq!(config.database.url, "postgres://localhost/zaprust");
        assert_eq!(config.dispatch.poll_interval_secs, 30);
        assert_eq!(config.dispatch.batch_size, 5);
        assert_eq!(config.api.port, 9090);
        // Untouched sections keep their defaults
        assert_eq!(config.dispatch.lease_timeout_secs, 300);
        assert_eq!(config.logging.level, "info");
    }
}
