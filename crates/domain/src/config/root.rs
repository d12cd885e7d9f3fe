use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::proxy::PipelineConfig;
use super::server::ServerConfig;
use super::upstream::{UpstreamConfig, DNS_PORT, DOH_PORT};

/// Main configuration structure for Veil DNS.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listening socket (bind address, port).
    #[serde(default)]
    pub server: ServerConfig,

    /// Pipeline tuning (workers, per-resolve deadline).
    #[serde(default)]
    pub proxy: PipelineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upstream resolver pool.
    #[serde(default)]
    pub upstreams: Vec<UpstreamConfig>,
}

impl Config {
    /// Load configuration from file or use defaults.
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. veil-dns.toml in current directory
    /// 3. /etc/veil-dns/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("veil-dns.toml").exists() {
            Self::from_file("veil-dns.toml")?
        } else if std::path::Path::new("/etc/veil-dns/config.toml").exists() {
            Self::from_file("/etc/veil-dns/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.dns_port {
            self.server.dns_port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Validate configuration before the proxy is built from it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.dns_port == 0 {
            return Err(ConfigError::Validation("DNS port cannot be 0".to_string()));
        }

        if self.upstreams.is_empty() {
            return Err(ConfigError::Validation(
                "No upstream resolvers configured".to_string(),
            ));
        }

        for upstream in &self.upstreams {
            if upstream.name.is_empty() {
                return Err(ConfigError::Validation(
                    "Upstream with empty name".to_string(),
                ));
            }
            if upstream.endpoint.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Upstream '{}' has no endpoint",
                    upstream.name
                )));
            }
            if upstream.port != DNS_PORT && upstream.port != DOH_PORT {
                return Err(ConfigError::Validation(format!(
                    "Upstream '{}' uses port {}: only 53 (DNS) and 443 (DoH) are supported",
                    upstream.name, upstream.port
                )));
            }
        }

        Ok(())
    }
}

/// Command-line overrides for configuration.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub dns_port: Option<u16>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
}
