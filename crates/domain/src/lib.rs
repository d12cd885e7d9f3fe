pub mod config;
pub mod errors;

pub use config::{
    CliOverrides, Config, ConfigError, DohAccept, LoggingConfig, PipelineConfig, ServerConfig,
    UpstreamConfig, DNS_PORT, DOH_PORT,
};
pub use errors::ProxyError;
