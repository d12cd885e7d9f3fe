pub mod errors;
pub mod logging;
pub mod proxy;
pub mod root;
pub mod server;
pub mod upstream;

pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use proxy::PipelineConfig;
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
pub use upstream::{DohAccept, UpstreamConfig, DNS_PORT, DOH_PORT};
