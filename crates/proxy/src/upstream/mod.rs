//! Upstream resolver clients
//!
//! One operation, two transports: classical UDP DNS on port 53 and the
//! JSON form of DNS-over-HTTPS on port 443. The port in the configuration
//! decides which; nothing else is accepted. An `Upstream` is immutable
//! after construction and is shared by reference across workers — the
//! HTTPS connection pool it owns is internally synchronized.

pub mod dns;
pub mod doh;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::Message;
use veil_dns_domain::{ProxyError, UpstreamConfig, DNS_PORT, DOH_PORT};

pub use dns::DnsExchange;
pub use doh::DohClient;

/// The single operation an upstream exposes to the pipeline.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve one query under the given deadline.
    async fn resolve(&self, query: &Message, timeout: Duration) -> Result<Message, ProxyError>;

    fn protocol_name(&self) -> &'static str;
}

#[derive(Debug)]
enum Transport {
    Dns(DnsExchange),
    Doh(DohClient),
}

/// One configured upstream recursive resolver.
#[derive(Debug)]
pub struct Upstream {
    name: Arc<str>,
    transport: Transport,
}

impl Upstream {
    /// Build an upstream from its configuration.
    ///
    /// Port 53 yields the UDP DNS variant, 443 the DoH variant; any other
    /// port is refused with `InvalidUpstreamPort`.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let transport = match config.port {
            DNS_PORT => Transport::Dns(DnsExchange::from_config(config)?),
            DOH_PORT => Transport::Doh(DohClient::from_config(config)?),
            port => {
                return Err(ProxyError::InvalidUpstreamPort {
                    upstream: config.name.clone(),
                    port,
                })
            }
        };

        Ok(Self {
            name: Arc::from(config.name.as_str()),
            transport,
        })
    }

    /// Classical DNS upstream talking to an explicit socket address.
    /// Used where the address is already resolved (tests, local mocks).
    pub fn classic_dns(name: &str, server_addr: SocketAddr) -> Self {
        Self {
            name: Arc::from(name),
            transport: Transport::Dns(DnsExchange::new(name, server_addr)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn protocol_name(&self) -> &'static str {
        match &self.transport {
            Transport::Dns(t) => t.protocol_name(),
            Transport::Doh(t) => t.protocol_name(),
        }
    }

    /// Resolve one query through this upstream.
    pub async fn resolve(
        &self,
        query: &Message,
        timeout: Duration,
    ) -> Result<Message, ProxyError> {
        match &self.transport {
            Transport::Dns(t) => t.resolve(query, timeout).await,
            Transport::Doh(t) => t.resolve(query, timeout).await,
        }
    }
}
