//! Classical DNS upstream (RFC 1035 §4.2.1)
//!
//! One UDP exchange per resolve: the original query bytes go out
//! unchanged (so the upstream's reply already carries the client's
//! transaction id) and a single datagram comes back.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::{Message, ResponseCode};
use tokio::net::UdpSocket;
use tracing::{debug, warn};
use veil_dns_domain::{ProxyError, UpstreamConfig, DNS_PORT};

use super::Resolver;
use crate::codec::MessageCodec;

/// Largest datagram accepted from an upstream resolver.
const MAX_RESPONSE_SIZE: usize = 1024;

/// DNS over UDP upstream client.
#[derive(Debug)]
pub struct DnsExchange {
    name: Arc<str>,
    server_addr: SocketAddr,
}

impl DnsExchange {
    pub fn new(name: &str, server_addr: SocketAddr) -> Self {
        Self {
            name: Arc::from(name),
            server_addr,
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let ip: IpAddr = config.endpoint.parse().map_err(|_| {
            ProxyError::Config(format!(
                "upstream '{}': endpoint '{}' is not an IP address",
                config.name, config.endpoint
            ))
        })?;
        Ok(Self::new(&config.name, SocketAddr::new(ip, DNS_PORT)))
    }

    fn transport_error(&self, detail: String) -> ProxyError {
        ProxyError::UpstreamTransport {
            upstream: self.name.to_string(),
            detail,
        }
    }
}

#[async_trait]
impl Resolver for DnsExchange {
    async fn resolve(&self, query: &Message, timeout: Duration) -> Result<Message, ProxyError> {
        let query_bytes = MessageCodec::pack(query)?;

        // Ephemeral port, family matched to the upstream address.
        let bind_addr = if self.server_addr.is_ipv4() {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
        } else {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0)
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| self.transport_error(format!("failed to bind query socket: {e}")))?;

        tokio::time::timeout(timeout, socket.send_to(&query_bytes, self.server_addr))
            .await
            .map_err(|_| {
                self.transport_error(format!("timeout sending query to {}", self.server_addr))
            })?
            .map_err(|e| {
                self.transport_error(format!(
                    "failed to send query to {}: {e}",
                    self.server_addr
                ))
            })?;

        let mut recv_buf = vec![0u8; MAX_RESPONSE_SIZE];
        let (len, from_addr) = tokio::time::timeout(timeout, socket.recv_from(&mut recv_buf))
            .await
            .map_err(|_| {
                self.transport_error(format!(
                    "timeout waiting for response from {}",
                    self.server_addr
                ))
            })?
            .map_err(|e| {
                self.transport_error(format!(
                    "failed to receive response from {}: {e}",
                    self.server_addr
                ))
            })?;

        if from_addr.ip() != self.server_addr.ip() {
            warn!(
                upstream = %self.name,
                expected = %self.server_addr,
                received_from = %from_addr,
                "UDP response from unexpected source"
            );
        }

        let response = Message::from_vec(&recv_buf[..len])
            .map_err(|e| ProxyError::Parse(e.to_string()))?;

        // SERVFAIL is surfaced as an error so the caller may pick another
        // upstream; any other rcode (NXDOMAIN included) is a valid DNS
        // answer and flows back to the stub unchanged.
        if response.response_code() == ResponseCode::ServFail {
            return Err(ProxyError::UpstreamFailure {
                upstream: self.name.to_string(),
                detail: "upstream answered SERVFAIL".to_string(),
            });
        }

        debug!(
            upstream = %self.name,
            rcode = ?response.response_code(),
            answers = response.answers().len(),
            "DNS response received"
        );

        Ok(response)
    }

    fn protocol_name(&self) -> &'static str {
        "DNS"
    }
}
