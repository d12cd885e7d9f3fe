use serde::{Deserialize, Serialize};

/// Port carried by classical DNS upstreams.
pub const DNS_PORT: u16 = 53;
/// Port carried by DoH upstreams.
pub const DOH_PORT: u16 = 443;

/// One upstream recursive resolver.
///
/// The port decides the protocol: 53 means classical UDP DNS, 443 means
/// DNS-over-HTTPS in its JSON form. No other ports are accepted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Logical name used in logs (e.g. "cloudflare").
    pub name: String,

    /// Host for DNS upstreams (e.g. "9.9.9.9"), host or host/path for DoH
    /// upstreams (e.g. "8.8.8.8/resolve", "1.1.1.1/dns-query").
    pub endpoint: String,

    pub port: u16,

    /// `Host:` header override for DoH upstreams whose configured endpoint
    /// is an IP literal while the TLS authority expects a hostname
    /// (e.g. endpoint "8.8.8.8/resolve" with authority "dns.google").
    #[serde(default)]
    pub host_override: Option<String>,

    /// Media type sent in the `Accept` header of DoH requests.
    #[serde(default)]
    pub accept: DohAccept,
}

impl UpstreamConfig {
    pub fn is_doh(&self) -> bool {
        self.port == DOH_PORT
    }
}

/// The `Accept` header quirk: most JSON DoH endpoints want
/// `application/dns-json`, Google's historically answered the JSON form
/// under `application/dns-message`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DohAccept {
    #[default]
    DnsJson,
    DnsMessage,
}

impl DohAccept {
    pub fn as_header_value(&self) -> &'static str {
        match self {
            Self::DnsJson => "application/dns-json",
            Self::DnsMessage => "application/dns-message",
        }
    }
}
