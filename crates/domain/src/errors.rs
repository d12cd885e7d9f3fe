use thiserror::Error;

/// Errors surfaced by the proxy core.
///
/// Per-job errors are logged and the job is dropped; none of these ever
/// travel back to the stub resolver except through the absence of a reply.
#[derive(Error, Debug, Clone)]
pub enum ProxyError {
    #[error("Failed to decode DNS query: {0}")]
    Parse(String),

    #[error("Failed to encode DNS response: {0}")]
    Pack(String),

    #[error("Malformed DoH answer: {0}")]
    MalformedAnswer(String),

    #[error("Unsupported record type {0} in DoH answer")]
    UnsupportedRecordType(u16),

    #[error("Transport error talking to upstream '{upstream}': {detail}")]
    UpstreamTransport { upstream: String, detail: String },

    #[error("Upstream '{upstream}' failed: {detail}")]
    UpstreamFailure { upstream: String, detail: String },

    #[error("Upstream '{upstream}' uses port {port}: only 53 (DNS) and 443 (DoH) are supported")]
    InvalidUpstreamPort { upstream: String, port: u16 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProxyError {
    /// Stable kind label for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Pack(_) => "pack",
            Self::MalformedAnswer(_) => "malformed_answer",
            Self::UnsupportedRecordType(_) => "unsupported_rr_type",
            Self::UpstreamTransport { .. } => "upstream_transport",
            Self::UpstreamFailure { .. } => "upstream_failure",
            Self::InvalidUpstreamPort { .. } => "invalid_upstream_port",
            Self::Config(_) => "config",
        }
    }
}
