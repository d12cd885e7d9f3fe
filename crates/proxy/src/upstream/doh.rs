//! DoH upstream (HTTPS GET, JSON form)
//!
//! Issues `GET https://{endpoint}?name={qname}&type={qtype}` against a
//! public JSON DoH resolver and rebuilds a wire response from the body.
//! Each client owns its own connection pool, so a worker never waits on
//! another upstream's transport state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::{Message, ResponseCode};
use reqwest::header::{HeaderValue, ACCEPT, HOST};
use tracing::debug;
use veil_dns_domain::{ProxyError, UpstreamConfig};

use super::Resolver;
use crate::codec::MessageCodec;
use crate::doh::{build_sections, DohReply};

/// SERVFAIL as it appears in the JSON `Status` field.
const STATUS_SERVFAIL: u16 = 2;

/// DNS-over-HTTPS upstream client.
#[derive(Debug)]
pub struct DohClient {
    name: Arc<str>,
    url: String,
    host_override: Option<HeaderValue>,
    accept: HeaderValue,
    client: reqwest::Client,
}

impl DohClient {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                ProxyError::Config(format!(
                    "upstream '{}': failed to build HTTPS client: {e}",
                    config.name
                ))
            })?;

        // The Host header override covers endpoints configured as IP
        // literals whose TLS authority expects a hostname, e.g. endpoint
        // "8.8.8.8/resolve" with authority "dns.google".
        let host_override = config
            .host_override
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|_| {
                ProxyError::Config(format!(
                    "upstream '{}': host_override is not a valid header value",
                    config.name
                ))
            })?;

        Ok(Self {
            name: Arc::from(config.name.as_str()),
            url: format!("https://{}", config.endpoint),
            host_override,
            accept: HeaderValue::from_static(config.accept.as_header_value()),
            client,
        })
    }

    fn transport_error(&self, detail: String) -> ProxyError {
        ProxyError::UpstreamTransport {
            upstream: self.name.to_string(),
            detail,
        }
    }

    fn upstream_failure(&self, detail: String) -> ProxyError {
        ProxyError::UpstreamFailure {
            upstream: self.name.to_string(),
            detail,
        }
    }
}

#[async_trait]
impl Resolver for DohClient {
    async fn resolve(&self, query: &Message, timeout: Duration) -> Result<Message, ProxyError> {
        let question = query
            .queries()
            .first()
            .ok_or_else(|| ProxyError::Parse("query carries no question section".to_string()))?;

        let qname = question.name().to_utf8();
        let qtype = u16::from(question.query_type());
        let url = format!("{}?name={}&type={}", self.url, qname, qtype);
        debug!(upstream = %self.name, url = %url, "Sending DoH query");

        let mut request = self.client.get(&url).header(ACCEPT, self.accept.clone());
        if let Some(host) = &self.host_override {
            request = request.header(HOST, host.clone());
        }

        let response = tokio::time::timeout(timeout, request.send())
            .await
            .map_err(|_| self.transport_error("timeout sending DoH query".to_string()))?
            .map_err(|e| self.transport_error(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.upstream_failure(format!("HTTP {}", status.as_u16())));
        }

        let body = tokio::time::timeout(timeout, response.bytes())
            .await
            .map_err(|_| self.transport_error("timeout reading DoH response body".to_string()))?
            .map_err(|e| self.transport_error(format!("failed to read response body: {e}")))?;

        let reply: DohReply = serde_json::from_slice(&body)
            .map_err(|e| ProxyError::MalformedAnswer(format!("DoH body is not valid JSON: {e}")))?;

        if reply.status == STATUS_SERVFAIL {
            return Err(self.upstream_failure("upstream answered SERVFAIL".to_string()));
        }

        let sections = build_sections(&reply)?;

        let mut message = MessageCodec::reply_to(query);
        message.set_response_code(rcode_from_status(reply.status));
        message.set_truncated(sections.truncated);
        message.set_recursion_desired(sections.recursion_desired);
        message.set_recursion_available(sections.recursion_available);
        for record in sections.answers {
            message.add_answer(record);
        }
        for record in sections.name_servers {
            message.add_name_server(record);
        }
        for record in sections.additionals {
            message.add_additional(record);
        }

        debug!(
            upstream = %self.name,
            rcode = ?message.response_code(),
            answers = message.answers().len(),
            "DoH response reconstructed"
        );

        Ok(message)
    }

    fn protocol_name(&self) -> &'static str {
        "DoH"
    }
}

/// JSON `Status` → wire rcode. Values outside the base set collapse to
/// SERVFAIL instead of inventing an extended rcode. SERVFAIL itself never
/// reaches this point (it is surfaced as an error beforehand).
fn rcode_from_status(status: u16) -> ResponseCode {
    match status {
        0 => ResponseCode::NoError,
        1 => ResponseCode::FormErr,
        3 => ResponseCode::NXDomain,
        4 => ResponseCode::NotImp,
        5 => ResponseCode::Refused,
        _ => ResponseCode::ServFail,
    }
}
