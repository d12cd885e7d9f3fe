//! Upstream selection policy.
//!
//! Uniform-random sharding over the configured pool. The RNG comes from
//! the caller (each worker owns one), which keeps selection pure, cheap
//! and free of shared state. The question text is part of the interface
//! so sharding policies keyed on it (consistent hashing, stickiness) can
//! drop in without touching call sites.

use std::sync::Arc;

use veil_dns_domain::ProxyError;

use crate::upstream::Upstream;

pub struct UpstreamSelector {
    upstreams: Vec<Arc<Upstream>>,
}

impl UpstreamSelector {
    pub fn new(upstreams: Vec<Arc<Upstream>>) -> Result<Self, ProxyError> {
        if upstreams.is_empty() {
            return Err(ProxyError::Config(
                "at least one upstream must be configured".to_string(),
            ));
        }
        Ok(Self { upstreams })
    }

    /// Pick one upstream for this question.
    pub fn select(&self, _question: &str, rng: &mut fastrand::Rng) -> &Arc<Upstream> {
        &self.upstreams[rng.usize(..self.upstreams.len())]
    }

    pub fn len(&self) -> usize {
        self.upstreams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }
}
