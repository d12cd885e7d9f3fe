//! Veil DNS core: the DoH↔DNS protocol bridge and the concurrent
//! forwarding pipeline.
//!
//! - [`codec`] — pure DNS wire encode/decode
//! - [`doh`] — DoH JSON model and per-type record reconstruction
//! - [`upstream`] — the two upstream client variants behind one seam
//! - [`selector`] — upstream sharding policy
//! - [`pipeline`] — listener, worker pool and writer over bounded queues

pub mod codec;
pub mod doh;
pub mod pipeline;
pub mod selector;
pub mod upstream;

pub use codec::MessageCodec;
pub use pipeline::{Proxy, MAX_DATAGRAM_SIZE};
pub use selector::UpstreamSelector;
pub use upstream::{DnsExchange, DohClient, Resolver, Upstream};
