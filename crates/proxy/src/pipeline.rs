//! The forwarding pipeline.
//!
//! One listener reads query datagrams off the shared UDP socket, N
//! resolver workers consume them through a bounded lookup queue, and one
//! writer sends packed responses back. Both queues are bounded at N, so a
//! saturated worker pool pushes back on the listener and, through it, on
//! the kernel socket buffer.
//!
//! Shutdown drains in a fixed order — listener, workers, writer — and
//! returns only after every task has exited.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use veil_dns_domain::{Config, ProxyError};

use crate::codec::MessageCodec;
use crate::selector::UpstreamSelector;
use crate::upstream::Upstream;

/// Largest query datagram accepted from a stub resolver.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// A unit of work: the client's return address plus an owned byte buffer.
/// Exactly one stage holds a job at any time.
struct Job {
    addr: SocketAddr,
    data: Vec<u8>,
}

/// The proxy: a bound socket, an upstream pool and the worker dimensions.
pub struct Proxy {
    socket: Arc<UdpSocket>,
    selector: Arc<UpstreamSelector>,
    worker_count: usize,
    request_timeout: Duration,
}

impl Proxy {
    /// Bind the listening socket and build the upstream pool.
    /// Failure to bind is fatal; the caller is expected to exit.
    pub async fn bind(config: &Config) -> Result<Self, ProxyError> {
        let upstreams = config
            .upstreams
            .iter()
            .map(Upstream::from_config)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(Arc::new)
            .collect();
        Self::bind_with(config, upstreams).await
    }

    /// Same as [`Proxy::bind`] with an explicit upstream pool. Tests wire
    /// mock upstreams on ephemeral ports through this.
    pub async fn bind_with(
        config: &Config,
        upstreams: Vec<Arc<Upstream>>,
    ) -> Result<Self, ProxyError> {
        let selector = Arc::new(UpstreamSelector::new(upstreams)?);

        let ip: IpAddr = config.server.bind_address.parse().map_err(|_| {
            ProxyError::Config(format!(
                "invalid bind address '{}'",
                config.server.bind_address
            ))
        })?;
        let bind_addr = SocketAddr::new(ip, config.server.dns_port);

        let socket = create_udp_socket(bind_addr).map_err(|e| {
            ProxyError::Config(format!("failed to bind listener on {bind_addr}: {e}"))
        })?;

        let worker_count = config.proxy.effective_workers();
        info!(
            bind_address = %bind_addr,
            workers = worker_count,
            upstreams = selector.len(),
            "Proxy socket bound"
        );

        Ok(Self {
            socket: Arc::new(socket),
            selector,
            worker_count,
            request_timeout: Duration::from_millis(config.proxy.request_timeout_ms),
        })
    }

    /// The actually bound address (relevant when the port was 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ProxyError> {
        self.socket
            .local_addr()
            .map_err(|e| ProxyError::Config(format!("socket has no local address: {e}")))
    }

    /// Run the pipeline until `shutdown` fires, then drain and return.
    pub async fn run(self, shutdown: CancellationToken) {
        let (lookup_tx, lookup_rx) = mpsc::channel::<Job>(self.worker_count);
        let (result_tx, result_rx) = mpsc::channel::<Job>(self.worker_count);

        let listener_exit = CancellationToken::new();
        let worker_exit = CancellationToken::new();
        let writer_exit = CancellationToken::new();

        let mut tasks: JoinSet<()> = JoinSet::new();

        tasks.spawn(run_listener(
            Arc::clone(&self.socket),
            lookup_tx,
            listener_exit.clone(),
        ));

        let lookup_rx = Arc::new(Mutex::new(lookup_rx));
        for id in 0..self.worker_count {
            tasks.spawn(run_worker(
                id,
                Arc::clone(&lookup_rx),
                result_tx.clone(),
                Arc::clone(&self.selector),
                self.request_timeout,
                worker_exit.clone(),
            ));
        }
        drop(result_tx);

        tasks.spawn(run_writer(
            Arc::clone(&self.socket),
            result_rx,
            writer_exit.clone(),
        ));

        shutdown.cancelled().await;
        info!("Shutdown signal received, draining pipeline");

        // Listener first so no late datagram becomes a new job, workers
        // next, writer last. The queues close as their senders drop, so a
        // worker can never block on a queue nobody reads.
        listener_exit.cancel();
        worker_exit.cancel();
        writer_exit.cancel();

        while tasks.join_next().await.is_some() {}
        info!("Proxy shut down");
    }
}

async fn run_listener(
    socket: Arc<UdpSocket>,
    lookup_tx: mpsc::Sender<Job>,
    exit: CancellationToken,
) {
    info!("Listener running");
    let mut recv_buf = [0u8; MAX_DATAGRAM_SIZE];

    loop {
        let (len, addr) = tokio::select! {
            _ = exit.cancelled() => break,
            received = socket.recv_from(&mut recv_buf) => match received {
                Ok(x) => x,
                Err(e) => {
                    error!(error = %e, "Failed to read query datagram");
                    continue;
                }
            },
        };

        debug!(size = len, client = %addr, "Query received");

        let job = Job {
            addr,
            data: recv_buf[..len].to_vec(),
        };
        tokio::select! {
            _ = exit.cancelled() => break,
            sent = lookup_tx.send(job) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    info!("Listener exited");
}

async fn run_worker(
    id: usize,
    lookup_rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    result_tx: mpsc::Sender<Job>,
    selector: Arc<UpstreamSelector>,
    timeout: Duration,
    exit: CancellationToken,
) {
    info!(id, "Resolver worker running");
    let mut rng = fastrand::Rng::new();

    loop {
        let job = tokio::select! {
            _ = exit.cancelled() => break,
            job = dequeue(&lookup_rx) => match job {
                Some(job) => job,
                None => break,
            },
        };

        let Job { addr, data } = job;

        // An in-flight resolve is abandoned on shutdown; the stub never
        // receives a partial response either way.
        let outcome = tokio::select! {
            _ = exit.cancelled() => {
                debug!(client = %addr, "Job abandoned during shutdown");
                break;
            }
            outcome = resolve_job(&data, &selector, &mut rng, timeout) => outcome,
        };

        match outcome {
            Ok(response) => {
                // A closed result queue means the writer is gone and
                // shutdown is underway.
                if result_tx.send(Job { addr, data: response }).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(client = %addr, kind = e.kind(), error = %e, "Dropped query");
            }
        }
    }

    info!(id, "Resolver worker exited");
}

async fn dequeue(queue: &Mutex<mpsc::Receiver<Job>>) -> Option<Job> {
    queue.lock().await.recv().await
}

/// Parse → select → resolve → pack. Any error drops the job; the stub
/// resolver retries on its own schedule.
async fn resolve_job(
    data: &[u8],
    selector: &UpstreamSelector,
    rng: &mut fastrand::Rng,
    timeout: Duration,
) -> Result<Vec<u8>, ProxyError> {
    let query = MessageCodec::parse_query(data)?;
    debug!(
        id = query.id(),
        op_code = ?query.op_code(),
        questions = query.queries().len(),
        "Query parsed"
    );

    // Multi-question queries have no well-defined answer semantics over
    // the JSON DoH form; refuse them instead of guessing.
    if query.queries().len() > 1 {
        warn!(
            id = query.id(),
            questions = query.queries().len(),
            "Refusing multi-question query with FORMERR"
        );
        return MessageCodec::pack(&MessageCodec::format_error_reply(&query));
    }

    let question = query
        .queries()
        .first()
        .ok_or_else(|| ProxyError::Parse("query carries no question section".to_string()))?;
    let question_text = question.name().to_utf8();

    let upstream = selector.select(&question_text, rng);
    debug!(
        upstream = upstream.name(),
        protocol = upstream.protocol_name(),
        question = %question_text,
        "Upstream selected"
    );

    let response = upstream.resolve(&query, timeout).await?;
    MessageCodec::pack(&response)
}

async fn run_writer(
    socket: Arc<UdpSocket>,
    mut result_rx: mpsc::Receiver<Job>,
    exit: CancellationToken,
) {
    info!("Writer running");

    loop {
        let job = tokio::select! {
            _ = exit.cancelled() => break,
            job = result_rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        if let Err(e) = socket.send_to(&job.data, job.addr).await {
            error!(error = %e, client = %job.addr, "Failed to write response");
        }
    }

    info!("Writer exited");
}

fn create_udp_socket(addr: SocketAddr) -> std::io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_recv_buffer_size(4 * 1024 * 1024)?;
    socket.set_send_buffer_size(1024 * 1024)?;
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}
