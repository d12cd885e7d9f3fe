//! Shared fixtures: an in-process mock DNS upstream and query builders.
#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::str::FromStr;
use tokio::net::UdpSocket;
use veil_dns_domain::Config;

/// Behavior of the mock upstream resolver.
#[derive(Clone, Copy)]
pub enum MockMode {
    /// Answer every question with one A record.
    AnswerA(Ipv4Addr),
    /// Answer NXDOMAIN.
    NxDomain,
    /// Answer SERVFAIL.
    ServFail,
    /// Swallow queries without answering.
    Silent,
}

/// Start a mock DNS upstream on an ephemeral port and return its address.
pub async fn spawn_mock_upstream(mode: MockMode) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind mock");
    let addr = socket.local_addr().expect("mock addr");

    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        loop {
            let (len, from) = match socket.recv_from(&mut buf).await {
                Ok(x) => x,
                Err(_) => break,
            };
            if matches!(mode, MockMode::Silent) {
                continue;
            }
            let query = match Message::from_vec(&buf[..len]) {
                Ok(q) => q,
                Err(_) => continue,
            };

            let mut reply = Message::new();
            reply.set_id(query.id());
            reply.set_message_type(MessageType::Response);
            reply.set_op_code(query.op_code());
            reply.set_recursion_desired(query.recursion_desired());
            reply.set_recursion_available(true);
            if let Some(question) = query.queries().first() {
                reply.add_query(question.clone());
            }

            match mode {
                MockMode::AnswerA(ip) => {
                    if let Some(question) = query.queries().first() {
                        reply.add_answer(Record::from_rdata(
                            question.name().clone(),
                            60,
                            RData::A(A(ip)),
                        ));
                    }
                }
                MockMode::NxDomain => {
                    reply.set_response_code(ResponseCode::NXDomain);
                }
                MockMode::ServFail => {
                    reply.set_response_code(ResponseCode::ServFail);
                }
                MockMode::Silent => unreachable!(),
            }

            let bytes = reply.to_vec().expect("pack mock reply");
            let _ = socket.send_to(&bytes, from).await;
        }
    });

    addr
}

/// A single-question query in wire form.
pub fn build_query(id: u16, name: &str, record_type: RecordType) -> Vec<u8> {
    build_multi_query(id, &[name], record_type)
}

pub fn build_multi_query(id: u16, names: &[&str], record_type: RecordType) -> Vec<u8> {
    let mut query = Message::new();
    query.set_id(id);
    query.set_message_type(MessageType::Query);
    query.set_op_code(OpCode::Query);
    query.set_recursion_desired(true);
    for name in names {
        query.add_query(Query::query(
            Name::from_str(name).expect("test name"),
            record_type,
        ));
    }
    query.to_vec().expect("pack test query")
}

/// Proxy configuration bound to an ephemeral localhost port.
pub fn test_config(workers: usize) -> Config {
    let mut config = Config::default();
    config.server.bind_address = "127.0.0.1".to_string();
    config.server.dns_port = 0;
    config.proxy.workers = workers;
    config.proxy.request_timeout_ms = 1_000;
    config
}
