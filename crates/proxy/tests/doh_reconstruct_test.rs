//! DoH JSON → wire response scenarios, driven by complete response
//! bodies as the public resolvers serve them.

use hickory_proto::op::Message;
use hickory_proto::rr::dnssec::rdata::DNSSECRData;
use hickory_proto::rr::{DNSClass, RData, RecordType};
use veil_dns_domain::ProxyError;
use veil_dns_proxy::doh::{build_sections, DohReply};
use veil_dns_proxy::MessageCodec;

mod helpers;
use helpers::build_query;

fn parse_reply(body: &str) -> DohReply {
    serde_json::from_str(body).expect("test body should be valid JSON")
}

#[test]
fn test_a_record_response_end_to_end() {
    let body = r#"{
        "Status": 0,
        "Answer": [
            {"name": "example.com.", "type": 1, "TTL": 120, "data": "93.184.216.34"}
        ],
        "RA": true
    }"#;

    let sections = build_sections(&parse_reply(body)).unwrap();
    assert_eq!(sections.answers.len(), 1);
    assert!(!sections.truncated);
    assert!(sections.recursion_desired);
    assert!(sections.recursion_available);

    // Graft the sections onto a reply to the original query and check the
    // response a stub would see.
    let query = Message::from_vec(&build_query(0xAB12, "example.com.", RecordType::A)).unwrap();
    let mut reply = MessageCodec::reply_to(&query);
    reply.set_truncated(sections.truncated);
    reply.set_recursion_desired(sections.recursion_desired);
    reply.set_recursion_available(sections.recursion_available);
    for record in sections.answers {
        reply.add_answer(record);
    }

    let wire = MessageCodec::pack(&reply).unwrap();
    let parsed = Message::from_vec(&wire).unwrap();

    assert_eq!(parsed.id(), 0xAB12);
    assert!(!parsed.truncated());
    assert!(parsed.recursion_desired());
    assert!(parsed.recursion_available());

    let answer = &parsed.answers()[0];
    assert_eq!(answer.record_type(), RecordType::A);
    assert_eq!(answer.dns_class(), DNSClass::IN);
    assert_eq!(answer.ttl(), 120);
    match answer.data() {
        Some(RData::A(a)) => assert_eq!(a.0.octets(), [93, 184, 216, 34]),
        other => panic!("expected A rdata, got {other:?}"),
    }
}

#[test]
fn test_soa_reconstruction_field_mapping() {
    let body = r#"{
        "Status": 0,
        "Authority": [
            {"name": "example.com.", "type": 6, "TTL": 300,
             "data": "ns1.example.com. hostmaster.example.com. 2023010101 7200 3600 1209600 300"}
        ]
    }"#;

    let sections = build_sections(&parse_reply(body)).unwrap();
    assert!(sections.answers.is_empty());
    assert_eq!(sections.name_servers.len(), 1);

    match sections.name_servers[0].data() {
        Some(RData::SOA(soa)) => {
            assert_eq!(soa.serial(), 2023010101);
            assert_eq!(soa.refresh(), 7200);
            assert_eq!(soa.retry(), 3600);
            assert_eq!(soa.expire(), 1209600);
            assert_eq!(soa.minimum(), 300);
        }
        other => panic!("expected SOA rdata, got {other:?}"),
    }
}

#[test]
fn test_unsupported_type_aborts_whole_response() {
    let body = r#"{
        "Status": 0,
        "Answer": [
            {"name": "example.com.", "type": 1, "TTL": 60, "data": "1.2.3.4"},
            {"name": "example.com.", "type": 99, "TTL": 60, "data": "?"}
        ]
    }"#;

    let err = build_sections(&parse_reply(body)).unwrap_err();
    assert!(matches!(err, ProxyError::UnsupportedRecordType(99)));
}

#[test]
fn test_flag_defaults_when_json_keys_absent() {
    let sections = build_sections(&parse_reply(r#"{"Status": 0}"#)).unwrap();
    assert!(!sections.truncated);
    assert!(sections.recursion_desired);
    assert!(sections.recursion_available);
    assert!(sections.answers.is_empty());
    assert!(sections.name_servers.is_empty());
    assert!(sections.additionals.is_empty());
}

#[test]
fn test_explicit_flags_override_defaults() {
    let body = r#"{"Status": 0, "TC": true, "RD": false, "RA": false}"#;
    let sections = build_sections(&parse_reply(body)).unwrap();
    assert!(sections.truncated);
    assert!(!sections.recursion_desired);
    assert!(!sections.recursion_available);
}

#[test]
fn test_all_three_sections_are_rebuilt() {
    let body = r#"{
        "Status": 0,
        "Answer": [
            {"name": "example.com.", "type": 5, "TTL": 60, "data": "www.example.com."}
        ],
        "Authority": [
            {"name": "example.com.", "type": 2, "TTL": 3600, "data": "ns1.example.com."}
        ],
        "Additional": [
            {"name": "ns1.example.com.", "type": 28, "TTL": 3600,
             "data": "2001:db8::53"}
        ]
    }"#;

    let sections = build_sections(&parse_reply(body)).unwrap();
    assert_eq!(sections.answers.len(), 1);
    assert_eq!(sections.name_servers.len(), 1);
    assert_eq!(sections.additionals.len(), 1);
    assert_eq!(sections.answers[0].record_type(), RecordType::CNAME);
    assert_eq!(sections.name_servers[0].record_type(), RecordType::NS);
    assert_eq!(sections.additionals[0].record_type(), RecordType::AAAA);
}

#[test]
fn test_dnssec_records_survive_reconstruction() {
    let body = r#"{
        "Status": 0,
        "Answer": [
            {"name": "example.com.", "type": 47, "TTL": 3600,
             "data": "next.example.com. A AAAA RRSIG NSEC"}
        ]
    }"#;

    let sections = build_sections(&parse_reply(body)).unwrap();
    match sections.answers[0].data() {
        Some(RData::DNSSEC(DNSSECRData::NSEC(nsec))) => {
            assert_eq!(nsec.next_domain_name().to_utf8(), "next.example.com.");
            assert_eq!(nsec.type_bit_maps().len(), 4);
        }
        other => panic!("expected NSEC rdata, got {other:?}"),
    }
}

#[test]
fn test_one_malformed_answer_fails_the_section() {
    let body = r#"{
        "Status": 0,
        "Answer": [
            {"name": "example.com.", "type": 1, "TTL": 60, "data": "1.2.3.4"},
            {"name": "example.com.", "type": 15, "TTL": 60, "data": "ten mail.example.com."}
        ]
    }"#;

    let err = build_sections(&parse_reply(body)).unwrap_err();
    match err {
        ProxyError::MalformedAnswer(detail) => {
            assert!(detail.contains("'ten'"), "got: {detail}");
            assert!(detail.contains("field 0"), "got: {detail}");
        }
        other => panic!("expected MalformedAnswer, got {other:?}"),
    }
}
