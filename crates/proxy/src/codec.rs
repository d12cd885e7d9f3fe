//! DNS wire codec (RFC 1035)
//!
//! Pure byte-level encode/decode on top of `hickory-proto`, with no I/O.
//! Keeping these free of socket setup is what lets the round-trip
//! properties be tested directly against byte buffers.

use hickory_proto::op::{Message, MessageType, ResponseCode};
use veil_dns_domain::ProxyError;

/// Encoder/decoder for the datagrams exchanged with stub resolvers.
pub struct MessageCodec;

impl MessageCodec {
    /// Decode one query datagram.
    ///
    /// Rejects truncated buffers and section counts that overrun the input
    /// (both enforced by the hickory decoder), plus messages without a
    /// question. Transaction id, opcode and the question list survive
    /// exactly; other header bits are not inspected here.
    pub fn parse_query(bytes: &[u8]) -> Result<Message, ProxyError> {
        let message = Message::from_vec(bytes).map_err(|e| ProxyError::Parse(e.to_string()))?;

        if message.queries().is_empty() {
            return Err(ProxyError::Parse(
                "query carries no question section".to_string(),
            ));
        }

        Ok(message)
    }

    /// Encode a message into a datagram. Name compression is on (hickory
    /// encoder default), matching what stubs expect from a resolver.
    pub fn pack(message: &Message) -> Result<Vec<u8>, ProxyError> {
        message.to_vec().map_err(|e| ProxyError::Pack(e.to_string()))
    }

    /// Reply skeleton for a query: id, opcode and RD copied over, QR set,
    /// RA set, and the first question echoed into the question section.
    pub fn reply_to(query: &Message) -> Message {
        let mut reply = Message::new();
        reply.set_id(query.id());
        reply.set_message_type(MessageType::Response);
        reply.set_op_code(query.op_code());
        reply.set_recursion_desired(query.recursion_desired());
        reply.set_recursion_available(true);

        if let Some(question) = query.queries().first() {
            reply.add_query(question.clone());
        }

        reply
    }

    /// FORMERR reply, used to refuse queries the proxy does not serve
    /// (multi-question queries in particular).
    pub fn format_error_reply(query: &Message) -> Message {
        let mut reply = Self::reply_to(query);
        reply.set_response_code(ResponseCode::FormErr);
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::{OpCode, Query};
    use hickory_proto::rr::{Name, RecordType};
    use std::str::FromStr;

    fn sample_query(id: u16) -> Message {
        let mut query = Message::new();
        query.set_id(id);
        query.set_message_type(MessageType::Query);
        query.set_op_code(OpCode::Query);
        query.set_recursion_desired(true);
        query.add_query(Query::query(
            Name::from_str("example.com.").unwrap(),
            RecordType::A,
        ));
        query
    }

    #[test]
    fn test_parse_query_roundtrip_preserves_identity() {
        let query = sample_query(0xAB12);
        let bytes = MessageCodec::pack(&query).unwrap();

        let parsed = MessageCodec::parse_query(&bytes).unwrap();
        assert_eq!(parsed.id(), 0xAB12);
        assert_eq!(parsed.op_code(), OpCode::Query);
        assert_eq!(parsed.queries().len(), 1);
        assert_eq!(parsed.queries()[0].name().to_utf8(), "example.com.");
        assert_eq!(parsed.queries()[0].query_type(), RecordType::A);
    }

    #[test]
    fn test_parse_query_rejects_garbage() {
        assert!(MessageCodec::parse_query(&[0xFF, 0x00, 0x01]).is_err());
    }

    #[test]
    fn test_parse_query_rejects_truncated_header() {
        let query = sample_query(7);
        let bytes = MessageCodec::pack(&query).unwrap();
        assert!(MessageCodec::parse_query(&bytes[..8]).is_err());
    }

    #[test]
    fn test_parse_query_rejects_empty_question_section() {
        let mut message = Message::new();
        message.set_id(42);
        let bytes = message.to_vec().unwrap();
        assert!(MessageCodec::parse_query(&bytes).is_err());
    }

    #[test]
    fn test_reply_echoes_id_and_question() {
        let query = sample_query(0x1234);
        let reply = MessageCodec::reply_to(&query);

        assert_eq!(reply.id(), 0x1234);
        assert_eq!(reply.message_type(), MessageType::Response);
        assert_eq!(reply.op_code(), OpCode::Query);
        assert!(reply.recursion_desired());
        assert!(reply.recursion_available());
        assert_eq!(reply.queries().len(), 1);

        // Reply survives a pack/parse cycle with the id intact.
        let bytes = MessageCodec::pack(&reply).unwrap();
        let parsed = Message::from_vec(&bytes).unwrap();
        assert_eq!(parsed.id(), 0x1234);
    }

    #[test]
    fn test_format_error_reply() {
        let query = sample_query(9);
        let reply = MessageCodec::format_error_reply(&query);
        assert_eq!(reply.id(), 9);
        assert_eq!(reply.response_code(), ResponseCode::FormErr);
        assert_eq!(reply.message_type(), MessageType::Response);
    }

    #[test]
    fn test_wire_id_matches_header_bytes() {
        let query = sample_query(0xBEEF);
        let bytes = MessageCodec::pack(&query).unwrap();
        assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]), 0xBEEF);
    }
}
