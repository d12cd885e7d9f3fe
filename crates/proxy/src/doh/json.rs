//! Typed model of the JSON DoH response body.
//!
//! The schema is the one served by Google (`/resolve`) and Cloudflare
//! (`/dns-query`) for `Accept: application/dns-json` requests. It is an
//! external contract we consume, not define; everything beyond the fields
//! below is ignored.

use serde::Deserialize;

/// One answer row: `{name, type, TTL, data}`.
///
/// `data` stays a string here; its grammar depends on `type` and is decoded
/// by the record reconstructor.
#[derive(Debug, Clone, Deserialize)]
pub struct DohAnswer {
    pub name: String,

    #[serde(rename = "type")]
    pub rr_type: u16,

    #[serde(rename = "TTL")]
    pub ttl: u32,

    pub data: String,
}

/// A complete DoH JSON response.
///
/// The flag fields and the three sections are all optional on the wire;
/// defaults are applied when the record sections are rebuilt.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DohReply {
    #[serde(rename = "Status", default)]
    pub status: u16,

    #[serde(rename = "TC")]
    pub truncated: Option<bool>,

    #[serde(rename = "RD")]
    pub recursion_desired: Option<bool>,

    #[serde(rename = "RA")]
    pub recursion_available: Option<bool>,

    #[serde(rename = "Answer")]
    pub answer: Option<Vec<DohAnswer>>,

    #[serde(rename = "Authority")]
    pub authority: Option<Vec<DohAnswer>>,

    #[serde(rename = "Additional")]
    pub additional: Option<Vec<DohAnswer>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_deserializes_renamed_fields() {
        let answer: DohAnswer = serde_json::from_str(
            r#"{"name":"example.com.","type":1,"TTL":120,"data":"93.184.216.34"}"#,
        )
        .unwrap();
        assert_eq!(answer.name, "example.com.");
        assert_eq!(answer.rr_type, 1);
        assert_eq!(answer.ttl, 120);
        assert_eq!(answer.data, "93.184.216.34");
    }

    #[test]
    fn test_reply_tolerates_sparse_body() {
        let reply: DohReply = serde_json::from_str(r#"{"Status":0}"#).unwrap();
        assert_eq!(reply.status, 0);
        assert!(reply.answer.is_none());
        assert!(reply.truncated.is_none());
    }

    #[test]
    fn test_reply_rejects_missing_answer_fields() {
        // "data" missing from an answer row.
        let result: Result<DohReply, _> = serde_json::from_str(
            r#"{"Status":0,"Answer":[{"name":"example.com.","type":1,"TTL":120}]}"#,
        );
        assert!(result.is_err());
    }
}
