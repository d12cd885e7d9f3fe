//! Rebuilds wire resource records from DoH JSON answer rows.
//!
//! Each row arrives as `{name, type, TTL, data}` with a type-dependent
//! textual grammar inside `data`. The supported type set is closed: a row
//! outside it fails the whole response, never a partial answer set.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hickory_proto::rr::dnssec::rdata::{DNSSECRData, NSEC, RRSIG};
use hickory_proto::rr::dnssec::Algorithm;
use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, NS, PTR, SOA, SRV, TXT};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use veil_dns_domain::ProxyError;

use super::json::{DohAnswer, DohReply};

/// The three record sections of a response plus its header flag bits.
#[derive(Debug)]
pub struct Sections {
    pub answers: Vec<Record>,
    pub name_servers: Vec<Record>,
    pub additionals: Vec<Record>,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
}

/// Rebuild all three sections from a DoH reply.
///
/// Flag defaults when the JSON key is absent: TC=false, RD=true, RA=true.
pub fn build_sections(reply: &DohReply) -> Result<Sections, ProxyError> {
    Ok(Sections {
        answers: build_section(reply.answer.as_deref())?,
        name_servers: build_section(reply.authority.as_deref())?,
        additionals: build_section(reply.additional.as_deref())?,
        truncated: reply.truncated.unwrap_or(false),
        recursion_desired: reply.recursion_desired.unwrap_or(true),
        recursion_available: reply.recursion_available.unwrap_or(true),
    })
}

fn build_section(rows: Option<&[DohAnswer]>) -> Result<Vec<Record>, ProxyError> {
    rows.unwrap_or_default().iter().map(build_record).collect()
}

/// Rebuild one resource record.
///
/// The owner name is forced to FQDN, the class is always IN, and type/ttl
/// come straight from the JSON numerics.
pub fn build_record(answer: &DohAnswer) -> Result<Record, ProxyError> {
    let name = fqdn(&answer.name)?;
    let rdata = build_rdata(answer)?;
    Ok(Record::from_rdata(name, answer.ttl, rdata))
}

fn build_rdata(answer: &DohAnswer) -> Result<RData, ProxyError> {
    let data = answer.data.as_str();

    match answer.rr_type {
        1 => Ok(RData::A(A(parse_ipv4(data)?))),
        2 => Ok(RData::NS(NS(fqdn(data)?))),
        5 => Ok(RData::CNAME(CNAME(fqdn(data)?))),
        6 => build_soa(data),
        12 => Ok(RData::PTR(PTR(fqdn(data)?))),
        15 => build_mx(data),
        16 => build_txt(data),
        28 => Ok(RData::AAAA(AAAA(parse_ipv6(data)?))),
        33 => build_srv(data),
        46 => build_rrsig(data),
        47 => build_nsec(data),
        other => Err(ProxyError::UnsupportedRecordType(other)),
    }
}

/// `ns mbox serial refresh retry expire minttl`
fn build_soa(data: &str) -> Result<RData, ProxyError> {
    let fields: Vec<&str> = data.split_whitespace().collect();

    let mname = fqdn(field(&fields, 0, "SOA")?)?;
    let rname = fqdn(field(&fields, 1, "SOA")?)?;
    let serial = numeric_field::<u32>(&fields, 2, "SOA")?;
    let refresh = numeric_field::<u32>(&fields, 3, "SOA")?;
    let retry = numeric_field::<u32>(&fields, 4, "SOA")?;
    let expire = numeric_field::<u32>(&fields, 5, "SOA")?;
    let minimum = numeric_field::<u32>(&fields, 6, "SOA")?;

    // hickory carries refresh/retry/expire as i32; the wire bits are the same.
    Ok(RData::SOA(SOA::new(
        mname,
        rname,
        serial,
        refresh as i32,
        retry as i32,
        expire as i32,
        minimum,
    )))
}

/// `preference mx`
fn build_mx(data: &str) -> Result<RData, ProxyError> {
    let fields: Vec<&str> = data.split_whitespace().collect();

    let preference = numeric_field::<u16>(&fields, 0, "MX")?;
    let exchange = fqdn(field(&fields, 1, "MX")?)?;

    Ok(RData::MX(MX::new(preference, exchange)))
}

/// A single JSON-quoted character-string.
fn build_txt(data: &str) -> Result<RData, ProxyError> {
    let unquoted: String = serde_json::from_str(data).map_err(|_| {
        ProxyError::MalformedAnswer(format!("TXT data '{data}' is not a quoted string"))
    })?;
    Ok(RData::TXT(TXT::new(vec![unquoted])))
}

/// `priority weight port target`
fn build_srv(data: &str) -> Result<RData, ProxyError> {
    let fields: Vec<&str> = data.split_whitespace().collect();

    let priority = numeric_field::<u16>(&fields, 0, "SRV")?;
    let weight = numeric_field::<u16>(&fields, 1, "SRV")?;
    let port = numeric_field::<u16>(&fields, 2, "SRV")?;
    let target = fqdn(field(&fields, 3, "SRV")?)?;

    Ok(RData::SRV(SRV::new(priority, weight, port, target)))
}

/// `type_covered algo labels origttl expiration inception keytag signer signature`
fn build_rrsig(data: &str) -> Result<RData, ProxyError> {
    let fields: Vec<&str> = data.split_whitespace().collect();

    let type_covered = type_from_name(field(&fields, 0, "RRSIG")?)?;
    let algorithm = Algorithm::from_u8(numeric_field::<u8>(&fields, 1, "RRSIG")?);
    let num_labels = numeric_field::<u8>(&fields, 2, "RRSIG")?;
    let original_ttl = numeric_field::<u32>(&fields, 3, "RRSIG")?;
    let expiration = numeric_field::<u32>(&fields, 4, "RRSIG")?;
    let inception = numeric_field::<u32>(&fields, 5, "RRSIG")?;
    let key_tag = numeric_field::<u16>(&fields, 6, "RRSIG")?;
    let signer_name = fqdn(field(&fields, 7, "RRSIG")?)?;
    let signature_text = field(&fields, 8, "RRSIG")?;

    let signature = STANDARD.decode(signature_text).map_err(|_| {
        ProxyError::MalformedAnswer(format!(
            "RRSIG field 8 ('{signature_text}') is not valid base64"
        ))
    })?;

    Ok(RData::DNSSEC(DNSSECRData::RRSIG(RRSIG::new(
        type_covered,
        algorithm,
        num_labels,
        original_ttl,
        expiration,
        inception,
        key_tag,
        signer_name,
        signature,
    ))))
}

/// `next_domain t1 t2 …`
fn build_nsec(data: &str) -> Result<RData, ProxyError> {
    let mut fields = data.split_whitespace();

    let next_domain = fqdn(fields.next().ok_or_else(|| {
        ProxyError::MalformedAnswer("NSEC data carries no next-domain field".to_string())
    })?)?;

    let type_bit_maps = fields
        .map(type_from_name)
        .collect::<Result<Vec<RecordType>, ProxyError>>()?;

    Ok(RData::DNSSEC(DNSSECRData::NSEC(NSEC::new(
        next_domain,
        type_bit_maps,
    ))))
}

/// Force a textual name to FQDN form (trailing dot) before parsing it.
fn fqdn(name: &str) -> Result<Name, ProxyError> {
    let parsed = if name.ends_with('.') {
        Name::from_utf8(name)
    } else {
        Name::from_utf8(format!("{name}."))
    };
    parsed.map_err(|e| ProxyError::MalformedAnswer(format!("invalid domain name '{name}': {e}")))
}

/// Textual type mnemonic → record type (used by RRSIG and NSEC payloads).
fn type_from_name(token: &str) -> Result<RecordType, ProxyError> {
    RecordType::from_str(token).map_err(|_| {
        ProxyError::MalformedAnswer(format!("'{token}' is not a known record type mnemonic"))
    })
}

fn parse_ipv4(data: &str) -> Result<Ipv4Addr, ProxyError> {
    data.parse()
        .map_err(|_| ProxyError::MalformedAnswer(format!("'{data}' is not an IPv4 address")))
}

fn parse_ipv6(data: &str) -> Result<Ipv6Addr, ProxyError> {
    data.parse()
        .map_err(|_| ProxyError::MalformedAnswer(format!("'{data}' is not an IPv6 address")))
}

fn field<'a>(fields: &[&'a str], index: usize, record: &str) -> Result<&'a str, ProxyError> {
    fields.get(index).copied().ok_or_else(|| {
        ProxyError::MalformedAnswer(format!("{record} data is missing field {index}"))
    })
}

/// Decimal field parse that reports the first failing token, with its
/// position and the offending substring.
fn numeric_field<T: FromStr>(
    fields: &[&str],
    index: usize,
    record: &str,
) -> Result<T, ProxyError> {
    let token = field(fields, index, record)?;
    token.parse().map_err(|_| {
        ProxyError::MalformedAnswer(format!(
            "{record} field {index} ('{token}') is not a valid number"
        ))
    })
}
