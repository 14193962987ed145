use anyhow::{Context, Result, anyhow, bail};
use hickory_proto::rr::dnssec::rdata::{DNSKEY, DNSSECRData, DS, NSEC, SIG};
use hickory_proto::rr::dnssec::{Algorithm, DigestType};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::str::FromStr;

/// TTL applied to records whose listing omits one, absent a `$TTL` directive.
pub const DEFAULT_TTL: u32 = 3600;

/// Reads a zone-file-style record listing into an ordered record sequence.
///
/// Unlike a zone loader this keeps the records in file order, since that is
/// the order presented to the validator, and treats any malformed record as
/// fatal rather than skipping it.
pub fn parse_rr_file<P: AsRef<Path>>(path: P, default_ttl: u32) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Error opening \"{}\"", path.display()))?;

    parse_rr_text(&content, default_ttl)
        .with_context(|| format!("Error reading \"{}\"", path.display()))
}

pub fn parse_rr_text(content: &str, default_ttl: u32) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut current_origin = Name::root();
    let mut default_ttl = default_ttl;

    for (line_num, line) in preprocess_content(content).iter().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if line.starts_with('$') {
            if line.starts_with("$ORIGIN") {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 2 {
                    current_origin = Name::from_str(parts[1])
                        .with_context(|| format!("Invalid $ORIGIN on line {}", line_num + 1))?;
                }
            } else if line.starts_with("$TTL") {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 2 {
                    default_ttl = parts[1]
                        .parse()
                        .with_context(|| format!("Invalid $TTL on line {}", line_num + 1))?;
                }
            }
            continue;
        }

        records.push(parse_resource_record(
            line,
            &current_origin,
            default_ttl,
            line_num,
        )?);
    }

    Ok(records)
}

/// Joins parenthesized multi-line records and strips inline comments,
/// preserving semicolons inside quoted strings.
fn preprocess_content(content: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_line = String::new();
    let mut in_parens = false;

    for line in content.lines() {
        let line_without_comment = if let Some(pos) = line.find(';') {
            let before_semicolon = &line[..pos];
            let quote_count = before_semicolon.matches('"').count();

            if quote_count % 2 == 1 {
                line
            } else {
                before_semicolon
            }
        } else {
            line
        };

        let trimmed = line_without_comment.trim();

        if trimmed.contains('(') {
            in_parens = true;
            current_line.push_str(trimmed.replace('(', "").trim());
            current_line.push(' ');
            continue;
        }

        if trimmed.contains(')') {
            in_parens = false;
            current_line.push_str(trimmed.replace(')', "").trim());
            result.push(current_line.trim().to_string());
            current_line = String::new();
            continue;
        }

        if in_parens {
            current_line.push_str(trimmed);
            current_line.push(' ');
        } else if !trimmed.is_empty() {
            result.push(trimmed.to_string());
        }
    }

    if !current_line.is_empty() {
        result.push(current_line.trim().to_string());
    }

    result
}

fn parse_resource_record(
    line: &str,
    origin: &Name,
    default_ttl: u32,
    line_num: usize,
) -> Result<Record> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        bail!("Truncated record on line {}", line_num + 1);
    }

    let mut idx = 0;

    let name = if parts[idx] == "@" {
        origin.clone()
    } else {
        parse_domain_name(parts[idx], origin)
            .with_context(|| format!("Invalid owner name on line {}", line_num + 1))?
    };
    idx += 1;

    let mut ttl = default_ttl;
    if let Ok(explicit) = parts[idx].parse::<u32>() {
        ttl = explicit;
        idx += 1;
    }

    // Only the Internet class is supported; the token is optional.
    if parts[idx] == "IN" {
        idx += 1;
    }

    if parts.len() <= idx {
        bail!("Record missing a type on line {}", line_num + 1);
    }
    let rtype = parts[idx];
    idx += 1;
    let rdata_parts = &parts[idx..];

    let rdata = parse_rdata(rtype, rdata_parts, origin, line_num)?;

    Ok(Record::from_rdata(name, ttl, rdata))
}

fn parse_rdata(rtype: &str, parts: &[&str], origin: &Name, line_num: usize) -> Result<RData> {
    let rdata = match rtype {
        "A" => {
            let addr = field(parts, 0, rtype, line_num)?
                .parse::<Ipv4Addr>()
                .with_context(|| format!("Invalid A record on line {}", line_num + 1))?;
            RData::A(hickory_proto::rr::rdata::A(addr))
        }
        "AAAA" => {
            let addr = field(parts, 0, rtype, line_num)?
                .parse::<Ipv6Addr>()
                .with_context(|| format!("Invalid AAAA record on line {}", line_num + 1))?;
            RData::AAAA(hickory_proto::rr::rdata::AAAA(addr))
        }
        "NS" => {
            let nsdname = parse_domain_name(field(parts, 0, rtype, line_num)?, origin)
                .with_context(|| format!("Invalid NS record on line {}", line_num + 1))?;
            RData::NS(hickory_proto::rr::rdata::NS(nsdname))
        }
        "CNAME" => {
            let cname = parse_domain_name(field(parts, 0, rtype, line_num)?, origin)
                .with_context(|| format!("Invalid CNAME record on line {}", line_num + 1))?;
            RData::CNAME(hickory_proto::rr::rdata::CNAME(cname))
        }
        "PTR" => {
            let ptrdname = parse_domain_name(field(parts, 0, rtype, line_num)?, origin)
                .with_context(|| format!("Invalid PTR record on line {}", line_num + 1))?;
            RData::PTR(hickory_proto::rr::rdata::PTR(ptrdname))
        }
        "MX" => {
            let preference = field(parts, 0, rtype, line_num)?
                .parse::<u16>()
                .with_context(|| format!("Invalid MX preference on line {}", line_num + 1))?;
            let exchange = parse_domain_name(field(parts, 1, rtype, line_num)?, origin)
                .with_context(|| format!("Invalid MX exchange on line {}", line_num + 1))?;
            RData::MX(hickory_proto::rr::rdata::MX::new(preference, exchange))
        }
        "TXT" => {
            if parts.is_empty() {
                bail!("Truncated TXT record on line {}", line_num + 1);
            }
            let txt_data = parts.join(" ");
            let txt_data = txt_data.trim_matches('"');
            RData::TXT(hickory_proto::rr::rdata::TXT::new(vec![
                txt_data.to_string(),
            ]))
        }
        "SOA" => {
            if parts.len() < 7 {
                bail!("Truncated SOA record on line {}", line_num + 1);
            }
            let mname = parse_domain_name(parts[0], origin)
                .with_context(|| format!("Invalid SOA mname on line {}", line_num + 1))?;
            let rname = parse_domain_name(parts[1], origin)
                .with_context(|| format!("Invalid SOA rname on line {}", line_num + 1))?;
            let serial = parts[2]
                .parse()
                .with_context(|| format!("Invalid SOA serial on line {}", line_num + 1))?;
            let refresh = parts[3]
                .parse()
                .with_context(|| format!("Invalid SOA refresh on line {}", line_num + 1))?;
            let retry = parts[4]
                .parse()
                .with_context(|| format!("Invalid SOA retry on line {}", line_num + 1))?;
            let expire = parts[5]
                .parse()
                .with_context(|| format!("Invalid SOA expire on line {}", line_num + 1))?;
            let minimum = parts[6]
                .parse()
                .with_context(|| format!("Invalid SOA minimum on line {}", line_num + 1))?;

            RData::SOA(hickory_proto::rr::rdata::SOA::new(
                mname, rname, serial, refresh, retry, expire, minimum,
            ))
        }
        "DNSKEY" => {
            if parts.len() < 4 {
                bail!("Truncated DNSKEY record on line {}", line_num + 1);
            }
            let flags = parts[0]
                .parse::<u16>()
                .with_context(|| format!("Invalid DNSKEY flags on line {}", line_num + 1))?;
            let _protocol = parts[1]
                .parse::<u8>()
                .with_context(|| format!("Invalid DNSKEY protocol on line {}", line_num + 1))?;
            let algorithm = parts[2]
                .parse::<u8>()
                .with_context(|| format!("Invalid DNSKEY algorithm on line {}", line_num + 1))?;

            // The public key is base64, possibly split across fields.
            let public_key_b64 = parts[3..].join("");
            let public_key = base64::Engine::decode(
                &base64::engine::general_purpose::STANDARD,
                &public_key_b64,
            )
            .with_context(|| format!("Invalid base64 in DNSKEY on line {}", line_num + 1))?;

            RData::DNSSEC(DNSSECRData::DNSKEY(DNSKEY::new(
                flags & 0x0100 != 0,
                flags & 0x0001 != 0,
                flags & 0x8000 != 0,
                Algorithm::from_u8(algorithm),
                public_key,
            )))
        }
        "RRSIG" => {
            // type_covered algorithm labels original_ttl expiration inception
            // key_tag signer_name signature
            if parts.len() < 9 {
                bail!("Truncated RRSIG record on line {}", line_num + 1);
            }
            let type_covered = RecordType::from_str(parts[0]).with_context(|| {
                format!("Invalid RRSIG type_covered on line {}", line_num + 1)
            })?;
            let algorithm = parts[1]
                .parse::<u8>()
                .with_context(|| format!("Invalid RRSIG algorithm on line {}", line_num + 1))?;
            let labels = parts[2]
                .parse::<u8>()
                .with_context(|| format!("Invalid RRSIG labels on line {}", line_num + 1))?;
            let original_ttl = parts[3].parse::<u32>().with_context(|| {
                format!("Invalid RRSIG original_ttl on line {}", line_num + 1)
            })?;
            let sig_expiration = parse_rrsig_time(parts[4]).with_context(|| {
                format!("Invalid RRSIG expiration on line {}", line_num + 1)
            })?;
            let sig_inception = parse_rrsig_time(parts[5]).with_context(|| {
                format!("Invalid RRSIG inception on line {}", line_num + 1)
            })?;
            let key_tag = parts[6]
                .parse::<u16>()
                .with_context(|| format!("Invalid RRSIG key_tag on line {}", line_num + 1))?;
            let signer_name = parse_domain_name(parts[7], origin).with_context(|| {
                format!("Invalid RRSIG signer_name on line {}", line_num + 1)
            })?;

            let signature_b64 = parts[8..].join("");
            let signature = base64::Engine::decode(
                &base64::engine::general_purpose::STANDARD,
                &signature_b64,
            )
            .with_context(|| format!("Invalid base64 in RRSIG on line {}", line_num + 1))?;

            RData::DNSSEC(DNSSECRData::SIG(SIG::new(
                type_covered,
                Algorithm::from_u8(algorithm),
                labels,
                original_ttl,
                sig_expiration,
                sig_inception,
                key_tag,
                signer_name,
                signature,
            )))
        }
        "NSEC" => {
            // next_domain_name type_bit_maps
            if parts.len() < 2 {
                bail!("Truncated NSEC record on line {}", line_num + 1);
            }
            let next_domain_name = parse_domain_name(parts[0], origin).with_context(|| {
                format!("Invalid NSEC next_domain_name on line {}", line_num + 1)
            })?;

            let mut type_bit_maps = Vec::new();
            for part in &parts[1..] {
                let rtype = RecordType::from_str(part).with_context(|| {
                    format!("Invalid NSEC type bitmap entry on line {}", line_num + 1)
                })?;
                type_bit_maps.push(rtype);
            }

            RData::DNSSEC(DNSSECRData::NSEC(NSEC::new(next_domain_name, type_bit_maps)))
        }
        "DS" => {
            // key_tag algorithm digest_type digest
            if parts.len() < 4 {
                bail!("Truncated DS record on line {}", line_num + 1);
            }
            let key_tag = parts[0]
                .parse::<u16>()
                .with_context(|| format!("Invalid DS key_tag on line {}", line_num + 1))?;
            let algorithm = parts[1]
                .parse::<u8>()
                .with_context(|| format!("Invalid DS algorithm on line {}", line_num + 1))?;
            let digest_type = match parts[2]
                .parse::<u8>()
                .with_context(|| format!("Invalid DS digest_type on line {}", line_num + 1))?
            {
                1 => DigestType::SHA1,
                2 => DigestType::SHA256,
                4 => DigestType::SHA384,
                other => bail!(
                    "Unsupported DS digest type {} on line {}",
                    other,
                    line_num + 1
                ),
            };

            let digest_hex = parts[3..].join("");
            let digest = hex::decode(&digest_hex)
                .with_context(|| format!("Invalid hex in DS on line {}", line_num + 1))?;

            RData::DNSSEC(DNSSECRData::DS(DS::new(
                key_tag,
                Algorithm::from_u8(algorithm),
                digest_type,
                digest,
            )))
        }
        _ => bail!(
            "Unsupported record type {} on line {}",
            rtype,
            line_num + 1
        ),
    };

    Ok(rdata)
}

fn field<'a>(parts: &[&'a str], idx: usize, rtype: &str, line_num: usize) -> Result<&'a str> {
    parts
        .get(idx)
        .copied()
        .ok_or_else(|| anyhow!("Truncated {} record on line {}", rtype, line_num + 1))
}

fn parse_domain_name(s: &str, origin: &Name) -> Result<Name> {
    if s.ends_with('.') {
        Ok(Name::from_str(s)?)
    } else if origin.is_root() {
        // the root origin renders as "." and would double the trailing dot
        Ok(Name::from_str(&format!("{s}."))?)
    } else {
        Ok(Name::from_str(&format!("{}.{}", s, origin))?)
    }
}

/// RRSIG times appear either as raw epoch seconds or as YYYYMMDDHHMMSS.
fn parse_rrsig_time(s: &str) -> Result<u32> {
    if s.len() == 14 && s.chars().all(|c| c.is_ascii_digit()) {
        let dt = chrono::NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S")?;
        return Ok(dt.and_utc().timestamp() as u32);
    }
    Ok(s.parse::<u32>()?)
}

pub fn as_rrsig(record: &Record) -> Option<&SIG> {
    match record.data() {
        Some(RData::DNSSEC(DNSSECRData::SIG(sig))) => Some(sig),
        _ => None,
    }
}

pub fn as_dnskey(record: &Record) -> Option<&DNSKEY> {
    match record.data() {
        Some(RData::DNSSEC(DNSSECRData::DNSKEY(key))) => Some(key),
        _ => None,
    }
}

pub fn as_ds(record: &Record) -> Option<&DS> {
    match record.data() {
        Some(RData::DNSSEC(DNSSECRData::DS(ds))) => Some(ds),
        _ => None,
    }
}

pub fn as_nsec(record: &Record) -> Option<&NSEC> {
    match record.data() {
        Some(RData::DNSSEC(DNSSECRData::NSEC(nsec))) => Some(nsec),
        _ => None,
    }
}
