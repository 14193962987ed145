use crate::records;
use anyhow::{Context, Result, bail};
use hickory_proto::rr::dnssec::Algorithm;
use hickory_proto::rr::dnssec::rdata::{DNSKEY, DNSSECRData};
use hickory_proto::rr::{Name, RData, Record};
use std::path::Path;

/// Loads the trust anchor record set: an operator-supplied file when given,
/// the built-in root keys otherwise. An empty set from either source is a
/// fatal configuration error.
pub fn load(path: Option<&Path>) -> Result<Vec<Record>> {
    let anchors = match path {
        Some(path) => records::parse_rr_file(path, records::DEFAULT_TTL)?,
        None => builtin_root_anchors().context("Missing trust anchors")?,
    };

    if anchors.is_empty() {
        bail!("Missing trust anchors");
    }

    tracing::debug!(count = anchors.len(), "trust anchors loaded");
    Ok(anchors)
}

/// The root zone key-signing keys, embedded so validation works without an
/// anchor file. Key tags 20326 and 19036.
fn builtin_root_anchors() -> Result<Vec<Record>> {
    let root_ksk_20326 = root_ksk(
        "AwEAAaz/tAm8yTn4Mfeh5eyI96WSVexTBAvkMgJzkKTOiW1vkIbzxeF3\
         +/4RgWOq7HrxRixHlFlExOLAJr5emLvN7SWXgnLh4+B5xQlNVz8Og8kv\
         ArMtNROxVQuCaSnIDdD5LKyWbRd2n9WGe2R8PzgCmr3EgVLrjyBxWezF\
         0jLHwVN8efS3rCj/EWgvIWgb9tarpVUDK/b58Da+sqqls3eNbuv7pr+e\
         oZG+SrDK6nWeL3c6H5Apxz7LjVc1uTIdsIXxuOLYA4/ilBmSVIzuDWfd\
         RUfhHdY6+cn8HFRm+2hM8AnXGXws9555KrUB5qihylGa8subX2Nn6UwN\
         R1AkUTV74bU=",
    )?;

    let root_ksk_19036 = root_ksk(
        "AwEAAagAIKlVZrpC6Ia7gEzahOR+9W29euxhJhVVLOyQbSEW0O8gcCjF\
         FVQUTf6v58fLjwBd0YI0EzrAcQqBGCzh/RStIoO8g0NfnfL2MTJRkxoX\
         bfDaUeVPQuYEhg37NZWAJQ9VnMVDxP/VHL496M/QZxkjf5/Efucp2gaD\
         X6RS6CXpoY68LsvPVjR0ZSwzz1apAzvN9dlzEheX7ICJBBtuA6G3LQpz\
         W5hOA2hzCTMjJPJ8LbqF6dsV6DoBQzgul0sGIcGOYl7OyQdXfZ57relS\
         Qageu+ipAdTTJ25AsRTAoub8ONGcLmqrAmRLKBP1dfwhYB4N7knNnulq\
         QxA+Uk1ihz0=",
    )?;

    Ok(vec![root_ksk_20326, root_ksk_19036])
}

fn root_ksk(public_key_b64: &str) -> Result<Record> {
    let public_key =
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, public_key_b64)
            .context("Invalid built-in trust anchor")?;

    // flags 257: zone key + secure entry point
    let key = DNSKEY::new(true, true, false, Algorithm::RSASHA256, public_key);

    Ok(Record::from_rdata(
        Name::root(),
        records::DEFAULT_TTL,
        RData::DNSSEC(DNSSECRData::DNSKEY(key)),
    ))
}
