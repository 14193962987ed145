use anyhow::{Result, bail};
use hickory_proto::rr::dnssec::DigestType;
use hickory_proto::rr::dnssec::rdata::{DNSKEY, DS, SIG};
use hickory_proto::rr::dnssec::tbs::rrset_tbs_with_sig;
use hickory_proto::rr::{DNSClass, Name, Record};
use ring::signature;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Key tag for a DNSKEY (RFC 4034 Appendix B).
pub fn key_tag(key: &DNSKEY) -> u16 {
    let mut rdata = Vec::new();
    rdata.extend_from_slice(&key.flags().to_be_bytes());
    rdata.push(3); // protocol is always 3 for DNSSEC
    rdata.push(key.algorithm().into());
    rdata.extend_from_slice(key.public_key());

    let mut ac: u32 = 0;
    for (i, &byte) in rdata.iter().enumerate() {
        if i % 2 == 0 {
            ac += (byte as u32) << 8;
        } else {
            ac += byte as u32;
        }
    }
    ac += (ac >> 16) & 0xFFFF;
    (ac & 0xFFFF) as u16
}

/// Checks a DS record against a DNSKEY: key tag, algorithm, and the digest
/// over the canonical owner name plus DNSKEY RDATA (RFC 4034 §5.1.4).
pub fn verify_ds(owner: &Name, ds: &DS, key: &DNSKEY) -> Result<bool> {
    if ds.key_tag() != key_tag(key) {
        return Ok(false);
    }
    if ds.algorithm() != key.algorithm() {
        return Ok(false);
    }

    let mut digest_input = name_to_wire(owner);
    digest_input.extend_from_slice(&key.flags().to_be_bytes());
    digest_input.push(3);
    digest_input.push(key.algorithm().into());
    digest_input.extend_from_slice(key.public_key());

    let computed = match ds.digest_type() {
        DigestType::SHA256 => Sha256::digest(&digest_input).to_vec(),
        DigestType::SHA384 => Sha384::digest(&digest_input).to_vec(),
        DigestType::SHA512 => Sha512::digest(&digest_input).to_vec(),
        other => bail!("Unsupported DS digest type: {:?}", other),
    };

    Ok(computed.as_slice() == ds.digest())
}

/// Verifies one RRSIG over an RRset with one DNSKEY at the given validation
/// time (epoch seconds).
///
/// `Ok(false)` means the signature does not validate with this key (wrong
/// tag or algorithm, outside the validity window, or a failed crypto check).
/// `Err` means the signature could not be judged at all, e.g. an algorithm
/// this build cannot verify.
pub fn verify_rrsig(
    owner: &Name,
    sig: &SIG,
    key: &DNSKEY,
    rrset: &[Record],
    at: u32,
) -> Result<bool> {
    if at < sig.sig_inception() || at > sig.sig_expiration() {
        return Ok(false);
    }
    if sig.key_tag() != key_tag(key) {
        return Ok(false);
    }
    if sig.algorithm() != key.algorithm() {
        return Ok(false);
    }

    let tbs = rrset_tbs_with_sig(owner, DNSClass::IN, sig, rrset)?;
    let data = tbs.as_ref();

    match u8::from(sig.algorithm()) {
        5 | 7 => verify_rsa(
            data,
            sig.sig(),
            key,
            &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        ),
        8 => verify_rsa(data, sig.sig(), key, &signature::RSA_PKCS1_2048_8192_SHA256),
        10 => verify_rsa(data, sig.sig(), key, &signature::RSA_PKCS1_2048_8192_SHA512),
        13 => verify_ecdsa(data, sig.sig(), key, &signature::ECDSA_P256_SHA256_FIXED, 64),
        14 => verify_ecdsa(data, sig.sig(), key, &signature::ECDSA_P384_SHA384_FIXED, 96),
        15 => verify_ed25519(data, sig.sig(), key),
        other => bail!("Unsupported DNSSEC algorithm: {}", other),
    }
}

fn verify_rsa(
    data: &[u8],
    sig: &[u8],
    key: &DNSKEY,
    params: &'static signature::RsaParameters,
) -> Result<bool> {
    let (exponent, modulus) = parse_rsa_key(key.public_key())?;
    let public_key = signature::RsaPublicKeyComponents {
        n: &modulus,
        e: &exponent,
    };
    Ok(public_key.verify(params, data, sig).is_ok())
}

fn verify_ecdsa(
    data: &[u8],
    sig: &[u8],
    key: &DNSKEY,
    params: &'static signature::EcdsaVerificationAlgorithm,
    point_len: usize,
) -> Result<bool> {
    if key.public_key().len() != point_len {
        bail!("Invalid ECDSA public key length");
    }
    if sig.len() != point_len {
        return Ok(false);
    }

    // Ring wants the uncompressed-point prefix the DNSKEY wire format omits.
    let mut pk = Vec::with_capacity(point_len + 1);
    pk.push(0x04);
    pk.extend_from_slice(key.public_key());

    let public_key = signature::UnparsedPublicKey::new(params, &pk);
    Ok(public_key.verify(data, sig).is_ok())
}

fn verify_ed25519(data: &[u8], sig: &[u8], key: &DNSKEY) -> Result<bool> {
    if key.public_key().len() != 32 {
        bail!("Invalid Ed25519 public key length");
    }
    if sig.len() != 64 {
        return Ok(false);
    }

    let public_key = signature::UnparsedPublicKey::new(&signature::ED25519, key.public_key());
    Ok(public_key.verify(data, sig).is_ok())
}

/// Splits a DNSKEY RSA public key field into (exponent, modulus), handling
/// both the one-byte and the three-byte exponent length form (RFC 3110).
fn parse_rsa_key(key_data: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    if key_data.is_empty() {
        bail!("Empty RSA public key");
    }

    let first_byte = key_data[0];
    let (exp_len, exp_start) = if first_byte == 0 {
        if key_data.len() < 3 {
            bail!("RSA key too short for long form");
        }
        let exp_len = u16::from_be_bytes([key_data[1], key_data[2]]) as usize;
        (exp_len, 3)
    } else {
        (first_byte as usize, 1)
    };

    let exp_end = exp_start + exp_len;
    if exp_end > key_data.len() {
        bail!("RSA exponent extends beyond key data");
    }

    let exponent = key_data[exp_start..exp_end].to_vec();
    let modulus = key_data[exp_end..].to_vec();
    if modulus.is_empty() {
        bail!("RSA modulus is empty");
    }

    Ok((exponent, modulus))
}

/// Canonical (lowercase, uncompressed) wire form of a name.
fn name_to_wire(name: &Name) -> Vec<u8> {
    let mut wire = Vec::new();
    for label in name.iter() {
        wire.push(label.len() as u8);
        wire.extend(label.iter().map(u8::to_ascii_lowercase));
    }
    wire.push(0);
    wire
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::RecordType;
    use hickory_proto::rr::dnssec::Algorithm;
    use std::str::FromStr;

    fn dnskey(algorithm: Algorithm, public_key: Vec<u8>) -> DNSKEY {
        DNSKEY::new(true, true, false, algorithm, public_key)
    }

    fn rrsig_for(key: &DNSKEY, algorithm: Algorithm, signature: Vec<u8>) -> SIG {
        SIG::new(
            RecordType::A,
            algorithm,
            2,
            3600,
            1_700_010_000,
            1_700_000_000,
            key_tag(key),
            Name::from_str("example.com.").unwrap(),
            signature,
        )
    }

    #[test]
    fn key_tag_is_deterministic_and_key_dependent() {
        let key1 = dnskey(Algorithm::RSASHA256, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let key2 = dnskey(Algorithm::RSASHA256, vec![8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(key_tag(&key1), key_tag(&key1));
        assert_ne!(key_tag(&key1), key_tag(&key2));
    }

    #[test]
    fn ds_with_matching_sha256_digest_verifies() {
        let owner = Name::from_str("Example.COM.").unwrap();
        let key = dnskey(Algorithm::RSASHA256, vec![3, 1, 0, 1, 0xab, 0xcd]);

        let mut input = Vec::new();
        // canonical form lowercases the owner labels
        input.extend_from_slice(b"\x07example\x03com\x00");
        input.extend_from_slice(&key.flags().to_be_bytes());
        input.push(3);
        input.push(key.algorithm().into());
        input.extend_from_slice(key.public_key());
        let digest = Sha256::digest(&input).to_vec();

        let ds = DS::new(
            key_tag(&key),
            Algorithm::RSASHA256,
            DigestType::SHA256,
            digest,
        );
        assert!(verify_ds(&owner, &ds, &key).unwrap());
    }

    #[test]
    fn ds_with_wrong_digest_or_tag_fails() {
        let owner = Name::from_str("example.com.").unwrap();
        let key = dnskey(Algorithm::RSASHA256, vec![3, 1, 0, 1, 0xab, 0xcd]);

        let wrong_digest = DS::new(
            key_tag(&key),
            Algorithm::RSASHA256,
            DigestType::SHA256,
            vec![0; 32],
        );
        assert!(!verify_ds(&owner, &wrong_digest, &key).unwrap());

        let wrong_tag = DS::new(
            key_tag(&key).wrapping_add(1),
            Algorithm::RSASHA256,
            DigestType::SHA256,
            vec![0; 32],
        );
        assert!(!verify_ds(&owner, &wrong_tag, &key).unwrap());
    }

    #[test]
    fn rrsig_outside_validity_window_fails() {
        let key = dnskey(Algorithm::ED25519, vec![0u8; 32]);
        let sig = rrsig_for(&key, Algorithm::ED25519, vec![0u8; 64]);
        let owner = Name::from_str("example.com.").unwrap();

        // before inception
        assert!(!verify_rrsig(&owner, &sig, &key, &[], 1_600_000_000).unwrap());
        // after expiration
        assert!(!verify_rrsig(&owner, &sig, &key, &[], 1_800_000_000).unwrap());
    }

    #[test]
    fn rrsig_with_mismatched_key_tag_fails() {
        let key = dnskey(Algorithm::ED25519, vec![0u8; 32]);
        let other_key = dnskey(Algorithm::ED25519, vec![1u8; 32]);
        let sig = rrsig_for(&key, Algorithm::ED25519, vec![0u8; 64]);
        let owner = Name::from_str("example.com.").unwrap();

        assert!(!verify_rrsig(&owner, &sig, &other_key, &[], 1_700_005_000).unwrap());
    }

    #[test]
    fn garbage_ed25519_signature_fails_cleanly() {
        let key = dnskey(Algorithm::ED25519, vec![7u8; 32]);
        let sig = rrsig_for(&key, Algorithm::ED25519, vec![9u8; 64]);
        let owner = Name::from_str("example.com.").unwrap();
        let record = Record::from_rdata(
            owner.clone(),
            3600,
            hickory_proto::rr::RData::A(hickory_proto::rr::rdata::A(std::net::Ipv4Addr::new(
                192, 0, 2, 1,
            ))),
        );

        assert!(!verify_rrsig(&owner, &sig, &key, &[record], 1_700_005_000).unwrap());
    }

    #[test]
    fn unsupported_algorithm_is_an_error() {
        let algorithm = Algorithm::from_u8(3);
        let key = dnskey(algorithm, vec![1, 2, 3]);
        let sig = rrsig_for(&key, algorithm, vec![0u8; 16]);
        let owner = Name::from_str("example.com.").unwrap();

        assert!(verify_rrsig(&owner, &sig, &key, &[], 1_700_005_000).is_err());
    }

    #[test]
    fn rsa_key_parsing_handles_both_exponent_forms() {
        // short form: 1-byte exponent length
        let (e, n) = parse_rsa_key(&[1, 3, 0xaa, 0xbb]).unwrap();
        assert_eq!(e, vec![3]);
        assert_eq!(n, vec![0xaa, 0xbb]);

        // long form: 0 marker plus 2-byte length
        let (e, n) = parse_rsa_key(&[0, 0, 2, 1, 0, 0xcc]).unwrap();
        assert_eq!(e, vec![1, 0]);
        assert_eq!(n, vec![0xcc]);

        assert!(parse_rsa_key(&[]).is_err());
        assert!(parse_rsa_key(&[5, 1, 2]).is_err());
    }
}
