use crate::validate::{Validate, ValidationInput, ValidationStatus};
use crate::{crypto, denial, records};
use anyhow::{Context, Result, anyhow};
use hickory_proto::op::Message;
use hickory_proto::rr::dnssec::rdata::{DNSKEY, SIG};
use hickory_proto::rr::{Name, Record, RecordType};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Offline chain-of-trust validator.
///
/// Everything a resolver would fetch over the network must be present in
/// the support record set: DNSKEYs, DS sets, and the RRSIGs linking them.
/// The walk seeds trust from the anchor records, descends delegation by
/// delegation, and classifies each RRset it is asked about.
pub struct ChainValidator;

impl ChainValidator {
    pub fn new() -> Self {
        ChainValidator
    }
}

impl Default for ChainValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validate for ChainValidator {
    fn validate(
        &self,
        input: ValidationInput<'_>,
        support: &[Record],
        trust_anchors: &[Record],
        at: SystemTime,
    ) -> Result<ValidationStatus> {
        let at = at
            .duration_since(UNIX_EPOCH)
            .context("Validation time predates the epoch")?
            .as_secs() as u32;

        let mut walk = ChainWalk::new(support, trust_anchors, at);

        match input {
            ValidationInput::RecordSet(rrs) => Ok(walk.validate_record_set(rrs)),
            ValidationInput::Replies(replies) => {
                if replies.is_empty() {
                    return Ok(ValidationStatus::Indeterminate);
                }
                let mut status = ValidationStatus::Secure;
                for reply in replies {
                    status = status.worst(walk.validate_reply(reply)?);
                }
                Ok(status)
            }
        }
    }
}

/// Outcome of resolving a signer zone's trusted keys.
enum ZoneKeys {
    Trusted(Vec<DNSKEY>),
    Unreachable(ValidationStatus),
}

struct ChainWalk<'a> {
    support: &'a [Record],
    /// Zones whose DNSKEY sets have been chained back to an anchor.
    trusted: HashMap<Name, Vec<DNSKEY>>,
    at: u32,
}

impl<'a> ChainWalk<'a> {
    fn new(support: &'a [Record], trust_anchors: &[Record], at: u32) -> Self {
        let mut walk = ChainWalk {
            support,
            trusted: HashMap::new(),
            at,
        };

        for anchor in trust_anchors {
            if let Some(key) = records::as_dnskey(anchor) {
                walk.trusted
                    .entry(anchor.name().clone())
                    .or_default()
                    .push(key.clone());
            } else if let Some(ds) = records::as_ds(anchor) {
                // A DS anchor only helps if the matching DNSKEY is in the
                // support set.
                let mut matched = false;
                for candidate in walk.support_rrset(anchor.name(), RecordType::DNSKEY) {
                    let Some(key) = records::as_dnskey(&candidate) else {
                        continue;
                    };
                    if crypto::verify_ds(anchor.name(), ds, key).unwrap_or(false) {
                        walk.trusted
                            .entry(anchor.name().clone())
                            .or_default()
                            .push(key.clone());
                        matched = true;
                    }
                }
                if !matched {
                    tracing::warn!(
                        anchor = %anchor.name(),
                        key_tag = ds.key_tag(),
                        "DS trust anchor matches no DNSKEY in the support set"
                    );
                }
            }
        }

        walk
    }

    fn validate_record_set(&mut self, rrs: &[Record]) -> ValidationStatus {
        let rrsets = group_rrsets(rrs);
        if rrsets.is_empty() {
            return ValidationStatus::Indeterminate;
        }

        let mut status = ValidationStatus::Secure;
        for (name, rtype, members) in &rrsets {
            let outcome = self.validate_rrset(name, *rtype, members, rrs);
            tracing::debug!(name = %name, rtype = ?rtype, outcome = ?outcome, "RRset judged");
            status = status.worst(outcome);
        }
        status
    }

    fn validate_reply(&mut self, reply: &Message) -> Result<ValidationStatus> {
        let question = reply
            .queries()
            .first()
            .ok_or_else(|| anyhow!("Reply has no question section"))?;
        let answers = reply.answers();

        let mut status = self.validate_record_set(answers);

        let answered = answers.iter().any(|rr| {
            records::as_rrsig(rr).is_none()
                && rr.name() == question.name()
                && rr.record_type() == question.query_type()
        });

        if !answered
            && !denial::proves_absence(question.name(), question.query_type(), answers)
        {
            tracing::debug!(
                qname = %question.name(),
                qtype = ?question.query_type(),
                "negative answer carries no denial proof"
            );
            status = status.worst(ValidationStatus::Bogus);
        }

        Ok(status)
    }

    fn validate_rrset(
        &mut self,
        name: &Name,
        rtype: RecordType,
        members: &[Record],
        local_pool: &[Record],
    ) -> ValidationStatus {
        let sigs = self.sigs_covering(name, rtype, local_pool);
        if sigs.is_empty() {
            return ValidationStatus::Insecure;
        }

        let mut saw_insecure = false;
        let mut saw_indeterminate = false;

        for sig in &sigs {
            match self.zone_keys(sig.signer_name()) {
                ZoneKeys::Unreachable(ValidationStatus::Insecure) => saw_insecure = true,
                ZoneKeys::Unreachable(ValidationStatus::Indeterminate) => {
                    saw_indeterminate = true
                }
                ZoneKeys::Unreachable(_) => {}
                ZoneKeys::Trusted(keys) => {
                    for key in &keys {
                        match crypto::verify_rrsig(name, sig, key, members, self.at) {
                            Ok(true) => return ValidationStatus::Secure,
                            Ok(false) => {}
                            Err(e) => {
                                tracing::debug!(name = %name, error = %e, "signature unusable");
                                saw_indeterminate = true;
                            }
                        }
                    }
                }
            }
        }

        if saw_insecure {
            ValidationStatus::Insecure
        } else if saw_indeterminate {
            ValidationStatus::Indeterminate
        } else {
            ValidationStatus::Bogus
        }
    }

    /// Resolves the trusted key set for a signer zone, validating any
    /// not-yet-walked delegations between the nearest trusted ancestor and
    /// the zone.
    fn zone_keys(&mut self, zone: &Name) -> ZoneKeys {
        if let Some(keys) = self.trusted.get(zone) {
            return ZoneKeys::Trusted(keys.clone());
        }

        let mut ancestor = zone.clone();
        let ancestor = loop {
            if self.trusted.contains_key(&ancestor) {
                break ancestor;
            }
            if ancestor.is_root() {
                return ZoneKeys::Unreachable(ValidationStatus::Indeterminate);
            }
            ancestor = ancestor.base_name();
        };

        // Delegation points between the ancestor and the zone, taken from
        // whatever DNSKEY/DS owners the support set actually contains.
        let mut cuts: Vec<Name> = Vec::new();
        for rr in self.support {
            if records::as_dnskey(rr).is_none() && records::as_ds(rr).is_none() {
                continue;
            }
            let owner = rr.name();
            if ancestor.zone_of(owner)
                && owner.zone_of(zone)
                && owner != &ancestor
                && !cuts.contains(owner)
            {
                cuts.push(owner.clone());
            }
        }
        cuts.sort_by_key(|n| n.num_labels());

        let mut parent = ancestor;
        for cut in cuts {
            if let Some(status) = self.validate_delegation(&parent, &cut) {
                return ZoneKeys::Unreachable(status);
            }
            parent = cut;
        }

        match self.trusted.get(zone) {
            Some(keys) => ZoneKeys::Trusted(keys.clone()),
            None => ZoneKeys::Unreachable(ValidationStatus::Indeterminate),
        }
    }

    /// Walks one delegation: the parent-signed DS set must match a DNSKEY
    /// at the child, and the child's DNSKEY RRset must be signed by a
    /// DS-matched key. On success the child's keys become trusted and
    /// `None` is returned; otherwise the terminal status for this path.
    fn validate_delegation(&mut self, parent: &Name, child: &Name) -> Option<ValidationStatus> {
        let ds_set = self.support_rrset(child, RecordType::DS);
        if ds_set.is_empty() {
            tracing::debug!(child = %child, "no DS RRset: unsigned delegation");
            return Some(ValidationStatus::Insecure);
        }

        let parent_keys = self.trusted.get(parent).cloned().unwrap_or_default();
        match self.verify_signed_rrset(child, RecordType::DS, &ds_set, &parent_keys) {
            ValidationStatus::Secure => {}
            status => return Some(status),
        }

        let dnskey_rrset = self.support_rrset(child, RecordType::DNSKEY);
        if dnskey_rrset.is_empty() {
            tracing::debug!(child = %child, "DS present but no DNSKEY RRset in support");
            return Some(ValidationStatus::Indeterminate);
        }

        let mut anchored: Vec<DNSKEY> = Vec::new();
        for ds_rr in &ds_set {
            let Some(ds) = records::as_ds(ds_rr) else {
                continue;
            };
            for key_rr in &dnskey_rrset {
                let Some(key) = records::as_dnskey(key_rr) else {
                    continue;
                };
                if crypto::verify_ds(child, ds, key).unwrap_or(false) {
                    anchored.push(key.clone());
                }
            }
        }
        if anchored.is_empty() {
            tracing::debug!(child = %child, "no DNSKEY matches any DS record");
            return Some(ValidationStatus::Bogus);
        }

        match self.verify_signed_rrset(child, RecordType::DNSKEY, &dnskey_rrset, &anchored) {
            ValidationStatus::Secure => {
                let keys: Vec<DNSKEY> = dnskey_rrset
                    .iter()
                    .filter_map(|rr| records::as_dnskey(rr).cloned())
                    .collect();
                self.trusted.insert(child.clone(), keys);
                None
            }
            status => Some(status),
        }
    }

    /// Verifies an RRset against a fixed key set using the RRSIGs the
    /// support set carries for it.
    fn verify_signed_rrset(
        &self,
        name: &Name,
        rtype: RecordType,
        members: &[Record],
        keys: &[DNSKEY],
    ) -> ValidationStatus {
        let sigs = self.sigs_covering(name, rtype, &[]);
        if sigs.is_empty() {
            return ValidationStatus::Indeterminate;
        }

        let mut saw_indeterminate = false;
        for sig in &sigs {
            for key in keys {
                match crypto::verify_rrsig(name, sig, key, members, self.at) {
                    Ok(true) => return ValidationStatus::Secure,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::debug!(name = %name, error = %e, "signature unusable");
                        saw_indeterminate = true;
                    }
                }
            }
        }

        if saw_indeterminate {
            ValidationStatus::Indeterminate
        } else {
            ValidationStatus::Bogus
        }
    }

    /// Non-RRSIG support records owned by `name` with the given type.
    fn support_rrset(&self, name: &Name, rtype: RecordType) -> Vec<Record> {
        self.support
            .iter()
            .filter(|rr| {
                records::as_rrsig(rr).is_none()
                    && rr.name() == name
                    && rr.record_type() == rtype
            })
            .cloned()
            .collect()
    }

    /// RRSIGs covering (name, rtype), drawn from the local record pool
    /// first and the support set second.
    fn sigs_covering(&self, name: &Name, rtype: RecordType, local_pool: &[Record]) -> Vec<SIG> {
        let mut sigs = Vec::new();
        for rr in local_pool.iter().chain(self.support.iter()) {
            if rr.name() != name {
                continue;
            }
            if let Some(sig) = records::as_rrsig(rr)
                && sig.type_covered() == rtype
            {
                sigs.push(sig.clone());
            }
        }
        sigs
    }
}

/// Groups non-signature records into RRsets, preserving first-seen order.
fn group_rrsets(rrs: &[Record]) -> Vec<(Name, RecordType, Vec<Record>)> {
    let mut rrsets: Vec<(Name, RecordType, Vec<Record>)> = Vec::new();
    for rr in rrs {
        if records::as_rrsig(rr).is_some() {
            continue;
        }
        let name = rr.name().clone();
        let rtype = rr.record_type();
        match rrsets
            .iter_mut()
            .find(|(n, t, _)| n == &name && *t == rtype)
        {
            Some((_, _, members)) => members.push(rr.clone()),
            None => rrsets.push((name, rtype, vec![rr.clone()])),
        }
    }
    rrsets
}
