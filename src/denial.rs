use crate::records;
use hickory_proto::rr::{Name, Record, RecordType};

/// Checks whether the NSEC records in `records` prove that `query_name`
/// with `query_type` does not exist (RFC 4034 §4).
///
/// Two shapes of proof are accepted: an NSEC whose owner/next span covers
/// the queried name in canonical order (name does not exist, including the
/// wrap-around span of the last NSEC in a zone), or an NSEC owned by the
/// queried name whose type bitmap omits the queried type (name exists, type
/// does not). This only judges the shape of the proof; whether the NSEC
/// records themselves are trustworthy is the chain walk's business.
pub fn proves_absence(query_name: &Name, query_type: RecordType, records: &[Record]) -> bool {
    for record in records {
        let Some(nsec) = records::as_nsec(record) else {
            continue;
        };

        let owner_name = record.name();
        let next_name = nsec.next_domain_name();

        if query_name == owner_name {
            if !nsec.type_bit_maps().contains(&query_type) {
                return true;
            }
            continue;
        }

        let covers_name = if owner_name < next_name {
            query_name > owner_name && query_name < next_name
        } else {
            // wrap-around span of the zone's last NSEC
            query_name > owner_name || query_name < next_name
        };

        if covers_name {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::RData;
    use hickory_proto::rr::dnssec::rdata::{DNSSECRData, NSEC};
    use std::str::FromStr;

    fn nsec(owner: &str, next: &str, types: Vec<RecordType>) -> Record {
        Record::from_rdata(
            Name::from_str(owner).unwrap(),
            3600,
            RData::DNSSEC(DNSSECRData::NSEC(NSEC::new(
                Name::from_str(next).unwrap(),
                types,
            ))),
        )
    }

    #[test]
    fn covered_name_is_denied() {
        let records = vec![nsec(
            "alpha.example.com.",
            "delta.example.com.",
            vec![RecordType::A, RecordType::NSEC],
        )];
        let query = Name::from_str("bravo.example.com.").unwrap();
        assert!(proves_absence(&query, RecordType::A, &records));
    }

    #[test]
    fn name_outside_span_is_not_denied() {
        let records = vec![nsec(
            "alpha.example.com.",
            "delta.example.com.",
            vec![RecordType::A],
        )];
        let query = Name::from_str("zulu.example.com.").unwrap();
        assert!(!proves_absence(&query, RecordType::A, &records));
    }

    #[test]
    fn wraparound_span_covers_names_past_the_last_owner() {
        // last NSEC in the zone points back to the apex
        let records = vec![nsec(
            "zulu.example.com.",
            "example.com.",
            vec![RecordType::A],
        )];
        let query = Name::from_str("zzz.example.com.").unwrap();
        assert!(proves_absence(&query, RecordType::A, &records));
    }

    #[test]
    fn missing_type_at_existing_owner_is_denied() {
        let records = vec![nsec(
            "www.example.com.",
            "example.com.",
            vec![RecordType::A, RecordType::NSEC],
        )];
        let query = Name::from_str("www.example.com.").unwrap();
        assert!(proves_absence(&query, RecordType::AAAA, &records));
        assert!(!proves_absence(&query, RecordType::A, &records));
    }

    #[test]
    fn empty_or_irrelevant_records_prove_nothing() {
        let query = Name::from_str("www.example.com.").unwrap();
        assert!(!proves_absence(&query, RecordType::A, &[]));

        let unrelated = Record::from_rdata(
            Name::from_str("www.example.com.").unwrap(),
            3600,
            RData::A(hickory_proto::rr::rdata::A(std::net::Ipv4Addr::new(
                192, 0, 2, 1,
            ))),
        );
        assert!(!proves_absence(&query, RecordType::A, &[unrelated]));
    }
}
