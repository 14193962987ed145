use crate::records;
use hickory_proto::rr::Record;

/// Result of the root-first transform.
///
/// `Unchanged` borrows the caller's sequence: no root-owned record needed
/// moving, so no new sequence was built. `Rotated` owns a freshly allocated
/// sequence. Callers that need to hand the records on can use [`records`]
/// either way; callers that care about allocation can match on the variant.
///
/// [`records`]: Reordered::records
#[derive(Debug)]
pub enum Reordered<'a> {
    Unchanged(&'a [Record]),
    Rotated(Vec<Record>),
}

impl Reordered<'_> {
    pub fn records(&self) -> &[Record] {
        match self {
            Reordered::Unchanged(records) => records,
            Reordered::Rotated(records) => records,
        }
    }

    pub fn is_rotated(&self) -> bool {
        matches!(self, Reordered::Rotated(_))
    }
}

/// Moves the first root-owned non-RRSIG record to the front of the sequence.
///
/// The validation entry point requires records at the root to lead the
/// sequence. This scans for the first record whose owner name is the root
/// and whose type is not RRSIG (root RRSIGs legitimately sort after other
/// root data and must not act as the pivot), then left-rotates the sequence
/// around that pivot: pivot first, then everything after it, then everything
/// that preceded it, relative order preserved within both runs.
///
/// Without a qualifying record the input is returned as borrowed and nothing
/// is allocated. A pivot already at index 0 still takes the rotation path
/// and yields an owned copy.
pub fn root_first(input: &[Record]) -> Reordered<'_> {
    let pivot = input
        .iter()
        .position(|rr| rr.name().is_root() && records::as_rrsig(rr).is_none());

    let Some(i) = pivot else {
        return Reordered::Unchanged(input);
    };

    let mut out = Vec::with_capacity(input.len());
    out.push(input[i].clone());
    out.extend_from_slice(&input[i + 1..]);
    out.extend_from_slice(&input[..i]);

    Reordered::Rotated(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proptest_helpers::{arb_record, arb_root_record};
    use hickory_proto::rr::rdata::A;
    use hickory_proto::rr::rdata::NS;
    use hickory_proto::rr::{Name, RData};
    use proptest::prelude::*;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn a_record(name: &str, last_octet: u8) -> Record {
        Record::from_rdata(
            Name::from_str(name).unwrap(),
            3600,
            RData::A(A(Ipv4Addr::new(192, 0, 2, last_octet))),
        )
    }

    fn root_ns_record() -> Record {
        Record::from_rdata(
            Name::root(),
            3600,
            RData::NS(NS(Name::from_str("a.root-servers.net.").unwrap())),
        )
    }

    fn root_rrsig_record() -> Record {
        use hickory_proto::rr::RecordType;
        use hickory_proto::rr::dnssec::Algorithm;
        use hickory_proto::rr::dnssec::rdata::{DNSSECRData, SIG};

        Record::from_rdata(
            Name::root(),
            3600,
            RData::DNSSEC(DNSSECRData::SIG(SIG::new(
                RecordType::NS,
                Algorithm::RSASHA256,
                0,
                3600,
                1700003600,
                1700000000,
                20326,
                Name::root(),
                vec![1, 2, 3],
            ))),
        )
    }

    #[test]
    fn empty_input_is_unchanged() {
        let reordered = root_first(&[]);
        assert!(!reordered.is_rotated());
        assert!(reordered.records().is_empty());
    }

    #[test]
    fn no_root_record_borrows_input() {
        let input = vec![a_record("www.example.com.", 1), a_record("example.com.", 2)];
        let reordered = root_first(&input);
        assert!(!reordered.is_rotated());
        assert_eq!(reordered.records(), &input[..]);
    }

    #[test]
    fn root_rrsig_is_not_a_pivot() {
        let input = vec![a_record("example.com.", 1), root_rrsig_record()];
        let reordered = root_first(&input);
        assert!(!reordered.is_rotated());
        assert_eq!(reordered.records(), &input[..]);
    }

    #[test]
    fn pivot_in_middle_rotates() {
        let input = vec![
            a_record("example.com.", 1),
            a_record("www.example.com.", 2),
            root_ns_record(),
            a_record("mail.example.com.", 3),
        ];
        let reordered = root_first(&input);
        assert!(reordered.is_rotated());
        assert_eq!(
            reordered.records(),
            &[
                input[2].clone(),
                input[3].clone(),
                input[0].clone(),
                input[1].clone(),
            ][..]
        );
    }

    #[test]
    fn pivot_at_front_still_allocates() {
        let input = vec![root_ns_record(), a_record("example.com.", 1)];
        let reordered = root_first(&input);
        assert!(reordered.is_rotated());
        assert_eq!(reordered.records(), &input[..]);
    }

    #[test]
    fn later_root_records_keep_relative_order() {
        let second_root = Record::from_rdata(
            Name::root(),
            3600,
            RData::NS(NS(Name::from_str("b.root-servers.net.").unwrap())),
        );
        let input = vec![
            a_record("example.com.", 1),
            root_ns_record(),
            second_root.clone(),
        ];
        let reordered = root_first(&input);
        assert_eq!(
            reordered.records(),
            &[input[1].clone(), second_root, input[0].clone()][..]
        );
    }

    proptest! {
        #[test]
        fn rotation_matches_slice_arithmetic(
            before in prop::collection::vec(arb_record(), 0..6),
            pivot in arb_root_record(),
            after in prop::collection::vec(arb_record(), 0..6),
        ) {
            // Records from arb_record never sit at the root, so the pivot
            // index is known exactly.
            let mut input = before.clone();
            input.push(pivot.clone());
            input.extend(after.clone());

            let i = before.len();
            let reordered = root_first(&input);
            prop_assert!(reordered.is_rotated());

            let mut expected = vec![input[i].clone()];
            expected.extend_from_slice(&input[i + 1..]);
            expected.extend_from_slice(&input[..i]);
            prop_assert_eq!(reordered.records(), &expected[..]);
        }

        #[test]
        fn reorder_is_idempotent(
            records in prop::collection::vec(
                prop_oneof![arb_record(), arb_root_record()],
                0..10,
            ),
        ) {
            let once = root_first(&records).records().to_vec();
            let twice = root_first(&once).records().to_vec();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn non_root_sequences_never_allocate(
            records in prop::collection::vec(arb_record(), 0..10),
        ) {
            prop_assert!(!root_first(&records).is_rotated());
        }
    }
}
