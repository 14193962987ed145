#![allow(dead_code)]

use hickory_proto::rr::{Name, RData, Record};
use proptest::prelude::*;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

pub fn arb_dns_label() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::char::range('a', 'z'), 1..=63)
        .prop_map(|chars| chars.into_iter().collect::<String>())
        .prop_filter("Label cannot be empty", |s| !s.is_empty())
}

/// Non-root names only: every generated name has at least one label.
pub fn arb_dns_name() -> impl Strategy<Value = Name> {
    prop::collection::vec(arb_dns_label(), 1..=4)
        .prop_filter("DNS name must be <= 253 chars total", |labels| {
            let fqdn = format!("{}.", labels.join("."));
            fqdn.len() <= 253
        })
        .prop_map(|labels| {
            let fqdn = format!("{}.", labels.join("."));
            Name::from_str(&fqdn).unwrap()
        })
}

pub fn arb_ipv4() -> impl Strategy<Value = Ipv4Addr> {
    any::<[u8; 4]>().prop_map(Ipv4Addr::from)
}

pub fn arb_ipv6() -> impl Strategy<Value = Ipv6Addr> {
    any::<[u8; 16]>().prop_map(Ipv6Addr::from)
}

fn arb_rdata() -> impl Strategy<Value = RData> {
    prop_oneof![
        arb_ipv4().prop_map(|ip| RData::A(hickory_proto::rr::rdata::A(ip))),
        arb_ipv6().prop_map(|ip| RData::AAAA(hickory_proto::rr::rdata::AAAA(ip))),
        arb_dns_name().prop_map(|n| RData::NS(hickory_proto::rr::rdata::NS(n))),
        arb_dns_name().prop_map(|n| RData::CNAME(hickory_proto::rr::rdata::CNAME(n))),
        prop::collection::vec(prop::char::range('a', 'z'), 1..=64).prop_map(|chars| {
            let text = chars.into_iter().collect::<String>();
            RData::TXT(hickory_proto::rr::rdata::TXT::new(vec![text]))
        }),
    ]
}

/// A record owned by some non-root name.
pub fn arb_record() -> impl Strategy<Value = Record> {
    (arb_dns_name(), arb_rdata(), arb_ttl())
        .prop_map(|(name, rdata, ttl)| Record::from_rdata(name, ttl, rdata))
}

/// A non-RRSIG record owned by the root.
pub fn arb_root_record() -> impl Strategy<Value = Record> {
    (arb_rdata(), arb_ttl())
        .prop_map(|(rdata, ttl)| Record::from_rdata(Name::root(), ttl, rdata))
}

pub fn arb_ttl() -> impl Strategy<Value = u32> {
    prop_oneof![
        Just(60u32),
        Just(300u32),
        Just(3600u32),
        Just(86400u32),
        0u32..=2147483647u32,
    ]
}
