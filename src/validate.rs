use crate::reorder;
use anyhow::{Context, Result};
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, Record, RecordType};
use std::fmt;
use std::time::SystemTime;

/// Terminal DNSSEC validation outcomes.
///
/// All four are successful classifications, including `Bogus`; operational
/// validator failures travel on the error channel instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    Secure,
    Bogus,
    Indeterminate,
    Insecure,
}

impl ValidationStatus {
    /// Numeric status code, printed ahead of the registered text.
    pub fn code(&self) -> u32 {
        match self {
            ValidationStatus::Secure => 400,
            ValidationStatus::Bogus => 401,
            ValidationStatus::Indeterminate => 402,
            ValidationStatus::Insecure => 403,
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            ValidationStatus::Secure => "The record was determined to be secure in DNSSEC",
            ValidationStatus::Bogus => "The record was determined to be bogus in DNSSEC",
            ValidationStatus::Indeterminate => {
                "The record was not determined to be DNSSEC secure, but also not bogus"
            }
            ValidationStatus::Insecure => "The record was determined to be insecure in DNSSEC",
        }
    }

    /// Combines two outcomes, keeping the more severe one.
    /// Severity order: bogus, indeterminate, insecure, secure.
    pub fn worst(self, other: ValidationStatus) -> ValidationStatus {
        fn rank(status: ValidationStatus) -> u8 {
            match status {
                ValidationStatus::Secure => 0,
                ValidationStatus::Insecure => 1,
                ValidationStatus::Indeterminate => 2,
                ValidationStatus::Bogus => 3,
            }
        }

        if rank(other) > rank(self) { other } else { self }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.text())
    }
}

/// What the validator is asked to judge: either a bare record set, or a
/// sequence of reply-shaped structures carrying a question section. One
/// validation primitive serves both; only the input is reshaped.
#[derive(Debug, Clone, Copy)]
pub enum ValidationInput<'a> {
    RecordSet(&'a [Record]),
    Replies(&'a [Message]),
}

/// The seam to the chain-of-trust validator. The orchestrator only depends
/// on this trait; tests drive it with a mock.
pub trait Validate {
    fn validate(
        &self,
        input: ValidationInput<'_>,
        support: &[Record],
        trust_anchors: &[Record],
        at: SystemTime,
    ) -> Result<ValidationStatus>;
}

pub struct ValidationRequest<'a> {
    pub records: &'a [Record],
    pub support: &'a [Record],
    pub trust_anchors: &'a [Record],
    pub at: SystemTime,
    pub query: Option<(Name, RecordType)>,
}

/// Runs one validation: reorders the record set root-first, then validates
/// it either directly or wrapped in a synthetic negative answer when a
/// query name was supplied.
pub fn classify<V: Validate>(
    validator: &V,
    request: &ValidationRequest<'_>,
) -> Result<ValidationStatus> {
    let reordered = reorder::root_first(request.records);
    tracing::debug!(
        records = request.records.len(),
        rotated = reordered.is_rotated(),
        "record set reordered root-first"
    );

    let input_status = match &request.query {
        None => validator.validate(
            ValidationInput::RecordSet(reordered.records()),
            request.support,
            request.trust_anchors,
            request.at,
        ),
        Some((qname, qtype)) => {
            let replies = [negative_reply(qname, *qtype, reordered.records())];
            validator.validate(
                ValidationInput::Replies(&replies),
                request.support,
                request.trust_anchors,
                request.at,
            )
        }
    };

    input_status.context("Error validating")
}

/// Builds the synthetic negative-answer reply: a question for the queried
/// name and type (class Internet) with the record set as its answer section.
fn negative_reply(qname: &Name, qtype: RecordType, answers: &[Record]) -> Message {
    let mut query = Query::query(qname.clone(), qtype);
    query.set_query_class(DNSClass::IN);

    let mut reply = Message::new();
    reply.set_message_type(MessageType::Response);
    reply.set_op_code(OpCode::Query);
    reply.set_response_code(ResponseCode::NXDomain);
    reply.add_query(query);
    for record in answers {
        reply.add_answer(record.clone());
    }

    reply
}
