//! Network-membership validation of decoded evidence.
//!
//! Every answer of every record is classified. An answer that does not parse
//! as an IP address, or parses but falls outside the network, is a defect.
//! Defects are recorded and validation continues with the next answer.

use serde::Serialize;
use std::net::IpAddr;

use crate::evidence::EvidenceRecord;
use crate::network::Network;

/// Classification of one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
    /// Answer token as it appeared in the evidence
    pub raw: String,

    /// Parsed address, if the token is an IP literal
    pub parsed: Option<IpAddr>,

    /// Network membership; set only when `parsed` is set
    pub is_member: Option<bool>,
}

impl AnswerOutcome {
    /// Classify a raw answer against a network.
    pub fn classify(raw: &str, network: &Network) -> Self {
        match raw.parse::<IpAddr>() {
            Ok(ip) => Self {
                raw: raw.to_string(),
                parsed: Some(ip),
                is_member: Some(network.contains(ip)),
            },
            Err(_) => Self {
                raw: raw.to_string(),
                parsed: None,
                is_member: None,
            },
        }
    }

    /// The defect this answer represents, if any.
    pub fn defect(&self) -> Option<DefectKind> {
        match (self.parsed, self.is_member) {
            (None, _) => Some(DefectKind::Unparsable),
            (Some(_), Some(false)) => Some(DefectKind::NonMember),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.defect().is_none()
    }
}

/// Kind of validation defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    /// Answer is not an IP address literal
    Unparsable,

    /// Answer is an IP address outside the network
    NonMember,
}

/// Outcomes of one record, in answer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    /// Position of the record's payload in the collected batch
    pub index: usize,

    pub subject: String,

    pub query_kind: Option<String>,

    pub answers: Vec<AnswerOutcome>,
}

impl RecordOutcome {
    /// True when no answer of this record is a defect.
    pub fn is_valid(&self) -> bool {
        self.answers.iter().all(AnswerOutcome::is_valid)
    }

    /// Answers that are defects.
    pub fn defects(&self) -> impl Iterator<Item = (&AnswerOutcome, DefectKind)> {
        self.answers.iter().filter_map(|a| a.defect().map(|d| (a, d)))
    }
}

/// Validates evidence records against a network.
pub struct Validator<'a> {
    network: &'a Network,
}

impl<'a> Validator<'a> {
    pub fn new(network: &'a Network) -> Self {
        Self { network }
    }

    /// Validate records, keeping record and answer order.
    ///
    /// Each record is paired with its batch index so diagnostics can point at
    /// the payload that produced it.
    pub fn validate<'r, I>(&self, records: I) -> Vec<RecordOutcome>
    where
        I: IntoIterator<Item = (usize, &'r EvidenceRecord)>,
    {
        records
            .into_iter()
            .map(|(index, record)| self.validate_record(index, record))
            .collect()
    }

    /// Validate a single record.
    pub fn validate_record(&self, index: usize, record: &EvidenceRecord) -> RecordOutcome {
        tracing::debug!(
            index,
            subject = %record.subject,
            query = ?record.query_kind,
            answers = record.answers.len(),
            "Checking evidence record"
        );

        let answers: Vec<AnswerOutcome> = record
            .answers
            .iter()
            .map(|raw| AnswerOutcome::classify(raw, self.network))
            .collect();

        for answer in &answers {
            match answer.defect() {
                Some(DefectKind::Unparsable) => tracing::warn!(
                    subject = %record.subject,
                    answer = %answer.raw,
                    "Answer is not a valid IP address"
                ),
                Some(DefectKind::NonMember) => tracing::warn!(
                    subject = %record.subject,
                    answer = %answer.raw,
                    network = %self.network,
                    "Network does not contain answer"
                ),
                None => {}
            }
        }

        RecordOutcome {
            index,
            subject: record.subject.clone(),
            query_kind: record.query_kind.clone(),
            answers,
        }
    }

    /// Logical AND over every answer of every outcome.
    pub fn all_valid(outcomes: &[RecordOutcome]) -> bool {
        outcomes.iter().all(RecordOutcome::is_valid)
    }
}
