//! Verdict assembly: aggregates decode failures and answer outcomes.
//!
//! The verdict passes only when every payload decoded and every answer is an
//! address inside the network. Nothing is summarized away: every decode
//! failure and every defective answer is listed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::validator::{DefectKind, RecordOutcome, Validator};

/// A payload that could not be decoded under any known shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeFailure {
    /// Position of the payload in the collected batch
    pub index: usize,

    /// The payload, verbatim
    pub payload: String,

    pub reason: String,
}

/// One defective answer, located by record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Defect {
    pub index: usize,
    pub subject: String,
    pub answer: String,
    pub kind: DefectKind,
}

/// Final result of one validation run.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// True only with zero decode failures and zero defects
    pub pass: bool,

    pub decode_failures: Vec<DecodeFailure>,

    /// Per-record outcomes, in collection order
    pub outcomes: Vec<RecordOutcome>,

    pub evaluated_at: DateTime<Utc>,
}

impl Verdict {
    /// Every defective answer across all records.
    pub fn defects(&self) -> Vec<Defect> {
        self.outcomes
            .iter()
            .flat_map(|record| {
                record.defects().map(move |(answer, kind)| Defect {
                    index: record.index,
                    subject: record.subject.clone(),
                    answer: answer.raw.clone(),
                    kind,
                })
            })
            .collect()
    }

    /// Number of answers checked.
    pub fn answers_checked(&self) -> usize {
        self.outcomes.iter().map(|r| r.answers.len()).sum()
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        let defects = self.defects();
        let status = if self.pass { "PASS" } else { "FAIL" };
        format!(
            "{}: {} records, {} answers, {} defects, {} decode failures",
            status,
            self.outcomes.len(),
            self.answers_checked(),
            defects.len(),
            self.decode_failures.len()
        )
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for failure in &self.decode_failures {
            writeln!(
                f,
                "  record #{}: decode failure: {} (payload: {})",
                failure.index, failure.reason, failure.payload
            )?;
        }
        for defect in self.defects() {
            let label = match defect.kind {
                DefectKind::Unparsable => "answer is not a valid IP address",
                DefectKind::NonMember => "answer is outside the network",
            };
            writeln!(
                f,
                "  record #{} ({}): {}: {}",
                defect.index, defect.subject, label, defect.answer
            )?;
        }
        Ok(())
    }
}

/// Aggregates a batch's results into a [`Verdict`].
#[derive(Debug, Default)]
pub struct Synthesizer;

impl Synthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Combine decode failures and record outcomes.
    ///
    /// Outcomes are kept in the order given; they are expected in collection
    /// order.
    pub fn synthesize(
        &self,
        decode_failures: Vec<DecodeFailure>,
        outcomes: Vec<RecordOutcome>,
    ) -> Verdict {
        let pass = decode_failures.is_empty() && Validator::all_valid(&outcomes);

        Verdict {
            pass,
            decode_failures,
            outcomes,
            evaluated_at: Utc::now(),
        }
    }
}
