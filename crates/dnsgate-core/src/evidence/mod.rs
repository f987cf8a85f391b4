//! DNS evidence records and their decoding.
//!
//! Every log event emitted by a probed environment is one raw payload. The
//! decoder turns it into an [`EvidenceRecord`] by trying a fixed table of
//! known payload shapes in order. Different environment versions emit
//! different field names, and each shape in the table is one of them.

mod decoder;

pub use decoder::{DecodedBatch, EvidenceDecoder, MalformedEvidence, SchemaVariant};

use serde::{Deserialize, Serialize};

/// One decoded DNS query/answer observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Name being resolved (e.g. a hostname)
    pub subject: String,

    /// Query classification such as "A"; absent in some payload shapes
    pub query_kind: Option<String>,

    /// Raw answer tokens, in the order the resolver returned them
    pub answers: Vec<String>,

    /// Payload shape this record was decoded from
    pub schema: SchemaVariant,
}

impl EvidenceRecord {
    /// Create a record in the primary payload shape.
    pub fn new(subject: impl Into<String>, answers: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            query_kind: None,
            answers,
            schema: SchemaVariant::NameQueryAnswers,
        }
    }

    /// Set the query kind.
    pub fn with_query_kind(mut self, kind: impl Into<String>) -> Self {
        self.query_kind = Some(kind.into());
        self
    }

    /// Records with no answers are valid but carry nothing to validate.
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}
