//! Ordered schema-variant decoding of raw evidence payloads.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use thiserror::Error;

use super::EvidenceRecord;
use crate::verdict::DecodeFailure;

/// A payload that matched none of the known shapes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed evidence: {reason}")]
pub struct MalformedEvidence {
    /// The offending payload, verbatim
    pub payload: String,

    /// Why every shape rejected it
    pub reason: String,
}

/// Known payload shapes, tried in [`SchemaVariant::DECODE_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// `{"name", "query", "answers": [string]}`
    NameQueryAnswers,

    /// `{"name" | "private_dns_name", "results": [string]}`
    PrivateDnsResults,

    /// Resolver query log: `{"query_name", "query_type", "answers": [{"Rdata"}]}`
    ResolverQueryLog,
}

#[derive(Deserialize)]
struct NameQueryAnswersShape {
    name: String,
    #[serde(default)]
    query: Option<String>,
    answers: Vec<String>,
}

#[derive(Deserialize)]
struct PrivateDnsResultsShape {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    private_dns_name: Option<String>,
    results: Vec<String>,
}

#[derive(Deserialize)]
struct ResolverQueryLogShape {
    query_name: String,
    #[serde(default)]
    query_type: Option<String>,
    answers: Vec<ResolverAnswer>,
}

#[derive(Deserialize)]
struct ResolverAnswer {
    #[serde(rename = "Rdata")]
    rdata: String,
}

impl SchemaVariant {
    /// Priority order used by the decoder.
    pub const DECODE_ORDER: [SchemaVariant; 3] = [
        SchemaVariant::NameQueryAnswers,
        SchemaVariant::PrivateDnsResults,
        SchemaVariant::ResolverQueryLog,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SchemaVariant::NameQueryAnswers => "name_query_answers",
            SchemaVariant::PrivateDnsResults => "private_dns_results",
            SchemaVariant::ResolverQueryLog => "resolver_query_log",
        }
    }

    /// Decode a parsed payload under this shape only.
    pub fn decode_value(self, value: &JsonValue) -> Result<EvidenceRecord, String> {
        let record = match self {
            SchemaVariant::NameQueryAnswers => {
                let shape = NameQueryAnswersShape::deserialize(value).map_err(|e| e.to_string())?;
                EvidenceRecord {
                    subject: shape.name,
                    query_kind: shape.query,
                    answers: shape.answers,
                    schema: self,
                }
            }
            SchemaVariant::PrivateDnsResults => {
                let shape = PrivateDnsResultsShape::deserialize(value).map_err(|e| e.to_string())?;
                let subject = shape
                    .name
                    .filter(|n| !n.is_empty())
                    .or(shape.private_dns_name)
                    .ok_or_else(|| "missing field `name` or `private_dns_name`".to_string())?;
                EvidenceRecord {
                    subject,
                    query_kind: None,
                    answers: shape.results,
                    schema: self,
                }
            }
            SchemaVariant::ResolverQueryLog => {
                let shape = ResolverQueryLogShape::deserialize(value).map_err(|e| e.to_string())?;
                let subject = shape
                    .query_name
                    .strip_suffix('.')
                    .map(str::to_string)
                    .unwrap_or(shape.query_name);
                EvidenceRecord {
                    subject,
                    query_kind: shape.query_type,
                    answers: shape.answers.into_iter().map(|a| a.rdata).collect(),
                    schema: self,
                }
            }
        };

        if record.subject.is_empty() {
            return Err("empty subject".to_string());
        }
        Ok(record)
    }

    /// Render a record in this shape.
    pub fn encode(self, record: &EvidenceRecord) -> JsonValue {
        match self {
            SchemaVariant::NameQueryAnswers => json!({
                "name": record.subject,
                "query": record.query_kind,
                "answers": record.answers,
            }),
            SchemaVariant::PrivateDnsResults => json!({
                "name": record.subject,
                "results": record.answers,
            }),
            SchemaVariant::ResolverQueryLog => {
                let kind = record.query_kind.clone().unwrap_or_else(|| "A".to_string());
                let answers: Vec<JsonValue> = record
                    .answers
                    .iter()
                    .map(|a| json!({ "Rdata": a, "Type": kind, "Class": "IN" }))
                    .collect();
                json!({
                    "query_name": format!("{}.", record.subject),
                    "query_type": kind,
                    "answers": answers,
                })
            }
        }
    }
}

/// Result of decoding a batch: records keep their batch index.
#[derive(Debug, Clone, Default)]
pub struct DecodedBatch {
    pub records: Vec<(usize, EvidenceRecord)>,
    pub failures: Vec<DecodeFailure>,
}

/// Decodes raw payloads by trying each known shape in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvidenceDecoder;

impl EvidenceDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one payload; the first shape that parses wins.
    pub fn decode(&self, payload: &str) -> Result<EvidenceRecord, MalformedEvidence> {
        let value: JsonValue = serde_json::from_str(payload).map_err(|e| MalformedEvidence {
            payload: payload.to_string(),
            reason: format!("invalid JSON: {}", e),
        })?;

        if !value.is_object() {
            return Err(MalformedEvidence {
                payload: payload.to_string(),
                reason: "payload is not a JSON object".to_string(),
            });
        }

        let mut rejections = Vec::with_capacity(SchemaVariant::DECODE_ORDER.len());
        for variant in SchemaVariant::DECODE_ORDER {
            match variant.decode_value(&value) {
                Ok(record) => return Ok(record),
                Err(reason) => rejections.push(format!("{}: {}", variant.name(), reason)),
            }
        }

        Err(MalformedEvidence {
            payload: payload.to_string(),
            reason: format!("no known schema matched ({})", rejections.join("; ")),
        })
    }

    /// Decode every payload, collecting failures instead of stopping.
    pub fn decode_batch<S: AsRef<str>>(&self, payloads: &[S]) -> DecodedBatch {
        let mut batch = DecodedBatch::default();

        for (index, payload) in payloads.iter().enumerate() {
            match self.decode(payload.as_ref()) {
                Ok(record) => batch.records.push((index, record)),
                Err(e) => {
                    tracing::warn!(index, reason = %e.reason, "Evidence payload failed to decode");
                    batch.failures.push(DecodeFailure {
                        index,
                        payload: e.payload,
                        reason: e.reason,
                    });
                }
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn answers(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_decode_name_query_answers() {
        let payload = r#"{"name":"api.internal","query":"A","answers":["10.0.1.5","10.0.2.6"]}"#;
        let record = EvidenceDecoder::new().decode(payload).unwrap();

        assert_eq!(record.subject, "api.internal");
        assert_eq!(record.query_kind.as_deref(), Some("A"));
        assert_eq!(record.answers, answers(&["10.0.1.5", "10.0.2.6"]));
        assert_eq!(record.schema, SchemaVariant::NameQueryAnswers);
    }

    #[test]
    fn test_missing_query_is_not_an_error() {
        let payload = r#"{"name":"api.internal","answers":[]}"#;
        let record = EvidenceDecoder::new().decode(payload).unwrap();
        assert_eq!(record.query_kind, None);
        assert!(record.is_empty());
    }

    #[test]
    fn test_decode_private_dns_results() {
        let payload = r#"{"name":"s3","private_dns_name":"bucket.s3.internal","results":["10.0.3.3"]}"#;
        let record = EvidenceDecoder::new().decode(payload).unwrap();

        assert_eq!(record.subject, "s3");
        assert_eq!(record.answers, answers(&["10.0.3.3"]));
        assert_eq!(record.schema, SchemaVariant::PrivateDnsResults);
    }

    #[test]
    fn test_private_dns_name_used_when_name_absent() {
        let payload = r#"{"private_dns_name":"ec2.internal","results":[]}"#;
        let record = EvidenceDecoder::new().decode(payload).unwrap();
        assert_eq!(record.subject, "ec2.internal");
    }

    #[test]
    fn test_decode_resolver_query_log() {
        let payload = r#"{
            "version": "1.100000",
            "query_name": "sts.us-east-1.amazonaws.com.",
            "query_type": "A",
            "rcode": "NOERROR",
            "answers": [
                {"Rdata": "10.0.4.10", "Type": "A", "Class": "IN"},
                {"Rdata": "10.0.4.11", "Type": "A", "Class": "IN"}
            ]
        }"#;
        let record = EvidenceDecoder::new().decode(payload).unwrap();

        assert_eq!(record.subject, "sts.us-east-1.amazonaws.com");
        assert_eq!(record.query_kind.as_deref(), Some("A"));
        assert_eq!(record.answers, answers(&["10.0.4.10", "10.0.4.11"]));
        assert_eq!(record.schema, SchemaVariant::ResolverQueryLog);
    }

    #[test]
    fn test_first_matching_shape_wins() {
        // Carries both `answers` and `results`; the primary shape is tried first.
        let payload = r#"{"name":"x","answers":["10.0.0.1"],"results":["192.168.0.1"]}"#;
        let record = EvidenceDecoder::new().decode(payload).unwrap();
        assert_eq!(record.schema, SchemaVariant::NameQueryAnswers);
        assert_eq!(record.answers, answers(&["10.0.0.1"]));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let payload = r#"{"name": "broken""#;
        let err = EvidenceDecoder::new().decode(payload).unwrap_err();
        assert_eq!(err.payload, payload);
        assert!(err.reason.starts_with("invalid JSON"));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = EvidenceDecoder::new().decode(r#"["10.0.0.1"]"#).unwrap_err();
        assert!(err.reason.contains("not a JSON object"));
    }

    #[test]
    fn test_no_shape_matches() {
        let payload = r#"{"hostname":"x","ips":["10.0.0.1"]}"#;
        let err = EvidenceDecoder::new().decode(payload).unwrap_err();

        assert!(err.reason.contains("name_query_answers"));
        assert!(err.reason.contains("private_dns_results"));
        assert!(err.reason.contains("resolver_query_log"));
    }

    #[test]
    fn test_answers_must_be_a_sequence() {
        let payload = r#"{"name":"x","answers":"10.0.0.1"}"#;
        assert!(EvidenceDecoder::new().decode(payload).is_err());
    }

    #[test]
    fn test_encode_then_decode_each_shape() {
        let record = EvidenceRecord::new(
            "svc.internal",
            answers(&["10.0.9.9", "not-an-ip", "10.0.9.8"]),
        )
        .with_query_kind("A");
        let decoder = EvidenceDecoder::new();

        for variant in SchemaVariant::DECODE_ORDER {
            let payload = variant.encode(&record).to_string();
            let decoded = decoder.decode(&payload).unwrap();
            assert_eq!(decoded.subject, record.subject, "{}", variant.name());
            assert_eq!(decoded.answers, record.answers, "{}", variant.name());
            assert_eq!(decoded.schema, variant);
        }
    }

    #[test]
    fn test_decode_batch_keeps_going() {
        let payloads = vec![
            r#"{"name":"a","answers":["10.0.0.1"]}"#.to_string(),
            "{not json".to_string(),
            r#"{"name":"c","answers":["10.0.0.3"]}"#.to_string(),
        ];
        let batch = EvidenceDecoder::new().decode_batch(&payloads);

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].0, 0);
        assert_eq!(batch.records[1].0, 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].index, 1);
        assert_eq!(batch.failures[0].payload, "{not json");
    }

    proptest! {
        #[test]
        fn prop_every_shape_decodes_what_it_encodes(
            subject in "[a-z0-9][a-z0-9.-]{0,40}",
            query_kind in proptest::option::of("[A-Z]{1,5}"),
            raw_answers in proptest::collection::vec("[ -~]{0,20}", 0..6),
        ) {
            let mut record = EvidenceRecord::new(subject, raw_answers);
            if let Some(kind) = query_kind.clone() {
                record = record.with_query_kind(kind);
            }
            let decoder = EvidenceDecoder::new();

            for variant in SchemaVariant::DECODE_ORDER {
                let payload = variant.encode(&record).to_string();
                let decoded = decoder.decode(&payload).unwrap();

                prop_assert_eq!(decoded.schema, variant);
                prop_assert_eq!(&decoded.subject, &record.subject);
                prop_assert_eq!(&decoded.answers, &record.answers);

                let expected_kind = match variant {
                    SchemaVariant::NameQueryAnswers => query_kind.clone(),
                    SchemaVariant::PrivateDnsResults => None,
                    SchemaVariant::ResolverQueryLog => {
                        Some(query_kind.clone().unwrap_or_else(|| "A".to_string()))
                    }
                };
                prop_assert_eq!(decoded.query_kind, expected_kind);
            }
        }
    }
}
