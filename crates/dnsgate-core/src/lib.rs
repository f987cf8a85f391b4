//! # dnsgate-core
//!
//! Deterministic DNS evidence validation.
//!
//! This crate answers one question for a provisioned network: did every DNS
//! answer observed inside it resolve to an address within the network's own
//! block?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same payloads and network always give the same verdict
//! 2. **No I/O**: Fetching and polling live in `dnsgate-runtime`
//! 3. **Itemized**: Every decode failure and defective answer is reported
//! 4. **Order-preserving**: Outcomes follow collection order
//!
//! ## Example
//!
//! ```rust,ignore
//! use dnsgate_core::{validate_batch, Network};
//!
//! let network = Network::parse("10.0.0.0/16")?;
//! let payloads = vec![r#"{"name":"api.internal","query":"A","answers":["10.0.5.5"]}"#];
//! let verdict = validate_batch(&payloads, &network);
//!
//! assert!(verdict.pass);
//! ```

pub mod evidence;
pub mod network;
pub mod plan;
pub mod validator;
pub mod verdict;

// Re-export main types at crate root
pub use evidence::{DecodedBatch, EvidenceDecoder, EvidenceRecord, MalformedEvidence, SchemaVariant};
pub use network::{Network, NetworkError};
pub use plan::{ObjectLocator, PlanError, PlanViolation, Readiness, RunPlan};
pub use validator::{AnswerOutcome, DefectKind, RecordOutcome, Validator};
pub use verdict::{DecodeFailure, Defect, Synthesizer, Verdict};

/// Decode and validate a batch of raw payloads against a network.
///
/// Decode failures are accumulated into the verdict; they never hide the
/// outcomes of the payloads that did decode.
pub fn validate_batch<S: AsRef<str>>(payloads: &[S], network: &Network) -> Verdict {
    let batch = EvidenceDecoder::new().decode_batch(payloads);

    let validator = Validator::new(network);
    let outcomes = validator.validate(batch.records.iter().map(|(index, record)| (*index, record)));

    let verdict = Synthesizer::new().synthesize(batch.failures, outcomes);
    tracing::info!(
        network = %network,
        pass = verdict.pass,
        records = verdict.outcomes.len(),
        decode_failures = verdict.decode_failures.len(),
        "Evidence batch validated"
    );
    verdict
}
