use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::process::ExitCode;

use dnsgate_core::EvidenceDecoder;

use super::exit_code;

pub fn run(file: &Path, json_output: bool) -> Result<ExitCode> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read payload file {}", file.display()))?;

    let payloads: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let batch = EvidenceDecoder::new().decode_batch(&payloads);

    if json_output {
        let records: Vec<_> = batch
            .records
            .iter()
            .map(|(index, record)| json!({ "index": index, "record": record }))
            .collect();
        let payload = json!({
            "source": file.display().to_string(),
            "payloads": payloads.len(),
            "records": records,
            "failures": batch.failures,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("dnsgate decode {}", file.display());
        for (index, record) in &batch.records {
            println!(
                "  #{} {} [{}] {} -> {}",
                index,
                record.subject,
                record.schema.name(),
                record.query_kind.as_deref().unwrap_or("-"),
                record.answers.join(", ")
            );
        }
        for failure in &batch.failures {
            println!("  #{} decode failure: {}", failure.index, failure.reason);
        }
        println!(
            "  {} decoded, {} failed",
            batch.records.len(),
            batch.failures.len()
        );
    }

    Ok(exit_code(batch.failures.is_empty()))
}
