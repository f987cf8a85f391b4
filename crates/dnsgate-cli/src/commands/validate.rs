use anyhow::{Context, Result};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use dnsgate_core::RunPlan;
use dnsgate_runtime::{FsLogStore, FsObjectStore, OrchestratorBuilder};

use super::exit_code;

pub struct Args {
    pub plans: Vec<PathBuf>,
    pub objects: PathBuf,
    pub logs: PathBuf,
    pub deadline: Option<Duration>,
    pub json: bool,
}

pub async fn run(args: Args) -> Result<ExitCode> {
    let plans = args
        .plans
        .iter()
        .map(|path| {
            RunPlan::from_file(path)
                .with_context(|| format!("Failed to load run plan {}", path.display()))
                .map(|plan| match args.deadline {
                    Some(deadline) => plan.with_deadline(deadline),
                    None => plan,
                })
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(count = plans.len(), objects = %args.objects.display(), logs = %args.logs.display(), "Run plans loaded");

    let orchestrator = OrchestratorBuilder::new()
        .objects(Arc::new(FsObjectStore::new(&args.objects)))
        .logs(Arc::new(FsLogStore::new(&args.logs)))
        .build()?;

    let results = orchestrator.run_all(&plans).await;

    // A run error outranks a failing verdict.
    let errored = results.iter().any(|r| r.is_err());
    let passed = results
        .iter()
        .all(|r| r.as_ref().map(|o| o.passed()).unwrap_or(false));

    if args.json {
        let reports: Vec<_> = plans
            .iter()
            .zip(&results)
            .map(|(plan, result)| match result {
                Ok(outcome) => serde_json::to_value(outcome).unwrap_or_else(|e| {
                    json!({ "plan": plan.name, "error": e.to_string() })
                }),
                Err(e) => json!({ "plan": plan.name, "error": e.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for (plan, result) in plans.iter().zip(&results) {
            println!("dnsgate validate {} ({})", plan.name, plan.cidr);
            match result {
                Ok(outcome) => {
                    println!(
                        "  Converged after {} attempts in {}",
                        outcome.convergence.attempts,
                        humantime::format_duration(outcome.convergence.elapsed)
                    );
                    for line in outcome.verdict.to_string().lines() {
                        println!("  {}", line);
                    }
                }
                Err(e) => println!("  ERROR: {}", e),
            }
        }
    }

    if errored {
        anyhow::bail!(
            "{} of {} runs ended without a verdict",
            results.iter().filter(|r| r.is_err()).count(),
            results.len()
        );
    }
    Ok(exit_code(passed))
}
