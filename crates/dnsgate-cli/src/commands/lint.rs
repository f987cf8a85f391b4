use anyhow::Result;
use std::path::PathBuf;
use std::process::ExitCode;

use dnsgate_core::RunPlan;

use super::exit_code;

pub fn run(files: &[PathBuf]) -> Result<ExitCode> {
    let mut clean = true;

    for file in files {
        match RunPlan::from_file(file) {
            Ok(plan) => {
                println!(
                    "ok   {} ({}: {}, deadline {})",
                    file.display(),
                    plan.name,
                    plan.readiness.kind(),
                    humantime::format_duration(plan.effective_deadline())
                );
            }
            Err(e) => {
                clean = false;
                println!("FAIL {}: {:#}", file.display(), anyhow::Error::from(e));
            }
        }
    }

    Ok(exit_code(clean))
}
