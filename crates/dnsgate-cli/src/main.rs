//! dnsgate CLI: the `dnsgate` command.

mod cli;
mod commands;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

/// Exit status for a run that ended in an error instead of a verdict.
const EXIT_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            plans,
            objects,
            logs,
            deadline,
            json,
        } => {
            commands::validate::run(commands::validate::Args {
                plans,
                objects,
                logs,
                deadline,
                json,
            })
            .await
        }
        Commands::Lint { files } => commands::lint::run(&files),
        Commands::Decode { file, json } => commands::decode::run(&file, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "dnsgate={level},dnsgate_core={level},dnsgate_runtime={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
