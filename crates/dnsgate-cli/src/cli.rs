use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "dnsgate",
    about = "Validate that DNS answers observed in a network resolve inside its own block",
    version
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Wait for readiness, collect evidence and print the verdict
    Validate {
        /// Run plan file (YAML or JSON); repeat to run several plans concurrently
        #[arg(long = "plan", required = true)]
        plans: Vec<PathBuf>,

        /// Root directory of the object backend (`<bucket>/<key>`)
        #[arg(long, default_value = "objects")]
        objects: PathBuf,

        /// Root directory of the log backend (`<stream>.jsonl`)
        #[arg(long, default_value = "logs")]
        logs: PathBuf,

        /// Override the plan's convergence deadline (e.g. `90s`, `3m`)
        #[arg(long, value_parser = humantime::parse_duration)]
        deadline: Option<Duration>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check run plans against the schema and semantic rules
    Lint {
        /// Run plan files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Decode a file of raw payloads, one per line
    Decode {
        /// Payload file (JSON lines)
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
