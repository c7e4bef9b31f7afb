use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use hs_engine::SweepEngine;
use hs_optimizer::{SchemaKind, StderrMode, SweepConfig};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "hmm-sweep",
    version,
    about = "Random-search calibration sweep over profile HMM aligner parameters"
)]
struct Cli {
    /// JSON sweep configuration; flags below override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Input dataset passed to the aligner
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Aligner invocation, split on whitespace (e.g. "cargo run --release -q --")
    #[arg(long = "command", value_name = "COMMAND")]
    aligner_command: Option<String>,

    /// Directory for per-run files, the ledger and the consolidated table
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Number of runs
    #[arg(short = 'n', long)]
    iterations: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum)]
    schema: Option<SchemaArg>,

    /// What to do with the aligner's standard error
    #[arg(long, value_enum)]
    stderr: Option<StderrArg>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SchemaArg {
    #[value(name = "seven", alias = "7")]
    Seven,
    #[value(name = "eight", alias = "8")]
    Eight,
}

impl From<SchemaArg> for SchemaKind {
    fn from(value: SchemaArg) -> Self {
        match value {
            SchemaArg::Seven => SchemaKind::Seven,
            SchemaArg::Eight => SchemaKind::Eight,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StderrArg {
    Discard,
    Inherit,
}

impl From<StderrArg> for StderrMode {
    fn from(value: StderrArg) -> Self {
        match value {
            StderrArg::Discard => StderrMode::Discard,
            StderrArg::Inherit => StderrMode::Inherit,
        }
    }
}

impl Cli {
    fn into_config(self) -> Result<SweepConfig> {
        let mut config = match &self.config {
            Some(path) => SweepConfig::from_json_file(path)?,
            None => SweepConfig::default(),
        };

        if let Some(input) = self.input {
            config = config.with_input(input);
        }
        if let Some(command) = self.aligner_command {
            config = config.with_command(command.split_whitespace());
        }
        if let Some(dir) = self.output_dir {
            config = config.with_output_dir(dir);
        }
        if let Some(n) = self.iterations {
            config = config.with_iterations(n);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(schema) = self.schema {
            config = config.with_schema(schema.into());
        }
        if let Some(stderr) = self.stderr {
            config = config.with_stderr(stderr.into());
        }
        Ok(config)
    }
}

/// `HMM_SWEEP_LOG` wins over `RUST_LOG`, which wins over `-v`/`-q`.
fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };

    let filter = std::env::var("HMM_SWEEP_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config()?;
    let engine = SweepEngine::with_process(config).context("invalid sweep configuration")?;
    let status = engine.run().await.context("sweep failed")?;

    if let Some(path) = &status.results_path {
        println!(
            "{} rows from {}/{} runs written to {}",
            status.rows_aggregated,
            status.runs_succeeded,
            status.iterations,
            path.display()
        );
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
