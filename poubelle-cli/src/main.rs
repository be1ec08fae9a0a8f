//! Command line entry point that runs the poubelle pipeline for one arrondissement.

mod app;
mod logging;
mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use poubelle_core::config::PipelineConfig;

/// Pipeline stage selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Step {
    /// Download datasets into `raw/` and `processed/`.
    Fetch,
    /// Estimate flows and build the flow network.
    Enrich,
    /// Draw the map.
    Visualize,
    /// All three stages in order.
    All,
}

#[derive(Debug, Parser)]
#[command(name = "poubelle", version, about = "Paris garbage flow visualization")]
struct Cli {
    /// Pipeline step to run.
    #[arg(long, value_enum, default_value_t = Step::All)]
    step: Step,

    /// Paris arrondissement to analyze.
    #[arg(long, default_value = "14")]
    arrondissement: String,

    /// Serve the working directory on port 8000 after the pipeline.
    #[arg(long)]
    serve: bool,

    /// TOML file overriding the built-in configuration.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root of the raw, processed and enriched data directories.
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = PipelineConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    if !app::run(&config, cli.step, &cli.arrondissement).await? {
        return Ok(ExitCode::FAILURE);
    }

    if cli.serve {
        serve::serve(&config).await?;
    }

    Ok(ExitCode::SUCCESS)
}
