//! graphgen CLI.
//!
//! Regenerates the tool catalog from a specs directory, or verifies in
//! `--check` mode that the committed output is current.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "graphgen", about = "Generate the Graph API tool catalog")]
struct Cli {
    /// Directory of API spec JSON files.
    #[arg(long, default_value = "api_specs")]
    specs: PathBuf,

    /// Output file for the generated catalog source.
    #[arg(long)]
    out: PathBuf,

    /// Verify the output file instead of writing it; exits nonzero when
    /// the catalog is stale.
    #[arg(long)]
    check: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = graphgen::generate_from_dir(&cli.specs)
        .with_context(|| format!("generating catalog from {}", cli.specs.display()))?;

    if cli.check {
        let existing = std::fs::read_to_string(&cli.out)
            .with_context(|| format!("reading {}", cli.out.display()))?;
        if existing != code {
            bail!(
                "{} is stale; regenerate with graphgen --specs {} --out {}",
                cli.out.display(),
                cli.specs.display(),
                cli.out.display()
            );
        }
        info!(out = %cli.out.display(), "catalog is current");
        return Ok(());
    }

    if let Some(parent) = cli.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&cli.out, &code)
        .with_context(|| format!("writing {}", cli.out.display()))?;
    info!(out = %cli.out.display(), bytes = code.len(), "catalog written");
    Ok(())
}
