//! Towngen command line
//!
//! Generates one town and prints its plan as JSON, writes it to a file, or
//! prints a short summary.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use towngen::core::error::Result;
use towngen::{generate, CityPlan, GeneratorConfig};

/// Procedural medieval town generator
#[derive(Parser, Debug)]
#[command(name = "towngen")]
#[command(about = "Generate a medieval town plan from a seed")]
struct Args {
    /// Number of patches inside the town
    #[arg(long, short = 'n')]
    patches: Option<usize>,

    /// Random seed for deterministic runs
    #[arg(long, short = 's')]
    seed: Option<u64>,

    /// TOML file with generator settings
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Write the plan here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Print ward and gate statistics instead of the JSON plan
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("towngen=info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(patches) = args.patches {
        config = config.with_patches(patches);
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, patches = config.patch_count, "Generating town");

    let model = generate(&config, seed)?;
    let plan = CityPlan::from_model(&model, seed);

    if let Some(path) = &args.output {
        fs::write(path, plan.to_json()?)?;
        tracing::info!(path = %path.display(), "Wrote town plan");
    }

    if args.summary {
        print!("{}", plan.summary());
        let issues = plan.footprint_issues();
        println!("{} malformed building footprints", issues.len());
        for issue in issues.iter().take(10) {
            tracing::warn!(patch = issue.patch, building = issue.building, "{}", issue.error);
        }
    } else if args.output.is_none() {
        println!("{}", plan.to_json()?);
    }

    Ok(())
}
