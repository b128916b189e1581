use anyhow::Context;
use clap::Parser;
use log::info;
use std::path::PathBuf;

mod calibration;
mod config;
mod error;
mod output;
mod simulation;
mod transform;

use crate::config::Config;
use crate::simulation::Simulator;

#[derive(Parser)]
#[command(name = "ch_simulation")]
#[command(about = "Global cluster headache burden simulation")]
struct Cli {
    /// Configuration file path; built-in reference scenario when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Random seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let config = match &cli.config {
        Some(path) => {
            let config = Config::from_file(path)
                .with_context(|| format!("failed to load configuration from {:?}", path))?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => {
            info!("No configuration file given, using the reference scenario");
            Config::default()
        }
    };

    let simulator = Simulator::new(config, cli.seed)?;

    info!("Worldwide sufferers: {}", simulator.total_sufferers());
    let (total_simulated, breakdown) = simulator.simulated_patients_info();
    info!("Simulating {} patients:", total_simulated);
    for (group, count, percentage) in breakdown {
        info!("  {}: {} ({}%)", group.label(), count, percentage);
    }

    let results = simulator.run()?;

    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("failed to create output directory {:?}", cli.output))?;
    output::save_results(&results, &cli.output)?;
    output::generate_report(&results, &cli.output)?;
    info!("Results saved to {:?}", cli.output);

    Ok(())
}
