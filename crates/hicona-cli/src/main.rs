mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hicona", about = "High-content microscopy processing tool")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full processing pipeline
    Run(commands::run::RunArgs),
    /// Inspect a measurement directory
    Info(commands::info::InfoArgs),
    /// Stitch an exported well directory
    Stitch(commands::stitch::StitchArgs),
    /// Run Cellpose segmentation over a processed measurement tree
    Segment(commands::segment::SegmentArgs),
    /// Print or save a default pipeline configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Stitch(args) => commands::stitch::run(args),
        Commands::Segment(args) => commands::segment::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
