use std::error::Error;
use std::fs;
use std::path::Path;

use clap::{Parser, Subcommand};
use commands::{
    analyze::{self, AnalyzeArgs},
    demo::{self, DemoArgs},
};
use pipeline::Stage;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod pipeline;
mod source;
mod store;

#[derive(Parser, Debug)]
#[command(name = "mela", version, about = "Lattice correlator analysis")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Average, symmetrize and sample the two-point functions.
    TwoPoint(AnalyzeArgs),
    /// Two-point stage plus effective energies and their fits.
    EffectiveEnergy(AnalyzeArgs),
    /// Everything up to plain, summed and reduced-summed ratios.
    Ratio(AnalyzeArgs),
    /// Everything up to plateau and summation fits.
    Fit(AnalyzeArgs),
    /// The full pipeline including Ioffe-time distributions.
    Itd(AnalyzeArgs),
    /// Run the full pipeline on a synthetic ensemble.
    Demo(DemoArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Command::TwoPoint(args) => analyze::run(&args, Stage::TwoPoint),
        Command::EffectiveEnergy(args) => analyze::run(&args, Stage::EffectiveEnergy),
        Command::Ratio(args) => analyze::run(&args, Stage::Ratio),
        Command::Fit(args) => analyze::run(&args, Stage::Fit),
        Command::Itd(args) => analyze::run(&args, Stage::Itd),
        Command::Demo(args) => demo::run(&args),
    }
}

fn write_json<P: AsRef<Path>, T: serde::Serialize>(
    path: P,
    value: &T,
) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
