//! earshot CLI - acoustic measurements from WAV files.

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "earshot")]
#[command(author, version, about = "Acoustic measurement toolkit", long_about = None)]
struct Cli {
    /// Measurement configuration (TOML path or name in the user config directory)
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an exponential sine sweep stimulus
    Sweep(commands::sweep::SweepArgs),

    /// Extract an impulse response from a recording
    Ir(commands::ir::IrArgs),

    /// Smoothed frequency response with phase and group delay
    Response(commands::response::ResponseArgs),

    /// Harmonic distortion from a sweep recording
    Distortion(commands::distortion::DistortionArgs),

    /// Estimate the delay between two recordings
    Correlate(commands::correlate::CorrelateArgs),

    /// Weighted, gated level and integrated loudness
    Loudness(commands::loudness::LoudnessArgs),

    /// Short-time spectrum (Ctrl+C cancels)
    Spectrogram(commands::spectrogram::SpectrogramArgs),
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = commands::common::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sweep(args) => commands::sweep::run(args, config),
        Commands::Ir(args) => commands::ir::run(args, config),
        Commands::Response(args) => commands::response::run(args, config),
        Commands::Distortion(args) => commands::distortion::run(args, config),
        Commands::Correlate(args) => commands::correlate::run(args, config),
        Commands::Loudness(args) => commands::loudness::run(args, config),
        Commands::Spectrogram(args) => commands::spectrogram::run(args, config),
    }
}
