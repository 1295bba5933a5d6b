//! Sweep stimulus generation.

use anyhow::Context;
use clap::Args;
use earshot_analysis::{chirp, db_to_linear};
use earshot_config::MeasurementConfig;
use earshot_io::{WavSpec, write_wav};
use std::path::PathBuf;

use super::common::quantity;

#[derive(Args)]
pub struct SweepArgs {
    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Start frequency (e.g. 20, 20Hz)
    #[arg(long, value_parser = quantity)]
    f_start: Option<f32>,

    /// Stop frequency (e.g. 20000, 20kHz)
    #[arg(long, value_parser = quantity)]
    f_stop: Option<f32>,

    /// Sweep duration in seconds, fades excluded
    #[arg(short, long, value_parser = quantity)]
    duration: Option<f32>,

    /// Fade-in in seconds; the fade-out is a tenth of it
    #[arg(long, value_parser = quantity)]
    fade: Option<f32>,

    /// Sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Bit depth (16, 24 or 32)
    #[arg(long)]
    bits: Option<u16>,

    /// Peak level in dBFS
    #[arg(long, value_parser = quantity, allow_hyphen_values = true)]
    level: Option<f32>,

    /// Write the effective configuration to this TOML file
    #[arg(long, value_name = "TOML")]
    save_config: Option<PathBuf>,
}

impl SweepArgs {
    fn apply(&self, config: &mut MeasurementConfig) {
        let sweep = &mut config.sweep;
        sweep.f_start = self.f_start.unwrap_or(sweep.f_start);
        sweep.f_stop = self.f_stop.unwrap_or(sweep.f_stop);
        sweep.duration = self.duration.unwrap_or(sweep.duration);
        sweep.fade = self.fade.unwrap_or(sweep.fade);
        sweep.sample_rate = self.sample_rate.unwrap_or(sweep.sample_rate);
        sweep.bits_per_sample = self.bits.unwrap_or(sweep.bits_per_sample);
        sweep.level_db = self.level.unwrap_or(sweep.level_db);
    }
}

pub fn run(args: SweepArgs, mut config: MeasurementConfig) -> anyhow::Result<()> {
    args.apply(&mut config);
    config.validate()?;
    let sweep = &config.sweep;

    println!(
        "Generating exponential sweep {}-{} Hz, {} s at {} Hz...",
        sweep.f_start, sweep.f_stop, sweep.duration, sweep.sample_rate
    );

    let gain = db_to_linear(sweep.level_db);
    let samples: Vec<f32> = chirp(
        sweep.f_start,
        sweep.f_stop,
        sweep.duration,
        sweep.fade,
        config.sample_rate(),
    )
    .into_iter()
    .map(|s| s * gain)
    .collect();

    let spec = WavSpec {
        channels: 1,
        sample_rate: sweep.sample_rate,
        bits_per_sample: sweep.bits_per_sample,
    };
    write_wav(&args.output, &samples, spec)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "  {} samples ({:.3} s, {:.1} dBFS peak) -> {}",
        samples.len(),
        samples.len() as f32 / config.sample_rate(),
        sweep.level_db,
        args.output.display()
    );

    if let Some(path) = &args.save_config {
        config.save(path)?;
        println!("Configuration written to {}", path.display());
    }

    Ok(())
}
