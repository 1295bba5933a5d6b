//! Weighted level and integrated loudness.

use anyhow::{Context, bail};
use clap::Args;
use earshot_analysis::level::{peak_db, rms_db};
use earshot_analysis::weighting::{
    A_WEIGHTING, Coefficients, FilterState, K_WEIGHTING_PRE, K_WEIGHTING_RLB, apply_weighting,
    gate, integrated_loudness,
};
use earshot_config::{MeasurementConfig, Weighting};
use earshot_io::read_wav_channels;
use serde::Serialize;
use std::path::PathBuf;

use super::common::{WeightingArg, quantity, write_json};

#[derive(Args)]
pub struct LoudnessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Frequency weighting for the gated level
    #[arg(long, value_enum)]
    weighting: Option<WeightingArg>,

    /// Gate threshold in dBFS
    #[arg(long, value_parser = quantity, allow_hyphen_values = true)]
    threshold: Option<f32>,

    /// Gate block length in milliseconds
    #[arg(long, value_parser = quantity)]
    block: Option<f32>,

    /// Write the measurement as JSON
    #[arg(long, value_name = "JSON")]
    json: Option<PathBuf>,
}

#[derive(Serialize)]
struct ChannelLevel {
    channel: usize,
    peak_db: f32,
    rms_db: f32,
    gated_rms_db: f32,
}

#[derive(Serialize)]
struct LoudnessReport {
    weighting: Weighting,
    gate_threshold_db: f32,
    channels: Vec<ChannelLevel>,
    integrated_lufs: f32,
}

/// Cascade of filters realising `weighting`.
fn stages(weighting: Weighting) -> &'static [Coefficients] {
    match weighting {
        Weighting::A => &[A_WEIGHTING],
        Weighting::K => &[K_WEIGHTING_PRE, K_WEIGHTING_RLB],
        Weighting::Z => &[],
    }
}

fn weigh(signal: &[f32], weighting: Weighting) -> Vec<f32> {
    stages(weighting)
        .iter()
        .fold(signal.to_vec(), |acc, coefficients| {
            let mut state = FilterState::for_coefficients(coefficients);
            apply_weighting(&acc, coefficients, &mut state)
        })
}

pub fn run(args: LoudnessArgs, mut config: MeasurementConfig) -> anyhow::Result<()> {
    let loudness = &mut config.loudness;
    if let Some(weighting) = args.weighting {
        loudness.weighting = weighting.into();
    }
    loudness.gate_threshold_db = args.threshold.unwrap_or(loudness.gate_threshold_db);
    loudness.block_ms = args.block.unwrap_or(loudness.block_ms);
    config.validate()?;
    let settings = &config.loudness;

    let (channels, spec) = read_wav_channels(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    if channels.first().is_none_or(Vec::is_empty) {
        bail!("{} holds no samples", args.input.display());
    }
    let sample_rate = spec.sample_rate as f32;

    let levels: Vec<ChannelLevel> = channels
        .iter()
        .enumerate()
        .map(|(channel, samples)| {
            let weighted = weigh(samples, settings.weighting);
            let gated = gate(
                &weighted,
                sample_rate,
                settings.gate_threshold_db,
                settings.block_ms,
                settings.overlap,
            );
            ChannelLevel {
                channel,
                peak_db: peak_db(samples),
                rms_db: rms_db(samples),
                gated_rms_db: rms_db(&gated),
            }
        })
        .collect();

    let refs: Vec<&[f32]> = channels.iter().map(Vec::as_slice).collect();
    let integrated_lufs = integrated_loudness(&refs, sample_rate);

    println!(
        "{} ({} ch, {} Hz)",
        args.input.display(),
        channels.len(),
        spec.sample_rate
    );
    println!(
        "\n{:>8} {:>10} {:>10} {:>14}",
        "Channel", "Peak (dB)", "RMS (dB)", "Gated (dB)"
    );
    println!("{:->8} {:->10} {:->10} {:->14}", "", "", "", "");
    for level in &levels {
        println!(
            "{:>8} {:>10.2} {:>10.2} {:>14.2}",
            level.channel, level.peak_db, level.rms_db, level.gated_rms_db
        );
    }
    if integrated_lufs.is_finite() {
        println!("\nIntegrated loudness: {integrated_lufs:.1} LUFS");
    } else {
        println!("\nIntegrated loudness: below gate (input silent or shorter than 400 ms)");
    }

    if let Some(path) = &args.json {
        let report = LoudnessReport {
            weighting: settings.weighting,
            gate_threshold_db: settings.gate_threshold_db,
            channels: levels,
            integrated_lufs,
        };
        write_json(path, &report)?;
    }
    Ok(())
}
