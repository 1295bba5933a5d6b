//! Short-time spectrum export.

use anyhow::{Context, bail};
use clap::Args;
use earshot_analysis::{AnalysisError, CancellationToken, StftAnalyzer};
use earshot_config::MeasurementConfig;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::common::{OutputFormat, WindowArg, analysis_window, read_mono, write_json};

#[derive(Args)]
pub struct SpectrogramArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file (.csv or .json)
    #[arg(short, long)]
    output: PathBuf,

    /// Frame length (power of two)
    #[arg(long)]
    fft_size: Option<usize>,

    /// Samples between frame starts
    #[arg(long)]
    hop: Option<usize>,

    /// Frame window
    #[arg(long, value_enum)]
    window: Option<WindowArg>,

    /// Write linear amplitude instead of dB
    #[arg(long)]
    linear: bool,
}

pub fn run(args: SpectrogramArgs, mut config: MeasurementConfig) -> anyhow::Result<()> {
    let settings = &mut config.spectrogram;
    settings.fft_size = args.fft_size.unwrap_or(settings.fft_size);
    settings.hop_size = args.hop.unwrap_or(settings.hop_size);
    if let Some(window) = args.window {
        settings.window = window.into();
    }
    config.validate()?;
    let settings = &config.spectrogram;

    let (samples, sample_rate) = read_mono(&args.input)?;
    let analyzer = StftAnalyzer::new(
        sample_rate as f32,
        settings.fft_size,
        settings.hop_size,
        analysis_window(settings.window),
    )?;
    let total = analyzer.num_frames(samples.len());
    if total == 0 {
        bail!(
            "{} is shorter than one {}-sample frame",
            args.input.display(),
            settings.fft_size
        );
    }

    let cancel: CancellationToken = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    println!(
        "Analyzing {} frames of {} samples (hop {})... Ctrl+C to cancel",
        total, settings.fft_size, settings.hop_size
    );
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})")?
            .progress_chars("##-"),
    );

    let spectrogram =
        match analyzer.analyze_with_progress(&samples, &cancel, |done, _| pb.set_position(done as u64)) {
            Ok(spectrogram) => spectrogram,
            Err(AnalysisError::Cancelled) => {
                pb.abandon_with_message("cancelled");
                bail!("spectrogram cancelled after {} of {} frames", pb.position(), total);
            }
            Err(e) => return Err(e.into()),
        };
    pb.finish_and_clear();

    let spectrogram = if args.linear {
        spectrogram
    } else {
        spectrogram.to_db()
    };

    match OutputFormat::from_path(&args.output) {
        OutputFormat::Json => write_json(&args.output, &spectrogram)?,
        OutputFormat::Csv => write_frames_csv(
            &args.output,
            &spectrogram.times,
            &spectrogram.frequencies,
            &spectrogram.frames,
        )?,
    }
    println!(
        "{} frames x {} bins written to {}",
        spectrogram.num_frames(),
        spectrogram.num_bins(),
        args.output.display()
    );
    Ok(())
}

/// One row per frame: start time, then one value per bin. The header row lists bin frequencies.
fn write_frames_csv(
    path: &Path,
    times: &[f32],
    frequencies: &[f32],
    frames: &[Vec<f32>],
) -> anyhow::Result<()> {
    let mut out = String::from("time_s");
    for f in frequencies {
        write!(out, ",{f}")?;
    }
    out.push('\n');
    for (t, frame) in times.iter().zip(frames) {
        write!(out, "{t}")?;
        for v in frame {
            write!(out, ",{v}")?;
        }
        out.push('\n');
    }
    std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}
