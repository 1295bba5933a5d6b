//! Frequency response export.

use clap::Args;
use earshot_analysis::math::nearest_index;
use earshot_analysis::{
    Farina, FrequencyResponse, correlate, db, frequency_response_from_ir, group_delay,
    smooth_response, two_channel_response,
};
use earshot_config::{IrMethod, MeasurementConfig};
use serde::Serialize;
use std::path::PathBuf;

use super::common::{
    MethodArg, OutputFormat, default_window, quantity, read_pair, write_csv, write_json,
};

/// Octave-band centres shown in the console summary.
const SUMMARY_BANDS: [f32; 10] = [
    31.5, 63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

#[derive(Args)]
pub struct ResponseArgs {
    /// Stimulus WAV: the sweep (farina) or the reference channel (two-channel)
    #[arg(value_name = "STIMULUS")]
    stimulus: PathBuf,

    /// Recorded response WAV
    #[arg(value_name = "RESPONSE")]
    response: PathBuf,

    /// Output file (.csv or .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extraction method
    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    /// Smoothing width in octaves (e.g. 1/3)
    #[arg(long, value_parser = quantity)]
    smoothing: Option<f32>,

    /// Report every bin without smoothing
    #[arg(long, conflicts_with = "smoothing")]
    raw: bool,

    /// Linear-response window in seconds (farina)
    #[arg(long, value_parser = quantity)]
    window: Option<f32>,

    /// Delay the reference by this many samples; negative delays the response (two-channel)
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<isize>,

    /// Find the offset by cross-correlation (two-channel)
    #[arg(long, conflicts_with = "offset")]
    align: bool,
}

/// Exported response: one entry per frequency point.
#[derive(Serialize)]
struct ResponseExport {
    frequency: Vec<f32>,
    magnitude_db: Vec<f32>,
    phase_deg: Vec<f32>,
    group_delay_ms: Vec<f32>,
}

pub fn run(args: ResponseArgs, mut config: MeasurementConfig) -> anyhow::Result<()> {
    if let Some(method) = args.method {
        config.analysis.method = method.into();
    }
    if let Some(fraction) = args.smoothing {
        config.smoothing.fraction = fraction;
    }
    config.validate()?;

    let (stimulus, response, sample_rate) = read_pair(&args.stimulus, &args.response)?;
    let reference_hz = config.analysis.phase_reference_hz;

    let raw = match config.analysis.method {
        IrMethod::Farina => {
            let mut farina =
                Farina::new(stimulus, config.sweep.f_start, config.sweep.f_stop, sample_rate)?;
            let ir = farina.deconvolved_response(&response)?;
            let window = args
                .window
                .or(config.analysis.harmonic_window)
                .unwrap_or_else(|| default_window(&farina, 1));
            tracing::info!(window, peak = ir.peak_at, "windowing linear response");
            let linear = farina.window_at(&ir.ir, ir.peak_at as isize, window);
            frequency_response_from_ir(&linear, reference_hz)?
        }
        IrMethod::TwoChannel => {
            let offset = if args.align {
                let lag = correlate(&stimulus, &response)?.estimated_lag_samples;
                println!("Aligned reference by {lag} samples");
                lag
            } else {
                args.offset.unwrap_or(0)
            };
            let fft_size = config.analysis.fft_size;
            if response.len().max(stimulus.len()) > fft_size {
                tracing::warn!(
                    fft_size,
                    len = response.len().max(stimulus.len()),
                    "recording longer than the transform; tail is ignored"
                );
            }
            two_channel_response(&response, &stimulus, fft_size, offset, sample_rate)?
        }
    };

    let shown = if args.raw {
        raw
    } else {
        smooth_response(&raw, config.smoothing.fraction, config.smoothing.resolution)?
    };
    let delay = group_delay(&shown, Some(reference_hz));

    print_summary(&shown, &delay);

    if let Some(path) = &args.output {
        let export = ResponseExport {
            frequency: shown.frequency.clone(),
            magnitude_db: shown.magnitude_db(),
            phase_deg: shown.phase.clone(),
            group_delay_ms: delay.iter().map(|d| d * 1000.0).collect(),
        };
        match OutputFormat::from_path(path) {
            OutputFormat::Json => write_json(path, &export)?,
            OutputFormat::Csv => write_csv(
                path,
                &["frequency_hz", "magnitude_db", "phase_deg", "group_delay_ms"]
                    .map(String::from),
                &[
                    export.frequency,
                    export.magnitude_db,
                    export.phase_deg,
                    export.group_delay_ms,
                ],
            )?,
        }
        println!("Response written to {}", path.display());
    }

    Ok(())
}

fn print_summary(response: &FrequencyResponse, delay: &[f32]) {
    println!(
        "\n{:>10} {:>10} {:>12} {:>12}",
        "Freq (Hz)", "Mag (dB)", "Phase (deg)", "GD (ms)"
    );
    println!("{:->10} {:->10} {:->12} {:->12}", "", "", "", "");
    let nyquist = response.sample_rate / 2.0;
    for band in SUMMARY_BANDS.iter().filter(|&&f| f < nyquist) {
        let Some(i) = nearest_index(&response.frequency, *band) else {
            continue;
        };
        println!(
            "{:>10.1} {:>10.2} {:>12.1} {:>12.3}",
            response.frequency[i],
            db(response.magnitude[i]),
            response.phase[i],
            delay[i] * 1000.0
        );
    }
}
