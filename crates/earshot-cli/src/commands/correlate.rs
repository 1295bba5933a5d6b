//! Delay estimation by cross-correlation.

use clap::Args;
use earshot_analysis::correlate;
use earshot_config::MeasurementConfig;
use serde::Serialize;
use std::path::PathBuf;

use super::common::{read_pair, write_json};

#[derive(Args)]
pub struct CorrelateArgs {
    /// Reference WAV
    #[arg(value_name = "REFERENCE")]
    reference: PathBuf,

    /// WAV to locate relative to the reference
    #[arg(value_name = "SIGNAL")]
    signal: PathBuf,

    /// Write the estimate as JSON
    #[arg(long, value_name = "JSON")]
    json: Option<PathBuf>,
}

#[derive(Serialize)]
struct DelayEstimate {
    lag_samples: isize,
    lag_seconds: f32,
    peak_correlation: f32,
    nfft: usize,
}

pub fn run(args: CorrelateArgs, _config: MeasurementConfig) -> anyhow::Result<()> {
    let (reference, signal, sample_rate) = read_pair(&args.reference, &args.signal)?;
    let result = correlate(&reference, &signal)?;

    let estimate = DelayEstimate {
        lag_samples: result.estimated_lag_samples,
        lag_seconds: result.delay_seconds(sample_rate),
        peak_correlation: result.peak_correlation,
        nfft: result.nfft,
    };

    println!(
        "Delay: {} samples ({:.3} ms), peak correlation {:.3}",
        estimate.lag_samples,
        estimate.lag_seconds * 1000.0,
        estimate.peak_correlation
    );
    if estimate.peak_correlation.abs() < 0.1 {
        tracing::warn!(
            peak = estimate.peak_correlation,
            "weak correlation, the delay estimate is unreliable"
        );
    }

    if let Some(path) = &args.json {
        write_json(path, &estimate)?;
    }
    Ok(())
}
