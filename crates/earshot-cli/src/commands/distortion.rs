//! Harmonic distortion from a sweep recording.

use clap::Args;
use earshot_analysis::math::nearest_index;
use earshot_analysis::{Farina, HarmonicDistortion, db};
use earshot_config::MeasurementConfig;
use std::path::PathBuf;

use super::common::{OutputFormat, default_window, quantity, read_pair, write_csv, write_json};

const SUMMARY_FREQUENCIES: [f32; 8] = [50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0];

#[derive(Args)]
pub struct DistortionArgs {
    /// Sweep stimulus WAV
    #[arg(value_name = "STIMULUS")]
    stimulus: PathBuf,

    /// Recorded response WAV
    #[arg(value_name = "RESPONSE")]
    response: PathBuf,

    /// Output file (.csv or .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Harmonics above the fundamental to analyse
    #[arg(long)]
    harmonics: Option<usize>,

    /// Window length per harmonic in seconds
    #[arg(long, value_parser = quantity)]
    window: Option<f32>,

    /// Smoothing width in octaves (e.g. 1/3)
    #[arg(long, value_parser = quantity)]
    smoothing: Option<f32>,
}

pub fn run(args: DistortionArgs, mut config: MeasurementConfig) -> anyhow::Result<()> {
    if let Some(count) = args.harmonics {
        config.analysis.harmonics = count;
    }
    if args.window.is_some() {
        config.analysis.harmonic_window = args.window;
    }
    if let Some(fraction) = args.smoothing {
        config.smoothing.fraction = fraction;
    }
    config.validate()?;

    let (stimulus, response, sample_rate) = read_pair(&args.stimulus, &args.response)?;
    let mut farina =
        Farina::new(stimulus, config.sweep.f_start, config.sweep.f_stop, sample_rate)?;
    farina.deconvolve(&response)?;

    let count = config.analysis.harmonics;
    let window = config
        .analysis
        .harmonic_window
        .unwrap_or_else(|| default_window(&farina, count));
    let safe = farina.max_safe_harmonic(window);
    if safe != 0 && count > safe {
        tracing::warn!(
            count,
            safe,
            window,
            "harmonic windows overlap above harmonic {}",
            safe
        );
    }

    println!(
        "Separating {} harmonics with {:.1} ms windows...",
        count,
        window * 1000.0
    );
    let thd = farina.harmonic_distortion(
        window,
        count,
        config.smoothing.fraction,
        config.smoothing.resolution,
    )?;

    print_summary(&thd);

    if let Some(path) = &args.output {
        match OutputFormat::from_path(path) {
            OutputFormat::Json => write_json(path, &thd)?,
            OutputFormat::Csv => {
                let mut headers = vec!["frequency_hz".to_string(), "fundamental_db".to_string()];
                headers.extend((2..thd.harmonics.len() + 2).map(|k| format!("h{k}_db")));
                headers.push("thd_percent".to_string());

                let mut columns = vec![thd.frequency.clone(), to_db(&thd.fundamental)];
                columns.extend(thd.harmonics.iter().map(|h| to_db(h)));
                columns.push(thd.thd_percent());
                write_csv(path, &headers, &columns)?;
            }
        }
        println!("Distortion written to {}", path.display());
    }

    Ok(())
}

fn to_db(values: &[f32]) -> Vec<f32> {
    values.iter().map(|&v| db(v)).collect()
}

fn print_summary(thd: &HarmonicDistortion) {
    println!("\n{:>10} {:>14} {:>10}", "Freq (Hz)", "Fund. (dB)", "THD (%)");
    println!("{:->10} {:->14} {:->10}", "", "", "");
    let percent = thd.thd_percent();
    for target in SUMMARY_FREQUENCIES {
        let Some(i) = nearest_index(&thd.frequency, target) else {
            continue;
        };
        println!(
            "{:>10.1} {:>14.2} {:>10.3}",
            thd.frequency[i],
            db(thd.fundamental[i]),
            percent[i]
        );
    }
}
