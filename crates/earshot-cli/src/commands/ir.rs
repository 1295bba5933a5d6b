//! Impulse-response extraction.

use anyhow::Context;
use clap::Args;
use earshot_analysis::{Farina, ImpulseResponse, estimate_ir, estimate_rt60};
use earshot_config::{IrMethod, MeasurementConfig};
use earshot_io::{WavSpec, write_wav};
use std::path::PathBuf;

use super::common::{MethodArg, quantity, read_pair, write_json};

#[derive(Args)]
pub struct IrArgs {
    /// Stimulus WAV: the sweep (farina) or the reference channel (two-channel)
    #[arg(value_name = "STIMULUS")]
    stimulus: PathBuf,

    /// Recorded response WAV
    #[arg(value_name = "RESPONSE")]
    response: PathBuf,

    /// Output impulse response WAV (32-bit float)
    #[arg(short, long)]
    output: PathBuf,

    /// Extraction method
    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    /// Keep only a Hann window of this many seconds around the peak (farina)
    #[arg(long, value_parser = quantity)]
    window: Option<f32>,

    /// Also write the response with its time axis as JSON
    #[arg(long, value_name = "JSON")]
    json: Option<PathBuf>,
}

pub fn run(args: IrArgs, mut config: MeasurementConfig) -> anyhow::Result<()> {
    if let Some(method) = args.method {
        config.analysis.method = method.into();
    }
    config.validate()?;

    let (stimulus, response, sample_rate) = read_pair(&args.stimulus, &args.response)?;

    let ir = match config.analysis.method {
        IrMethod::Farina => {
            println!(
                "Deconvolving {} against a {}-{} Hz sweep...",
                args.response.display(),
                config.sweep.f_start,
                config.sweep.f_stop
            );
            let mut farina =
                Farina::new(stimulus.clone(), config.sweep.f_start, config.sweep.f_stop, sample_rate)?;
            farina.deconvolve(&stimulus)?;
            let direct = farina.instant();
            let full = farina.deconvolved_response(&response)?;

            let latency = full.peak_at as isize - direct as isize;
            println!(
                "  Latency: {} samples ({:.2} ms)",
                latency,
                latency as f32 / sample_rate * 1000.0
            );

            match args.window {
                Some(length) => farina.window_at(&full.ir, full.peak_at as isize, length),
                None => full,
            }
        }
        IrMethod::TwoChannel => {
            println!(
                "Dividing {} by reference {}...",
                args.response.display(),
                args.stimulus.display()
            );
            let ir = estimate_ir(&response, &stimulus, sample_rate)?;
            println!(
                "  Delay: {:.2} ms",
                ir.delay_seconds() * 1000.0
            );
            ir
        }
    };

    report(&ir);

    write_wav(&args.output, &ir.ir, WavSpec::mono(sample_rate as u32))
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("Impulse response written to {}", args.output.display());

    if let Some(path) = &args.json {
        write_json(path, &ir)?;
        println!("JSON written to {}", path.display());
    }

    Ok(())
}

fn report(ir: &ImpulseResponse) {
    let peak = ir.ir.get(ir.peak_at).copied().unwrap_or(0.0);
    println!(
        "  {} samples, peak {:.4} at sample {}",
        ir.len(),
        peak,
        ir.peak_at
    );

    match estimate_rt60(&ir.ir[ir.peak_at.min(ir.len())..], ir.sample_rate) {
        Some(rt) if rt.rt60_seconds > 0.0 => println!(
            "  RT60 {:.3} s (T20 {:.3} s, T30 {:.3} s, EDT {:.3} s)",
            rt.rt60_seconds, rt.t20_seconds, rt.t30_seconds, rt.edt_seconds
        ),
        _ => tracing::info!("no usable decay for an RT60 estimate"),
    }
}
