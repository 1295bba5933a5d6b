//! Analysis demo: sweep measurement of a mildly distorting system.
//!
//! Run with: cargo run -p earshot-analysis --example analysis_demo

use earshot_analysis::{
    Farina, chirp, correlate, frequency_response_from_ir, group_delay, smooth_response,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sample_rate = 48000.0;
    let (f_start, f_stop, duration) = (20.0, 20000.0, 2.0);

    // --- Stimulus and a synthetic device under test ---
    println!("=== Exponential sweep {f_start}-{f_stop} Hz, {duration} s ===\n");
    let stimulus = chirp(f_start, f_stop, duration, 0.0, sample_rate);

    // 2 ms of latency, -6 dB gain and a little second-order distortion.
    let latency = 96;
    let mut recorded = vec![0.0; latency];
    recorded.extend(stimulus.iter().map(|&x| 0.5 * x + 0.02 * x * x));

    // --- Latency from cross-correlation ---
    let xcorr = correlate(&stimulus, &recorded)?;
    println!(
        "Latency: {} samples ({:.2} ms), correlation {:.3}",
        xcorr.estimated_lag_samples,
        xcorr.delay_seconds(sample_rate) * 1000.0,
        xcorr.peak_correlation
    );

    // --- Deconvolution ---
    let mut farina = Farina::new(stimulus, f_start, f_stop, sample_rate)?;
    let ir = farina.deconvolved_response(&recorded)?;
    println!("IR peak at sample {} of {}", ir.peak_at, ir.len());

    let window = 0.9 * farina.margin_of_harmonic(2.0);
    println!(
        "Harmonic window {:.1} ms, harmonics 2-3 separated by {:.1} ms",
        window * 1000.0,
        farina.margin_of_harmonic(2.0) * 1000.0
    );

    // --- Linear response ---
    let linear = farina.window_at(&ir.ir, ir.peak_at as isize, window);
    let response = frequency_response_from_ir(&linear, 1000.0)?;
    let smoothed = smooth_response(&response, 1.0 / 6.0, 1.0 / 48.0)?;
    let delay = group_delay(&smoothed, Some(1000.0));

    println!("\n{:>10} {:>10} {:>12} {:>12}", "Freq (Hz)", "Mag (dB)", "Phase (deg)", "GD (ms)");
    println!("{:->10} {:->10} {:->12} {:->12}", "", "", "", "");
    for target in [50.0, 100.0, 1000.0, 5000.0, 10000.0] {
        let Some(i) = earshot_analysis::math::nearest_index(&smoothed.frequency, target) else {
            continue;
        };
        println!(
            "{:>10.1} {:>10.2} {:>12.1} {:>12.3}",
            smoothed.frequency[i],
            earshot_analysis::db(smoothed.magnitude[i]),
            smoothed.phase[i],
            delay[i] * 1000.0
        );
    }

    // --- Distortion ---
    let thd = farina.harmonic_distortion(window, 3, 1.0 / 3.0, 1.0 / 12.0)?;
    println!("\n{:>10} {:>10}", "Freq (Hz)", "THD (%)");
    println!("{:->10} {:->10}", "", "");
    for (f, percent) in thd
        .frequency
        .iter()
        .zip(thd.thd_percent())
        .step_by(6)
        .filter(|(f, _)| **f < 5000.0)
    {
        println!("{:>10.1} {:>10.3}", f, percent);
    }

    Ok(())
}
