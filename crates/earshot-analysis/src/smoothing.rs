//! Fractional-octave smoothing
//!
//! Each output point is the mean of the input bins inside a window whose width
//! is a fixed fraction of an octave around the target frequency. Prefix sums
//! make every window O(1), so smoothing onto a dense log grid stays linear in
//! the input length.

use crate::error::SmoothingError;
use crate::math::logspace;
use crate::spectrum::FrequencyResponse;

/// Lowest frequency of the grid used by [`smooth_response`].
pub const SMOOTHING_LOW_HZ: f32 = 20.0;

/// Smooth `data` onto `frequencies` with a `fraction`-octave window.
///
/// `data` holds `n` bins from DC towards Nyquist; target `f` maps to bin
/// `round(f · (n - 1) / (fs / 2))`. Window half-widths shrink towards both ends of
/// the bin range, and a window of zero bins returns the bin itself.
///
/// # Arguments
/// * `data` - Values per bin (dB magnitude, phase, ...)
/// * `fraction` - Octave fraction, e.g. `1.0 / 6.0`
/// * `frequencies` - Target frequencies in Hz
/// * `sample_rate` - Sample rate in Hz
pub fn fractional_octave_smoothing(
    data: &[f32],
    fraction: f32,
    frequencies: &[f32],
    sample_rate: f32,
) -> Vec<f32> {
    let n = data.len();
    if n == 0 {
        return vec![0.0; frequencies.len()];
    }

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for &v in data {
        acc += v as f64;
        prefix.push(acc);
    }

    let fraction = fraction as f64;
    let factor = 2f64.powf(fraction / 2.0) - 2f64.powf(-fraction / 2.0);
    let inv_bin = (n - 1) as f64 / (sample_rate as f64 / 2.0);
    let half = n as f64 * 0.5;
    let last = n as isize - 1;

    frequencies
        .iter()
        .map(|&f| {
            let i = ((f as f64 * inv_bin + 0.5).floor() as isize).clamp(0, last);
            let distance = (half - i as f64).abs();
            let width = (0.5 * factor * (half - distance) + 0.5).floor() as isize;
            if width <= 0 {
                return data[i as usize];
            }
            let start = (i - width + 1).max(0) as usize;
            let end = (i + width).min(last) as usize;
            let sum = prefix[end + 1] - prefix[start];
            (sum / (end - start + 1) as f64) as f32
        })
        .collect()
}

/// Log-spaced frequency grid snapped to FFT bins.
///
/// `fraction` is the grid step in decades (`1/96` gives 96 points per decade).
/// Points are rounded to multiples of `sample_rate / fft_size`; duplicates and
/// zero are dropped, so the grid is strictly increasing and strictly positive.
pub fn generate_frequencies(
    fraction: f32,
    f_low: f32,
    f_high: f32,
    fft_size: usize,
    sample_rate: f32,
) -> Result<Vec<f32>, SmoothingError> {
    if fraction.is_nan() || fraction <= 0.0 {
        return Err(SmoothingError::InvalidFraction(fraction));
    }
    if f_low.is_nan() || f_high.is_nan() || f_low <= 0.0 || f_high <= 0.0 {
        return Err(SmoothingError::InvalidFrequency { f_low, f_high });
    }
    if f_low >= f_high {
        return Err(SmoothingError::InvalidRange { f_low, f_high });
    }

    let lo = (f_low as f64).log10();
    let hi = (f_high as f64).log10();
    let num = ((hi - lo) / fraction as f64).round() as usize + 1;
    let resolution = sample_rate as f64 / fft_size.max(1) as f64;

    let mut bins: Vec<u64> = logspace(lo, hi, num)
        .into_iter()
        .map(|f| (f / resolution).round() as u64)
        .filter(|&k| k > 0)
        .collect();
    bins.dedup();

    Ok(bins
        .into_iter()
        .map(|k| (k as f64 * resolution) as f32)
        .collect())
}

/// Smooth a raw response onto a log grid.
///
/// The grid runs from 20 Hz to Nyquist with `resolution` decades per step.
/// Magnitude is averaged in dB and converted back to linear; phase is averaged
/// as is.
pub fn smooth_response(
    response: &FrequencyResponse,
    fraction: f32,
    resolution: f32,
) -> Result<FrequencyResponse, SmoothingError> {
    if fraction.is_nan() || fraction <= 0.0 {
        return Err(SmoothingError::InvalidFraction(fraction));
    }
    let sample_rate = response.sample_rate;
    let grid = generate_frequencies(
        resolution,
        SMOOTHING_LOW_HZ,
        sample_rate / 2.0,
        response.fft_size,
        sample_rate,
    )?;

    let magnitude_db = response.magnitude_db();
    let magnitude = fractional_octave_smoothing(&magnitude_db, fraction, &grid, sample_rate)
        .into_iter()
        .map(crate::level::db_to_linear)
        .collect();
    let phase = fractional_octave_smoothing(&response.phase, fraction, &grid, sample_rate);

    tracing::debug!(points = grid.len(), fraction, resolution, "smoothed response");

    Ok(FrequencyResponse {
        frequency: grid,
        magnitude,
        phase,
        fft_size: response.fft_size,
        sample_rate,
    })
}
