//! Signal level measurement and conversion
//!
//! - RMS and peak level
//! - Decibel conversions
//! - Level normalization

/// Compute RMS (Root Mean Square) level of a signal
///
/// Returns RMS value in linear scale (not dB). Accumulates in `f64` so long
/// measurement buffers do not lose precision.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = signal.iter().map(|&x| x as f64 * x as f64).sum();
    (sum_sq / signal.len() as f64).sqrt() as f32
}

/// Compute RMS level in dB
pub fn rms_db(signal: &[f32]) -> f32 {
    linear_to_db(rms(signal))
}

/// Compute peak level (maximum absolute value)
pub fn peak(signal: &[f32]) -> f32 {
    signal.iter().fold(0.0f32, |m, &x| m.max(x.abs()))
}

/// Compute peak level in dB
pub fn peak_db(signal: &[f32]) -> f32 {
    linear_to_db(peak(signal))
}

/// Compute crest factor (peak-to-RMS ratio)
///
/// A sine wave gives ~1.41 (3 dB).
pub fn crest_factor(signal: &[f32]) -> f32 {
    let rms_val = rms(signal);
    if rms_val > 1e-10 {
        peak(signal) / rms_val
    } else {
        0.0
    }
}

/// Magnitude in dB with a tiny floor, so zero maps to a large finite negative value.
pub fn db(value: f32) -> f32 {
    (20.0 * (value as f64 + 1e-50).log10()) as f32
}

/// Convert a gain in dB to linear scale
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Convert a linear gain to dB; non-positive values give negative infinity
pub fn linear_to_db(linear: f32) -> f32 {
    if linear > 0.0 {
        20.0 * linear.log10()
    } else {
        f32::NEG_INFINITY
    }
}

/// Target of [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeMode {
    /// Scale so the RMS equals that of a full-scale sine (-3.01 dBFS).
    #[default]
    Rms,
    /// Scale so the largest absolute sample equals 1.
    Peak,
}

/// Scale a signal to a reference level.
///
/// Silent input is returned unchanged.
pub fn normalize(signal: &[f32], mode: NormalizeMode) -> Vec<f32> {
    let reference = match mode {
        NormalizeMode::Rms => rms(signal) * std::f32::consts::SQRT_2,
        NormalizeMode::Peak => peak(signal),
    };
    if reference == 0.0 {
        return signal.to_vec();
    }
    let factor = 1.0 / reference;
    signal.iter().map(|&x| x * factor).collect()
}
