//! Impulse response estimation and reverberation metrics
//!
//! [`estimate_ir`] recovers an impulse response from a measured channel and a
//! reference channel by regularized spectral division. Unlike sweep
//! deconvolution it works with any broadband stimulus (noise, music), as long
//! as both channels were recorded together.
//!
//! The reverberation helpers ([`energy_decay_curve`], [`estimate_rt60`],
//! [`trim_ir`]) operate on an extracted IR from either method.

use crate::error::FftError;
use crate::fft::Fft;
use crate::math::argmax_abs;
use num_complex::Complex;
use serde::Serialize;

/// Floor added to `|X|²` before dividing by the reference spectrum.
pub const REGULARIZATION: f32 = 1e-20;

/// An impulse response together with its time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpulseResponse {
    /// Real impulse response.
    pub ir: Vec<f32>,
    /// Complex impulse response with the main peak at index 0.
    pub ir_complex: Vec<Complex<f32>>,
    /// Time of each sample of `ir` in seconds.
    pub t: Vec<f32>,
    /// Index of the main peak in `ir`.
    pub peak_at: usize,
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Transform size the response was computed with.
    pub fft_size: usize,
}

impl ImpulseResponse {
    /// Wrap a real response whose main peak sits at `peak_at`.
    ///
    /// The time axis is zero at the peak and `ir_complex` is the response rotated so the
    /// peak comes first.
    pub fn from_real(ir: Vec<f32>, peak_at: usize, sample_rate: f32) -> Self {
        let len = ir.len();
        let t = (0..len)
            .map(|i| (i as f32 - peak_at as f32) / sample_rate)
            .collect();
        let ir_complex = (0..len)
            .map(|i| Complex::new(ir[(i + peak_at) % len], 0.0))
            .collect();
        Self {
            ir,
            ir_complex,
            t,
            peak_at,
            sample_rate,
            fft_size: len,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.ir.len()
    }

    /// True when the response holds no samples.
    pub fn is_empty(&self) -> bool {
        self.ir.is_empty()
    }

    /// Time of the main peak on the `t` axis, in seconds.
    pub fn delay_seconds(&self) -> f32 {
        self.t.get(self.peak_at).copied().unwrap_or(0.0)
    }

    /// Whether `ir_complex` carries any imaginary content.
    pub fn has_imaginary_part(&self) -> bool {
        self.ir_complex.iter().any(|c| c.im != 0.0)
    }
}

/// Estimate the impulse response of the path from `reference` to `response`.
///
/// Computes `H = R · conj(X) / (|X|² + ε)` on spectra zero-padded to the next power
/// of two at or above `len_r + len_x - 1`, then rotates the inverse transform by
/// half its length so zero lag sits in the middle. A response that lags the
/// reference by `d` samples peaks at index `N/2 + d`.
pub fn estimate_ir(
    response: &[f32],
    reference: &[f32],
    sample_rate: f32,
) -> Result<ImpulseResponse, FftError> {
    let n = (response.len() + reference.len())
        .saturating_sub(1)
        .next_power_of_two()
        .max(2);
    let fft = Fft::new(n)?;

    let a = fft.full_spectrum(response);
    let b = fft.full_spectrum(reference);
    let quotient: Vec<Complex<f32>> = a
        .iter()
        .zip(&b)
        .map(|(a, b)| {
            let denom = b.norm_sqr() + REGULARIZATION;
            Complex::new(
                (a.re * b.re + a.im * b.im) / denom,
                (a.im * b.re - a.re * b.im) / denom,
            )
        })
        .collect();

    let mut h = fft.create_complex_array();
    fft.inverse_transform(&mut h, &quotient)?;

    let half = n / 2;
    let mut ir: Vec<f32> = (0..n).map(|i| h[(i + half) % n].re).collect();
    let peak_at = argmax_abs(&ir).unwrap_or(half);

    // Rotated index `peak_at` is unrotated index `peak_at - N/2`.
    let shift = peak_at as isize - half as isize;
    let ir_complex = (0..n as isize)
        .map(|i| h[(i + shift).rem_euclid(n as isize) as usize])
        .collect();

    let mean = ir.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    for v in &mut ir {
        *v -= mean as f32;
    }

    let t = (0..n)
        .map(|i| (i as f32 - half as f32) / sample_rate)
        .collect();

    tracing::debug!(fft_size = n, delay_samples = shift, "two-channel impulse response");

    Ok(ImpulseResponse {
        ir,
        ir_complex,
        t,
        peak_at,
        sample_rate,
        fft_size: n,
    })
}

/// Generate a unit impulse of `length` samples
pub fn impulse(length: usize) -> Vec<f32> {
    let mut signal = vec![0.0; length];
    if let Some(first) = signal.first_mut() {
        *first = 1.0;
    }
    signal
}

/// Trim an impulse response to its significant portion
///
/// Removes leading silence and trailing decay below threshold.
///
/// # Arguments
/// * `ir` - Impulse response samples
/// * `start_threshold_db` - Threshold for detecting IR start (relative to peak)
/// * `end_threshold_db` - Threshold for detecting IR end (relative to peak)
///
/// # Returns
/// Tuple of (trimmed_ir, start_sample, end_sample)
pub fn trim_ir(
    ir: &[f32],
    start_threshold_db: f32,
    end_threshold_db: f32,
) -> (Vec<f32>, usize, usize) {
    let peak = crate::level::peak(ir);
    if peak < 1e-10 {
        return (Vec::new(), 0, 0);
    }

    let start_thresh = peak * crate::level::db_to_linear(start_threshold_db);
    let end_thresh = peak * crate::level::db_to_linear(end_threshold_db);

    let start = ir
        .iter()
        .position(|&x| x.abs() > start_thresh)
        .unwrap_or(0);
    let end = ir
        .iter()
        .rposition(|&x| x.abs() > end_thresh)
        .map_or(ir.len(), |i| i + 1);

    if end <= start {
        return (Vec::new(), start, start);
    }

    (ir[start..end].to_vec(), start, end)
}

/// Compute the Energy Decay Curve (Schroeder integration)
///
/// Reverse-integrates the squared impulse response. Returned in dB, normalized
/// to 0 dB at the first sample.
pub fn energy_decay_curve(ir: &[f32]) -> Vec<f32> {
    let mut edc = vec![0.0f64; ir.len()];
    let mut sum = 0.0f64;
    for (e, &x) in edc.iter_mut().zip(ir).rev() {
        sum += x as f64 * x as f64;
        *e = sum;
    }

    let total = edc.first().copied().unwrap_or(0.0).max(1e-20);
    edc.iter()
        .map(|&e| (10.0 * (e / total).max(1e-10).log10()) as f32)
        .collect()
}

/// RT60 estimation result
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Rt60Estimate {
    /// RT60 in seconds (extrapolated from decay slope)
    pub rt60_seconds: f32,
    /// T20 (time to decay 20 dB, from -5 to -25 dB)
    pub t20_seconds: f32,
    /// T30 (time to decay 30 dB, from -5 to -35 dB)
    pub t30_seconds: f32,
    /// Early Decay Time (time to decay 10 dB, from 0 to -10 dB)
    pub edt_seconds: f32,
    /// Correlation coefficient of the linear fit (1.0 = perfect fit)
    pub correlation: f32,
}

/// Estimate RT60 (reverberation time) from an impulse response
///
/// Uses the Schroeder method with linear regression on the EDC. T30 is preferred
/// when it agrees with T20 within 30 %.
pub fn estimate_rt60(ir: &[f32], sample_rate: f32) -> Option<Rt60Estimate> {
    if ir.is_empty() {
        return None;
    }

    let edc = energy_decay_curve(ir);
    let decay_time = |from: f32, to: f32| {
        decay_fit(&edc, from, to)
            .filter(|fit| fit.slope < 0.0)
            .map_or(0.0, |fit| (from - to) / -fit.slope / sample_rate)
    };

    let edt_seconds = decay_time(0.0, -10.0);
    let t20_seconds = decay_time(-5.0, -25.0);
    let t30_seconds = decay_time(-5.0, -35.0);

    let rt60_from_t20 = t20_seconds * 3.0;
    let rt60_from_t30 = t30_seconds * 2.0;
    let rt60_seconds =
        if t30_seconds > 0.0 && (rt60_from_t30 - rt60_from_t20).abs() / rt60_from_t20 < 0.3 {
            rt60_from_t30
        } else {
            rt60_from_t20
        };

    let correlation = decay_fit(&edc, -5.0, -25.0).map_or(0.0, |fit| fit.correlation);

    Some(Rt60Estimate {
        rt60_seconds,
        t20_seconds,
        t30_seconds,
        edt_seconds,
        correlation,
    })
}

struct DecayFit {
    /// dB per sample.
    slope: f32,
    /// Absolute Pearson correlation of the fit.
    correlation: f32,
}

/// Least-squares line through the EDC between two levels.
fn decay_fit(edc: &[f32], start_db: f32, end_db: f32) -> Option<DecayFit> {
    let s = edc.iter().position(|&e| e <= start_db)?;
    let e = edc.iter().position(|&e| e <= end_db)?;
    if e <= s {
        return None;
    }

    let (mut sx, mut sy, mut sxy, mut sxx, mut syy) = (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for (i, &val) in edc[s..=e].iter().enumerate() {
        let x = i as f64;
        let y = val as f64;
        sx += x;
        sy += y;
        sxy += x * y;
        sxx += x * x;
        syy += y * y;
    }

    let n = (e - s + 1) as f64;
    let cov = n * sxy - sx * sy;
    let var_x = n * sxx - sx * sx;
    let var_y = n * syy - sy * sy;
    let denom = (var_x * var_y).sqrt();

    Some(DecayFit {
        slope: (cov / var_x) as f32,
        correlation: if denom > 0.0 {
            (cov / denom).abs() as f32
        } else {
            0.0
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exponential_decay(len: usize, rt60: f32, sample_rate: f32) -> Vec<f32> {
        let decay_constant = rt60 / 6.91;
        (0..len)
            .map(|i| (-(i as f32 / sample_rate) / decay_constant).exp())
            .collect()
    }

    #[test]
    fn test_identity_channels_give_centred_impulse() {
        let x: Vec<f32> = (0..200).map(|i| ((i * 37 % 101) as f32 / 50.0) - 1.0).collect();
        let result = estimate_ir(&x, &x, 48000.0).unwrap();
        assert_eq!(result.fft_size, 512);
        assert_eq!(result.peak_at, 256);
        assert_eq!(result.delay_seconds(), 0.0);
        assert!((result.ir_complex[0].re - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_delayed_channel_moves_peak() {
        let x: Vec<f32> = (0..256).map(|i| ((i * 53 % 97) as f32 / 48.0) - 1.0).collect();
        let mut y = vec![0.0; 266];
        y[10..].copy_from_slice(&x);
        let result = estimate_ir(&y, &x, 1000.0).unwrap();
        assert_eq!(result.peak_at, result.fft_size / 2 + 10);
        assert!((result.delay_seconds() - 0.010).abs() < 1e-6);
    }

    #[test]
    fn test_ir_mean_removed() {
        let x = impulse(64);
        let result = estimate_ir(&x, &x, 48000.0).unwrap();
        let mean: f32 = result.ir.iter().sum::<f32>() / result.ir.len() as f32;
        assert!(mean.abs() < 1e-6);
    }

    #[test]
    fn test_silent_reference_stays_finite() {
        let result = estimate_ir(&[0.5; 32], &[0.0; 32], 48000.0).unwrap();
        assert!(result.ir.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_from_real_time_axis() {
        let ir = ImpulseResponse::from_real(vec![0.0, 0.0, 1.0, 0.5], 2, 2.0);
        assert_eq!(ir.t, vec![-1.0, -0.5, 0.0, 0.5]);
        assert_eq!(ir.ir_complex[0], Complex::new(1.0, 0.0));
        assert!(!ir.has_imaginary_part());
    }

    #[test]
    fn test_impulse() {
        let imp = impulse(100);
        assert_eq!(imp[0], 1.0);
        assert!(imp[1..].iter().all(|&x| x == 0.0));
        assert!(impulse(0).is_empty());
    }

    #[test]
    fn test_trim_ir_basic() {
        let mut ir = vec![0.0; 100];
        ir[20] = 1.0;
        ir[21] = 0.5;
        ir[22] = 0.25;
        ir[23] = 0.1;
        ir[24] = 0.05;

        let (trimmed, start, end) = trim_ir(&ir, -20.0, -40.0);

        assert_eq!(start, 20);
        assert_eq!(end, 25);
        assert_eq!(trimmed.len(), 5);
    }

    #[test]
    fn test_trim_ir_silence() {
        let (trimmed, start, end) = trim_ir(&[0.0; 100], -20.0, -60.0);
        assert!(trimmed.is_empty());
        assert_eq!((start, end), (0, 0));
        assert!(trim_ir(&[], -20.0, -60.0).0.is_empty());
    }

    #[test]
    fn test_energy_decay_curve() {
        let ir = exponential_decay(24000, 0.5, 48000.0);
        let edc = energy_decay_curve(&ir);

        assert_eq!(edc.len(), ir.len());
        assert!(edc[0].abs() < 0.1, "EDC should start at 0 dB");
        for i in 1..edc.len() {
            assert!(edc[i] <= edc[i - 1] + 0.01, "EDC should be monotonically decreasing");
        }
        assert!(energy_decay_curve(&[]).is_empty());
    }

    #[test]
    fn test_estimate_rt60_exponential_decay() {
        let ir = exponential_decay(96000, 1.0, 48000.0);
        let rt60 = estimate_rt60(&ir, 48000.0).unwrap();
        assert!(
            (rt60.rt60_seconds - 1.0).abs() < 0.2,
            "RT60 should be close to 1 s, got {} s",
            rt60.rt60_seconds
        );
        assert!(rt60.correlation > 0.9);
        assert!(rt60.edt_seconds > 0.0);
    }

    #[test]
    fn test_estimate_rt60_empty() {
        assert!(estimate_rt60(&[], 48000.0).is_none());
    }
}
