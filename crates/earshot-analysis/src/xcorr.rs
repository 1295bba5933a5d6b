//! Cross-correlation and linear convolution
//!
//! Cross-correlation measures the similarity between two signals as a function of the
//! time-shift (lag) applied to one of them. It is the basis of delay estimation between
//! a reference channel and a measured channel.
//!
//! # Lag Convention
//!
//! The cross-correlation of signals x and y at lag τ is:
//!
//! ```text
//! R_xy(τ) = Σ_{n} x[n] · y[n + τ]
//! ```
//!
//! R_xy peaks at τ = τ₀ when y is x delayed by τ₀ samples (y\[n\] = x\[n - τ₀\]).
//! [`correlate`] reports every lag of the full support, `-(len_x - 1)..=len_y - 1`.
//!
//! # FFT-based Computation
//!
//! Both [`correlate`] and [`convolve`] zero-pad their inputs to the next power of two
//! at or above `len_x + len_y - 1`, so the circular result of the transform never
//! wraps onto itself:
//!
//! ```text
//! R_xy = IFFT( Y(f) · conj(X(f)) )
//! x * y = IFFT( X(f) · Y(f) )
//! ```
//!
//! # References
//!
//! - Oppenheim & Schafer, "Discrete-Time Signal Processing" (3rd ed.), section 2.8.
//! - Proakis & Manolakis, "Digital Signal Processing" (4th ed.), section 6.4.

use crate::error::FftError;
use crate::fft::Fft;
use num_complex::Complex;
use serde::Serialize;

/// Output of [`correlate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    /// Correlation normalized by `sqrt(Σx² · Σy²)`, all zeros when either signal is silent.
    pub corr: Vec<f32>,
    /// Signed lag in samples of each entry of `corr` and `raw`.
    pub lags: Vec<isize>,
    /// Lag of the correlation peak.
    pub estimated_lag_samples: isize,
    /// Index of the correlation peak in `corr`.
    pub estimated_lag_index: usize,
    /// Normalized correlation at the peak.
    pub peak_correlation: f32,
    /// Unnormalized correlation.
    pub raw: Vec<f32>,
    /// Transform size used.
    pub nfft: usize,
}

impl CorrelationResult {
    fn empty() -> Self {
        Self {
            corr: Vec::new(),
            lags: Vec::new(),
            estimated_lag_samples: 0,
            estimated_lag_index: 0,
            peak_correlation: 0.0,
            raw: Vec::new(),
            nfft: 0,
        }
    }

    /// Estimated delay of `y` relative to `x` in seconds.
    pub fn delay_seconds(&self, sample_rate: f32) -> f32 {
        self.estimated_lag_samples as f32 / sample_rate
    }
}

/// Output length selection for [`convolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvolveMode {
    /// All `len_x + len_y - 1` samples.
    #[default]
    Full,
    /// `len_x` samples centred on the full result.
    Same,
}

fn transform_size(len_x: usize, len_y: usize) -> usize {
    (len_x + len_y - 1).next_power_of_two().max(2)
}

/// FFT cross-correlation of `x` and `y` over every lag of their full support.
///
/// Positive lag means `y` is a delayed copy of `x`. The peak is the maximum of the
/// normalized correlation; ties go to the lowest index.
///
/// # Example
///
/// ```rust
/// use earshot_analysis::correlate;
///
/// let result = correlate(&[1.0, 0.0, 0.0, 0.0], &[0.0, 0.0, 1.0, 0.0]).unwrap();
/// assert_eq!(result.estimated_lag_samples, 2);
/// ```
pub fn correlate(x: &[f32], y: &[f32]) -> Result<CorrelationResult, FftError> {
    if x.is_empty() || y.is_empty() {
        return Ok(CorrelationResult::empty());
    }

    let full_len = x.len() + y.len() - 1;
    let nfft = transform_size(x.len(), y.len());
    let fft = Fft::new(nfft)?;

    let a = fft.full_spectrum(y);
    let b = fft.full_spectrum(x);
    let cross: Vec<Complex<f32>> = a
        .iter()
        .zip(&b)
        .map(|(a, b)| Complex::new(a.re * b.re + a.im * b.im, a.im * b.re - a.re * b.im))
        .collect();

    let mut circular = fft.create_complex_array();
    fft.inverse_transform(&mut circular, &cross)?;

    // Circular index m holds lag m for m >= 0 and lag m - nfft otherwise.
    let offset = x.len() as isize - 1;
    let lags: Vec<isize> = (0..full_len as isize).map(|i| i - offset).collect();
    let raw: Vec<f32> = lags
        .iter()
        .map(|&lag| circular[lag.rem_euclid(nfft as isize) as usize].re)
        .collect();

    let energy_x: f64 = x.iter().map(|&v| v as f64 * v as f64).sum();
    let energy_y: f64 = y.iter().map(|&v| v as f64 * v as f64).sum();
    let denom = (energy_x * energy_y).sqrt();
    let corr: Vec<f32> = if denom > 0.0 {
        raw.iter().map(|&r| (r as f64 / denom) as f32).collect()
    } else {
        tracing::warn!("correlation of a silent signal, returning zeros");
        vec![0.0; raw.len()]
    };

    let mut peak_index = 0;
    for (i, &v) in corr.iter().enumerate().skip(1) {
        if v > corr[peak_index] {
            peak_index = i;
        }
    }

    tracing::debug!(
        nfft,
        lag = lags[peak_index],
        peak = corr[peak_index],
        "cross-correlation computed"
    );

    Ok(CorrelationResult {
        estimated_lag_samples: lags[peak_index],
        estimated_lag_index: peak_index,
        peak_correlation: corr[peak_index],
        corr,
        lags,
        raw,
        nfft,
    })
}

/// FFT linear convolution of `x` and `y`.
///
/// `Full` returns `len_x + len_y - 1` samples. `Same` returns `len_x` samples starting at
/// `floor((full_len - len_x) / 2)` of the full result.
pub fn convolve(x: &[f32], y: &[f32], mode: ConvolveMode) -> Result<Vec<f32>, FftError> {
    if x.is_empty() {
        return Ok(Vec::new());
    }
    if y.is_empty() {
        return Ok(match mode {
            ConvolveMode::Full => Vec::new(),
            ConvolveMode::Same => vec![0.0; x.len()],
        });
    }

    let full_len = x.len() + y.len() - 1;
    let nfft = transform_size(x.len(), y.len());
    let fft = Fft::new(nfft)?;

    let a = fft.full_spectrum(x);
    let b = fft.full_spectrum(y);
    let product: Vec<Complex<f32>> = a.iter().zip(&b).map(|(a, b)| a * b).collect();

    let mut out = fft.create_complex_array();
    fft.inverse_transform(&mut out, &product)?;

    let (start, len) = match mode {
        ConvolveMode::Full => (0, full_len),
        ConvolveMode::Same => ((full_len - x.len()) / 2, x.len()),
    };
    Ok(out[start..start + len].iter().map(|c| c.re).collect())
}

/// Compute the direct time-domain cross-correlation.
///
/// Time complexity O(n · max_lag). Used as a reference for [`correlate`] and for short
/// lag windows where the transform is not worth it.
///
/// # Arguments
///
/// * `x` - first signal
/// * `y` - second signal
/// * `max_lag` - maximum lag to evaluate (inclusive)
///
/// # Returns
///
/// `Vec<f32>` of length `2 * max_lag + 1`, laid out as `[R(-max_lag), …, R(0), …, R(max_lag)]`.
pub fn xcorr_direct(x: &[f32], y: &[f32], max_lag: usize) -> Vec<f32> {
    let max_lag = max_lag as isize;
    (-max_lag..=max_lag)
        .map(|lag| {
            x.iter()
                .enumerate()
                .filter_map(|(n, &xv)| {
                    let m = n as isize + lag;
                    (m >= 0 && (m as usize) < y.len()).then(|| xv * y[m as usize])
                })
                .sum()
        })
        .collect()
}

/// Find the lag of maximum absolute correlation and its value.
///
/// `correlation` is laid out as returned by [`xcorr_direct`]. Uses the maximum absolute
/// value so that anti-phase alignments are also found.
pub fn peak_lag(correlation: &[f32], max_lag: usize) -> (isize, f32) {
    match crate::math::argmax_abs(correlation) {
        Some(i) => (i as isize - max_lag as isize, correlation[i]),
        None => (0, 0.0),
    }
}
