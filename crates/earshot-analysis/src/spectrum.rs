//! Single-sided spectra and the frequency response type

use crate::error::FftError;
use crate::fft::Fft;
use crate::math::interpolate;
use serde::Serialize;

/// Magnitude and phase sampled on a frequency axis.
///
/// Raw spectra hold `fft_size / 2` bins from DC up to (excluding) Nyquist;
/// smoothed responses hold one value per grid frequency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyResponse {
    /// Frequency of each point in Hz, strictly increasing.
    pub frequency: Vec<f32>,
    /// Linear magnitude.
    pub magnitude: Vec<f32>,
    /// Phase; radians for raw spectra, degrees for transfer functions.
    pub phase: Vec<f32>,
    /// Transform size the response was computed with.
    pub fft_size: usize,
    /// Sample rate in Hz.
    pub sample_rate: f32,
}

impl FrequencyResponse {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    /// True when the response holds no points.
    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }

    /// Magnitude in dB.
    pub fn magnitude_db(&self) -> Vec<f32> {
        self.magnitude.iter().map(|&m| crate::level::db(m)).collect()
    }

    /// Magnitude at `freq_hz`, linearly interpolated.
    pub fn magnitude_at(&self, freq_hz: f32) -> f32 {
        interpolate(&self.frequency, &self.magnitude, freq_hz)
    }

    /// Phase at `freq_hz`, linearly interpolated.
    pub fn phase_at(&self, freq_hz: f32) -> f32 {
        interpolate(&self.frequency, &self.phase, freq_hz)
    }
}

/// Single-sided spectrum of a real signal.
///
/// The signal is zero-padded or truncated to `fft_size` (default: the next power of
/// two at or above its length). Magnitudes are scaled by √2 so a sine's RMS lands in
/// its bin; phase is the wrapped `atan2` angle in radians.
pub fn compute_spectrum(
    data: &[f32],
    fft_size: Option<usize>,
    sample_rate: f32,
) -> Result<FrequencyResponse, FftError> {
    let fft_size = fft_size.unwrap_or_else(|| data.len().next_power_of_two().max(2));
    let fft = Fft::new(fft_size)?;
    let bins = fft_size / 2;
    tracing::debug!(fft_size, len = data.len(), "computing spectrum");

    let spectrum = fft.forward(data);
    let resolution = sample_rate / fft_size as f32;

    Ok(FrequencyResponse {
        frequency: (0..bins).map(|i| i as f32 * resolution).collect(),
        magnitude: spectrum[..bins]
            .iter()
            .map(|c| c.norm() * std::f32::consts::SQRT_2)
            .collect(),
        phase: spectrum[..bins].iter().map(|c| c.arg()).collect(),
        fft_size,
        sample_rate,
    })
}
