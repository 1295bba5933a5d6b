//! Transfer function derivation
//!
//! Three ways to get from measured signals to a [`FrequencyResponse`]:
//!
//! - [`frequency_response_from_ir`] transforms an extracted impulse response
//!   (from [`crate::farina`] or [`crate::ir::estimate_ir`]).
//! - [`two_channel_response`] divides the spectra of a measured channel and a
//!   reference channel directly.
//! - [`TransferFunction::measure`] averages Welch cross-spectra, which also
//!   yields the coherence of the measurement.
//!
//! Transfer-function phase is unwrapped and reported in degrees, shifted by a
//! whole number of turns so it sits near zero at a reference frequency.

use crate::error::{AnalysisError, FftError};
use crate::fft::Fft;
use crate::ir::ImpulseResponse;
use crate::math::{interpolate, nearest_index};
use crate::spectrum::{FrequencyResponse, compute_spectrum};
use crate::window::Window;
use num_complex::Complex;
use std::f32::consts::PI;

/// Phase reference of [`two_channel_response`] in Hz.
pub const TWO_CHANNEL_PHASE_REFERENCE_HZ: f32 = 50.0;

/// Unwrap phase to remove discontinuities
///
/// Phase values are adjusted to be continuous by adding/subtracting
/// multiples of 2π when the jump between neighbouring input values exceeds π.
pub fn unwrap_phase(phase: &[f32]) -> Vec<f32> {
    let Some(&first) = phase.first() else {
        return Vec::new();
    };

    let two_pi = 2.0 * PI;
    let mut correction = 0.0;
    let mut unwrapped = Vec::with_capacity(phase.len());
    unwrapped.push(first);

    for pair in phase.windows(2) {
        let diff = pair[1] - pair[0];
        if diff > PI {
            correction -= two_pi;
        } else if diff < -PI {
            correction += two_pi;
        }
        unwrapped.push(pair[1] + correction);
    }

    unwrapped
}

/// Unwrap, remove whole turns at `reference` and convert to degrees.
fn reference_phase_degrees(wrapped: &[f32], frequency: &[f32], reference: f32) -> Vec<f32> {
    let unwrapped = unwrap_phase(wrapped);
    let turns = nearest_index(frequency, reference)
        .map_or(0.0, |i| (unwrapped[i] / (2.0 * PI) + 0.5).floor());
    let correction = turns * 2.0 * PI;
    unwrapped
        .iter()
        .map(|&p| (p - correction).to_degrees())
        .collect()
}

/// Transfer function of an impulse response.
///
/// Transforms `ir_complex` (the response rotated so its main peak comes first) at
/// the next power of two at or above its length. A purely real response takes the
/// real-input path. The phase is unwrapped, referenced to the bin nearest
/// `normalize_at` and returned in degrees.
pub fn frequency_response_from_ir(
    ir: &ImpulseResponse,
    normalize_at: f32,
) -> Result<FrequencyResponse, FftError> {
    let n = ir.len().next_power_of_two().max(2);
    let fft = Fft::new(n)?;
    tracing::debug!(fft_size = n, len = ir.len(), "transfer function from impulse response");

    let mut spectrum = fft.create_complex_array();
    if ir.has_imaginary_part() {
        let mut input = fft.create_complex_array();
        for (dst, src) in input.iter_mut().zip(&ir.ir_complex) {
            *dst = *src;
        }
        fft.transform(&mut spectrum, &input)?;
    } else {
        let mut frame = vec![0.0; n];
        for (dst, src) in frame.iter_mut().zip(&ir.ir_complex) {
            *dst = src.re;
        }
        fft.real_transform(&mut spectrum, &frame)?;
    }

    let bins = n / 2;
    let resolution = ir.sample_rate / n as f32;
    let frequency: Vec<f32> = (0..bins).map(|i| i as f32 * resolution).collect();
    let magnitude = spectrum[..bins].iter().map(|c| c.norm()).collect();
    let wrapped: Vec<f32> = spectrum[..bins].iter().map(|c| c.arg()).collect();
    let phase = reference_phase_degrees(&wrapped, &frequency, normalize_at);

    Ok(FrequencyResponse {
        frequency,
        magnitude,
        phase,
        fft_size: n,
        sample_rate: ir.sample_rate,
    })
}

/// Group delay in seconds from a response whose phase is in degrees.
///
/// Backward differences over the interior bins, edges copied from their
/// neighbours. With `normalize_at` the curve is shifted so the delay is zero at
/// the nearest bin, which drops the bulk propagation delay; `None` keeps the
/// absolute delay.
pub fn group_delay(response: &FrequencyResponse, normalize_at: Option<f32>) -> Vec<f32> {
    let n = response.len().min(response.phase.len());
    if n < 3 {
        return vec![0.0; n];
    }
    let f = &response.frequency;
    let phase = &response.phase;

    let mut delay = vec![0.0f32; n];
    for i in 1..n - 1 {
        let df = f[i] - f[i - 1];
        if df > 0.0 {
            delay[i] = -(phase[i] - phase[i - 1]) / df / 360.0;
        }
    }
    delay[0] = delay[1];
    delay[n - 1] = delay[n - 2];

    let reference = normalize_at
        .and_then(|at| nearest_index(&f[..n], at))
        .map_or(0.0, |i| delay[i]);
    for d in &mut delay {
        *d -= reference;
    }
    delay
}

/// Copy `src` into `dst` starting at `at`, clipped to the end of `dst`.
fn place(dst: &mut [f32], src: &[f32], at: usize) {
    let at = at.min(dst.len());
    let count = src.len().min(dst.len() - at);
    dst[at..at + count].copy_from_slice(&src[..count]);
}

/// Transfer function from the spectra of a measured and a reference channel.
///
/// Both channels are zero-padded or truncated to `fft_size`. A positive `offset`
/// delays the reference by that many samples, a negative one delays `data`, so a
/// known acoustic delay can be removed before the phase is compared.
///
/// Magnitude is `|S| / |R|`; phase is the unwrapped difference `∠S − ∠R` in
/// degrees, referenced to [`TWO_CHANNEL_PHASE_REFERENCE_HZ`].
pub fn two_channel_response(
    data: &[f32],
    reference: &[f32],
    fft_size: usize,
    offset: isize,
    sample_rate: f32,
) -> Result<FrequencyResponse, FftError> {
    let mut data_padded = vec![0.0f32; fft_size];
    let mut reference_padded = vec![0.0f32; fft_size];
    let shift = offset.unsigned_abs();
    if offset >= 0 {
        place(&mut reference_padded, reference, shift);
        place(&mut data_padded, data, 0);
    } else {
        place(&mut reference_padded, reference, 0);
        place(&mut data_padded, data, shift);
    }

    let signal = compute_spectrum(&data_padded, Some(fft_size), sample_rate)?;
    let reference = compute_spectrum(&reference_padded, Some(fft_size), sample_rate)?;

    let magnitude = signal
        .magnitude
        .iter()
        .zip(&reference.magnitude)
        .map(|(&s, &r)| s.max(1e-20) / r.max(1e-20))
        .collect();
    let difference: Vec<f32> = signal
        .phase
        .iter()
        .zip(&reference.phase)
        .map(|(&s, &r)| s - r)
        .collect();
    let phase = reference_phase_degrees(
        &difference,
        &signal.frequency,
        TWO_CHANNEL_PHASE_REFERENCE_HZ,
    );

    Ok(FrequencyResponse {
        frequency: signal.frequency,
        magnitude,
        phase,
        fft_size,
        sample_rate,
    })
}

/// Transfer function measurement result
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransferFunction {
    /// Frequency bins (Hz)
    pub frequencies: Vec<f32>,
    /// Magnitude response (dB)
    pub magnitude_db: Vec<f32>,
    /// Phase response (radians)
    pub phase_rad: Vec<f32>,
    /// Coherence (0-1, measure of linearity)
    pub coherence: Vec<f32>,
    /// Transform size per frame
    pub fft_size: usize,
    /// Sample rate in Hz
    pub sample_rate: f32,
}

impl TransferFunction {
    /// Measure transfer function using the H1 cross-spectral estimator
    ///
    /// # Arguments
    /// * `input` - Input signal (reference)
    /// * `output` - Output signal (system response)
    /// * `sample_rate` - Sample rate in Hz
    /// * `fft_size` - FFT size (determines frequency resolution)
    /// * `overlap` - Overlap ratio in `[0, 1)`, typically 0.5
    pub fn measure(
        input: &[f32],
        output: &[f32],
        sample_rate: f32,
        fft_size: usize,
        overlap: f32,
    ) -> Result<Self, AnalysisError> {
        if !(0.0..1.0).contains(&overlap) {
            return Err(AnalysisError::invalid_parameter(
                "overlap",
                format!("must be in [0, 1), got {overlap}"),
            ));
        }
        let fft = Fft::new(fft_size)?;
        let len = input.len().min(output.len());
        if len < fft_size {
            return Err(AnalysisError::SignalTooShort {
                len,
                required: fft_size,
            });
        }

        let hop_size = (((1.0 - overlap) * fft_size as f32) as usize).max(1);
        let num_frames = (len - fft_size) / hop_size + 1;
        let window = Window::Hann.coefficients(fft_size);
        tracing::debug!(fft_size, hop_size, num_frames, "measuring transfer function");

        let spectrum_size = fft_size / 2 + 1;
        let mut pxx = vec![0.0f32; spectrum_size];
        let mut pyy = vec![0.0f32; spectrum_size];
        let mut pxy = vec![Complex::new(0.0f32, 0.0); spectrum_size];

        let windowed = |signal: &[f32]| -> Vec<f32> {
            signal.iter().zip(&window).map(|(&s, &w)| s * w).collect()
        };

        for frame in 0..num_frames {
            let start = frame * hop_size;
            let x = fft.forward(&windowed(&input[start..start + fft_size]));
            let y = fft.forward(&windowed(&output[start..start + fft_size]));

            for i in 0..spectrum_size {
                pxx[i] += x[i].norm_sqr();
                pyy[i] += y[i].norm_sqr();
                pxy[i] += y[i] * x[i].conj();
            }
        }

        let freq_resolution = sample_rate / fft_size as f32;
        let mut tf = Self {
            frequencies: Vec::with_capacity(spectrum_size),
            magnitude_db: Vec::with_capacity(spectrum_size),
            phase_rad: Vec::with_capacity(spectrum_size),
            coherence: Vec::with_capacity(spectrum_size),
            fft_size,
            sample_rate,
        };

        for i in 0..spectrum_size {
            tf.frequencies.push(i as f32 * freq_resolution);

            if pxx[i] > 1e-10 {
                let h = pxy[i] / pxx[i];
                tf.magnitude_db.push(crate::level::db(h.norm()));
                tf.phase_rad.push(h.arg());
                let coh = pxy[i].norm_sqr() / (pxx[i] * pyy[i]).max(1e-10);
                tf.coherence.push(coh.min(1.0));
            } else {
                tf.magnitude_db.push(-120.0);
                tf.phase_rad.push(0.0);
                tf.coherence.push(0.0);
            }
        }

        Ok(tf)
    }

    /// Get magnitude at a specific frequency (interpolated)
    pub fn magnitude_at(&self, freq_hz: f32) -> f32 {
        interpolate(&self.frequencies, &self.magnitude_db, freq_hz)
    }

    /// Get phase at a specific frequency (interpolated)
    pub fn phase_at(&self, freq_hz: f32) -> f32 {
        interpolate(&self.frequencies, &self.phase_rad, freq_hz)
    }

    /// Convert to a Nyquist-exclusive [`FrequencyResponse`] with phase in degrees,
    /// referenced to the bin nearest `normalize_at`.
    pub fn to_frequency_response(&self, normalize_at: f32) -> FrequencyResponse {
        let bins = self.fft_size / 2;
        let frequency = self.frequencies[..bins].to_vec();
        let phase = reference_phase_degrees(&self.phase_rad[..bins], &frequency, normalize_at);
        FrequencyResponse {
            magnitude: self.magnitude_db[..bins]
                .iter()
                .map(|&db| crate::level::db_to_linear(db))
                .collect(),
            frequency,
            phase,
            fft_size: self.fft_size,
            sample_rate: self.sample_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(n: usize, seed: u32) -> Vec<f32> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state as i32 as f32) / (i32::MAX as f32)
            })
            .collect()
    }

    #[test]
    fn test_unwrap_phase() {
        let wrapped = [0.0, 3.0, -3.0, -0.5];
        let unwrapped = unwrap_phase(&wrapped);
        assert_eq!(unwrapped[0], 0.0);
        assert_eq!(unwrapped[1], 3.0);
        assert!((unwrapped[2] - (-3.0 + 2.0 * PI)).abs() < 1e-6);
        assert!(unwrap_phase(&[]).is_empty());
    }

    #[test]
    fn test_unwrapped_steps_stay_below_pi() {
        // Linear phase of a 40-sample delay wraps many times.
        let wrapped: Vec<f32> = (0..200)
            .map(|k| {
                let p = -2.0 * PI * 40.0 * k as f32 / 512.0;
                p.sin().atan2(p.cos())
            })
            .collect();
        let unwrapped = unwrap_phase(&wrapped);
        for pair in unwrapped.windows(2) {
            assert!((pair[1] - pair[0]).abs() <= PI + 1e-4);
        }
    }

    #[test]
    fn test_impulse_response_is_flat() {
        let mut samples = vec![0.0; 256];
        samples[0] = 1.0;
        let ir = ImpulseResponse::from_real(samples, 0, 48000.0);
        let response = frequency_response_from_ir(&ir, 1000.0).unwrap();

        assert_eq!(response.fft_size, 256);
        assert_eq!(response.len(), 128);
        for (&m, &p) in response.magnitude.iter().zip(&response.phase) {
            assert!((m - 1.0).abs() < 1e-5);
            assert!(p.abs() < 1e-3);
        }
    }

    #[test]
    fn test_complex_ir_takes_complex_path() {
        let mut ir = ImpulseResponse::from_real(vec![0.0; 8], 0, 8.0);
        ir.ir_complex[0] = Complex::new(0.0, 1.0);
        let response = frequency_response_from_ir(&ir, 1.0).unwrap();
        // j·δ[n] has unit magnitude and +90° phase everywhere
        for (&m, &p) in response.magnitude.iter().zip(&response.phase) {
            assert!((m - 1.0).abs() < 1e-6);
            assert!((p - 90.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_group_delay_of_pure_delay() {
        let fs = 48000.0;
        let frequency: Vec<f32> = (0..64).map(|i| i as f32 * fs / 128.0).collect();
        let phase: Vec<f32> = frequency
            .iter()
            .map(|&f| -360.0 * f * 4.0 / fs)
            .collect();
        let response = FrequencyResponse {
            magnitude: vec![1.0; 64],
            frequency,
            phase,
            fft_size: 128,
            sample_rate: fs,
        };

        let absolute = group_delay(&response, None);
        assert!(absolute.iter().all(|d| (d - 4.0 / fs).abs() < 1e-7));

        // Constant group delay vanishes after normalization.
        let gd = group_delay(&response, Some(1000.0));
        assert_eq!(gd.len(), 64);
        assert!(gd.iter().all(|d| d.abs() < 1e-7));
    }

    #[test]
    fn test_group_delay_step() {
        let fs = 48000.0;
        let df = fs / 128.0;
        let frequency: Vec<f32> = (0..64).map(|i| i as f32 * df).collect();
        // 4 samples of delay below bin 32, 8 samples above.
        let phase: Vec<f32> = (0..64)
            .map(|i: usize| {
                let low = i.min(32) as f32;
                let high = i.saturating_sub(32) as f32;
                -360.0 * df * (4.0 * low + 8.0 * high) / fs
            })
            .collect();
        let response = FrequencyResponse {
            magnitude: vec![1.0; 64],
            frequency,
            phase,
            fft_size: 128,
            sample_rate: fs,
        };

        let gd = group_delay(&response, Some(1000.0));
        assert!(gd[10].abs() < 1e-7);
        assert!((gd[40] - 4.0 / fs).abs() < 1e-7, "{}", gd[40]);
        assert_eq!(gd[63], gd[62]);
    }

    #[test]
    fn test_group_delay_short_input() {
        let response = FrequencyResponse {
            frequency: vec![0.0, 1.0],
            magnitude: vec![1.0, 1.0],
            phase: vec![0.0, -10.0],
            fft_size: 4,
            sample_rate: 4.0,
        };
        assert_eq!(group_delay(&response, Some(1.0)), vec![0.0, 0.0]);
    }

    #[test]
    fn test_two_channel_identity() {
        let x = noise(1024, 9);
        let response = two_channel_response(&x, &x, 1024, 0, 48000.0).unwrap();
        assert_eq!(response.len(), 512);
        for (&m, &p) in response.magnitude.iter().zip(&response.phase).skip(1) {
            assert!((m - 1.0).abs() < 1e-3);
            assert!(p.abs() < 0.1);
        }
    }

    #[test]
    fn test_two_channel_offset_compensates_delay() {
        let x = noise(2048, 5);
        let mut y = vec![0.0; 2048];
        y[8..].copy_from_slice(&x[..2040]);
        // Delay the reference by the same 8 samples.
        let response = two_channel_response(&y, &x, 2048, 8, 48000.0).unwrap();
        let mid = response.len() / 4;
        assert!((response.magnitude[mid] - 1.0).abs() < 1e-2);
        assert!(response.phase[mid].abs() < 1.0);
    }

    #[test]
    fn test_place_clips() {
        let mut dst = [0.0; 4];
        place(&mut dst, &[1.0, 2.0, 3.0], 2);
        assert_eq!(dst, [0.0, 0.0, 1.0, 2.0]);
        place(&mut dst, &[9.0], 7);
        assert_eq!(dst, [0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_measure_identity_system() {
        let x = noise(16384, 77);
        let tf = TransferFunction::measure(&x, &x, 48000.0, 1024, 0.5).unwrap();
        assert_eq!(tf.frequencies.len(), 513);
        for i in 1..512 {
            assert!(tf.magnitude_db[i].abs() < 0.01, "bin {i}: {}", tf.magnitude_db[i]);
            assert!(tf.coherence[i] > 0.99);
        }
        assert!(tf.magnitude_at(1000.0).abs() < 0.01);

        let response = tf.to_frequency_response(1000.0);
        assert_eq!(response.len(), 512);
        assert!((response.magnitude[100] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_measure_rejects_bad_input() {
        assert!(matches!(
            TransferFunction::measure(&[0.0; 100], &[0.0; 100], 48000.0, 1024, 0.5),
            Err(AnalysisError::SignalTooShort { .. })
        ));
        assert!(matches!(
            TransferFunction::measure(&[0.0; 2048], &[0.0; 2048], 48000.0, 1024, 1.0),
            Err(AnalysisError::InvalidParameter { name: "overlap", .. })
        ));
        assert!(matches!(
            TransferFunction::measure(&[0.0; 2048], &[0.0; 2048], 48000.0, 1000, 0.5),
            Err(AnalysisError::Fft(FftError::InvalidSize(1000)))
        ));
    }
}
