//! Exponential sine sweep deconvolution (Farina method)
//!
//! Convolving a sweep response with the time-reversed, envelope-compensated
//! sweep compresses the sweep into an impulse. The linear impulse response
//! lands at [`Farina::instant`]; the response of the `n`-th harmonic arrives
//! `ℓ·ln(n)` seconds *earlier*, with `ℓ = duration / ln(f_stop / f_start)`, so
//! each harmonic can be cut out with a window and analyzed separately.
//!
//! ```text
//!        H3   H2        H1 (linear)
//!   ─────┼────┼─────────┼──────────▶ t
//!        │◀──▶│◀───────▶│
//!        ℓ·ln(3/2)  ℓ·ln(2)
//! ```
//!
//! # Reference
//!
//! A. Farina, "Simultaneous measurement of impulse response and distortion
//! with a swept-sine technique", AES 108th Convention, 2000.

use crate::error::{AnalysisError, FftError};
use crate::ir::ImpulseResponse;
use crate::math::{argmax_abs, interpolate};
use crate::smoothing::smooth_response;
use crate::transfer_fn::frequency_response_from_ir;
use crate::window::Window;
use crate::xcorr::{ConvolveMode, convolve};
use serde::Serialize;

/// Harmonic numbers examined by [`Farina::max_safe_harmonic`].
const HARMONIC_SEARCH_LIMIT: usize = 1000;

/// Phase reference for harmonic transfer functions in Hz.
const HARMONIC_PHASE_REFERENCE_HZ: f32 = 1000.0;

/// Sweep deconvolver bound to one stimulus.
#[derive(Debug, Clone)]
pub struct Farina {
    stimulus: Vec<f32>,
    f_start: f32,
    f_stop: f32,
    sample_rate: f32,
    duration: f32,
    deconvolved: Vec<f32>,
}

/// Per-frequency harmonic distortion, see [`Farina::harmonic_distortion`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarmonicDistortion {
    /// Excitation frequency in Hz.
    pub frequency: Vec<f32>,
    /// Linear magnitude of the fundamental.
    pub fundamental: Vec<f32>,
    /// Linear magnitude of harmonics 2, 3, ... at each excitation frequency.
    pub harmonics: Vec<Vec<f32>>,
    /// `sqrt(Σ harmonic²) / fundamental`.
    pub thd: Vec<f32>,
}

impl HarmonicDistortion {
    /// THD in percent.
    pub fn thd_percent(&self) -> Vec<f32> {
        self.thd.iter().map(|&r| r * 100.0).collect()
    }
}

impl Farina {
    /// Create a deconvolver for `stimulus`, a sweep from `f_start` to `f_stop` Hz.
    pub fn new(
        stimulus: impl Into<Vec<f32>>,
        f_start: f32,
        f_stop: f32,
        sample_rate: f32,
    ) -> Result<Self, AnalysisError> {
        let stimulus = stimulus.into();
        if stimulus.is_empty() {
            return Err(AnalysisError::SignalTooShort {
                len: 0,
                required: 1,
            });
        }
        if sample_rate <= 0.0 {
            return Err(AnalysisError::invalid_parameter(
                "sample_rate",
                "must be positive",
            ));
        }
        if f_start <= 0.0 || f_stop <= f_start {
            return Err(AnalysisError::invalid_parameter(
                "frequency",
                format!("need 0 < f_start ({f_start}) < f_stop ({f_stop})"),
            ));
        }

        let duration = stimulus.len() as f32 / sample_rate;
        tracing::debug!(
            samples = stimulus.len(),
            duration,
            f_start,
            f_stop,
            "farina deconvolver"
        );

        Ok(Self {
            stimulus,
            f_start,
            f_stop,
            sample_rate,
            duration,
            deconvolved: Vec::new(),
        })
    }

    /// Stimulus duration in seconds.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Sweep rate `ℓ = duration / ln(f_stop / f_start)` in seconds.
    pub fn ell(&self) -> f32 {
        self.duration / (self.f_stop / self.f_start).ln()
    }

    /// Sweep rate helper: `π / f_start · round(length · f_start / log2(f_stop / f_start))`.
    pub fn rate(&self, length: f32) -> f32 {
        std::f32::consts::PI / self.f_start
            * (length * self.f_start / (self.f_stop / self.f_start).log2()).round()
    }

    /// Time by which harmonic `n` precedes the linear response, in seconds.
    pub fn lag_of_harmonic(&self, n: f32) -> f32 {
        self.ell() * n.ln()
    }

    /// Spacing between harmonics `n` and `n + 1`, in seconds.
    pub fn margin_of_harmonic(&self, n: f32) -> f32 {
        self.lag_of_harmonic(n + 1.0) - self.lag_of_harmonic(n)
    }

    /// Number of harmonics whose spacing exceeds `window_size` seconds.
    ///
    /// Counts `n` in `1..1000`; returns 0 when all of them qualify, meaning the
    /// window never overlaps a neighbour.
    pub fn max_safe_harmonic(&self, window_size: f32) -> usize {
        let safe = (1..HARMONIC_SEARCH_LIMIT)
            .filter(|&n| self.margin_of_harmonic(n as f32) > window_size)
            .count();
        if safe < HARMONIC_SEARCH_LIMIT - 1 { safe } else { 0 }
    }

    /// Inverse filter: the reversed stimulus with an `exp(-t/ℓ)` envelope.
    pub fn inverse_filter(&self) -> Vec<f32> {
        let decay = 1.0 / (self.ell() * self.sample_rate);
        self.stimulus
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &s)| s * (-(i as f32) * decay).exp())
            .collect()
    }

    /// Deconvolve a recorded response.
    ///
    /// The result has the length of `response` and is scaled so the stimulus
    /// deconvolved with itself peaks at 1. Each call replaces the previous result.
    pub fn deconvolve(&mut self, response: &[f32]) -> Result<&[f32], FftError> {
        let inverse = self.inverse_filter();
        let mut deconvolved = convolve(response, &inverse, ConvolveMode::Same)?;
        let reference = convolve(&self.stimulus, &inverse, ConvolveMode::Same)?;
        let norm = crate::level::peak(&reference);

        if norm > 0.0 {
            for v in &mut deconvolved {
                *v /= norm;
            }
        } else {
            tracing::warn!("stimulus deconvolves to silence, leaving result unnormalized");
        }

        self.deconvolved = deconvolved;
        Ok(&self.deconvolved)
    }

    /// Result of the last [`Farina::deconvolve`] call.
    pub fn deconvolved(&self) -> &[f32] {
        &self.deconvolved
    }

    /// Index of the linear impulse response peak in the deconvolved buffer.
    pub fn instant(&self) -> usize {
        argmax_abs(&self.deconvolved).unwrap_or(0)
    }

    /// Deconvolve `response` and wrap it with a time axis that is zero at the peak.
    pub fn deconvolved_response(&mut self, response: &[f32]) -> Result<ImpulseResponse, FftError> {
        self.deconvolve(response)?;
        let peak_at = self.instant();
        Ok(ImpulseResponse::from_real(
            self.deconvolved.clone(),
            peak_at,
            self.sample_rate,
        ))
    }

    /// Hann-windowed segment of `floor(length · fs)` samples centred on sample `at`.
    ///
    /// Samples outside `signal` read as zero.
    pub fn window_at(&self, signal: &[f32], at: isize, length: f32) -> ImpulseResponse {
        let size = (length * self.sample_rate).max(0.0).floor() as usize;
        let taper = Window::Hann.symmetric_coefficients(size);
        let start = at - (size / 2) as isize;

        let segment = taper
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let idx = start + i as isize;
                if idx >= 0 && (idx as usize) < signal.len() {
                    signal[idx as usize] * w
                } else {
                    0.0
                }
            })
            .collect();

        ImpulseResponse::from_real(segment, size / 2, self.sample_rate)
    }

    /// Windows around the fundamental and the first `count` harmonics.
    ///
    /// Element 0 is the linear response, element `k` harmonic `k + 1`. Requires a
    /// prior [`Farina::deconvolve`]; windows wider than
    /// [`Farina::margin_of_harmonic`] overlap their neighbours.
    pub fn harmonics(&self, window_size: f32, count: usize) -> Vec<ImpulseResponse> {
        let instant = self.instant() as isize;
        (1..=count + 1)
            .map(|n| {
                let lag = (self.lag_of_harmonic(n as f32) * self.sample_rate).round() as isize;
                self.window_at(&self.deconvolved, instant - lag, window_size)
            })
            .collect()
    }

    /// Total harmonic distortion per excitation frequency.
    ///
    /// Each harmonic window is transformed and smoothed with a `fraction`-octave
    /// window onto a log grid of `resolution` decades. Harmonic `k` excited at `f`
    /// appears at `k·f`, so its smoothed magnitude is read there; harmonics above
    /// Nyquist count as zero.
    pub fn harmonic_distortion(
        &self,
        window_size: f32,
        count: usize,
        fraction: f32,
        resolution: f32,
    ) -> Result<HarmonicDistortion, AnalysisError> {
        let responses = self
            .harmonics(window_size, count)
            .iter()
            .map(|h| {
                let raw = frequency_response_from_ir(h, HARMONIC_PHASE_REFERENCE_HZ)?;
                Ok(smooth_response(&raw, fraction, resolution)?)
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;

        let Some((fundamental, rest)) = responses.split_first() else {
            return Err(AnalysisError::invalid_parameter(
                "count",
                "no harmonic windows",
            ));
        };

        let nyquist = self.sample_rate / 2.0;
        let harmonics: Vec<Vec<f32>> = rest
            .iter()
            .enumerate()
            .map(|(i, response)| {
                let order = (i + 2) as f32;
                fundamental
                    .frequency
                    .iter()
                    .map(|&f| {
                        let f = f * order;
                        if f < nyquist {
                            interpolate(&response.frequency, &response.magnitude, f)
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect();

        let thd = fundamental
            .magnitude
            .iter()
            .enumerate()
            .map(|(i, &base)| {
                let power: f32 = harmonics.iter().map(|h| h[i] * h[i]).sum();
                if base > 0.0 { power.sqrt() / base } else { 0.0 }
            })
            .collect();

        Ok(HarmonicDistortion {
            frequency: fundamental.frequency.clone(),
            fundamental: fundamental.magnitude.clone(),
            harmonics,
            thd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::chirp;

    fn farina(duration: f32, fs: f32) -> Farina {
        Farina::new(chirp(20.0, 20000.0, duration, 0.0, fs), 20.0, 20000.0, fs).unwrap()
    }

    #[test]
    fn test_lag_of_second_harmonic() {
        let f = farina(5.0, 48000.0);
        assert!((f.duration() - 5.0).abs() < 1e-6);
        let ell = 5.0 / 1000f32.ln();
        assert!((f.lag_of_harmonic(2.0) - ell * 2f32.ln()).abs() < 1e-5);
        assert_eq!(f.lag_of_harmonic(1.0), 0.0);
    }

    #[test]
    fn test_margins_shrink() {
        let f = farina(2.0, 8000.0);
        assert!(f.margin_of_harmonic(1.0) > f.margin_of_harmonic(2.0));
        assert!((f.margin_of_harmonic(1.0) - f.lag_of_harmonic(2.0)).abs() < 1e-6);
    }

    #[test]
    fn test_max_safe_harmonic() {
        let f = farina(5.0, 48000.0);
        // A vanishing window never overlaps, which reads as "all safe".
        assert_eq!(f.max_safe_harmonic(0.0), 0);
        // margin(n) = ℓ·ln(1 + 1/n) exceeds 0.05 s for n = 1..=13.
        assert_eq!(f.max_safe_harmonic(0.05), 13);
        assert_eq!(f.max_safe_harmonic(10.0), 0);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(Farina::new(Vec::new(), 20.0, 20000.0, 48000.0).is_err());
        assert!(Farina::new(vec![0.0; 8], 20.0, 20.0, 48000.0).is_err());
        assert!(Farina::new(vec![0.0; 8], 20.0, 200.0, 0.0).is_err());
    }

    #[test]
    fn test_self_deconvolution_peaks_at_one() {
        let fs = 8000.0;
        let mut f = Farina::new(chirp(50.0, 3000.0, 0.5, 0.0, fs), 50.0, 3000.0, fs).unwrap();
        let stimulus = chirp(50.0, 3000.0, 0.5, 0.0, fs);
        let len = stimulus.len();
        let out = f.deconvolve(&stimulus).unwrap().to_vec();

        assert_eq!(out.len(), len);
        assert!((crate::level::peak(&out) - 1.0).abs() < 1e-5);
        assert!(f.instant().abs_diff(len / 2) <= 2);
    }

    #[test]
    fn test_deconvolve_overwrites() {
        let fs = 8000.0;
        let stimulus = chirp(50.0, 3000.0, 0.25, 0.0, fs);
        let mut f = Farina::new(stimulus.clone(), 50.0, 3000.0, fs).unwrap();
        f.deconvolve(&stimulus).unwrap();
        let half: Vec<f32> = stimulus.iter().map(|&x| 0.5 * x).collect();
        f.deconvolve(&half).unwrap();
        assert_eq!(f.deconvolved().len(), stimulus.len());
        assert!((crate::level::peak(f.deconvolved()) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_window_at_clamps_outside() {
        let f = farina(1.0, 1000.0);
        let signal = vec![1.0; 10];
        let w = f.window_at(&signal, 0, 0.02);
        assert_eq!(w.len(), 20);
        assert_eq!(w.peak_at, 10);
        // The first half falls before the signal start.
        assert!(w.ir[..10].iter().all(|&x| x == 0.0));
        assert!(w.ir[10..].iter().any(|&x| x > 0.0));
    }

    #[test]
    fn test_window_at_tapers_with_hann() {
        let f = farina(1.0, 1000.0);
        let signal = vec![1.0; 100];
        let w = f.window_at(&signal, 50, 0.0215);
        assert_eq!(w.len(), 21);
        assert!(w.ir[0].abs() < 1e-6);
        assert!((w.ir[10] - 1.0).abs() < 1e-6);
        assert_eq!(w.t[10], 0.0);
    }

    #[test]
    fn test_harmonic_window_positions() {
        let fs = 8000.0;
        let stimulus = chirp(50.0, 3000.0, 1.0, 0.0, fs);
        let mut f = Farina::new(stimulus.clone(), 50.0, 3000.0, fs).unwrap();
        f.deconvolve(&stimulus).unwrap();

        let windows = f.harmonics(0.01, 2);
        assert_eq!(windows.len(), 3);
        // Fundamental window is centred on the linear peak.
        let centre = windows[0].peak_at;
        assert!((windows[0].ir[centre].abs() - 1.0).abs() < 1e-3);
        // The stimulus is distortion free, so harmonic windows hold little energy.
        for h in &windows[1..] {
            assert!(crate::level::peak(&h.ir) < 0.1);
        }
    }

    #[test]
    fn test_quadratic_distortion_detected() {
        let fs = 16000.0;
        let stimulus = chirp(50.0, 4000.0, 2.0, 0.0, fs);
        let mut f = Farina::new(stimulus.clone(), 50.0, 4000.0, fs).unwrap();
        let distorted: Vec<f32> = stimulus.iter().map(|&x| x + 0.1 * x * x).collect();
        f.deconvolve(&distorted).unwrap();

        let window = f.margin_of_harmonic(2.0) * 0.9;
        let windows = f.harmonics(window, 2);
        let h2 = crate::level::peak(&windows[1].ir);
        let h3 = crate::level::peak(&windows[2].ir);
        assert!(h2 > 5.0 * h3, "h2 {h2} h3 {h3}");

        let thd = f.harmonic_distortion(window, 2, 1.0 / 3.0, 1.0 / 24.0).unwrap();
        assert_eq!(thd.harmonics.len(), 2);
        assert_eq!(thd.thd.len(), thd.frequency.len());
        assert!(thd.thd.iter().all(|v| v.is_finite() && *v >= 0.0));
    }
}
