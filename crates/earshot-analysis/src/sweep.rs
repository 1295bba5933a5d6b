//! Exponential sine sweep stimulus
//!
//! The instantaneous frequency of an exponential sweep rises from `f_start` to
//! `f_stop` as `f(t) = f_start · e^{t/L}`, where `L = duration / ln(f_stop/f_start)`
//! is the sweep rate. Each harmonic of a nonlinear system's response then appears
//! as a time-shifted copy after deconvolution, see [`crate::farina`].

use crate::error::AnalysisError;
use crate::xcorr::{ConvolveMode, convolve};
use std::f64::consts::PI;

/// Exponential sine sweep generator for IR capture
///
/// Uses the Farina method for deconvolution-based impulse response measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineSweep {
    sample_rate: f32,
    start_freq: f32,
    end_freq: f32,
    duration_secs: f32,
    fade: f32,
}

impl SineSweep {
    /// Create a new sine sweep generator
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `start_freq` - Start frequency in Hz
    /// * `end_freq` - End frequency in Hz
    /// * `duration_secs` - Sweep duration in seconds
    pub fn new(
        sample_rate: f32,
        start_freq: f32,
        end_freq: f32,
        duration_secs: f32,
    ) -> Result<Self, AnalysisError> {
        if sample_rate <= 0.0 {
            return Err(AnalysisError::invalid_parameter(
                "sample_rate",
                "must be positive",
            ));
        }
        if start_freq <= 0.0 || end_freq <= start_freq {
            return Err(AnalysisError::invalid_parameter(
                "frequency",
                format!("need 0 < start ({start_freq}) < end ({end_freq})"),
            ));
        }
        if duration_secs <= 0.0 {
            return Err(AnalysisError::invalid_parameter(
                "duration",
                "must be positive",
            ));
        }
        Ok(Self {
            sample_rate,
            start_freq,
            end_freq,
            duration_secs,
            fade: 0.0,
        })
    }

    /// Add a linear fade-in of `fade` seconds and a fade-out of `fade / 10` seconds.
    pub fn with_fade(mut self, fade: f32) -> Self {
        self.fade = fade.max(0.0);
        self
    }

    /// Generate the exponential sine sweep, including fades
    pub fn generate(&self) -> Vec<f32> {
        chirp(
            self.start_freq,
            self.end_freq,
            self.duration_secs,
            self.fade,
            self.sample_rate,
        )
    }

    /// Generate the inverse filter for deconvolution
    ///
    /// The time-reversed sweep with a decaying envelope that compensates the
    /// sweep's pink energy distribution.
    pub fn inverse_filter(&self) -> Vec<f32> {
        let rate = self.rate();
        self.generate()
            .into_iter()
            .rev()
            .enumerate()
            .map(|(i, sample)| {
                let t = i as f32 / self.sample_rate;
                sample * (-t / rate).exp()
            })
            .collect()
    }

    /// Compute impulse response from recorded sweep response
    ///
    /// Full linear convolution of `response` with [`SineSweep::inverse_filter`]. The
    /// linear IR sits near sample `num_samples()`; harmonic IRs precede it.
    pub fn compute_ir(&self, response: &[f32]) -> Result<Vec<f32>, AnalysisError> {
        let inverse = self.inverse_filter();
        Ok(convolve(response, &inverse, ConvolveMode::Full)?)
    }

    /// Sweep rate `L = duration / ln(end/start)` in seconds
    pub fn rate(&self) -> f32 {
        self.duration_secs / (self.end_freq / self.start_freq).ln()
    }

    /// Get sweep duration in seconds (excluding fades)
    pub fn duration(&self) -> f32 {
        self.duration_secs
    }

    /// Start frequency in Hz
    pub fn start_freq(&self) -> f32 {
        self.start_freq
    }

    /// Stop frequency in Hz
    pub fn end_freq(&self) -> f32 {
        self.end_freq
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Get number of samples, including fades
    pub fn num_samples(&self) -> usize {
        let (fade_in, fade_out) = fade_lengths(self.fade, self.sample_rate);
        sweep_samples(self.duration_secs, self.sample_rate) + fade_in + fade_out
    }
}

fn sweep_samples(duration: f32, sample_rate: f32) -> usize {
    ((duration as f64 * sample_rate as f64).round() as usize).max(1)
}

fn fade_lengths(fade: f32, sample_rate: f32) -> (usize, usize) {
    let fade = fade.max(0.0) as f64;
    let fs = sample_rate as f64;
    ((fade * fs).floor() as usize, (fade / 10.0 * fs).floor() as usize)
}

/// Exponential sweep with linear fades.
///
/// The sweep proper lasts `duration` seconds. It is preceded by a constant
/// `f_start` tone of `fade · fs` samples that ramps in linearly and followed by a
/// constant `f_stop` tone of `fade / 10 · fs` samples that ramps out linearly.
/// Phase is continuous across all three segments.
pub fn chirp(f_start: f32, f_stop: f32, duration: f32, fade: f32, sample_rate: f32) -> Vec<f32> {
    let fs = sample_rate as f64;
    let f_start = f_start as f64;
    let f_stop = f_stop as f64;
    let rate = duration as f64 / (f_stop / f_start).ln();

    let count = sweep_samples(duration, sample_rate);
    let (fade_in, fade_out) = fade_lengths(fade, sample_rate);
    let total = fade_in + count + fade_out;

    // Phase in cycles.
    let mut phi = Vec::with_capacity(total);
    phi.extend((0..fade_in).map(|i| f_start * i as f64 / fs));
    let offset = f_start * (fade_in + 1) as f64 / fs;
    phi.extend((0..count).map(|i| {
        let t = i as f64 / fs;
        rate * f_start * ((t / rate).exp() - 1.0) + offset
    }));
    let last = phi.last().copied().unwrap_or(0.0);
    phi.extend((0..fade_out).map(|i| last + f_stop * (i + 1) as f64 / fs));

    tracing::debug!(
        samples = total,
        fade_in,
        fade_out,
        rate,
        "generated exponential sweep"
    );

    phi.iter()
        .enumerate()
        .map(|(i, &p)| {
            let mut gain = 1.0;
            if i < fade_in {
                gain = i as f64 / fade_in as f64;
            }
            if fade_out > 0 && i >= total - fade_out {
                let k = i - (total - fade_out);
                gain *= 1.0 - k as f64 / fade_out as f64;
            }
            ((2.0 * PI * p).sin() * gain) as f32
        })
        .collect()
}
