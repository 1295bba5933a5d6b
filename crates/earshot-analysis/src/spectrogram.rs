//! STFT-based spectrogram generation
//!
//! Frames are windowed and transformed independently with one shared [`Fft`].
//! Long runs can be stopped between frames through a [`CancellationToken`].

use crate::error::AnalysisError;
use crate::fft::Fft;
use crate::window::Window;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag that stops frame-wise analysis when set.
pub type CancellationToken = Arc<AtomicBool>;

/// Spectrogram data structure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrogram {
    /// Amplitude data `[time_frame][frequency_bin]`; a sine of amplitude `A` reads `A`.
    pub frames: Vec<Vec<f32>>,
    /// Bin frequencies in Hz, `fft_size / 2 + 1` entries.
    pub frequencies: Vec<f32>,
    /// Frame start times in seconds.
    pub times: Vec<f32>,
    /// FFT size used
    pub fft_size: usize,
    /// Hop size between frames
    pub hop_size: usize,
    /// Sample rate
    pub sample_rate: f32,
}

impl Spectrogram {
    /// Number of time frames
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of frequency bins
    pub fn num_bins(&self) -> usize {
        self.frequencies.len()
    }

    /// Get magnitude at specific time and frequency
    ///
    /// Returns None if out of bounds
    pub fn get(&self, frame: usize, bin: usize) -> Option<f32> {
        self.frames.get(frame).and_then(|f| f.get(bin)).copied()
    }

    /// Get magnitude in dB at specific time and frequency
    pub fn get_db(&self, frame: usize, bin: usize) -> Option<f32> {
        self.get(frame, bin).map(crate::level::db)
    }

    /// Find peak frequency at a given time frame
    pub fn peak_frequency(&self, frame: usize) -> Option<f32> {
        let spectrum = self.frames.get(frame)?;
        let peak = crate::math::argmax_abs(spectrum)?;
        self.frequencies.get(peak).copied()
    }

    /// Compute spectral centroid for each frame
    pub fn spectral_centroid(&self) -> Vec<f32> {
        self.frames
            .iter()
            .map(|frame| {
                let (weighted, total) = frame
                    .iter()
                    .zip(&self.frequencies)
                    .fold((0.0f64, 0.0f64), |(w, t), (&m, &f)| {
                        (w + f as f64 * m as f64, t + m as f64)
                    });
                if total > 1e-10 {
                    (weighted / total) as f32
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Copy with every value converted to dB
    pub fn to_db(&self) -> Spectrogram {
        Spectrogram {
            frames: self
                .frames
                .iter()
                .map(|frame| frame.iter().map(|&m| crate::level::db(m)).collect())
                .collect(),
            ..self.clone()
        }
    }
}

/// STFT (Short-Time Fourier Transform) analyzer
#[derive(Debug, Clone)]
pub struct StftAnalyzer {
    hop_size: usize,
    window: Window,
    sample_rate: f32,
    fft: Fft,
    window_coeffs: Vec<f32>,
    scale: f32,
}

impl StftAnalyzer {
    /// Create a new STFT analyzer
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `fft_size` - FFT size, a power of two
    /// * `hop_size` - Hop size between frames (typically fft_size / 4)
    /// * `window` - Window function to use
    pub fn new(
        sample_rate: f32,
        fft_size: usize,
        hop_size: usize,
        window: Window,
    ) -> Result<Self, AnalysisError> {
        let fft = Fft::new(fft_size)?;
        if hop_size == 0 {
            return Err(AnalysisError::invalid_parameter(
                "hop_size",
                "must be at least 1",
            ));
        }
        if sample_rate <= 0.0 {
            return Err(AnalysisError::invalid_parameter(
                "sample_rate",
                "must be positive",
            ));
        }
        let window_coeffs = window.coefficients(fft_size);
        let scale = 2.0 / window_coeffs.iter().sum::<f32>().max(f32::MIN_POSITIVE);

        Ok(Self {
            hop_size,
            window,
            sample_rate,
            fft,
            window_coeffs,
            scale,
        })
    }

    /// Create analyzer with default settings (50% overlap, Hann window)
    pub fn default_for_sample_rate(sample_rate: f32, fft_size: usize) -> Result<Self, AnalysisError> {
        Self::new(sample_rate, fft_size, fft_size / 2, Window::Hann)
    }

    /// Number of complete frames in a signal of `len` samples.
    pub fn num_frames(&self, len: usize) -> usize {
        let size = self.fft_size();
        if len >= size {
            (len - size) / self.hop_size + 1
        } else {
            0
        }
    }

    /// Compute spectrogram from audio signal
    pub fn analyze(
        &self,
        signal: &[f32],
        cancel: &CancellationToken,
    ) -> Result<Spectrogram, AnalysisError> {
        self.analyze_with_progress(signal, cancel, |_, _| {})
    }

    /// Like [`StftAnalyzer::analyze`], calling `progress(done, total)` after every frame.
    pub fn analyze_with_progress(
        &self,
        signal: &[f32],
        cancel: &CancellationToken,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<Spectrogram, AnalysisError> {
        let size = self.fft_size();
        let num_frames = self.num_frames(signal.len());
        let mut frames = Vec::with_capacity(num_frames);
        let mut frame = vec![0.0f32; size];

        for index in 0..num_frames {
            if cancel.load(Ordering::Relaxed) {
                tracing::info!(done = index, total = num_frames, "spectrogram cancelled");
                return Err(AnalysisError::Cancelled);
            }

            let start = index * self.hop_size;
            for ((dst, &src), &w) in frame
                .iter_mut()
                .zip(&signal[start..start + size])
                .zip(&self.window_coeffs)
            {
                *dst = src * w;
            }

            let spectrum = self.fft.forward(&frame);
            frames.push(spectrum.iter().map(|c| c.norm() * self.scale).collect());
            progress(index + 1, num_frames);
        }

        tracing::debug!(frames = num_frames, fft_size = size, hop = self.hop_size, "spectrogram");

        let resolution = self.frequency_resolution();
        Ok(Spectrogram {
            frames,
            frequencies: (0..=size / 2).map(|k| k as f32 * resolution).collect(),
            times: (0..num_frames)
                .map(|i| i as f32 * self.time_resolution())
                .collect(),
            fft_size: size,
            hop_size: self.hop_size,
            sample_rate: self.sample_rate,
        })
    }

    /// Get FFT size
    pub fn fft_size(&self) -> usize {
        self.fft.size()
    }

    /// Get hop size
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Get frequency resolution (Hz per bin)
    pub fn frequency_resolution(&self) -> f32 {
        self.sample_rate / self.fft_size() as f32
    }

    /// Get time resolution (seconds per frame)
    pub fn time_resolution(&self) -> f32 {
        self.hop_size as f32 / self.sample_rate
    }

    /// Get the window function used
    pub fn window(&self) -> Window {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn generate_sine(sample_rate: f32, freq: f32, duration_secs: f32) -> Vec<f32> {
        let num_samples = (duration_secs * sample_rate) as usize;
        (0..num_samples)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    fn token() -> CancellationToken {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn test_spectrogram_dimensions() {
        let sample_rate = 44100.0;
        let signal = generate_sine(sample_rate, 440.0, 1.0);

        let analyzer = StftAnalyzer::new(sample_rate, 1024, 512, Window::Hann).unwrap();
        let spectrogram = analyzer.analyze(&signal, &token()).unwrap();

        assert_eq!(spectrogram.num_bins(), 513);
        assert_eq!(spectrogram.num_frames(), (44100 - 1024) / 512 + 1);
        assert_eq!(spectrogram.times.len(), spectrogram.num_frames());
        assert_eq!(spectrogram.frames[0].len(), spectrogram.num_bins());
    }

    #[test]
    fn test_spectrogram_peak_detection() {
        let sample_rate = 44100.0;
        let freq = 1000.0;
        let signal = generate_sine(sample_rate, freq, 0.5);

        let analyzer = StftAnalyzer::new(sample_rate, 2048, 1024, Window::Hann).unwrap();
        let spectrogram = analyzer.analyze(&signal, &token()).unwrap();

        for frame in 0..spectrogram.num_frames() {
            let peak_freq = spectrogram.peak_frequency(frame).unwrap();
            assert!(
                (peak_freq - freq).abs() < 50.0,
                "Peak {} Hz should be near {} Hz",
                peak_freq,
                freq
            );
        }
    }

    #[test]
    fn test_amplitude_scaling() {
        let sample_rate = 48000.0;
        let fft_size = 1024;
        // Bin-centred tone, so there is no scalloping loss.
        let freq = 32.0 * sample_rate / fft_size as f32;
        let signal: Vec<f32> = generate_sine(sample_rate, freq, 0.1)
            .iter()
            .map(|x| 0.5 * x)
            .collect();

        let analyzer = StftAnalyzer::new(sample_rate, fft_size, 256, Window::Hann).unwrap();
        let spectrogram = analyzer.analyze(&signal, &token()).unwrap();
        let peak = spectrogram.get(0, 32).unwrap();
        assert!((peak - 0.5).abs() < 0.01, "peak {peak}");
    }

    #[test]
    fn test_time_frequency_axes() {
        let sample_rate = 48000.0;
        let analyzer = StftAnalyzer::new(sample_rate, 1024, 256, Window::Hann).unwrap();
        let spectrogram = analyzer.analyze(&vec![0.0; 4096], &token()).unwrap();

        assert_eq!(spectrogram.frequencies[0], 0.0);
        assert!((spectrogram.frequencies[512] - 24000.0).abs() < 1e-2);
        assert_eq!(spectrogram.times[0], 0.0);
        assert!((spectrogram.times[1] - 256.0 / 48000.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_signal_has_no_frames() {
        let analyzer = StftAnalyzer::new(48000.0, 1024, 256, Window::Hann).unwrap();
        let spectrogram = analyzer.analyze(&[0.5; 100], &token()).unwrap();
        assert_eq!(spectrogram.num_frames(), 0);
        assert_eq!(spectrogram.num_bins(), 513);
    }

    #[test]
    fn test_cancelled_before_start() {
        let analyzer = StftAnalyzer::new(48000.0, 256, 128, Window::Hann).unwrap();
        let cancel = token();
        cancel.store(true, Ordering::Relaxed);
        let result = analyzer.analyze(&vec![0.0; 4096], &cancel);
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }

    #[test]
    fn test_cancel_midway_from_progress() {
        let analyzer = StftAnalyzer::new(48000.0, 256, 128, Window::Hann).unwrap();
        let cancel = token();
        let mut seen = 0;
        let result = analyzer.analyze_with_progress(&vec![0.0; 4096], &cancel, |done, _| {
            seen = done;
            if done == 3 {
                cancel.store(true, Ordering::Relaxed);
            }
        });
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(StftAnalyzer::new(48000.0, 1000, 256, Window::Hann).is_err());
        assert!(StftAnalyzer::new(48000.0, 1024, 0, Window::Hann).is_err());
        assert!(StftAnalyzer::new(0.0, 1024, 256, Window::Hann).is_err());
    }

    #[test]
    fn test_spectrogram_to_db() {
        let sample_rate = 44100.0;
        let signal = generate_sine(sample_rate, 440.0, 0.5);

        let analyzer = StftAnalyzer::default_for_sample_rate(sample_rate, 1024).unwrap();
        let spectrogram_db = analyzer.analyze(&signal, &token()).unwrap().to_db();

        assert!(spectrogram_db.frames[0].iter().any(|&v| v < 0.0));
        assert!(spectrogram_db.frames[0].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_spectral_centroid() {
        let sample_rate = 44100.0;
        let freq = 1000.0;
        let signal = generate_sine(sample_rate, freq, 0.5);

        let analyzer = StftAnalyzer::new(sample_rate, 2048, 1024, Window::Hann).unwrap();
        let centroids = analyzer.analyze(&signal, &token()).unwrap().spectral_centroid();

        for centroid in centroids {
            assert!(
                (centroid - freq).abs() < 100.0,
                "Centroid {} should be near {} Hz",
                centroid,
                freq
            );
        }
    }
}
