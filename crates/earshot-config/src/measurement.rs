//! Measurement configuration file format.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::validation::{ValidationResult, validate_config};

/// Sample rate used when a configuration does not name one.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Defaults for every stage of a sweep measurement.
///
/// All sections are optional in the file; missing sections and fields take
/// their [`Default`] values.
///
/// # TOML Format
///
/// ```toml
/// [sweep]
/// f_start = 20.0
/// f_stop = 20000.0
/// duration = 5.0
/// fade = 0.01
/// sample_rate = 48000
/// bits_per_sample = 32
/// level_db = -3.0
///
/// [smoothing]
/// fraction = 0.1666667
/// resolution = 0.0104167
///
/// [analysis]
/// method = "farina"
/// fft_size = 65536
/// phase_reference_hz = 1000.0
/// harmonics = 5
///
/// [loudness]
/// weighting = "a"
/// gate_threshold_db = -70.0
/// block_ms = 400.0
/// overlap = 0.75
///
/// [spectrogram]
/// fft_size = 2048
/// hop_size = 512
/// window = "hann"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeasurementConfig {
    /// Stimulus generation.
    pub sweep: SweepConfig,
    /// Fractional-octave smoothing of responses.
    pub smoothing: SmoothingConfig,
    /// Impulse-response and transfer-function analysis.
    pub analysis: AnalysisConfig,
    /// Weighted level and loudness.
    pub loudness: LoudnessConfig,
    /// Short-time Fourier analysis.
    pub spectrogram: SpectrogramConfig,
}

/// `[sweep]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SweepConfig {
    /// Start frequency in Hz.
    pub f_start: f32,
    /// Stop frequency in Hz.
    pub f_stop: f32,
    /// Sweep duration in seconds, fades excluded.
    pub duration: f32,
    /// Fade-in length as a fraction of a second; the fade-out is a tenth of it.
    pub fade: f32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// WAV bit depth for written files (16, 24 or 32).
    pub bits_per_sample: u16,
    /// Peak level of the written stimulus in dBFS.
    pub level_db: f32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            f_start: 20.0,
            f_stop: 20000.0,
            duration: 5.0,
            fade: 0.01,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bits_per_sample: 32,
            level_db: -3.0,
        }
    }
}

/// `[smoothing]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Averaging width in octaves (`1/6` is sixth-octave smoothing).
    pub fraction: f32,
    /// Output grid step in decades (`1/96` gives 96 points per decade).
    pub resolution: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            fraction: 1.0 / 6.0,
            resolution: 1.0 / 96.0,
        }
    }
}

/// How an impulse response is obtained from a recording.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IrMethod {
    /// Exponential-sweep inverse filtering; separates harmonics.
    #[default]
    Farina,
    /// Spectral division of the response by a recorded reference channel.
    TwoChannel,
}

/// `[analysis]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Impulse-response method.
    pub method: IrMethod,
    /// Transform size for two-channel responses and averaged transfer functions.
    pub fft_size: usize,
    /// Frame overlap for averaged transfer functions, in `[0, 1)`.
    pub overlap: f32,
    /// Frequency at which phase and group delay are referenced to zero.
    pub phase_reference_hz: f32,
    /// Number of harmonics above the fundamental for distortion analysis.
    pub harmonics: usize,
    /// Harmonic window length in seconds; derived from the sweep when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harmonic_window: Option<f32>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            method: IrMethod::Farina,
            fft_size: 65536,
            overlap: 0.5,
            phase_reference_hz: 1000.0,
            harmonics: 5,
            harmonic_window: None,
        }
    }
}

/// Frequency weighting applied before level measurement.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// IEC 61672 A-weighting.
    #[default]
    A,
    /// BS.1770 K-weighting.
    K,
    /// No weighting.
    Z,
}

/// `[loudness]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoudnessConfig {
    /// Weighting for the gated RMS level.
    pub weighting: Weighting,
    /// Blocks quieter than this (dBFS RMS) are silenced.
    pub gate_threshold_db: f32,
    /// Gate block length in milliseconds.
    pub block_ms: f32,
    /// Gate block overlap, in `[0, 1)`.
    pub overlap: f32,
}

impl Default for LoudnessConfig {
    fn default() -> Self {
        Self {
            weighting: Weighting::A,
            gate_threshold_db: -70.0,
            block_ms: 400.0,
            overlap: 0.75,
        }
    }
}

/// Analysis window for spectrogram frames.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WindowKind {
    /// No taper.
    Rectangular,
    /// Raised cosine.
    #[default]
    Hann,
    /// Hamming.
    Hamming,
    /// Blackman.
    Blackman,
    /// Four-term Blackman-Harris.
    BlackmanHarris,
}

/// `[spectrogram]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// Frame length (power of two).
    pub fft_size: usize,
    /// Samples between frame starts.
    pub hop_size: usize,
    /// Frame window.
    pub window: WindowKind,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 512,
            window: WindowKind::Hann,
        }
    }
}

impl MeasurementConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check all sections; see [`validate_config`].
    pub fn validate(&self) -> ValidationResult<()> {
        validate_config(self)
    }

    /// Load and validate in one step.
    pub fn load_validated(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Sample rate as the `f32` the analysis functions take.
    pub fn sample_rate(&self) -> f32 {
        self.sweep.sample_rate as f32
    }
}
