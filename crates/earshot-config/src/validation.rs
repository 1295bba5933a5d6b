//! Range checks for measurement configurations and parsing of unit-suffixed values.
//!
//! # Example
//!
//! ```rust
//! use earshot_config::{MeasurementConfig, parse_quantity};
//!
//! let mut config = MeasurementConfig::default();
//! config.smoothing.fraction = parse_quantity("smoothing.fraction", "1/3").unwrap();
//! assert!(config.validate().is_ok());
//!
//! config.sweep.f_stop = 30000.0;
//! assert!(config.validate().is_err());
//! ```

use crate::measurement::MeasurementConfig;
use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Value outside its allowed interval.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted field name, e.g. `sweep.f_stop`.
        field: String,
        /// The offending value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Value that breaks a structural rule (ordering, power of two, ...).
    #[error("'{field}' {reason}")]
    InvalidValue {
        /// Dotted field name.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Collects every problem in one pass so a bad file reports all of them.
#[derive(Default)]
struct Checker {
    errors: Vec<ValidationError>,
}

impl Checker {
    fn range(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if value.is_nan() || value < min || value > max {
            self.errors.push(ValidationError::OutOfRange {
                field: field.to_string(),
                value,
                min,
                max,
            });
        }
    }

    fn positive(&mut self, field: &str, value: f64) {
        if value.is_nan() || value <= 0.0 {
            self.invalid(field, "must be positive");
        }
    }

    fn power_of_two(&mut self, field: &str, value: usize) {
        if value < 2 || !value.is_power_of_two() {
            self.invalid(field, format!("must be a power of two > 1, got {value}"));
        }
    }

    fn invalid(&mut self, field: &str, reason: impl Into<String>) {
        self.errors.push(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        });
    }

    fn finish(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }
}

/// Check every section of a configuration.
///
/// # Errors
///
/// A single [`ValidationError`] when one field is wrong, otherwise
/// [`ValidationError::Multiple`] listing all of them.
pub fn validate_config(config: &MeasurementConfig) -> ValidationResult<()> {
    let mut check = Checker::default();

    let sweep = &config.sweep;
    let nyquist = f64::from(sweep.sample_rate) / 2.0;
    if sweep.sample_rate == 0 {
        check.invalid("sweep.sample_rate", "must be positive");
    }
    check.positive("sweep.f_start", f64::from(sweep.f_start));
    if sweep.f_start >= sweep.f_stop {
        check.invalid(
            "sweep.f_stop",
            format!("must be above f_start ({} Hz)", sweep.f_start),
        );
    }
    if sweep.sample_rate > 0 {
        check.range("sweep.f_stop", f64::from(sweep.f_stop), 0.0, nyquist);
    }
    check.positive("sweep.duration", f64::from(sweep.duration));
    check.range("sweep.fade", f64::from(sweep.fade), 0.0, 0.5);
    check.range("sweep.level_db", f64::from(sweep.level_db), -120.0, 0.0);
    if !matches!(sweep.bits_per_sample, 16 | 24 | 32) {
        check.invalid(
            "sweep.bits_per_sample",
            format!("must be 16, 24 or 32, got {}", sweep.bits_per_sample),
        );
    }

    check.positive("smoothing.fraction", f64::from(config.smoothing.fraction));
    check.positive("smoothing.resolution", f64::from(config.smoothing.resolution));

    let analysis = &config.analysis;
    check.power_of_two("analysis.fft_size", analysis.fft_size);
    check.range("analysis.overlap", f64::from(analysis.overlap), 0.0, 0.95);
    check.positive(
        "analysis.phase_reference_hz",
        f64::from(analysis.phase_reference_hz),
    );
    if sweep.sample_rate > 0 {
        check.range(
            "analysis.phase_reference_hz",
            f64::from(analysis.phase_reference_hz),
            0.0,
            nyquist,
        );
    }
    if analysis.harmonics == 0 {
        check.invalid("analysis.harmonics", "must be at least 1");
    }
    if let Some(window) = analysis.harmonic_window {
        check.positive("analysis.harmonic_window", f64::from(window));
    }

    let loudness = &config.loudness;
    check.range(
        "loudness.gate_threshold_db",
        f64::from(loudness.gate_threshold_db),
        -200.0,
        0.0,
    );
    check.positive("loudness.block_ms", f64::from(loudness.block_ms));
    check.range("loudness.overlap", f64::from(loudness.overlap), 0.0, 0.95);

    let spectrogram = &config.spectrogram;
    check.power_of_two("spectrogram.fft_size", spectrogram.fft_size);
    if spectrogram.hop_size == 0 || spectrogram.hop_size > spectrogram.fft_size {
        check.invalid(
            "spectrogram.hop_size",
            format!("must be in 1..={}", spectrogram.fft_size),
        );
    }

    check.finish()
}

/// Parse a number that may carry a unit suffix or be written as a fraction.
///
/// Accepts plain numbers (`"0.5"`, `"-70"`), fractions (`"1/6"`), and the
/// suffixes `dB`, `Hz`, `kHz`, `ms` and `s`. Units are stripped, not
/// converted, except `kHz` which scales by 1000.
pub fn parse_quantity(field: &str, text: &str) -> ValidationResult<f32> {
    let s = text.trim();
    let bad = |v: &str| ValidationError::InvalidValue {
        field: field.to_string(),
        reason: format!("cannot parse '{v}' as a number"),
    };
    let number = |v: &str| v.trim().parse::<f32>().map_err(|_| bad(v));

    if let Some((num, den)) = s.split_once('/') {
        let den = number(den)?;
        if den == 0.0 {
            return Err(bad(s));
        }
        return Ok(number(num)? / den);
    }
    if let Some(v) = s.strip_suffix("kHz").or_else(|| s.strip_suffix("khz")) {
        return Ok(number(v)? * 1000.0);
    }
    let stripped = ["dB", "db", "Hz", "hz", "ms", "s"]
        .iter()
        .find_map(|unit| s.strip_suffix(unit))
        .unwrap_or(s);
    number(stripped)
}
