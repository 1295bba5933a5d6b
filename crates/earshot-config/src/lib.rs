//! Measurement configuration for the earshot acoustic analysis tools.
//!
//! A [`MeasurementConfig`] holds the defaults a measurement session needs:
//! sweep parameters, smoothing, impulse-response analysis, loudness gating
//! and spectrogram framing. It is stored as TOML, every section optional.
//!
//! # Example
//!
//! ```rust,no_run
//! use earshot_config::{MeasurementConfig, paths};
//!
//! let mut config = MeasurementConfig::load(paths::default_config_path())
//!     .unwrap_or_default();
//! config.sweep.duration = 10.0;
//! config.validate().unwrap();
//! config.save("measurement.toml").unwrap();
//! ```

mod error;
mod measurement;

/// Platform-specific paths for configuration files.
pub mod paths;

/// Range checks and value parsing.
pub mod validation;

pub use error::ConfigError;
pub use measurement::{
    AnalysisConfig, DEFAULT_SAMPLE_RATE, IrMethod, LoudnessConfig, MeasurementConfig,
    SmoothingConfig, SpectrogramConfig, SweepConfig, Weighting, WindowKind,
};
pub use paths::{default_config_path, ensure_user_config_dir, find_config, user_config_dir};
pub use validation::{ValidationError, ValidationResult, parse_quantity, validate_config};
