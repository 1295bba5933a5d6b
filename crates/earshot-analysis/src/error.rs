//! Error types for analysis operations.

use thiserror::Error;

/// Errors raised by the FFT engine.
///
/// These are construction and contract errors: the transform that raised
/// one must not be used for the call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FftError {
    /// Transform size is not a power of two greater than one.
    #[error("FFT size must be a power of two greater than 1, got {0}")]
    InvalidSize(usize),

    /// A buffer passed to a transform does not match the engine size.
    #[error("buffer length {actual} does not match FFT size {expected}")]
    BufferLength {
        /// Length the engine requires.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },
}

/// Errors raised when building a fractional-octave frequency grid.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SmoothingError {
    /// Octave fraction must be strictly positive.
    #[error("octave fraction must be greater than 0, got {0}")]
    InvalidFraction(f32),

    /// Band edges must be strictly positive.
    #[error("frequencies must be greater than 0 (f_low = {f_low}, f_high = {f_high})")]
    InvalidFrequency {
        /// Lower band edge in Hz.
        f_low: f32,
        /// Upper band edge in Hz.
        f_high: f32,
    },

    /// Lower band edge is not below the upper one.
    #[error("f_low ({f_low}) must be less than f_high ({f_high})")]
    InvalidRange {
        /// Lower band edge in Hz.
        f_low: f32,
        /// Upper band edge in Hz.
        f_high: f32,
    },
}

/// Crate-level error for higher-level analysis routines.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// FFT engine error.
    #[error(transparent)]
    Fft(#[from] FftError),

    /// Frequency grid error.
    #[error(transparent)]
    Smoothing(#[from] SmoothingError),

    /// The input signal is too short for the requested operation.
    #[error("signal of {len} samples is too short (need at least {required})")]
    SignalTooShort {
        /// Supplied length in samples.
        len: usize,
        /// Minimum length in samples.
        required: usize,
    },

    /// An invalid parameter value.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The operation was cancelled through its [`crate::CancellationToken`].
    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_size_display_names_the_size() {
        let err = FftError::InvalidSize(6);
        assert!(err.to_string().contains('6'));
    }

    #[test]
    fn fft_error_converts_into_analysis_error() {
        let err: AnalysisError = FftError::InvalidSize(3).into();
        assert!(matches!(err, AnalysisError::Fft(FftError::InvalidSize(3))));
    }

    #[test]
    fn invalid_parameter_factory_produces_correct_variant() {
        let err = AnalysisError::invalid_parameter("hop_size", "must be positive");
        assert!(matches!(
            err,
            AnalysisError::InvalidParameter { name: "hop_size", .. }
        ));
        assert!(err.to_string().contains("hop_size"));
    }
}
