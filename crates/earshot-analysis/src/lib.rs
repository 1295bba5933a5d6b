//! Earshot Analysis - acoustic measurement DSP
//!
//! Everything an acoustic measurement needs between a recorded buffer and a
//! plotted curve:
//!
//! - [`fft`] - Fixed-size radix-2/4 FFT engine
//! - [`window`] - Window functions and Tukey tapers
//! - [`xcorr`] - FFT cross-correlation, delay estimation and linear convolution
//! - [`ir`] - Two-channel impulse response estimation and decay metrics
//! - [`sweep`] - Exponential sine sweep generation
//! - [`farina`] - Sweep deconvolution, harmonic separation and THD
//! - [`spectrum`] - Single-sided spectra and the [`FrequencyResponse`] type
//! - [`smoothing`] - Fractional-octave smoothing on log-spaced grids
//! - [`transfer_fn`] - Transfer functions, group delay and phase unwrapping
//! - [`level`] - RMS, peak, dB conversion and normalization
//! - [`weighting`] - A/K weighting filters, block gating and integrated loudness
//! - [`spectrogram`] - Cancellable STFT analysis
//!
//! Every function that needs a time or frequency axis takes the sample rate
//! explicitly.
//!
//! ## Sweep measurement
//!
//! ```rust
//! use earshot_analysis::{Farina, chirp};
//!
//! let fs = 8000.0;
//! let stimulus = chirp(50.0, 3000.0, 0.5, 0.0, fs);
//! let mut farina = Farina::new(stimulus.clone(), 50.0, 3000.0, fs).unwrap();
//!
//! // Play `stimulus`, record the device under test; here it is a wire.
//! let ir = farina.deconvolved_response(&stimulus).unwrap();
//! assert_eq!(ir.peak_at, farina.instant());
//! ```
//!
//! ## Delay between two channels
//!
//! ```rust
//! use earshot_analysis::correlate;
//!
//! let result = correlate(&[1.0, 0.0, 0.0, 0.0], &[0.0, 0.0, 1.0, 0.0]).unwrap();
//! assert_eq!(result.estimated_lag_samples, 2);
//! ```

pub mod error;
pub mod farina;
pub mod fft;
pub mod ir;
pub mod level;
pub mod math;
pub mod smoothing;
pub mod spectrogram;
pub mod spectrum;
pub mod sweep;
pub mod transfer_fn;
pub mod weighting;
pub mod window;
pub mod xcorr;

pub use error::{AnalysisError, FftError, SmoothingError};
pub use farina::{Farina, HarmonicDistortion};
pub use fft::Fft;
pub use ir::{ImpulseResponse, Rt60Estimate, estimate_ir, estimate_rt60};
pub use level::{NormalizeMode, db, db_to_linear, linear_to_db, normalize, rms};
pub use smoothing::{fractional_octave_smoothing, generate_frequencies, smooth_response};
pub use spectrogram::{CancellationToken, Spectrogram, StftAnalyzer};
pub use spectrum::{FrequencyResponse, compute_spectrum};
pub use sweep::{SineSweep, chirp};
pub use transfer_fn::{
    TransferFunction, frequency_response_from_ir, group_delay, two_channel_response,
};
pub use weighting::{
    A_WEIGHTING, Coefficients, FilterState, K_WEIGHTING_PRE, K_WEIGHTING_RLB, apply_weighting,
    gate, integrated_loudness,
};
pub use window::Window;
pub use xcorr::{ConvolveMode, CorrelationResult, convolve, correlate};
