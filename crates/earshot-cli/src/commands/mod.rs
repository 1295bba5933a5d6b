//! CLI command implementations.

pub mod common;
pub mod correlate;
pub mod distortion;
pub mod ir;
pub mod loudness;
pub mod response;
pub mod spectrogram;
pub mod sweep;
