//! WAV I/O for earshot measurements.
//!
//! Stimuli are written and recordings read as `f32` samples in `[-1, 1]`:
//!
//! - [`read_wav`] mixes every channel down to one buffer
//! - [`read_wav_channels`] keeps channels apart, for two-channel measurements
//! - [`write_wav`] and [`write_wav_channels`] write 16/24-bit PCM or 32-bit float
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use earshot_io::{WavSpec, read_wav_channels, write_wav};
//!
//! let sweep = vec![0.0f32; 48000];
//! write_wav("sweep.wav", &sweep, WavSpec::default())?;
//!
//! let (channels, spec) = read_wav_channels("recording.wav")?;
//! println!("{} channels at {} Hz", channels.len(), spec.sample_rate);
//! # Ok::<(), earshot_io::Error>(())
//! ```

mod wav;

pub use wav::{
    WavFormat, WavInfo, WavSpec, read_wav, read_wav_channels, read_wav_info, write_wav,
    write_wav_channels,
};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Channel buffers do not agree with the requested layout.
    #[error("Channel layout mismatch: {0}")]
    ChannelMismatch(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
