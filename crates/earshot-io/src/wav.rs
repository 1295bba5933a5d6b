//! WAV file reading and writing.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use std::io::Read;
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = reader.duration() as u64;
    let duration_secs = num_frames as f64 / spec.sample_rate as f64;

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// WAV file specification.
///
/// 32 bits means IEEE float; 16 and 24 bits mean integer PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: u32,
    /// Bit depth per sample (16, 24 or 32).
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
        }
    }
}

impl WavSpec {
    /// Mono float spec at `sample_rate`.
    pub fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Interleaved samples of any supported format, scaled to `[-1, 1]`.
fn read_interleaved<R: Read>(reader: WavReader<R>) -> Result<Vec<f32>> {
    let spec = reader.spec();
    match spec.sample_format {
        SampleFormat::Float => Ok(reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?),
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            Ok(reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?)
        }
    }
}

/// Read a WAV file and return samples as f32 along with the spec.
///
/// Multi-channel files are mixed down to mono by averaging channels.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavSpec)> {
    let (channels, spec) = read_wav_channels(path)?;
    let count = channels.len().max(1) as f32;
    let frames = channels.first().map_or(0, Vec::len);

    let mono = (0..frames)
        .map(|i| channels.iter().map(|c| c[i]).sum::<f32>() / count)
        .collect();
    Ok((mono, spec))
}

/// Read a WAV file into one buffer per channel.
///
/// Two-channel measurements record the response on one channel and the
/// loopback reference on the other; this keeps them apart.
pub fn read_wav_channels<P: AsRef<Path>>(path: P) -> Result<(Vec<Vec<f32>>, WavSpec)> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = WavSpec::from(reader.spec());
    let channels = spec.channels.max(1) as usize;

    let interleaved = read_interleaved(reader)?;
    let frames = interleaved.len() / channels;
    let mut out = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (channel, &sample) in out.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    tracing::debug!(
        path = %path.display(),
        channels,
        frames,
        sample_rate = spec.sample_rate,
        "read wav"
    );
    Ok((out, spec))
}

fn check_bits(bits: u16) -> Result<()> {
    match bits {
        16 | 24 | 32 => Ok(()),
        other => Err(Error::UnsupportedFormat(format!(
            "{other}-bit samples (use 16, 24 or 32)"
        ))),
    }
}

fn write_interleaved(path: &Path, samples: &[f32], spec: WavSpec) -> Result<()> {
    check_bits(spec.bits_per_sample)?;
    let clipped = samples.iter().filter(|s| s.abs() > 1.0).count();
    if clipped > 0 {
        tracing::warn!(clipped, path = %path.display(), "samples outside [-1, 1]");
    }

    let mut writer = WavWriter::create(path, hound::WavSpec::from(spec))?;
    if spec.bits_per_sample == 32 {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
        for &sample in samples {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }

    writer.finalize()?;
    tracing::debug!(path = %path.display(), samples = samples.len(), "wrote wav");
    Ok(())
}

/// Write one contiguous buffer to a WAV file.
///
/// With more than one channel in `spec`, `samples` is taken as interleaved and
/// must hold a whole number of frames. Integer formats clip at full scale.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], spec: WavSpec) -> Result<()> {
    let channels = spec.channels as usize;
    if channels == 0 || samples.len() % channels != 0 {
        return Err(Error::ChannelMismatch(format!(
            "{} samples do not split into {} channels",
            samples.len(),
            spec.channels
        )));
    }
    write_interleaved(path.as_ref(), samples, spec)
}

/// Write one buffer per channel; `spec.channels` is taken from `channels`.
pub fn write_wav_channels<P: AsRef<Path>>(
    path: P,
    channels: &[Vec<f32>],
    spec: WavSpec,
) -> Result<()> {
    let frames = channels.first().map_or(0, Vec::len);
    if channels.is_empty() || channels.iter().any(|c| c.len() != frames) {
        return Err(Error::ChannelMismatch(
            "channel buffers must be non-empty and of equal length".to_string(),
        ));
    }
    let count = u16::try_from(channels.len())
        .map_err(|_| Error::ChannelMismatch(format!("{} channels", channels.len())))?;

    let interleaved: Vec<f32> = (0..frames)
        .flat_map(|i| channels.iter().map(move |c| c[i]))
        .collect();
    write_interleaved(
        path.as_ref(),
        &interleaved,
        WavSpec {
            channels: count,
            ..spec
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_roundtrip_f32() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin()).collect();
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &samples, WavSpec::mono(48000)).unwrap();

        let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
        assert_eq!(loaded_spec.sample_rate, 48000);
        assert_eq!(loaded, samples);
    }

    #[test]
    fn test_roundtrip_i16() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin() * 0.9).collect();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
        };

        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &samples, spec).unwrap();

        let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
        assert_eq!(loaded_spec, spec);
        assert_eq!(loaded.len(), samples.len());

        // 16-bit has less precision
        for (a, b) in samples.iter().zip(loaded.iter()) {
            assert!((a - b).abs() < 0.001);
        }
    }

    #[test]
    fn test_channels_roundtrip() {
        let left: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let right: Vec<f32> = left.iter().map(|v| -v).collect();

        let file = NamedTempFile::new().unwrap();
        write_wav_channels(file.path(), &[left.clone(), right.clone()], WavSpec::mono(48000))
            .unwrap();

        let (channels, spec) = read_wav_channels(file.path()).unwrap();
        assert_eq!(spec.channels, 2);
        assert_eq!(channels, vec![left, right]);

        // The mono mixdown of opposite channels is silent.
        let (mono, _) = read_wav(file.path()).unwrap();
        assert!(mono.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_integer_clips_at_full_scale() {
        let spec = WavSpec {
            bits_per_sample: 16,
            ..WavSpec::default()
        };
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &[2.0, -2.0], spec).unwrap();
        let (loaded, _) = read_wav(file.path()).unwrap();
        assert!((loaded[0] - 32767.0 / 32768.0).abs() < 1e-6);
        assert_eq!(loaded[1], -1.0);
    }

    #[test]
    fn test_rejects_bad_layouts() {
        let file = NamedTempFile::new().unwrap();
        let stereo = WavSpec {
            channels: 2,
            ..WavSpec::default()
        };
        assert!(matches!(
            write_wav(file.path(), &[0.0; 3], stereo),
            Err(Error::ChannelMismatch(_))
        ));
        assert!(matches!(
            write_wav_channels(file.path(), &[vec![0.0; 3], vec![0.0; 2]], stereo),
            Err(Error::ChannelMismatch(_))
        ));
        let eight_bit = WavSpec {
            bits_per_sample: 8,
            ..WavSpec::default()
        };
        assert!(matches!(
            write_wav(file.path(), &[0.0], eight_bit),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
