//! Fixed-size FFT engine
//!
//! A mixed radix-2/radix-4 decimation-in-time transform for power-of-two
//! sizes. Construction precomputes a twiddle table and a base-4
//! digit-reversal table; both are immutable afterwards, so one [`Fft`] can be
//! shared across threads and cloned cheaply.
//!
//! The first pass reads the input in digit-reversed order into base blocks of
//! length 2 or 4. Every later pass combines four blocks with a radix-4
//! butterfly. The real-input path computes each butterfly only up to the block
//! midpoint and fills the mirrored outputs by conjugation, so only bins
//! `0..=size/2` are produced.
//!
//! # Example
//!
//! ```rust
//! use earshot_analysis::Fft;
//!
//! let fft = Fft::new(8).unwrap();
//! let mut input = vec![0.0f32; 8];
//! input[0] = 1.0;
//!
//! let mut spectrum = fft.create_complex_array();
//! fft.real_transform(&mut spectrum, &input).unwrap();
//! fft.complete_spectrum(&mut spectrum);
//! assert!(spectrum.iter().all(|c| (c.norm() - 1.0).abs() < 1e-6));
//! ```

use crate::error::FftError;
use num_complex::Complex;
use std::f64::consts::PI;
use std::sync::Arc;

/// FFT engine for one transform size
#[derive(Debug, Clone)]
pub struct Fft {
    size: usize,
    /// Length of the first-pass blocks (2 or 4).
    base_len: usize,
    /// `(cos(2πi/N), -sin(2πi/N))` for `i in 0..N`.
    twiddles: Arc<[Complex<f32>]>,
    /// Base-4 digit reversal of each base block index.
    bitrev: Arc<[usize]>,
}

impl Fft {
    /// Create an engine for `size`-point transforms.
    ///
    /// `size` must be a power of two greater than 1.
    pub fn new(size: usize) -> Result<Self, FftError> {
        if size <= 1 || !size.is_power_of_two() {
            return Err(FftError::InvalidSize(size));
        }

        let power = size.trailing_zeros();
        let width = 2 * ((power - 1) / 2);
        let digits = width / 2;

        let twiddles: Arc<[Complex<f32>]> = (0..size)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / size as f64;
                Complex::new(angle.cos() as f32, -angle.sin() as f32)
            })
            .collect();

        let bitrev: Arc<[usize]> = (0..1usize << width)
            .map(|block| {
                let mut rev = 0;
                let mut rest = block;
                for _ in 0..digits {
                    rev = (rev << 2) | (rest & 3);
                    rest >>= 2;
                }
                rev
            })
            .collect();

        tracing::debug!(size, width, base_len = size >> width, "fft engine constructed");

        Ok(Self {
            size,
            base_len: size >> width,
            twiddles,
            bitrev,
        })
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Allocate a zeroed complex buffer of the engine size
    pub fn create_complex_array(&self) -> Vec<Complex<f32>> {
        vec![Complex::new(0.0, 0.0); self.size]
    }

    /// Copy real samples into a complex buffer of the engine size.
    ///
    /// Input shorter than the engine size is zero-padded, longer input is
    /// truncated.
    pub fn to_complex_array(&self, real: &[f32]) -> Vec<Complex<f32>> {
        let mut buffer = self.create_complex_array();
        for (dst, &x) in buffer.iter_mut().zip(real) {
            dst.re = x;
        }
        buffer
    }

    /// Real parts of a complex buffer
    pub fn from_complex_array(&self, complex: &[Complex<f32>]) -> Vec<f32> {
        complex.iter().map(|c| c.re).collect()
    }

    fn check_len(&self, actual: usize) -> Result<(), FftError> {
        if actual == self.size {
            Ok(())
        } else {
            Err(FftError::BufferLength {
                expected: self.size,
                actual,
            })
        }
    }

    /// Forward complex transform of `input` into `out`.
    pub fn transform(
        &self,
        out: &mut [Complex<f32>],
        input: &[Complex<f32>],
    ) -> Result<(), FftError> {
        self.check_len(out.len())?;
        self.check_len(input.len())?;
        self.process(out, input, false);
        Ok(())
    }

    /// Inverse complex transform of `input` into `out`, scaled by `1/size`.
    pub fn inverse_transform(
        &self,
        out: &mut [Complex<f32>],
        input: &[Complex<f32>],
    ) -> Result<(), FftError> {
        self.check_len(out.len())?;
        self.check_len(input.len())?;
        self.process(out, input, true);
        let scale = 1.0 / self.size as f32;
        for c in out.iter_mut() {
            *c *= scale;
        }
        Ok(())
    }

    /// Forward transform of real input.
    ///
    /// Writes bins `0..=size/2` into `out`; the remaining bins are left
    /// unspecified. Call [`Fft::complete_spectrum`] to fill them.
    pub fn real_transform(&self, out: &mut [Complex<f32>], input: &[f32]) -> Result<(), FftError> {
        self.check_len(out.len())?;
        self.check_len(input.len())?;
        self.process_real(out, input);
        Ok(())
    }

    /// Fill bins above Nyquist from the lower half using `X[N-k] = conj(X[k])`.
    pub fn complete_spectrum(&self, spectrum: &mut [Complex<f32>]) {
        let n = spectrum.len();
        for k in 1..n / 2 {
            spectrum[n - k] = spectrum[k].conj();
        }
    }

    /// In-place forward transform of a complex buffer
    pub fn forward_complex(&self, buffer: &mut [Complex<f32>]) -> Result<(), FftError> {
        let input = buffer.to_vec();
        self.transform(buffer, &input)
    }

    /// In-place inverse transform of a complex buffer (scaled by `1/size`)
    pub fn inverse_complex(&self, buffer: &mut [Complex<f32>]) -> Result<(), FftError> {
        let input = buffer.to_vec();
        self.inverse_transform(buffer, &input)
    }

    /// Perform forward FFT on real input
    ///
    /// Input is zero-padded or truncated to the engine size. Returns the
    /// `size/2 + 1` bins from DC to Nyquist.
    pub fn forward(&self, input: &[f32]) -> Vec<Complex<f32>> {
        let mut frame = vec![0.0; self.size];
        let n = input.len().min(self.size);
        frame[..n].copy_from_slice(&input[..n]);

        let mut spectrum = self.create_complex_array();
        self.process_real(&mut spectrum, &frame);
        spectrum.truncate(self.size / 2 + 1);
        spectrum
    }

    /// Full conjugate-symmetric spectrum of a zero-padded real signal
    pub fn full_spectrum(&self, input: &[f32]) -> Vec<Complex<f32>> {
        let mut spectrum = self.forward(input);
        spectrum.resize(self.size, Complex::new(0.0, 0.0));
        self.complete_spectrum(&mut spectrum);
        spectrum
    }

    /// Perform inverse FFT
    ///
    /// Takes the `size/2 + 1` positive-frequency bins and returns the real
    /// signal. Missing bins are treated as zero.
    pub fn inverse(&self, spectrum: &[Complex<f32>]) -> Vec<f32> {
        let mut full = self.create_complex_array();
        let n = spectrum.len().min(self.size / 2 + 1);
        full[..n].copy_from_slice(&spectrum[..n]);
        self.complete_spectrum(&mut full);

        let mut out = self.create_complex_array();
        self.process(&mut out, &full, true);
        let scale = 1.0 / self.size as f32;
        out.iter().map(|c| c.re * scale).collect()
    }

    /// Twiddles `W^k`, `W^2k`, `W^3k` for `W = e^{-2πi·step/N}`.
    #[inline]
    fn twiddle_triplet(&self, index: usize, inverse: bool) -> [Complex<f32>; 3] {
        let w = [
            self.twiddles[index],
            self.twiddles[2 * index],
            self.twiddles[3 * index],
        ];
        if inverse { w.map(|c| c.conj()) } else { w }
    }

    fn process(&self, out: &mut [Complex<f32>], input: &[Complex<f32>], inverse: bool) {
        let stride = self.bitrev.len();

        if self.base_len == 2 {
            for (t, &off) in self.bitrev.iter().enumerate() {
                let a = input[off];
                let b = input[off + stride];
                out[2 * t] = a + b;
                out[2 * t + 1] = a - b;
            }
        } else {
            for (t, &off) in self.bitrev.iter().enumerate() {
                let x = butterfly4(
                    input[off],
                    input[off + stride],
                    input[off + 2 * stride],
                    input[off + 3 * stride],
                    inverse,
                );
                out[4 * t..4 * t + 4].copy_from_slice(&x);
            }
        }

        let mut len = self.base_len * 4;
        while len <= self.size {
            let quarter = len / 4;
            let step = self.size / len;
            for block in out.chunks_exact_mut(len) {
                for k in 0..quarter {
                    let [w1, w2, w3] = self.twiddle_triplet(k * step, inverse);
                    let x = butterfly4(
                        block[k],
                        block[k + quarter] * w1,
                        block[k + 2 * quarter] * w2,
                        block[k + 3 * quarter] * w3,
                        inverse,
                    );
                    block[k] = x[0];
                    block[k + quarter] = x[1];
                    block[k + 2 * quarter] = x[2];
                    block[k + 3 * quarter] = x[3];
                }
            }
            len *= 4;
        }
    }

    fn process_real(&self, out: &mut [Complex<f32>], input: &[f32]) {
        let stride = self.bitrev.len();

        if self.base_len == 2 {
            for (t, &off) in self.bitrev.iter().enumerate() {
                let a = input[off];
                let b = input[off + stride];
                out[2 * t] = Complex::new(a + b, 0.0);
                out[2 * t + 1] = Complex::new(a - b, 0.0);
            }
        } else {
            for (t, &off) in self.bitrev.iter().enumerate() {
                let a = input[off];
                let b = input[off + stride];
                let c = input[off + 2 * stride];
                let d = input[off + 3 * stride];
                let (t0, t1, t2, t3) = (a + c, a - c, b + d, b - d);
                out[4 * t] = Complex::new(t0 + t2, 0.0);
                out[4 * t + 1] = Complex::new(t1, -t3);
                out[4 * t + 2] = Complex::new(t0 - t2, 0.0);
                out[4 * t + 3] = Complex::new(t1, t3);
            }
        }

        // Each sub-block only holds valid bins up to its own midpoint, which
        // is all a butterfly at k <= quarter/2 reads.
        let mut len = self.base_len * 4;
        while len <= self.size {
            let quarter = len / 4;
            let half_quarter = quarter / 2;
            let step = self.size / len;
            for block in out.chunks_exact_mut(len) {
                for k in 0..=half_quarter {
                    let [w1, w2, w3] = self.twiddle_triplet(k * step, false);
                    let x = butterfly4(
                        block[k],
                        block[k + quarter] * w1,
                        block[k + 2 * quarter] * w2,
                        block[k + 3 * quarter] * w3,
                        false,
                    );
                    block[k] = x[0];
                    block[k + quarter] = x[1];
                    if k == 0 {
                        block[2 * quarter] = x[2];
                    } else if k < half_quarter {
                        block[quarter - k] = x[3].conj();
                        block[2 * quarter - k] = x[2].conj();
                    }
                }
            }
            len *= 4;
        }
    }
}

/// Radix-4 butterfly on pre-twiddled inputs.
#[inline]
fn butterfly4(
    a: Complex<f32>,
    b: Complex<f32>,
    c: Complex<f32>,
    d: Complex<f32>,
    inverse: bool,
) -> [Complex<f32>; 4] {
    let t0 = a + c;
    let t1 = a - c;
    let t2 = b + d;
    let t3 = b - d;
    // -j·t3 forward, +j·t3 inverse
    let rot = if inverse {
        Complex::new(-t3.im, t3.re)
    } else {
        Complex::new(t3.im, -t3.re)
    };
    [t0 + t2, t1 + rot, t0 - t2, t1 - rot]
}

/// Flatten complex values into an interleaved `[re, im, re, im, ...]` buffer
pub fn to_interleaved(complex: &[Complex<f32>]) -> Vec<f32> {
    complex.iter().flat_map(|c| [c.re, c.im]).collect()
}

/// Build complex values from an interleaved `[re, im, ...]` buffer.
///
/// A trailing unpaired value is ignored.
pub fn from_interleaved(interleaved: &[f32]) -> Vec<Complex<f32>> {
    interleaved
        .chunks_exact(2)
        .map(|pair| Complex::new(pair[0], pair[1]))
        .collect()
}

/// Convert magnitude spectrum to dB
pub fn magnitude_db(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum
        .iter()
        .map(|c| 20.0 * c.norm().max(1e-10).log10())
        .collect()
}

/// Get phase spectrum in radians
pub fn phase_rad(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum.iter().map(|c| c.arg()).collect()
}
