//! Window functions for spectral analysis and IR extraction
//!
//! [`Window::apply`] and [`Window::coefficients`] use the periodic form
//! (denominator `N`), which is what frame-wise analysis wants. Windows cut
//! around a single event, such as a harmonic impulse response, use
//! [`Window::symmetric_coefficients`] (denominator `N - 1`) so both ends
//! reach zero.

use std::f32::consts::PI;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// Rectangular (no windowing)
    Rectangular,
    /// Hann window (raised cosine)
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Blackman window
    Blackman,
    /// Blackman-Harris window (better sidelobe suppression)
    BlackmanHarris,
}

impl Window {
    /// Window value at phase `x = 2π·i/denominator`.
    fn value(self, x: f32) -> f32 {
        match self {
            Window::Rectangular => 1.0,
            Window::Hann => 0.5 * (1.0 - x.cos()),
            Window::Hamming => 0.54 - 0.46 * x.cos(),
            Window::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
            Window::BlackmanHarris => {
                0.35875 - 0.48829 * x.cos() + 0.14128 * (2.0 * x).cos()
                    - 0.01168 * (3.0 * x).cos()
            }
        }
    }

    /// Apply the periodic window to a buffer in place
    pub fn apply(&self, buffer: &mut [f32]) {
        if *self == Window::Rectangular {
            return;
        }
        let n = buffer.len() as f32;
        for (i, sample) in buffer.iter_mut().enumerate() {
            *sample *= self.value(2.0 * PI * i as f32 / n);
        }
    }

    /// Get periodic window coefficients
    pub fn coefficients(&self, size: usize) -> Vec<f32> {
        let mut coeffs = vec![1.0; size];
        self.apply(&mut coeffs);
        coeffs
    }

    /// Get symmetric window coefficients (first and last sample mirror each other)
    pub fn symmetric_coefficients(&self, size: usize) -> Vec<f32> {
        match size {
            0 => Vec::new(),
            1 => vec![1.0],
            _ => {
                let denom = (size - 1) as f32;
                (0..size)
                    .map(|i| self.value(2.0 * PI * i as f32 / denom))
                    .collect()
            }
        }
    }

    /// Coherent gain (mean of the periodic coefficients)
    pub fn coherent_gain(&self, size: usize) -> f32 {
        if size == 0 {
            return 0.0;
        }
        self.coefficients(size).iter().sum::<f32>() / size as f32
    }
}

/// Tukey (tapered cosine) window.
///
/// `alpha` is the tapered fraction of the window: 0 gives a rectangular
/// window, 1 a symmetric Hann window. Values outside `[0, 1]` are clamped.
pub fn tukey(length: usize, alpha: f32) -> Vec<f32> {
    let alpha = alpha.clamp(0.0, 1.0);
    if length < 2 || alpha == 0.0 {
        return vec![1.0; length];
    }
    let m = (length - 1) as f32;
    let edge = alpha * m / 2.0;
    (0..length)
        .map(|i| {
            let n = i as f32;
            if n < edge {
                0.5 * (1.0 + (PI * (n / edge - 1.0)).cos())
            } else if n > m - edge {
                0.5 * (1.0 + (PI * ((n - m) / edge + 1.0)).cos())
            } else {
                1.0
            }
        })
        .collect()
}
