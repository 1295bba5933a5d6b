//! Frequency weighting filters, block gating and integrated loudness
//!
//! Weighting filters are IIR filters given as `(b, a)` coefficient tables and run
//! in transposed direct form II. The filter state lives in a caller-owned
//! [`FilterState`] so a long recording can be weighted buffer by buffer.
//!
//! All coefficient tables are designed for 48 kHz.

use crate::level::{db_to_linear, rms};

/// IIR filter coefficients, `a[0]` being the output normalisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// Feedforward coefficients.
    pub b: &'static [f64],
    /// Feedback coefficients.
    pub a: &'static [f64],
}

impl Coefficients {
    /// Filter order.
    pub fn order(&self) -> usize {
        self.b.len().max(self.a.len()).saturating_sub(1)
    }
}

/// A-weighting, 6th order.
pub const A_WEIGHTING: Coefficients = Coefficients {
    b: &[
        0.234301792299513,
        -0.468603584599026,
        -0.234301792299513,
        0.937207169198054,
        -0.234301792299515,
        -0.468603584599025,
        0.234301792299513,
    ],
    a: &[
        1.0,
        -4.113043408775871,
        6.553121752655047,
        -4.990849294163381,
        1.785737302937573,
        -0.246190595319487,
        0.011224250033231,
    ],
};

/// ITU-R BS.1770 stage 1: high-frequency shelf modelling the head.
pub const K_WEIGHTING_PRE: Coefficients = Coefficients {
    b: &[1.53512485958697, -2.69169618940638, 1.19839281085285],
    a: &[1.0, -1.69065929318241, 0.73248077421585],
};

/// ITU-R BS.1770 stage 2: revised low-frequency B-curve high-pass.
pub const K_WEIGHTING_RLB: Coefficients = Coefficients {
    b: &[1.0, -2.0, 1.0],
    a: &[1.0, -1.99004745483398, 0.99007225036621],
};

/// Delay line of a transposed direct-form II filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    z: Vec<f64>,
}

impl FilterState {
    /// Zeroed state sized for `coefficients`.
    pub fn for_coefficients(coefficients: &Coefficients) -> Self {
        Self {
            z: vec![0.0; coefficients.order()],
        }
    }

    /// Clear the delay line.
    pub fn reset(&mut self) {
        self.z.fill(0.0);
    }
}

/// Filter `signal` with `coefficients`, continuing from `state`.
///
/// A state sized for different coefficients is resized and cleared first.
pub fn apply_weighting(
    signal: &[f32],
    coefficients: &Coefficients,
    state: &mut FilterState,
) -> Vec<f32> {
    let order = coefficients.order();
    if state.z.len() != order {
        state.z = vec![0.0; order];
    }

    let a0 = coefficients.a.first().copied().unwrap_or(1.0);
    let norm = if a0 != 0.0 { 1.0 / a0 } else { 1.0 };
    let b = |i: usize| coefficients.b.get(i).copied().unwrap_or(0.0) * norm;
    let a = |i: usize| coefficients.a.get(i).copied().unwrap_or(0.0) * norm;

    let z = &mut state.z;
    signal
        .iter()
        .map(|&x| {
            let x = x as f64;
            let y = b(0) * x + z.first().copied().unwrap_or(0.0);
            for i in 1..=order {
                let next = if i < order { z[i] } else { 0.0 };
                z[i - 1] = b(i) * x + next - a(i) * y;
            }
            y as f32
        })
        .collect()
}

/// Block gate.
///
/// Blocks of `floor(block_ms / 1000 · fs)` samples advance by
/// `floor(block · (1 - overlap))` samples (at least one). Every block whose RMS
/// reaches `threshold_db` is copied into an otherwise silent output; blocks
/// overlapping an open one are not attenuated.
pub fn gate(
    signal: &[f32],
    sample_rate: f32,
    threshold_db: f32,
    block_ms: f32,
    overlap: f32,
) -> Vec<f32> {
    let mut gated = vec![0.0; signal.len()];
    let block = (block_ms as f64 / 1000.0 * sample_rate as f64).floor().max(0.0) as usize;
    if block == 0 {
        return gated;
    }
    let hop = ((block as f64 * (1.0 - overlap as f64)).floor() as usize).max(1);
    let threshold = db_to_linear(threshold_db);

    let mut open = 0usize;
    for start in (0..signal.len()).step_by(hop) {
        let end = (start + block).min(signal.len());
        if rms(&signal[start..end]) >= threshold {
            gated[start..end].copy_from_slice(&signal[start..end]);
            open += 1;
        }
    }
    tracing::trace!(block, hop, open, "gated signal");
    gated
}

/// Offset calibrating K-weighted mean square to LUFS.
const LOUDNESS_OFFSET: f64 = -0.691;
const ABSOLUTE_GATE_LUFS: f64 = -70.0;
const RELATIVE_GATE_LU: f64 = -10.0;
const LOUDNESS_BLOCK_MS: f64 = 400.0;
const LOUDNESS_OVERLAP: f64 = 0.75;

fn block_loudness(energy: f64) -> f64 {
    LOUDNESS_OFFSET + 10.0 * energy.log10()
}

/// ITU-R BS.1770 integrated loudness in LUFS.
///
/// Every channel is K-weighted and cut into 400 ms blocks with 75 % overlap.
/// Block energies are the sum over channels (all weighted 1.0) of the mean
/// square. Blocks below −70 LUFS are discarded, then blocks more than 10 LU
/// below the loudness of the survivors. Returns `-inf` for silence, empty input,
/// or input shorter than one block.
pub fn integrated_loudness(channels: &[&[f32]], sample_rate: f32) -> f32 {
    let len = channels.iter().map(|c| c.len()).min().unwrap_or(0);
    let block = (LOUDNESS_BLOCK_MS / 1000.0 * sample_rate as f64).floor().max(0.0) as usize;
    if channels.is_empty() || block == 0 || len < block {
        return f32::NEG_INFINITY;
    }
    let hop = ((block as f64 * (1.0 - LOUDNESS_OVERLAP)).floor() as usize).max(1);

    let weighted: Vec<Vec<f32>> = channels
        .iter()
        .map(|channel| {
            let mut pre = FilterState::for_coefficients(&K_WEIGHTING_PRE);
            let mut rlb = FilterState::for_coefficients(&K_WEIGHTING_RLB);
            let stage1 = apply_weighting(&channel[..len], &K_WEIGHTING_PRE, &mut pre);
            apply_weighting(&stage1, &K_WEIGHTING_RLB, &mut rlb)
        })
        .collect();

    let energies: Vec<f64> = (0..=len - block)
        .step_by(hop)
        .map(|start| {
            weighted
                .iter()
                .map(|channel| {
                    let sum: f64 = channel[start..start + block]
                        .iter()
                        .map(|&x| x as f64 * x as f64)
                        .sum();
                    sum / block as f64
                })
                .sum()
        })
        .collect();

    let absolute: Vec<f64> = energies
        .into_iter()
        .filter(|&e| e > 0.0 && block_loudness(e) >= ABSOLUTE_GATE_LUFS)
        .collect();
    if absolute.is_empty() {
        return f32::NEG_INFINITY;
    }

    let mean = absolute.iter().sum::<f64>() / absolute.len() as f64;
    let relative_gate = block_loudness(mean) + RELATIVE_GATE_LU;
    let relative: Vec<f64> = absolute
        .into_iter()
        .filter(|&e| block_loudness(e) >= relative_gate)
        .collect();
    if relative.is_empty() {
        return f32::NEG_INFINITY;
    }

    let loudness = block_loudness(relative.iter().sum::<f64>() / relative.len() as f64);
    tracing::debug!(
        channels = channels.len(),
        blocks = relative.len(),
        loudness,
        "integrated loudness"
    );
    loudness as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, amplitude: f32, seconds: f32, fs: f32) -> Vec<f32> {
        (0..(seconds * fs) as usize)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / fs).sin())
            .collect()
    }

    fn gain_db(freq: f32, coefficients: &Coefficients) -> f32 {
        let fs = 48000.0;
        let input = sine(freq, 0.5, 1.0, fs);
        let mut state = FilterState::for_coefficients(coefficients);
        let output = apply_weighting(&input, coefficients, &mut state);
        let half = input.len() / 2;
        crate::level::rms_db(&output[half..]) - crate::level::rms_db(&input[half..])
    }

    #[test]
    fn test_a_weighting_response() {
        assert!(gain_db(1000.0, &A_WEIGHTING).abs() < 0.5);
        let low = gain_db(100.0, &A_WEIGHTING);
        assert!((low + 19.1).abs() < 1.0, "A(100 Hz) = {low}");
    }

    #[test]
    fn test_k_weighting_shelf() {
        // Stage 1 boosts highs by about 4 dB.
        let high = gain_db(10000.0, &K_WEIGHTING_PRE);
        assert!((high - 4.0).abs() < 0.5, "shelf gain {high}");
        // Stage 2 blocks DC.
        let mut state = FilterState::for_coefficients(&K_WEIGHTING_RLB);
        let out = apply_weighting(&vec![1.0; 48000], &K_WEIGHTING_RLB, &mut state);
        assert!(out[47999].abs() < 1e-3);
    }

    #[test]
    fn test_state_carries_across_buffers() {
        let input = sine(440.0, 0.8, 0.1, 48000.0);
        let mut whole = FilterState::for_coefficients(&A_WEIGHTING);
        let expected = apply_weighting(&input, &A_WEIGHTING, &mut whole);

        let mut state = FilterState::for_coefficients(&A_WEIGHTING);
        let (a, b) = input.split_at(1234);
        let mut chunked = apply_weighting(a, &A_WEIGHTING, &mut state);
        chunked.extend(apply_weighting(b, &A_WEIGHTING, &mut state));

        assert_eq!(chunked, expected);
        assert_eq!(state, whole);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut state = FilterState::for_coefficients(&K_WEIGHTING_PRE);
        apply_weighting(&[1.0, -1.0, 0.5], &K_WEIGHTING_PRE, &mut state);
        state.reset();
        assert_eq!(state, FilterState::for_coefficients(&K_WEIGHTING_PRE));
    }

    #[test]
    fn test_gate_drops_quiet_blocks() {
        let fs = 1000.0;
        let mut signal = sine(50.0, 0.5, 1.0, fs);
        signal.extend(vec![1e-6; 1000]);
        let gated = gate(&signal, fs, -40.0, 100.0, 0.5);

        assert_eq!(gated.len(), signal.len());
        assert_eq!(&gated[..1000], &signal[..1000]);
        assert!(gated[1100..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_gate_zero_block() {
        assert_eq!(gate(&[1.0; 10], 1000.0, -20.0, 0.0, 0.75), vec![0.0; 10]);
    }

    #[test]
    fn test_gate_full_overlap_still_advances() {
        let signal = vec![0.5; 100];
        let gated = gate(&signal, 1000.0, -20.0, 10.0, 1.0);
        assert_eq!(gated, signal);
    }

    #[test]
    fn test_loudness_of_full_scale_sine() {
        let fs = 48000.0;
        let tone = sine(1000.0, 1.0, 3.0, fs);
        let lufs = integrated_loudness(&[&tone], fs);
        assert!((lufs + 3.01).abs() < 0.1, "{lufs} LUFS");
    }

    #[test]
    fn test_loudness_sums_channels() {
        let fs = 48000.0;
        let tone = sine(1000.0, 0.5, 2.0, fs);
        let mono = integrated_loudness(&[&tone], fs);
        let stereo = integrated_loudness(&[&tone, &tone], fs);
        assert!((stereo - mono - 3.01).abs() < 0.05);
    }

    #[test]
    fn test_loudness_silence_and_short_input() {
        let fs = 48000.0;
        assert_eq!(integrated_loudness(&[&vec![0.0; 48000]], fs), f32::NEG_INFINITY);
        assert_eq!(integrated_loudness(&[&vec![0.5; 100]], fs), f32::NEG_INFINITY);
        assert_eq!(integrated_loudness(&[], fs), f32::NEG_INFINITY);
    }
}
