//! Criterion benchmarks for earshot-analysis components
//!
//! Run with: cargo bench -p earshot-analysis

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use earshot_analysis::smoothing::{fractional_octave_smoothing, generate_frequencies};
use earshot_analysis::{ConvolveMode, Farina, Fft, chirp, convolve, correlate, estimate_ir};
use num_complex::Complex;

const SAMPLE_RATE: f32 = 48000.0;

/// Generate white noise
fn generate_noise(size: usize) -> Vec<f32> {
    let mut state = 0x12345678u32;
    (0..size)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as i32 as f32) / (i32::MAX as f32)
        })
        .collect()
}

// ============================================================================
// FFT benchmarks
// ============================================================================

fn bench_fft_real(c: &mut Criterion) {
    let mut group = c.benchmark_group("FFT_Real");

    for size in [256, 1024, 4096, 16384, 65536] {
        let fft = Fft::new(size).unwrap();
        let signal = generate_noise(size);
        let mut out = fft.create_complex_array();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| fft.real_transform(&mut out, black_box(&signal)))
        });
    }

    group.finish();
}

fn bench_fft_complex(c: &mut Criterion) {
    let mut group = c.benchmark_group("FFT_Complex");

    for size in [256, 1024, 4096, 16384, 65536] {
        let fft = Fft::new(size).unwrap();
        let input: Vec<Complex<f32>> = generate_noise(size)
            .into_iter()
            .map(|re| Complex::new(re, 0.0))
            .collect();
        let mut out = fft.create_complex_array();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| fft.transform(&mut out, black_box(&input)))
        });
    }

    group.finish();
}

fn bench_fft_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("FFT_Roundtrip");

    for size in [1024, 8192] {
        let fft = Fft::new(size).unwrap();
        let signal = generate_noise(size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let spectrum = fft.forward(black_box(&signal));
                fft.inverse(&spectrum)
            })
        });
    }

    group.finish();
}

// ============================================================================
// Correlation, convolution and deconvolution
// ============================================================================

fn bench_correlate(c: &mut Criterion) {
    let mut group = c.benchmark_group("Correlate");

    for size in [4800, 48000] {
        let x = generate_noise(size);
        let mut y = vec![0.0; 100];
        y.extend_from_slice(&x);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| correlate(black_box(&x), black_box(&y)))
        });
    }

    group.finish();
}

fn bench_convolve_same(c: &mut Criterion) {
    let x = generate_noise(48000);
    let h = generate_noise(4096);

    c.bench_function("Convolve_Same_48000x4096", |b| {
        b.iter(|| convolve(black_box(&x), black_box(&h), ConvolveMode::Same))
    });
}

fn bench_two_channel_ir(c: &mut Criterion) {
    let reference = generate_noise(16384);
    let response: Vec<f32> = reference.iter().map(|v| 0.5 * v).collect();

    c.bench_function("Estimate_IR_16384", |b| {
        b.iter(|| estimate_ir(black_box(&response), black_box(&reference), SAMPLE_RATE))
    });
}

fn bench_farina_deconvolve(c: &mut Criterion) {
    let stimulus = chirp(20.0, 20000.0, 1.0, 0.0, SAMPLE_RATE);
    let mut farina = Farina::new(stimulus.clone(), 20.0, 20000.0, SAMPLE_RATE).unwrap();

    c.bench_function("Farina_Deconvolve_1s", |b| {
        b.iter(|| farina.deconvolve(black_box(&stimulus)).map(|d| d.len()))
    });
}

// ============================================================================
// Smoothing
// ============================================================================

fn bench_smoothing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Smoothing");
    let data = generate_noise(32768);
    let grid = generate_frequencies(1.0 / 96.0, 20.0, 24000.0, 65536, SAMPLE_RATE).unwrap();

    for (name, fraction) in [("1/3", 1.0 / 3.0), ("1/6", 1.0 / 6.0), ("1/24", 1.0 / 24.0)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &fraction, |b, &fraction| {
            b.iter(|| fractional_octave_smoothing(black_box(&data), fraction, &grid, SAMPLE_RATE))
        });
    }

    group.finish();
}

criterion_group!(fft_benches, bench_fft_real, bench_fft_complex, bench_fft_roundtrip);

criterion_group!(
    deconvolution_benches,
    bench_correlate,
    bench_convolve_same,
    bench_two_channel_ir,
    bench_farina_deconvolve,
);

criterion_group!(smoothing_benches, bench_smoothing);

criterion_main!(fft_benches, deconvolution_benches, smoothing_benches);
