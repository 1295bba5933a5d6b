//! Shared CLI helpers used across multiple commands.

use anyhow::{Context, bail};
use clap::ValueEnum;
use earshot_analysis::{Farina, Window};
use earshot_config::{
    ConfigError, IrMethod, MeasurementConfig, Weighting, WindowKind, default_config_path,
    find_config, parse_quantity,
};
use earshot_io::read_wav;
use serde::Serialize;
use std::path::Path;

/// Load the configuration named by `--config`, else the user default file, else built-in defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<MeasurementConfig> {
    let Some(path) = path else {
        let default = default_config_path();
        if !default.is_file() {
            return Ok(MeasurementConfig::default());
        }
        tracing::info!(path = %default.display(), "using default configuration");
        return MeasurementConfig::load_validated(&default)
            .with_context(|| format!("loading {}", default.display()));
    };

    let name = path.to_string_lossy();
    let resolved = find_config(&name).ok_or_else(|| ConfigError::NotFound(name.to_string()))?;
    tracing::info!(path = %resolved.display(), "using configuration");
    MeasurementConfig::load_validated(&resolved)
        .with_context(|| format!("loading {}", resolved.display()))
}

/// clap `value_parser` for numbers written with units or as fractions (`20Hz`, `1/3`).
pub fn quantity(s: &str) -> Result<f32, String> {
    parse_quantity("value", s).map_err(|e| e.to_string())
}

/// Impulse-response method as given on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MethodArg {
    /// Exponential-sweep deconvolution
    Farina,
    /// Division by a recorded reference channel
    TwoChannel,
}

impl From<MethodArg> for IrMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Farina => IrMethod::Farina,
            MethodArg::TwoChannel => IrMethod::TwoChannel,
        }
    }
}

/// Level weighting as given on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum WeightingArg {
    /// A-weighting
    A,
    /// K-weighting
    K,
    /// Unweighted
    Z,
}

impl From<WeightingArg> for Weighting {
    fn from(arg: WeightingArg) -> Self {
        match arg {
            WeightingArg::A => Weighting::A,
            WeightingArg::K => Weighting::K,
            WeightingArg::Z => Weighting::Z,
        }
    }
}

/// Frame window as given on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum WindowArg {
    /// No taper
    Rectangular,
    /// Hann
    Hann,
    /// Hamming
    Hamming,
    /// Blackman
    Blackman,
    /// Blackman-Harris
    BlackmanHarris,
}

impl From<WindowArg> for WindowKind {
    fn from(arg: WindowArg) -> Self {
        match arg {
            WindowArg::Rectangular => WindowKind::Rectangular,
            WindowArg::Hann => WindowKind::Hann,
            WindowArg::Hamming => WindowKind::Hamming,
            WindowArg::Blackman => WindowKind::Blackman,
            WindowArg::BlackmanHarris => WindowKind::BlackmanHarris,
        }
    }
}

/// Analysis window for a configured window kind.
pub fn analysis_window(kind: WindowKind) -> Window {
    match kind {
        WindowKind::Rectangular => Window::Rectangular,
        WindowKind::Hann => Window::Hann,
        WindowKind::Hamming => Window::Hamming,
        WindowKind::Blackman => Window::Blackman,
        WindowKind::BlackmanHarris => Window::BlackmanHarris,
    }
}

/// Read a WAV file as mono; returns the samples and sample rate.
pub fn read_mono(path: &Path) -> anyhow::Result<(Vec<f32>, u32)> {
    let (samples, spec) =
        read_wav(path).with_context(|| format!("reading {}", path.display()))?;
    if samples.is_empty() {
        bail!("{} holds no samples", path.display());
    }
    tracing::info!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate = spec.sample_rate,
        "loaded"
    );
    Ok((samples, spec.sample_rate))
}

/// Read a stimulus/response pair that must share one sample rate.
pub fn read_pair(stimulus: &Path, response: &Path) -> anyhow::Result<(Vec<f32>, Vec<f32>, f32)> {
    let (x, rate_x) = read_mono(stimulus)?;
    let (y, rate_y) = read_mono(response)?;
    if rate_x != rate_y {
        bail!(
            "sample rates differ: {} is {} Hz, {} is {} Hz",
            stimulus.display(),
            rate_x,
            response.display(),
            rate_y
        );
    }
    Ok((x, y, rate_x as f32))
}

/// Window length that keeps harmonic windows `1..=harmonics + 1` apart.
pub fn default_window(farina: &Farina, harmonics: usize) -> f32 {
    0.9 * farina.margin_of_harmonic(harmonics.max(1) as f32)
}

/// Export format picked from the output file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    /// `.json` selects JSON; anything else is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

/// Pretty-printed JSON.
pub fn write_json(path: &Path, value: &impl Serialize) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

/// Column-oriented CSV; rows stop at the shortest column.
pub fn write_csv(path: &Path, headers: &[String], columns: &[Vec<f32>]) -> anyhow::Result<()> {
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = headers.join(",");
    out.push('\n');
    for row in 0..rows {
        let line: Vec<String> = columns.iter().map(|c| c[row].to_string()).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}
