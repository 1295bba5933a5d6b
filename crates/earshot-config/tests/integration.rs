//! Integration tests for earshot-config.
//!
//! File round trips and validation of configurations read from disk.

use earshot_config::{
    ConfigError, IrMethod, MeasurementConfig, ValidationError, Weighting, find_config,
};
use tempfile::TempDir;

#[test]
fn save_and_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.toml");

    let mut config = MeasurementConfig::default();
    config.sweep.duration = 10.0;
    config.sweep.sample_rate = 96000;
    config.sweep.f_stop = 40000.0;
    config.analysis.method = IrMethod::TwoChannel;
    config.loudness.weighting = Weighting::K;
    config.save(&path).unwrap();

    let loaded = MeasurementConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert!(loaded.validate().is_ok());
}

#[test]
fn save_creates_missing_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("config.toml");
    MeasurementConfig::default().save(&path).unwrap();
    assert!(path.is_file());
}

#[test]
fn load_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let err = MeasurementConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn load_validated_rejects_out_of_range_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(
        &path,
        "[sweep]\nsample_rate = 44100\nf_stop = 24000.0\n\n[spectrogram]\nhop_size = 0\n",
    )
    .unwrap();

    // Parses fine, fails the range checks.
    assert!(MeasurementConfig::load(&path).is_ok());
    let err = MeasurementConfig::load_validated(&path).unwrap_err();
    let ConfigError::Validation(ValidationError::Multiple(errors)) = err else {
        panic!("expected multiple validation errors, got {err:?}");
    };
    assert_eq!(errors.len(), 2);
}

#[test]
fn hand_written_file_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("room.toml");
    std::fs::write(
        &path,
        r#"
        # Living room, 1/3-octave view
        [sweep]
        f_start = 30.0
        duration = 3.0

        [smoothing]
        fraction = 0.3333333

        [analysis]
        harmonics = 3
        harmonic_window = 0.04
        "#,
    )
    .unwrap();

    let config = MeasurementConfig::load_validated(&path).unwrap();
    assert_eq!(config.sweep.f_start, 30.0);
    assert_eq!(config.analysis.harmonics, 3);
    assert_eq!(config.analysis.harmonic_window, Some(0.04));
    assert_eq!(config.loudness.gate_threshold_db, -70.0);
}

#[test]
fn find_config_accepts_plain_paths() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lab.toml");
    MeasurementConfig::default().save(&path).unwrap();
    assert_eq!(find_config(path.to_str().unwrap()), Some(path));
}
