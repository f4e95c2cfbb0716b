// tests/persistence_tests.rs
//! On-disk formats and configuration files
//!
//! Collected signals and stats results go through JSON files in a temporary
//! directory; configuration goes through TOML and environment overrides.

use serial_test::serial;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};
use vtool_core::config::{ConfigLoader, VtoolConfig};
use vtool_core::io::{
    load_collected_signals, load_stats_file, save_collected_signals, save_stats_file, CollectedSignals, TimeSource,
};
use vtool_core::processing::{combine_stats_files, compute_stats_array, StatsInput};
use vtool_core::validation::is_signal_group_value;
use vtool_core::{SignalGroup, SignalGroupArray, VtoolError};

const COLLECTED_JSON: &str = r#"{
  "SIGNALS": [
    {
      "Names": ["speed", "load"],
      "ShortNames": ["v", "F"],
      "Values": [[1.0, 10.0], [null, 12.0], [3.0, 14.0]],
      "Units": ["m/s", "N"],
      "Descriptions": ["vehicle speed", ""]
    },
    {
      "Names": ["speed", "load"],
      "ShortNames": ["v", "F"],
      "Values": [[4.0, 20.0], [5.0, 22.0], [6.0, 24.0]],
      "Units": ["m/s", "N"],
      "Descriptions": ["vehicle speed", ""]
    }
  ],
  "Time": {
    "Names": ["Time"],
    "ShortNames": ["Time"],
    "Values": [[0.0], [0.5], [1.0]],
    "Units": ["s"],
    "Descriptions": [""]
  },
  "fnames": ["r1.csv", "r2.csv"]
}"#;

fn isolated_loader(paths: Vec<std::path::PathBuf>, tag: &str) -> ConfigLoader {
    ConfigLoader::with_paths(paths).with_env_prefix(&format!("VTOOL_ITEST_{}", tag))
}

fn sine_cases(n_cases: usize, offset: f64) -> CollectedSignals {
    let groups = (0..n_cases)
        .map(|c| {
            let x: Vec<f64> = (0..128).map(|i| offset + c as f64 + (i as f64 * 0.9).sin()).collect();
            SignalGroup::from_columns(&["x"], &[x], &["g"]).unwrap()
        })
        .collect();
    let mut collected = CollectedSignals::new(SignalGroupArray::new(groups).unwrap());
    collected.fnames = (0..n_cases).map(|c| format!("off{}_{}", offset, c)).collect();
    collected.times = Some(TimeSource::Shared(SignalGroup::time((0..128).map(|i| i as f64 / 32.0).collect())));
    collected
}

// ============================================================================
// Collected signals
// ============================================================================

/// A hand-written file with two name layers, null samples and a shared time
#[test]
fn test_load_hand_written_collection() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(COLLECTED_JSON.as_bytes()).unwrap();

    let collected = load_collected_signals(file.path()).unwrap();
    assert_eq!(collected.len(), 2);
    assert_eq!(collected.fnames, vec!["r1.csv", "r2.csv"]);
    assert!(collected.signals[0].values[[1, 0]].is_nan());
    assert_eq!(collected.signals[0].layer_names(), vec!["Names", "ShortNames"]);
    assert_eq!(collected.signals[0].find("F"), vec![1]);
    assert_eq!(collected.case_time(1), Some(vec![0.0, 0.5, 1.0]));
}

/// Raw JSON values are checked before any typed conversion
#[test]
fn test_raw_value_checks() {
    let value: serde_json::Value = serde_json::from_str(COLLECTED_JSON).unwrap();
    assert!(is_signal_group_value(&value["SIGNALS"][0]).is_valid);
    assert!(is_signal_group_value(&value["Time"]).is_valid);

    let mut broken = value["SIGNALS"][0].clone();
    broken["Units"] = serde_json::json!(["m/s"]);
    let validity = is_signal_group_value(&broken);
    assert!(validity.is_type);
    assert!(!validity.is_valid);
    assert!(validity.reason.contains("Units"));
}

/// Time groups that do not line up with the cases are refused on load
#[test]
fn test_misaligned_time_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    let mut collected = sine_cases(2, 0.0);
    collected.times = Some(TimeSource::Shared(SignalGroup::time(vec![0.0, 1.0])));
    save_collected_signals(&path, &collected).unwrap();

    let err = load_collected_signals(&path).unwrap_err();
    assert!(err.is_incompatible());
}

/// Garbage input surfaces as a serialization error
#[test]
fn test_unreadable_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    assert!(matches!(load_collected_signals(file.path()), Err(VtoolError::Serialization(_))));
}

// ============================================================================
// Stats files
// ============================================================================

/// Compute, write, read back and combine two stats files
#[test]
fn test_stats_pipeline_through_files() {
    let dir = tempdir().unwrap();
    let config = VtoolConfig::default();
    let mut analysis = config.analysis.clone();
    analysis.spectral.df_hz = 1.0;

    let mut stats_paths = Vec::new();
    for (k, offset) in [0.0, 100.0].into_iter().enumerate() {
        let collected_path = dir.path().join(format!("collected_{}.json", k));
        save_collected_signals(&collected_path, &sine_cases(3, offset)).unwrap();
        let collected = load_collected_signals(&collected_path).unwrap();

        let input = StatsInput::from_collected("TEST", collected);
        let result = compute_stats_array(&input, &config.stats, &analysis).unwrap();
        let stats_path = dir.path().join(format!("stats_{}.json", k));
        save_stats_file(&stats_path, &result).unwrap();
        stats_paths.push(stats_path);
    }

    let loaded: Vec<_> = stats_paths.iter().map(|p| load_stats_file(p).unwrap()).collect();
    let first = &loaded[0];
    assert_eq!(first.info.freq.as_ref().map(Vec::len), Some(17));
    assert!(first.info.bins[0].center.is_nan());
    // the reference against itself has zero error power, which has no dB value
    let err_psd = first.stats[0].err_psd_stats.as_ref().unwrap();
    assert!(err_psd.mean.iter().all(|v| v.is_nan()));
    assert!(first.stats[0].psd_stats.as_ref().unwrap().mean.iter().any(|v| v.is_finite()));

    let combined = combine_stats_files(&loaded).unwrap();
    assert_eq!(combined.info.n_cases(), 6);
    assert_eq!(combined.info.iclass, vec![1, 1, 1, 2, 2, 2]);
    let g = combined.stats[0].global_stats.get([0, 0]);
    assert!(g.max > 100.0 && g.min < 1.0);

    let combined_path = dir.path().join("combined.json");
    save_stats_file(&combined_path, &combined).unwrap();
    let back = load_stats_file(&combined_path).unwrap();
    assert_eq!(back.info.fnames, combined.info.fnames);
    assert_eq!(back.stats[0].case_stats.shape(), &[6, 1]);
}

/// A stats file edited to disagree with its own signal count cannot be combined
#[test]
fn test_reshaped_stats_file_is_refused() {
    let dir = tempdir().unwrap();
    let config = VtoolConfig::default();
    let mut analysis = config.analysis.clone();
    analysis.spectral.df_hz = 1.0;

    let mut loaded = Vec::new();
    for (k, offset) in [0.0, 100.0].into_iter().enumerate() {
        let input = StatsInput::from_collected("TEST", sine_cases(2, offset));
        let result = compute_stats_array(&input, &config.stats, &analysis).unwrap();
        let path = dir.path().join(format!("stats_{}.json", k));
        save_stats_file(&path, &result).unwrap();

        if k == 1 {
            let mut raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
            raw["Stats"][0]["GlobalStats"]["min"] = serde_json::json!({ "shape": [1, 3], "data": [0.0, 0.0, 0.0] });
            std::fs::write(&path, raw.to_string()).unwrap();
        }
        loaded.push(load_stats_file(&path).unwrap());
    }

    let err = combine_stats_files(&loaded).unwrap_err();
    assert!(err.is_incompatible());
    assert!(err.to_string().contains("GlobalStats"));
}

/// Cases that disagree on units are refused when read back
#[test]
fn test_inhomogeneous_collection_is_refused() {
    let mut value: serde_json::Value = serde_json::from_str(COLLECTED_JSON).unwrap();
    value["SIGNALS"][1]["Units"] = serde_json::json!(["km/h", "N"]);
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(value.to_string().as_bytes()).unwrap();
    assert!(matches!(load_collected_signals(file.path()), Err(VtoolError::Serialization(_))));
}

// ============================================================================
// Configuration
// ============================================================================

/// Stats options read from TOML drive the computation
#[test]
#[serial]
fn test_config_file_drives_stats() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[analysis]
parallel = false

[stats]
spectral = false
selections = ["x"]

[stats.filter]
name = "x"
ranges = [[-5.0, 5.0]]

[stats.classification]
names = ["x"]
statistic = "mean"
edges1 = [0.0, 1.0, 2.0, 3.0]
"#
    )
    .unwrap();

    let config = isolated_loader(vec![file.path().to_path_buf()], "STATS").load().unwrap();
    assert!(!config.analysis.parallel);

    let mut collected = sine_cases(3, 0.5);
    let shifted = sine_cases(1, 50.0);
    let mut groups = collected.signals.into_vec();
    groups.extend(shifted.signals.into_vec());
    collected.signals = SignalGroupArray::new(groups).unwrap();
    collected.fnames.push("far".into());

    let out = compute_stats_array(&StatsInput::from_collected("TEST", collected), &config.stats, &config.analysis).unwrap();
    assert_eq!(out.info.n_cases(), 3);
    assert!(!out.info.fnames.contains(&"far".to_string()));
    assert_eq!(out.info.class_names, vec!["x"]);
    assert!(out.stats[0].psd_stats.is_none());
}

/// An environment override beats the file
#[test]
#[serial]
fn test_environment_beats_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[analysis.spectral]\ndf_hz = 0.5").unwrap();
    std::env::set_var("VTOOL_ITEST_ENV__ANALYSIS__SPECTRAL__DF_HZ", "0.25");

    let config = isolated_loader(vec![file.path().to_path_buf()], "ENV").load().unwrap();
    assert_eq!(config.analysis.spectral.df_hz, 0.25);

    std::env::remove_var("VTOOL_ITEST_ENV__ANALYSIS__SPECTRAL__DF_HZ");
}
