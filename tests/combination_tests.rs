// tests/combination_tests.rs
//! Combining stats files computed over disjoint case sets and adjacent bins

use vtool_core::config::{AnalysisConfig, Classification, StatsOptions};
use vtool_core::io::StatsFile;
use vtool_core::processing::{combine_stats_files, compute_stats_array, Statistic, StatsInput};
use vtool_core::{SignalGroup, SignalGroupArray};

fn run(speeds: &[f64], edges: Vec<f64>, prefix: &str, spectral: bool) -> StatsFile {
    let cases: Vec<SignalGroup> = speeds
        .iter()
        .map(|&v| {
            let wave: Vec<f64> = (0..64).map(|i| v + (i as f64 * 0.7).sin()).collect();
            SignalGroup::from_columns(&["speed"], &[wave], &["m/s"]).unwrap()
        })
        .collect();
    let shifted: Vec<SignalGroup> = cases
        .iter()
        .map(|g| {
            let mut g = g.clone();
            g.values.mapv_inplace(|v| v + 0.5);
            g
        })
        .collect();
    let input = StatsInput {
        arrays: vec![
            ("TEST".into(), SignalGroupArray::new(cases).unwrap()),
            ("SIM".into(), SignalGroupArray::new(shifted).unwrap()),
        ],
        times: None,
        fnames: (0..speeds.len()).map(|i| format!("{}_{}", prefix, i)).collect(),
    };
    let options = StatsOptions {
        reference: Some("TEST".into()),
        spectral,
        classification: Some(Classification {
            names: vec!["speed".into()],
            statistic: Statistic::Mean,
            edges1: edges,
            edges2: None,
        }),
        ..Default::default()
    };
    let mut config = AnalysisConfig::default();
    config.spectral.sample_rate_hz = Some(16.0);
    config.spectral.df_hz = 1.0;
    compute_stats_array(&input, &options, &config).unwrap()
}

/// Adjacent bin ranges merge into one edge list with shifted classes
#[test]
fn test_adjacent_ranges_merge() {
    let low = run(&[2.0, 8.0, 3.0], vec![0.0, 5.0, 10.0], "low", false);
    let high = run(&[15.0, 25.0], vec![10.0, 20.0, 30.0], "high", false);
    let combined = combine_stats_files(&[low.clone(), high.clone()]).unwrap();

    assert_eq!(combined.info.edges, vec![0.0, 5.0, 10.0, 20.0, 30.0]);
    assert_eq!(combined.info.iclass, vec![1, 2, 1, 3, 4]);
    assert_eq!(combined.info.n_bins(), 4);
    assert_eq!(combined.info.n_cases(), 5);
    assert_eq!(combined.info.fnames, vec!["low_0", "low_1", "low_2", "high_0", "high_1"]);

    for (c, (l, h)) in combined.stats.iter().zip(low.stats.iter().zip(&high.stats)) {
        assert_eq!(c.name, l.name);
        assert_eq!(c.st_stats.shape(), &[4, 1]);
        assert_eq!(c.st_stats.mean[[3, 0]], h.st_stats.mean[[1, 0]]);
        assert_eq!(c.lt_mean.min[[0, 0]], l.lt_mean.min[[0, 0]]);
        assert_eq!(c.case_err.shape(), &[5, 1]);
    }
}

/// A gap between ranges is kept as an empty bin so edges still bound every bin
#[test]
fn test_gap_between_ranges_is_an_empty_bin() {
    let low = run(&[2.0, 3.0], vec![0.0, 5.0], "low", true);
    let high = run(&[15.0], vec![10.0, 20.0], "high", true);
    let combined = combine_stats_files(&[low, high]).unwrap();

    assert_eq!(combined.info.edges, vec![0.0, 5.0, 10.0, 20.0]);
    assert_eq!(combined.info.n_bins(), 3);
    assert_eq!(combined.info.edges.len(), combined.info.n_bins() + 1);
    assert_eq!(combined.info.iclass, vec![1, 1, 3]);
    assert_eq!(combined.info.bins[1].count, 0);
    assert_eq!(combined.info.bins[1].title, "5 - 10 m/s");

    let psd = combined.stats[0].psd_stats.as_ref().unwrap();
    assert_eq!(psd.shape(), &[9, 1, 3]);
    assert!(psd.mean.iter().skip(1).step_by(3).all(|v| v.is_nan()));
}

/// Combined global statistics: extreme min/max, case-weighted mean, no percentiles
#[test]
fn test_global_statistics_are_recombined() {
    let low = run(&[2.0, 8.0, 3.0], vec![0.0, 5.0, 10.0], "low", false);
    let high = run(&[15.0], vec![10.0, 20.0], "high", false);
    let combined = combine_stats_files(&[low.clone(), high.clone()]).unwrap();

    let (gl, gh, gc) = (
        low.stats[1].global_stats.get([0, 0]),
        high.stats[1].global_stats.get([0, 0]),
        combined.stats[1].global_stats.get([0, 0]),
    );
    assert_eq!(gc.min, gl.min.min(gh.min));
    assert_eq!(gc.max, gl.max.max(gh.max));
    assert!((gc.mean - (3.0 * gl.mean + gh.mean) / 4.0).abs() < 1e-12);
    assert!(gc.p50.is_nan());

    // SIM is TEST + 0.5 everywhere
    let err = combined.stats[1].global_err.get([0, 0]);
    assert!((err.mean - 0.5).abs() < 1e-12);
}

/// Spectral cubes are concatenated along the bin axis
#[test]
fn test_spectral_cubes_concatenate() {
    let low = run(&[2.0, 3.0], vec![0.0, 5.0], "low", true);
    let high = run(&[7.0], vec![5.0, 10.0], "high", true);
    let combined = combine_stats_files(&[low, high.clone()]).unwrap();

    let psd = combined.stats[0].psd_stats.as_ref().unwrap();
    assert_eq!(psd.shape(), &[9, 1, 2]);
    let high_psd = high.stats[0].psd_stats.as_ref().unwrap();
    assert_eq!(psd.max[[3, 0, 1]], high_psd.max[[3, 0, 0]]);
    assert_eq!(combined.info.freq, high.info.freq);
}

/// Files with and without spectra cannot be combined
#[test]
fn test_spectral_presence_must_match() {
    let low = run(&[2.0], vec![0.0, 5.0], "low", true);
    let high = run(&[7.0], vec![5.0, 10.0], "high", false);
    assert!(combine_stats_files(&[low, high]).unwrap_err().is_incompatible());
}

/// The same case in two files is refused
#[test]
fn test_overlapping_file_names() {
    let a = run(&[2.0], vec![0.0, 5.0], "same", false);
    let b = run(&[7.0], vec![5.0, 10.0], "same", false);
    let err = combine_stats_files(&[a, b]).unwrap_err();
    assert!(err.is_incompatible());
}

/// A single file comes back unchanged
#[test]
fn test_single_file_is_identity() {
    let a = run(&[2.0, 3.0], vec![0.0, 5.0], "only", false);
    let combined = combine_stats_files(std::slice::from_ref(&a)).unwrap();
    assert_eq!(
        serde_json::to_value(&combined).unwrap(),
        serde_json::to_value(&a).unwrap()
    );
}
