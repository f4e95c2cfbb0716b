// tests/aggregation_tests.rs
//! Binned statistics over case arrays
//!
//! Checks the consistency between the long-time, short-time, per-case and global
//! reductions, and the spectral path end to end.

use proptest::prelude::*;
use vtool_core::config::{AnalysisConfig, Classification, SpectralConfig, StatsOptions, WindowType};
use vtool_core::io::{StatsFile, TimeSource};
use vtool_core::processing::{compute_stats_array, SpectralEstimator, Statistic, StatsInput};
use vtool_core::{SignalGroup, SignalGroupArray};

fn array_from(cases: &[Vec<f64>]) -> SignalGroupArray {
    let groups = cases
        .iter()
        .map(|c| {
            let doubled: Vec<f64> = c.iter().map(|v| 2.0 * v).collect();
            SignalGroup::from_columns(&["x", "y"], &[c.clone(), doubled], &["m", "m"]).unwrap()
        })
        .collect();
    SignalGroupArray::new(groups).unwrap()
}

fn single_input(cases: &[Vec<f64>]) -> StatsInput {
    StatsInput {
        arrays: vec![("REF".into(), array_from(cases))],
        times: None,
        fnames: (0..cases.len()).map(|i| format!("run{}", i)).collect(),
    }
}

fn no_spectra() -> StatsOptions {
    StatsOptions { spectral: false, ..Default::default() }
}

fn as_json(file: &StatsFile) -> String {
    serde_json::to_string(file).unwrap()
}

/// An all-NaN signal yields a full-length all-NaN spectrum
#[test]
fn test_all_nan_signal_spectrum_has_expected_length() {
    let config = SpectralConfig { df_hz: 0.25, ..Default::default() };
    let est = SpectralEstimator::new(&config, 20.0).unwrap();
    let pair = est.spect_signals(&vec![f64::NAN; 200], &vec![f64::NAN; 200]);

    assert_eq!(est.nfft(), 80);
    assert_eq!(pair.pxx.len(), 41);
    assert_eq!(pair.pxx.len(), est.frequencies().len());
    assert!(pair.pxx.iter().all(|v| v.is_nan()));
    assert!(pair.coherence.iter().all(|v| v.is_nan()));
}

/// Parallel and sequential evaluation give identical results
#[test]
fn test_parallel_matches_sequential() {
    let cases: Vec<Vec<f64>> = (0..12).map(|c| (0..64).map(|i| ((c * 64 + i) as f64 * 0.37).sin()).collect()).collect();
    let mut input = single_input(&cases);
    input.times = Some(TimeSource::Shared(SignalGroup::time((0..64).map(|i| i as f64 / 16.0).collect())));
    let options = StatsOptions {
        classification: Some(Classification {
            names: vec!["x".into()],
            statistic: Statistic::Mean,
            edges1: vec![-1.0, 0.0, 1.0],
            edges2: None,
        }),
        ..Default::default()
    };
    let mut config = AnalysisConfig::default();
    config.spectral.df_hz = 1.0;

    config.parallel = true;
    let parallel = compute_stats_array(&input, &options, &config).unwrap();
    config.parallel = false;
    let sequential = compute_stats_array(&input, &options, &config).unwrap();

    assert_eq!(as_json(&parallel), as_json(&sequential));
}

/// The sample rate comes from the time vector when not configured
#[test]
fn test_sample_rate_from_time_vector() {
    let cases: Vec<Vec<f64>> = (0..3).map(|c| (0..96).map(|i| (i as f64 * 0.5 + c as f64).cos()).collect()).collect();
    let mut input = single_input(&cases);
    input.times = Some(TimeSource::Shared(SignalGroup::time((0..96).map(|i| i as f64 / 32.0).collect())));
    let config = AnalysisConfig {
        spectral: SpectralConfig { df_hz: 1.0, window: WindowType::Hamming, db: false, ..Default::default() },
        ..Default::default()
    };

    let out = compute_stats_array(&input, &StatsOptions::default(), &config).unwrap();
    assert_eq!(out.info.freq.as_ref().map(Vec::len), Some(17));
    assert_eq!(out.info.df, Some(1.0));
    assert!(!out.info.db);

    let reference = &out.stats[0];
    let err = reference.err_psd_stats.as_ref().unwrap();
    assert!(err.max.iter().all(|&v| v == 0.0));
    let psd = reference.psd_stats.as_ref().unwrap();
    assert_eq!(psd.shape(), &[17, 2, 1]);
    // y = 2x: four times the power in every band
    for k in 0..17 {
        let (px, py) = (psd.mean[[k, 0, 0]], psd.mean[[k, 1, 0]]);
        assert!((py - 4.0 * px).abs() <= 1e-9 * py.abs().max(1.0));
    }
}

/// Two classification dimensions give P1 × P2 bins
#[test]
fn test_two_dimensional_classification() {
    let cases: Vec<Vec<f64>> = vec![vec![1.0, 1.0], vec![1.0, 3.0], vec![6.0, 6.0], vec![6.0, 8.0]];
    let options = StatsOptions {
        spectral: false,
        classification: Some(Classification {
            names: vec!["x".into(), "y".into()],
            statistic: Statistic::Min,
            edges1: vec![0.0, 5.0, 10.0],
            edges2: Some(vec![0.0, 10.0, 20.0]),
        }),
        ..Default::default()
    };
    let out = compute_stats_array(&single_input(&cases), &options, &AnalysisConfig::default()).unwrap();

    // y minima are 2, 2, 12, 12
    assert_eq!(out.info.iclass, vec![1, 1, 4, 4]);
    assert_eq!(out.info.n_bins(), 4);
    assert_eq!(out.info.edges2.as_deref(), Some(&[0.0, 10.0, 20.0][..]));
    let s = &out.stats[0];
    assert_eq!(s.st_stats.shape(), &[4, 2]);
    assert!(s.st_stats.mean[[1, 0]].is_nan());
    assert_eq!(s.st_stats.max[[3, 0]], 8.0);
}

/// Requesting per-case data keeps the selected arrays
#[test]
fn test_include_data() {
    let options = StatsOptions { include_data: true, selections: vec!["y".into()], ..no_spectra() };
    let out = compute_stats_array(&single_input(&[vec![1.0, 2.0], vec![3.0]]), &options, &AnalysisConfig::default()).unwrap();
    let data = out.stats[0].data.as_ref().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[1].primary_names(), vec!["y"]);
    assert_eq!(data[1].column_vec(0), vec![6.0]);
}

proptest! {
    /// Pooled summaries are ordered and agree with the long-time extremes
    #[test]
    fn prop_summaries_are_consistent(
        cases in proptest::collection::vec(proptest::collection::vec(-100.0f64..100.0, 1..20), 1..8),
    ) {
        let out = compute_stats_array(&single_input(&cases), &no_spectra(), &AnalysisConfig::default()).unwrap();
        let s = &out.stats[0];
        for j in 0..2 {
            let g = s.global_stats.get([0, j]);
            let ordered = [g.min, g.p05, g.p50, g.p95, g.max];
            prop_assert!(ordered.windows(2).all(|w| w[0] <= w[1] + 1e-9));
            prop_assert!(g.mean >= g.min - 1e-9 && g.mean <= g.max + 1e-9);
            prop_assert_eq!(s.lt_min.min[[0, j]], g.min);
            prop_assert_eq!(s.lt_max.max[[0, j]], g.max);
            prop_assert_eq!(s.st_stats.get([0, j]), g);
        }
        prop_assert_eq!(s.case_stats.shape(), &[cases.len(), 2][..]);
        prop_assert!(s.global_err.max.iter().all(|&v| v == 0.0));
    }
}
