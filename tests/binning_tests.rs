// tests/binning_tests.rs
//! Case classification: histogram edge convention, trimming and the partition property

use proptest::prelude::*;
use vtool_core::processing::{classify_values, combine_class_vectors, compute_class_vector, Statistic};
use vtool_core::{SignalGroup, SignalGroupArray};

fn cases_with_means(means: &[f64]) -> SignalGroupArray {
    let groups = means
        .iter()
        .map(|&m| SignalGroup::from_columns(&["speed", "load"], &[vec![m, m], vec![1.0, 3.0]], &["m/s", "N"]).unwrap())
        .collect();
    SignalGroupArray::new(groups).unwrap()
}

/// Ten cases with means 1..=10 over edges [0, 5, 10]: 5 opens the second bin, 10 closes it
#[test]
fn test_interior_edge_belongs_to_upper_bin() {
    let means: Vec<f64> = (1..=10).map(f64::from).collect();
    let cv = compute_class_vector(&cases_with_means(&means), "speed", Statistic::Mean, &[0.0, 5.0, 10.0]).unwrap();

    assert_eq!(cv.iclass, vec![1, 1, 1, 1, 2, 2, 2, 2, 2, 2]);
    assert_eq!(cv.n_bins(), 2);
    assert_eq!(cv.values, means);
}

/// Values outside the edges and NaN statistics are rejected with class 0
#[test]
fn test_rejected_cases() {
    let cv = compute_class_vector(&cases_with_means(&[-1.0, 2.0, f64::NAN, 11.0]), "speed", Statistic::Max, &[0.0, 10.0]).unwrap();
    assert_eq!(cv.iclass, vec![0, 1, 0, 0]);
    assert_eq!(cv.bins[0].count, 1);
}

/// A signal missing from the cases surfaces as not-found
#[test]
fn test_unknown_signal() {
    let err = compute_class_vector(&cases_with_means(&[1.0]), "torque", Statistic::Mean, &[0.0, 1.0]).unwrap_err();
    assert!(err.is_not_found());
}

/// Two dimensions combine as (k1 - 1) * P2 + k2
#[test]
fn test_two_dimensional_classes() {
    let first = classify_values(&[1.0, 1.0, 7.0, 7.0], &[0.0, 5.0, 10.0], "").unwrap();
    let second = classify_values(&[0.5, 2.5, 0.5, 2.5], &[0.0, 1.0, 2.0, 3.0], "").unwrap();
    let both = combine_class_vectors(&first, &second).unwrap();

    assert_eq!(second.n_bins(), 3);
    assert_eq!(both.iclass, vec![1, 3, 4, 6]);
    assert_eq!(both.n_bins(), 6);
    assert_eq!(both.bins[1].count, 0);
    assert_eq!(both.bins[5].center2, Some(2.5));
}

proptest! {
    /// Every accepted case lands in exactly one bin and the counts add up
    #[test]
    fn prop_bins_partition_accepted_cases(
        values in proptest::collection::vec(-20.0f64..20.0, 1..60),
        lo in -10.0f64..0.0,
        widths in proptest::collection::vec(0.5f64..5.0, 1..6),
    ) {
        let mut edges = vec![lo];
        for w in &widths {
            let next = edges[edges.len() - 1] + w;
            edges.push(next);
        }
        let cv = classify_values(&values, &edges, "").unwrap();
        let first = edges[0];
        let last = edges[edges.len() - 1];

        let accepted = values.iter().filter(|&&v| v >= first && v <= last).count();
        let counted: usize = cv.bins.iter().map(|b| b.count).sum();
        prop_assert_eq!(counted, accepted);

        for (&v, &k) in values.iter().zip(&cv.iclass) {
            if k == 0 {
                prop_assert!(v < first || v > last);
            } else {
                prop_assert!(k <= cv.n_bins());
                let (a, b) = (cv.edges[k - 1], cv.edges[k]);
                prop_assert!(v >= a);
                prop_assert!(v < b || (k == cv.n_bins() && v == b));
            }
        }
    }
}
