// src/processing/binning.rs
//! Case classification by a per-case summary statistic
//!
//! Bins follow the histogram convention: bin `k` (1-based) holds values in
//! `[edges[k-1], edges[k])`, except the last bin which also includes its upper edge.
//! Class 0 marks a rejected case (NaN, or outside the edges).

use crate::error::{VtoolError, VtoolResult, WithIndex};
use crate::model::SignalGroupArray;
use crate::processing::nanstats::Statistic;
use crate::validation::get_signal;
use serde::{Deserialize, Serialize};

/// Description of one populated bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinResult {
    /// 1-based bin number, matching the values of `iclass`
    pub index: usize,
    /// Midpoint of the bin edges (first classification dimension)
    #[serde(with = "crate::utils::serde_array::nullable")]
    pub center: f64,
    /// Midpoint along the second classification dimension, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center2: Option<f64>,
    /// Cases in the bin
    pub count: usize,
    /// Label built from the bin range and unit
    pub title: String,
}

/// Outcome of classifying an array of cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassVector {
    /// One class per case; 0 means rejected
    pub iclass: Vec<usize>,
    /// Edges after trimming empty end bins
    pub edges: Vec<f64>,
    /// One entry per bin
    pub bins: Vec<BinResult>,
    /// Per-case value of the reduced statistic
    pub values: Vec<f64>,
}

impl ClassVector {
    /// P, the number of bins
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }
}

/// Edges must be finite, strictly increasing and at least two long
pub fn validate_edges(edges: &[f64], parameter: &str) -> VtoolResult<()> {
    if edges.len() < 2 {
        return Err(VtoolError::invalid_input(parameter, format!("need at least 2 edges, got {}", edges.len())));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(VtoolError::invalid_input(parameter, "edges must be finite"));
    }
    if let Some(k) = edges.windows(2).position(|w| w[1] <= w[0]) {
        return Err(VtoolError::invalid_input(
            parameter,
            format!("edges must be strictly increasing ({} then {})", edges[k], edges[k + 1]),
        ));
    }
    Ok(())
}

/// Bin of a single value, 0 if rejected
pub fn assign_bin(value: f64, edges: &[f64]) -> usize {
    let p = edges.len().saturating_sub(1);
    if p == 0 || value.is_nan() || value < edges[0] || value > edges[p] {
        return 0;
    }
    if value == edges[p] {
        return p;
    }
    // first edge strictly above the value closes its bin
    edges.partition_point(|&e| e <= value)
}

/// Human-readable bin label
pub fn bin_title(lo: f64, hi: f64, unit: &str) -> String {
    format!("{} - {} {}", lo, hi, unit).trim_end().to_string()
}

/// Classify precomputed values, trimming empty bins at both ends
pub fn classify_values(values: &[f64], edges: &[f64], unit: &str) -> VtoolResult<ClassVector> {
    validate_edges(edges, "edges")?;
    let raw: Vec<usize> = values.iter().map(|&v| assign_bin(v, edges)).collect();
    let p = edges.len() - 1;
    let mut counts = vec![0usize; p + 1];
    for &c in &raw {
        counts[c] += 1;
    }

    let first = (1..=p).find(|&k| counts[k] > 0);
    let last = (1..=p).rev().find(|&k| counts[k] > 0);
    let (lo, hi) = match (first, last) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => (1, p),
    };
    let shift = lo - 1;
    let edges: Vec<f64> = edges[lo - 1..=hi].to_vec();
    let iclass: Vec<usize> = raw.iter().map(|&c| if c == 0 { 0 } else { c - shift }).collect();
    let bins = (lo..=hi)
        .enumerate()
        .map(|(i, k)| BinResult {
            index: i + 1,
            center: 0.5 * (edges[i] + edges[i + 1]),
            center2: None,
            count: counts[k],
            title: bin_title(edges[i], edges[i + 1], unit),
        })
        .collect();

    Ok(ClassVector { iclass, edges, bins, values: values.to_vec() })
}

/// Reduce `signal` of every case with `statistic` and bin the results.
///
/// Fails with an index-annotated error when a case lacks the signal.
pub fn compute_class_vector(
    array: &SignalGroupArray,
    signal: &str,
    statistic: Statistic,
    edges: &[f64],
) -> VtoolResult<ClassVector> {
    statistic.validate()?;
    validate_edges(edges, "edges")?;
    let mut values = Vec::with_capacity(array.len());
    for (i, group) in array.iter().enumerate() {
        let column = get_signal(signal, group).at_index(i)?;
        let samples = column.to_vec();
        values.push(statistic.apply(&samples));
    }
    let unit = array
        .get(0)
        .and_then(|g| g.find(signal).first().and_then(|&j| g.units.get(j).cloned()))
        .unwrap_or_default();
    classify_values(&values, edges, &unit)
}

/// Combine two independent classifications: class `(k1 - 1) * P2 + k2`
pub fn combine_class_vectors(first: &ClassVector, second: &ClassVector) -> VtoolResult<ClassVector> {
    if first.iclass.len() != second.iclass.len() {
        return Err(VtoolError::incompatible(
            "classification",
            format!("{} cases vs {} cases", first.iclass.len(), second.iclass.len()),
        ));
    }
    let p2 = second.n_bins();
    let iclass: Vec<usize> = first
        .iclass
        .iter()
        .zip(&second.iclass)
        .map(|(&k1, &k2)| if k1 == 0 || k2 == 0 { 0 } else { (k1 - 1) * p2 + k2 })
        .collect();

    let mut bins = Vec::with_capacity(first.n_bins() * p2);
    for b1 in &first.bins {
        for b2 in &second.bins {
            let index = (b1.index - 1) * p2 + b2.index;
            bins.push(BinResult {
                index,
                center: b1.center,
                center2: Some(b2.center),
                count: iclass.iter().filter(|&&c| c == index).count(),
                title: format!("{}, {}", b1.title, b2.title),
            });
        }
    }

    Ok(ClassVector {
        iclass,
        edges: first.edges.clone(),
        bins,
        values: first.values.clone(),
    })
}
