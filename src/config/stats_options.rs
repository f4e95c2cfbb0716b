// src/config/stats_options.rs
//! Option surface of the statistics aggregation entry point

use crate::config::constants::{names, stats};
use crate::error::{VtoolError, VtoolResult};
use crate::processing::binning::validate_edges;
use crate::processing::nanstats::Statistic;
use serde::{Deserialize, Serialize};

/// Options of [`crate::processing::compute_stats_array`]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StatsOptions {
    /// Input arrays to analyse, in output order; empty means every input array
    #[serde(default)]
    pub array_names: Vec<String>,

    /// Array the others are compared against; defaults to the first analysed array
    #[serde(default)]
    pub reference: Option<String>,

    /// Signals to analyse; empty means every signal of the reference's first case
    #[serde(default)]
    pub selections: Vec<String>,

    /// Cases rejected before classification
    #[serde(default)]
    pub filter: Option<CaseFilter>,

    /// Binning of cases; `None` puts every case in one bin
    #[serde(default)]
    pub classification: Option<Classification>,

    /// Compute PSD statistics
    #[serde(default = "defaults::spectral")]
    pub spectral: bool,

    /// Keep the per-case signal arrays in the output
    #[serde(default)]
    pub include_data: bool,
}

/// Keep a case only if every valid sample of `name` is inside a range or a listed value
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaseFilter {
    /// Signal of the reference array the filter inspects
    pub name: String,
    /// Inclusive `[lo, hi]` ranges
    #[serde(default)]
    pub ranges: Vec<[f64; 2]>,
    /// Accepted ranges as flat `[lo, hi]` pairs
    #[serde(default)]
    pub values: Vec<f64>,
}

/// Classification of cases into bins by one or two signals
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Classification {
    /// First name bins by `edges1`, the optional second by `edges2`
    pub names: Vec<String>,
    /// Per-case reduction of the classifying signals
    #[serde(default)]
    pub statistic: Statistic,
    /// Edges along the first classifying signal
    pub edges1: Vec<f64>,
    /// Edges along the second classifying signal, if any
    #[serde(default)]
    pub edges2: Option<Vec<f64>>,
}

mod defaults {
    /// Spectral statistics are on unless disabled
    pub fn spectral() -> bool { true }
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            array_names: Vec::new(),
            reference: None,
            selections: Vec::new(),
            filter: None,
            classification: None,
            spectral: defaults::spectral(),
            include_data: false,
        }
    }
}

impl StatsOptions {
    /// Name of the reference array given the available input names
    pub fn reference_name<'a>(&'a self, available: &'a [String]) -> Option<&'a str> {
        self.reference
            .as_deref()
            .or_else(|| self.array_names.first().map(String::as_str))
            .or_else(|| available.first().map(String::as_str))
    }
}

/// Validate option shapes before any data is touched
pub fn validate_stats_options(options: &StatsOptions) -> VtoolResult<()> {
    if let Some(name) = options.array_names.iter().find(|n| n.trim().is_empty()) {
        return Err(VtoolError::invalid_input("array_names", format!("blank array name '{}'", name)));
    }
    if let Some(reference) = &options.reference {
        if !options.array_names.is_empty() && !options.array_names.contains(reference) {
            return Err(VtoolError::not_found(reference.as_str(), "array_names"));
        }
    }
    if options.selections.iter().any(|n| n == names::TIME_SIGNAL) {
        return Err(VtoolError::invalid_input("selections", "time is not an analysable signal"));
    }
    if let Some(filter) = &options.filter {
        if filter.name.is_empty() {
            return Err(VtoolError::invalid_input("filter.name", "filter signal name is empty"));
        }
        if filter.ranges.is_empty() && filter.values.is_empty() {
            return Err(VtoolError::invalid_input("filter", "need at least one range or value"));
        }
        if let Some(r) = filter.ranges.iter().find(|r| r[0].is_nan() || r[1].is_nan() || r[0] > r[1]) {
            return Err(VtoolError::invalid_input("filter.ranges", format!("invalid range [{}, {}]", r[0], r[1])));
        }
    }
    if let Some(class) = &options.classification {
        let dims = class.names.len();
        if dims == 0 || dims > stats::MAX_CLASS_DIMENSIONS {
            return Err(VtoolError::invalid_input(
                "classification.names",
                format!("expected 1 or {} names, got {}", stats::MAX_CLASS_DIMENSIONS, dims),
            ));
        }
        class.statistic.validate()?;
        validate_edges(&class.edges1, "classification.edges1")?;
        match (&class.edges2, dims) {
            (Some(edges2), 2) => validate_edges(edges2, "classification.edges2")?,
            (None, 1) => {}
            (Some(_), _) => {
                return Err(VtoolError::invalid_input("classification.edges2", "edges2 needs a second name"));
            }
            (None, _) => {
                return Err(VtoolError::invalid_input("classification.edges2", "second name needs edges2"));
            }
        }
    }
    Ok(())
}
