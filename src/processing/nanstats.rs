// src/processing/nanstats.rs
//! NaN-aware reductions
//!
//! Every reduction ignores NaN samples. A reduction over no remaining samples is NaN,
//! never an error. Percentiles use linear interpolation between closest ranks
//! (the R-7 definition): `h = (n - 1) * p / 100`.

use crate::config::constants::stats;
use crate::error::{VtoolError, VtoolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn non_nan(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

/// Smallest non-NaN value, NaN if there is none
pub fn nan_min(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, |acc, v| if acc.is_nan() || v < acc { v } else { acc })
}

/// Largest non-NaN value, NaN if there is none
pub fn nan_max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, |acc, v| if acc.is_nan() || v > acc { v } else { acc })
}

/// Sum and count of the non-NaN values
pub fn nan_sum_count(values: &[f64]) -> (f64, usize) {
    values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0), |(sum, count), v| (sum + v, count + 1))
}

/// Mean of the non-NaN values
pub fn nan_mean(values: &[f64]) -> f64 {
    match nan_sum_count(values) {
        (_, 0) => f64::NAN,
        (sum, count) => sum / count as f64,
    }
}

/// Sample standard deviation (n - 1); 0 for a single sample
pub fn nan_std(values: &[f64]) -> f64 {
    let data = non_nan(values);
    match data.len() {
        0 => f64::NAN,
        1 => 0.0,
        n => {
            let mean = data.iter().sum::<f64>() / n as f64;
            let ss: f64 = data.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        }
    }
}

/// Median of the non-NaN values
pub fn nan_median(values: &[f64]) -> f64 {
    nan_percentile(values, 50.0)
}

/// Most frequent value; ties resolve to the smallest
pub fn nan_mode(values: &[f64]) -> f64 {
    let mut data = non_nan(values);
    if data.is_empty() {
        return f64::NAN;
    }
    data.sort_by(|a, b| a.total_cmp(b));
    let (mut best, mut best_count) = (data[0], 0usize);
    let mut i = 0;
    while i < data.len() {
        let run = data[i..].iter().take_while(|&&v| v == data[i]).count();
        if run > best_count {
            best = data[i];
            best_count = run;
        }
        i += run;
    }
    best
}

/// Percentile of already sorted, NaN-free data; `p` in percent
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    match n {
        0 => f64::NAN,
        1 => sorted[0],
        _ => {
            let h = (n - 1) as f64 * (p / 100.0).clamp(0.0, 1.0);
            let lo = h.floor() as usize;
            let frac = h - h.floor();
            if lo >= n - 1 {
                sorted[n - 1]
            } else if frac == 0.0 {
                sorted[lo]
            } else {
                sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
            }
        }
    }
}

/// Percentile over non-NaN values; `p` in percent
pub fn nan_percentile(values: &[f64], p: f64) -> f64 {
    let mut data = non_nan(values);
    data.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&data, p)
}

/// Scalar reduction used to classify cases
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Mean
    #[default]
    Mean,
    /// Sample standard deviation
    Std,
    /// Median
    Median,
    /// Maximum
    Max,
    /// Minimum
    Min,
    /// Most frequent value
    Mode,
    /// Percentile in percent, 0 to 100
    Percentile(f64),
}

impl Statistic {
    /// Reduce `values` with this statistic
    pub fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Statistic::Mean => nan_mean(values),
            Statistic::Std => nan_std(values),
            Statistic::Median => nan_median(values),
            Statistic::Max => nan_max(values),
            Statistic::Min => nan_min(values),
            Statistic::Mode => nan_mode(values),
            Statistic::Percentile(p) => nan_percentile(values, *p),
        }
    }

    /// Reject percentiles outside `0..=100`
    pub fn validate(&self) -> VtoolResult<()> {
        match self {
            Statistic::Percentile(p) if !(0.0..=100.0).contains(p) => Err(VtoolError::invalid_input(
                "statistic",
                format!("percentile must be within [0, 100], got {}", p),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Mean => write!(f, "mean"),
            Statistic::Std => write!(f, "std"),
            Statistic::Median => write!(f, "median"),
            Statistic::Max => write!(f, "max"),
            Statistic::Min => write!(f, "min"),
            Statistic::Mode => write!(f, "mode"),
            Statistic::Percentile(p) => write!(f, "p{}", p),
        }
    }
}

impl FromStr for Statistic {
    type Err = VtoolError;

    /// Keywords, `pNN` or a bare number for a percentile
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim().to_ascii_lowercase();
        let statistic = match word.as_str() {
            "mean" => Statistic::Mean,
            "std" => Statistic::Std,
            "median" => Statistic::Median,
            "max" => Statistic::Max,
            "min" => Statistic::Min,
            "mode" => Statistic::Mode,
            other => {
                let number = other.strip_prefix('p').unwrap_or(other);
                let p: f64 = number.parse().map_err(|_| {
                    VtoolError::invalid_input("statistic", format!("unknown statistic '{}'", s))
                })?;
                Statistic::Percentile(p)
            }
        };
        statistic.validate()?;
        Ok(statistic)
    }
}

/// The six reported statistics of one pool of values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Minimum
    pub min: f64,
    /// Maximum
    pub max: f64,
    /// Mean
    pub mean: f64,
    /// 5th percentile
    pub p05: f64,
    /// Median
    pub p50: f64,
    /// 95th percentile
    pub p95: f64,
}

impl Summary {
    /// Every field NaN
    pub const NAN: Summary = Summary {
        min: f64::NAN,
        max: f64::NAN,
        mean: f64::NAN,
        p05: f64::NAN,
        p50: f64::NAN,
        p95: f64::NAN,
    };

    /// Every field equal to `value`
    pub fn constant(value: f64) -> Self {
        Summary { min: value, max: value, mean: value, p05: value, p50: value, p95: value }
    }

    /// Apply `f` to every field
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Summary {
            min: f(self.min),
            max: f(self.max),
            mean: f(self.mean),
            p05: f(self.p05),
            p50: f(self.p50),
            p95: f(self.p95),
        }
    }

    /// Values in the order of [`stats::FIELDS`]
    pub fn as_array(&self) -> [f64; 6] {
        [self.min, self.max, self.mean, self.p05, self.p50, self.p95]
    }
}

/// Summarize a pool of values. A single non-NaN value is returned as-is in every field.
pub fn summarize(values: &[f64]) -> Summary {
    let mut data = non_nan(values);
    match data.len() {
        0 => Summary::NAN,
        1 => Summary::constant(data[0]),
        n => {
            data.sort_by(|a, b| a.total_cmp(b));
            Summary {
                min: data[0],
                max: data[n - 1],
                mean: data.iter().sum::<f64>() / n as f64,
                p05: percentile_sorted(&data, stats::P05),
                p50: percentile_sorted(&data, stats::P50),
                p95: percentile_sorted(&data, stats::P95),
            }
        }
    }
}
