// src/ops/resample.rs
//! Resampling of signal groups and datasets onto a new time axis

use crate::config::constants::names;
use crate::error::{VtoolError, VtoolResult};
use crate::model::time::{is_strictly_increasing, uniform_grid};
use crate::model::{Dataset, SignalGroup};
use crate::validation::{check_dataset, check_signal_group};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Interpolation between neighbouring samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpMethod {
    /// Straight line between neighbours
    #[default]
    Linear,
    /// Closest sample
    Nearest,
    /// Sample at or before the query point
    Previous,
    /// Sample at or after the query point
    Next,
}

/// Policy for query points outside the source axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extrapolation {
    /// NaN outside the source range
    #[default]
    Nan,
    /// Repeat the first/last sample
    Hold,
    /// Extend the interpolation method beyond the ends
    Extend,
}

/// Interpolation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResampleOptions {
    /// Interpolation between source samples
    pub method: InterpMethod,
    /// Handling of points outside the source axis
    pub extrapolation: Extrapolation,
}

/// New sample axis for [`resample_dataset`]
#[derive(Debug, Clone, PartialEq)]
pub enum ResampleTarget {
    /// Explicit time vector
    Times(Vec<f64>),
    /// Uniform grid with this spacing spanning the current time range
    Interval(f64),
}

/// 1-D interpolation of `y(x)` at `xi`.
///
/// `x` must be strictly increasing. Query points that coincide with a source point
/// return that sample exactly.
pub fn interp1(x: &[f64], y: &[f64], xi: &[f64], options: ResampleOptions) -> VtoolResult<Vec<f64>> {
    if x.len() != y.len() {
        return Err(VtoolError::invalid_input(
            "y",
            format!("{} samples for {} time points", y.len(), x.len()),
        ));
    }
    if !is_strictly_increasing(x) {
        return Err(VtoolError::invalid_input("x", "sample axis must be finite and strictly increasing"));
    }
    Ok(xi.iter().map(|&q| interp_point(x, y, q, options)).collect())
}

fn interp_point(x: &[f64], y: &[f64], q: f64, options: ResampleOptions) -> f64 {
    let n = x.len();
    if n == 0 || q.is_nan() {
        return f64::NAN;
    }
    // exact hit
    let pos = x.partition_point(|&v| v < q);
    if pos < n && x[pos] == q {
        return y[pos];
    }
    if n == 1 {
        return match options.extrapolation {
            Extrapolation::Nan => f64::NAN,
            _ => y[0],
        };
    }

    let outside = pos == 0 || pos == n;
    if outside {
        match options.extrapolation {
            Extrapolation::Nan => return f64::NAN,
            Extrapolation::Hold => return if pos == 0 { y[0] } else { y[n - 1] },
            Extrapolation::Extend => {}
        }
    }

    let hi = pos.clamp(1, n - 1);
    let lo = hi - 1;
    match options.method {
        InterpMethod::Linear => {
            let w = (q - x[lo]) / (x[hi] - x[lo]);
            y[lo] + w * (y[hi] - y[lo])
        }
        InterpMethod::Nearest => {
            if pos == 0 {
                y[0]
            } else if pos == n {
                y[n - 1]
            } else if q - x[lo] < x[hi] - q {
                y[lo]
            } else {
                y[hi]
            }
        }
        InterpMethod::Previous => {
            if pos == 0 {
                f64::NAN
            } else {
                y[pos - 1]
            }
        }
        InterpMethod::Next => {
            if pos == n {
                f64::NAN
            } else {
                y[pos]
            }
        }
    }
}

/// Interpolate every column of `group` from `t_old` onto `t_new`.
///
/// A group without signals keeps its header and just takes the new sample count.
pub fn resample_signal_group(
    group: &SignalGroup,
    t_old: &[f64],
    t_new: &[f64],
    options: ResampleOptions,
) -> VtoolResult<SignalGroup> {
    check_signal_group(group).into_result("group")?;
    if group.n_samples() != t_old.len() {
        return Err(VtoolError::incompatible(
            "sample count",
            format!("group has {} samples, time axis has {}", group.n_samples(), t_old.len()),
        ));
    }
    if group.is_empty() {
        let mut empty = group.header();
        empty.values = Array2::zeros((t_new.len(), 0));
        return Ok(empty);
    }
    let mut values = Array2::from_elem((t_new.len(), group.n_signals()), f64::NAN);
    for (j, column) in group.values.columns().into_iter().enumerate() {
        let y = column.to_vec();
        let resampled = interp1(t_old, &y, t_new, options)?;
        values.column_mut(j).assign(&ndarray::Array1::from(resampled));
    }
    Ok(SignalGroup {
        layers: group.layers.clone(),
        values,
        units: group.units.clone(),
        descriptions: group.descriptions.clone(),
    })
}

fn retime(dataset: &Dataset, t_new: Vec<f64>) -> SignalGroup {
    let mut time = SignalGroup::time(t_new);
    if let Some(old) = dataset.time() {
        time.layers = old.layers.clone();
        time.units = old.units.clone();
        time.descriptions = old.descriptions.clone();
    }
    time
}

/// Resample every group of a dataset onto a new time axis
pub fn resample_dataset(dataset: &Dataset, target: &ResampleTarget, options: ResampleOptions) -> VtoolResult<Dataset> {
    check_dataset(dataset).into_result("dataset")?;
    let t_old = dataset.time_values();
    let t_new = match target {
        ResampleTarget::Times(t) => t.clone(),
        ResampleTarget::Interval(dt) => {
            if !(*dt > 0.0) {
                return Err(VtoolError::invalid_input("interval", format!("must be positive, got {}", dt)));
            }
            match (t_old.first(), t_old.last()) {
                (Some(&start), Some(&end)) => uniform_grid(start, end, *dt),
                _ => Vec::new(),
            }
        }
    };
    if !is_strictly_increasing(&t_new) {
        return Err(VtoolError::invalid_input("time", "new time axis must be finite and strictly increasing"));
    }

    let mut groups = Vec::with_capacity(dataset.groups.len());
    for (name, group) in &dataset.groups {
        let resampled = if name == names::TIME_GROUP {
            retime(dataset, t_new.clone())
        } else {
            resample_signal_group(group, &t_old, &t_new, options).map_err(|e| match e {
                VtoolError::Incompatible { what, reason } => {
                    VtoolError::incompatible(what, format!("group '{}': {}", name, reason))
                }
                other => other,
            })?
        };
        groups.push((name.clone(), resampled));
    }
    debug!(from = t_old.len(), to = t_new.len(), "resampled dataset");
    Ok(Dataset {
        groups,
        attributes: dataset.attributes.clone(),
    })
}

/// Keep every `factor`-th sample, starting with the first
pub fn downsample_dataset(dataset: &Dataset, factor: usize) -> VtoolResult<Dataset> {
    check_dataset(dataset).into_result("dataset")?;
    if factor == 0 {
        return Err(VtoolError::invalid_input("factor", "must be at least 1"));
    }
    let rows: Vec<usize> = (0..dataset.n_samples()).step_by(factor).collect();
    Ok(select_dataset_samples(dataset, &rows))
}

/// Keep the samples whose time lies in `[start, end]`
pub fn limit_time_range(dataset: &Dataset, start: f64, end: f64) -> VtoolResult<Dataset> {
    check_dataset(dataset).into_result("dataset")?;
    if start.is_nan() || end.is_nan() || end < start {
        return Err(VtoolError::invalid_input(
            "range",
            format!("[{}, {}] is not a valid time range", start, end),
        ));
    }
    let rows: Vec<usize> = dataset
        .time_values()
        .iter()
        .enumerate()
        .filter(|(_, t)| **t >= start && **t <= end)
        .map(|(i, _)| i)
        .collect();
    Ok(select_dataset_samples(dataset, &rows))
}

pub(crate) fn select_dataset_samples(dataset: &Dataset, rows: &[usize]) -> Dataset {
    Dataset {
        groups: dataset
            .groups
            .iter()
            .map(|(name, group)| (name.clone(), group.select_samples(rows)))
            .collect(),
        attributes: dataset.attributes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ds() -> Dataset {
        let mut ds = Dataset::from_time(vec![0.0, 1.0, 2.0, 3.0]);
        ds.insert_group(
            "G",
            SignalGroup::from_columns(&["x", "y"], &[vec![0.0, 10.0, 20.0, 30.0], vec![1.0, 1.0, f64::NAN, 1.0]], &["m", ""])
                .unwrap(),
        )
        .unwrap();
        ds.insert_group("Empty", SignalGroup::empty(4)).unwrap();
        ds
    }

    #[test]
    fn test_interp_linear_and_exact_points() {
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 10.0, 40.0];
        let out = interp1(&x, &y, &[0.0, 0.5, 2.0, 1.5], ResampleOptions::default()).unwrap();
        assert_eq!(out, vec![0.0, 5.0, 40.0, 25.0]);
    }

    #[test]
    fn test_interp_extrapolation_policies() {
        let x = [0.0, 1.0];
        let y = [0.0, 2.0];
        let q = [-1.0, 2.0];
        let nan = interp1(&x, &y, &q, ResampleOptions::default()).unwrap();
        assert!(nan.iter().all(|v| v.is_nan()));

        let hold = ResampleOptions { extrapolation: Extrapolation::Hold, ..Default::default() };
        assert_eq!(interp1(&x, &y, &q, hold).unwrap(), vec![0.0, 2.0]);

        let extend = ResampleOptions { extrapolation: Extrapolation::Extend, ..Default::default() };
        assert_eq!(interp1(&x, &y, &q, extend).unwrap(), vec![-2.0, 4.0]);
    }

    #[test]
    fn test_interp_step_methods() {
        let x = [0.0, 1.0, 2.0];
        let y = [5.0, 6.0, 7.0];
        let q = [0.4, 0.6];
        let prev = ResampleOptions { method: InterpMethod::Previous, ..Default::default() };
        assert_eq!(interp1(&x, &y, &q, prev).unwrap(), vec![5.0, 5.0]);
        let next = ResampleOptions { method: InterpMethod::Next, ..Default::default() };
        assert_eq!(interp1(&x, &y, &q, next).unwrap(), vec![6.0, 6.0]);
        let nearest = ResampleOptions { method: InterpMethod::Nearest, ..Default::default() };
        assert_eq!(interp1(&x, &y, &q, nearest).unwrap(), vec![5.0, 6.0]);
    }

    #[test]
    fn test_interp_rejects_unsorted_axis() {
        let err = interp1(&[0.0, 0.0], &[1.0, 2.0], &[0.0], ResampleOptions::default()).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_resample_onto_own_time_is_identity() {
        let d = ds();
        let same = resample_dataset(&d, &ResampleTarget::Times(d.time_values()), ResampleOptions::default()).unwrap();
        assert_eq!(same.group("G").unwrap().column_vec(0), d.group("G").unwrap().column_vec(0));
        assert!(same.group("G").unwrap().values[[2, 1]].is_nan());
        assert_eq!(same.time_values(), d.time_values());
    }

    #[test]
    fn test_resample_interval_keeps_empty_groups() {
        let d = ds();
        let r = resample_dataset(&d, &ResampleTarget::Interval(0.5), ResampleOptions::default()).unwrap();
        assert_eq!(r.n_samples(), 7);
        assert_eq!(r.group("Empty").unwrap().n_samples(), 7);
        assert_eq!(r.group("G").unwrap().values[[1, 0]], 5.0);
        assert!(crate::validation::check_dataset(&r).is_valid);
    }

    #[test]
    fn test_downsample_and_limit() {
        let d = ds();
        let down = downsample_dataset(&d, 2).unwrap();
        assert_eq!(down.time_values(), vec![0.0, 2.0]);
        assert_eq!(down.group("G").unwrap().column_vec(0), vec![0.0, 20.0]);

        let limited = limit_time_range(&d, 0.5, 2.0).unwrap();
        assert_eq!(limited.time_values(), vec![1.0, 2.0]);
        assert!(limit_time_range(&d, 2.0, 1.0).is_err());
        assert!(downsample_dataset(&d, 0).is_err());
    }
}
