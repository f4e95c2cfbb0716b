// src/ops/pad.rs
//! Extending and truncating groups to a common length

use crate::config::constants::names;
use crate::error::{VtoolError, VtoolResult, WithIndex};
use crate::model::time::sample_interval;
use crate::model::{Dataset, SignalGroup, SignalGroupArray};
use crate::validation::{check_dataset, check_signal_group, check_signal_group_array};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

/// Fill policy for appended samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadMode {
    /// Fill with NaN
    #[default]
    Nan,
    /// Repeat the last sample (NaN for an empty group)
    Hold,
}

/// Common length chosen by [`equalize_lengths`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthTarget {
    /// Truncate every element to the shortest one
    #[default]
    Shortest,
    /// Pad every element to the longest one
    Longest,
}

/// Extend `group` to `n` samples. `n` below the current length is an error.
pub fn pad_signal_group(group: &SignalGroup, n: usize, mode: PadMode) -> VtoolResult<SignalGroup> {
    check_signal_group(group).into_result("group")?;
    let current = group.n_samples();
    if n < current {
        return Err(VtoolError::invalid_input(
            "length",
            format!("cannot pad {} samples down to {}", current, n),
        ));
    }
    let mut values = Array2::from_elem((n, group.n_signals()), f64::NAN);
    values.slice_mut(s![..current, ..]).assign(&group.values);
    if mode == PadMode::Hold && current > 0 {
        let last = group.values.row(current - 1);
        for mut row in values.slice_mut(s![current.., ..]).rows_mut() {
            row.assign(&last);
        }
    }
    Ok(SignalGroup {
        layers: group.layers.clone(),
        values,
        units: group.units.clone(),
        descriptions: group.descriptions.clone(),
    })
}

/// Keep the first `n` samples of `group`
pub fn truncate_signal_group(group: &SignalGroup, n: usize) -> SignalGroup {
    let rows: Vec<usize> = (0..n.min(group.n_samples())).collect();
    group.select_samples(&rows)
}

/// Extend every group of a dataset to `n` samples.
///
/// The time group is continued at its median sample interval so it stays increasing.
pub fn pad_dataset(dataset: &Dataset, n: usize, mode: PadMode) -> VtoolResult<Dataset> {
    check_dataset(dataset).into_result("dataset")?;
    let mut groups = Vec::with_capacity(dataset.groups.len());
    for (name, group) in &dataset.groups {
        let padded = if name == names::TIME_GROUP {
            let mut time = pad_signal_group(group, n, PadMode::Nan)?;
            let t = group.column_vec(0);
            let dt = sample_interval(&t).unwrap_or(1.0);
            let mut last = t.last().copied().unwrap_or(-dt);
            for i in t.len()..n {
                last += dt;
                time.values[[i, 0]] = last;
            }
            time
        } else {
            pad_signal_group(group, n, mode)?
        };
        groups.push((name.clone(), padded));
    }
    Ok(Dataset {
        groups,
        attributes: dataset.attributes.clone(),
    })
}

/// Truncate or pad every case to one common length
pub fn equalize_lengths(array: &SignalGroupArray, target: LengthTarget, mode: PadMode) -> VtoolResult<SignalGroupArray> {
    check_signal_group_array(array.as_slice(), false).into_result("array")?;
    let lengths = array.iter().map(SignalGroup::n_samples);
    let n = match target {
        LengthTarget::Shortest => lengths.min(),
        LengthTarget::Longest => lengths.max(),
    }
    .unwrap_or(0);

    let mut cases = Vec::with_capacity(array.len());
    for (i, group) in array.iter().enumerate() {
        let case = if group.n_samples() >= n {
            truncate_signal_group(group, n)
        } else {
            pad_signal_group(group, n, mode).at_index(i)?
        };
        cases.push(case);
    }
    Ok(SignalGroupArray::from_vec_unchecked(cases))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(n: usize) -> SignalGroup {
        let col: Vec<f64> = (0..n).map(|i| i as f64).collect();
        SignalGroup::from_columns(&["x"], &[col], &["m"]).unwrap()
    }

    #[test]
    fn test_pad_nan_and_hold() {
        let g = group(2);
        let nan = pad_signal_group(&g, 4, PadMode::Nan).unwrap();
        assert_eq!(nan.n_samples(), 4);
        assert!(nan.values[[3, 0]].is_nan());

        let hold = pad_signal_group(&g, 4, PadMode::Hold).unwrap();
        assert_eq!(hold.column_vec(0), vec![0.0, 1.0, 1.0, 1.0]);

        assert!(pad_signal_group(&g, 1, PadMode::Nan).is_err());
    }

    #[test]
    fn test_pad_dataset_continues_time() {
        let mut ds = Dataset::from_time(vec![0.0, 0.5]);
        ds.insert_group("G", group(2)).unwrap();
        let padded = pad_dataset(&ds, 4, PadMode::Hold).unwrap();
        assert_eq!(padded.time_values(), vec![0.0, 0.5, 1.0, 1.5]);
        assert!(crate::validation::check_dataset(&padded).is_valid);
    }

    #[test]
    fn test_pad_dataset_refuses_empty_time_group() {
        let mut ds = Dataset::from_time(vec![0.0, 0.5]);
        ds.groups[0].1.values = Array2::zeros((2, 0));
        assert!(pad_dataset(&ds, 4, PadMode::Nan).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_equalize_lengths() {
        let arr = SignalGroupArray::new(vec![group(3), group(5)]).unwrap();
        let short = equalize_lengths(&arr, LengthTarget::Shortest, PadMode::Nan).unwrap();
        assert_eq!(short.uniform_len(), Some(3));

        let long = equalize_lengths(&arr, LengthTarget::Longest, PadMode::Nan).unwrap();
        assert_eq!(long.uniform_len(), Some(5));
        assert!(long[0].values[[4, 0]].is_nan());
    }
}
