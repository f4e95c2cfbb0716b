// src/ops/merge.rs
//! Signal-axis merging of groups and datasets sharing one sample count

use crate::config::constants::names;
use crate::error::{VtoolError, VtoolResult, WithIndex};
use crate::model::{Dataset, SignalGroup};
use crate::validation::{check_dataset, check_signal_group};
use ndarray::{concatenate, ArrayView2, Axis};
use tracing::warn;

/// A group or attribute of an earlier dataset overwritten by a later one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflict {
    /// Group or attribute name
    pub field: String,
    /// Index of the input whose value was kept
    pub winner: usize,
    /// Index of the input whose value was replaced
    pub overwritten: usize,
}

/// Place the columns of all groups side by side.
///
/// Layers missing from some inputs are padded with empty names.
pub fn merge_signal_groups(groups: &[SignalGroup]) -> VtoolResult<SignalGroup> {
    let Some(first) = groups.first() else {
        return Err(VtoolError::invalid_input("groups", "nothing to merge"));
    };
    for (i, group) in groups.iter().enumerate() {
        check_signal_group(group).into_result("groups").at_index(i)?;
    }
    let n = first.n_samples();
    for (i, group) in groups.iter().enumerate().skip(1) {
        if group.n_samples() != n {
            return Err(VtoolError::incompatible(
                "sample count",
                format!("{} samples, expected {}", group.n_samples(), n),
            ))
            .at_index(i);
        }
    }

    let mut layers = first.layers.clone();
    let mut units = first.units.clone();
    let mut descriptions = first.descriptions.clone();
    for group in &groups[1..] {
        layers.extend(&group.layers);
        units.extend(group.units.iter().cloned());
        descriptions.extend(group.descriptions.iter().cloned());
    }
    let views: Vec<ArrayView2<'_, f64>> = groups.iter().map(|g| g.values.view()).collect();
    let values = concatenate(Axis(1), &views)
        .map_err(|e| VtoolError::incompatible("values", e.to_string()))?;

    Ok(SignalGroup { layers, values, units, descriptions })
}

/// Merge the groups and attributes of several datasets.
///
/// All inputs must have the same N. On a name collision the later input wins and the
/// collision is reported in the returned conflict list.
pub fn merge_datasets(datasets: &[Dataset]) -> VtoolResult<(Dataset, Vec<MergeConflict>)> {
    let Some(first) = datasets.first() else {
        return Err(VtoolError::invalid_input("datasets", "nothing to merge"));
    };
    for (i, dataset) in datasets.iter().enumerate() {
        check_dataset(dataset).into_result("datasets").at_index(i)?;
    }
    let mut merged = first.clone();
    let mut owner: Vec<(String, usize)> = merged
        .groups
        .iter()
        .map(|(name, _)| (name.clone(), 0))
        .chain(merged.attributes.keys().map(|k| (k.clone(), 0)))
        .collect();
    let mut conflicts = Vec::new();

    for (i, dataset) in datasets.iter().enumerate().skip(1) {
        if dataset.n_samples() != merged.n_samples() {
            return Err(VtoolError::incompatible(
                "sample count",
                format!("{} samples, expected {}", dataset.n_samples(), merged.n_samples()),
            ))
            .at_index(i);
        }
        for (name, group) in &dataset.groups {
            if name == names::TIME_GROUP {
                continue;
            }
            record(&mut owner, &mut conflicts, name, i);
            merged.attributes.remove(name);
            merged.insert_group(name, group.clone()).at_index(i)?;
        }
        for (name, value) in &dataset.attributes {
            record(&mut owner, &mut conflicts, name, i);
            if merged.contains_group(name) {
                merged.remove_group(name).at_index(i)?;
            }
            merged.set_attribute(name, value.clone()).at_index(i)?;
        }
    }

    for conflict in &conflicts {
        warn!(field = %conflict.field, winner = conflict.winner, overwritten = conflict.overwritten, "merge conflict");
    }
    Ok((merged, conflicts))
}

fn record(owner: &mut Vec<(String, usize)>, conflicts: &mut Vec<MergeConflict>, name: &str, index: usize) {
    match owner.iter_mut().find(|(n, _)| n == name) {
        Some((_, previous)) => {
            conflicts.push(MergeConflict {
                field: name.to_string(),
                winner: index,
                overwritten: *previous,
            });
            *previous = index;
        }
        None => owner.push((name.to_string(), index)),
    }
}
