// src/ops/concat.rs
//! Sample-axis concatenation of signal groups and datasets
//!
//! Inputs must carry identical name layers (layer names and contents). Units may
//! differ only where one side is blank; [`reconcile_units`] fills the gaps and
//! refuses genuinely conflicting units.

use crate::error::{VtoolError, VtoolResult, WithIndex};
use crate::model::{Dataset, SignalGroup};
use crate::validation::{check_dataset, check_signal_group};
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use tracing::{debug, warn};

/// Merge the unit lists of several groups column by column.
///
/// A column takes its single distinct non-blank unit, or stays blank. Any column with
/// two or more distinct non-blank units fails the whole reconciliation.
pub fn reconcile_units(unit_lists: &[&[String]]) -> VtoolResult<Vec<String>> {
    let Some(first) = unit_lists.first() else {
        return Ok(Vec::new());
    };
    let m = first.len();
    if let Some((i, units)) = unit_lists.iter().enumerate().find(|(_, u)| u.len() != m) {
        return Err(VtoolError::incompatible(
            "units",
            format!("element {} has {} units, element 0 has {}", i, units.len(), m),
        ));
    }

    let mut reconciled = Vec::with_capacity(m);
    let mut conflicts = Vec::new();
    for j in 0..m {
        let mut distinct: Vec<&str> = Vec::new();
        for units in unit_lists {
            let unit = units[j].trim();
            if !unit.is_empty() && !distinct.contains(&unit) {
                distinct.push(unit);
            }
        }
        match distinct.as_slice() {
            [] => reconciled.push(String::new()),
            [unit] => reconciled.push(unit.to_string()),
            many => conflicts.push(format!("column {}: [{}]", j, many.join(", "))),
        }
    }
    if !conflicts.is_empty() {
        return Err(VtoolError::incompatible("units", conflicts.join("; ")));
    }
    Ok(reconciled)
}

/// Stack groups along the sample axis
pub fn concat_signal_groups(groups: &[SignalGroup]) -> VtoolResult<SignalGroup> {
    let Some(first) = groups.first() else {
        return Err(VtoolError::invalid_input("groups", "nothing to concatenate"));
    };
    for (i, group) in groups.iter().enumerate() {
        check_signal_group(group).into_result("groups").at_index(i)?;
    }
    for (i, group) in groups.iter().enumerate().skip(1) {
        check_same_names(first, group).at_index(i)?;
    }

    let mut units = first.units.clone();
    if groups.iter().any(|g| g.units != first.units) {
        let lists: Vec<&[String]> = groups.iter().map(|g| g.units.as_slice()).collect();
        units = reconcile_units(&lists)?;
        warn!(units = ?units, "reconciled differing units while concatenating");
    }

    let descriptions = (0..first.n_signals())
        .map(|j| {
            groups
                .iter()
                .map(|g| g.descriptions[j].as_str())
                .find(|d| !d.is_empty())
                .unwrap_or_default()
                .to_string()
        })
        .collect();

    let views: Vec<ArrayView2<'_, f64>> = groups.iter().map(|g| g.values.view()).collect();
    let values: Array2<f64> = concatenate(Axis(0), &views)
        .map_err(|e| VtoolError::incompatible("values", e.to_string()))?;

    Ok(SignalGroup {
        layers: first.layers.clone(),
        values,
        units,
        descriptions,
    })
}

fn check_same_names(reference: &SignalGroup, group: &SignalGroup) -> VtoolResult<()> {
    if group.n_signals() != reference.n_signals() {
        return Err(VtoolError::incompatible(
            "signal count",
            format!("{} signals, expected {}", group.n_signals(), reference.n_signals()),
        ));
    }
    if !group.layers.same_layer_set(&reference.layers) {
        return Err(VtoolError::incompatible(
            "name layers",
            format!(
                "[{}] differ from [{}]",
                group.layer_names().join(", "),
                reference.layer_names().join(", ")
            ),
        ));
    }
    if !group.layers.same_names(&reference.layers) {
        return Err(VtoolError::incompatible("names", "signal names differ between inputs"));
    }
    Ok(())
}

/// Stack datasets along the sample axis, group by group.
///
/// Every input must hold the same groups. Attributes are taken from the first input;
/// disagreeing attributes in later inputs are reported but do not fail the call.
pub fn concat_datasets(datasets: &[Dataset]) -> VtoolResult<Dataset> {
    let Some(first) = datasets.first() else {
        return Err(VtoolError::invalid_input("datasets", "nothing to concatenate"));
    };
    for (i, dataset) in datasets.iter().enumerate() {
        check_dataset(dataset).into_result("datasets").at_index(i)?;
    }
    let mut expected = first.group_names();
    expected.sort_unstable();
    for (i, dataset) in datasets.iter().enumerate().skip(1) {
        let mut actual = dataset.group_names();
        actual.sort_unstable();
        if actual != expected {
            return Err(VtoolError::incompatible(
                "groups",
                format!("[{}] differ from [{}]", actual.join(", "), expected.join(", ")),
            ))
            .at_index(i);
        }
        for (name, value) in &dataset.attributes {
            if first.attributes.get(name) != Some(value) {
                warn!(element = i, attribute = %name, "attribute differs between concatenated datasets, keeping first");
            }
        }
    }

    let mut groups = Vec::with_capacity(first.groups.len());
    for (name, _) in &first.groups {
        let parts: Vec<SignalGroup> = datasets
            .iter()
            .filter_map(|d| d.group(name).cloned())
            .collect();
        let merged = concat_signal_groups(&parts).map_err(|e| match e {
            VtoolError::Incompatible { what, reason } => {
                VtoolError::incompatible(what, format!("group '{}': {}", name, reason))
            }
            other => other,
        })?;
        groups.push((name.clone(), merged));
    }
    debug!(inputs = datasets.len(), groups = groups.len(), "concatenated datasets");

    Ok(Dataset {
        groups,
        attributes: first.attributes.clone(),
    })
}
