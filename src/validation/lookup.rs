// src/validation/lookup.rs
//! Name resolution across name layers
//!
//! Lookups return empty results instead of failing; callers decide whether a miss is
//! an error. When a name resolves to several rows the first one is the primary
//! instance and single-answer lookups use it.

use crate::config::constants::names;
use crate::error::{VtoolError, VtoolResult};
use crate::model::name_layers::is_layer_name;
use crate::model::{Dataset, SignalGroup};
use ndarray::Array1;
use serde_json::Value;
use tracing::warn;

/// Matches of a name inside one group of a dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetMatch {
    /// Group holding the matches
    pub group: String,
    /// Matching columns, primary instance first
    pub rows: Vec<usize>,
}

/// All rows of `group` whose name equals `name` on any layer (case-sensitive)
pub fn find_name(name: &str, group: &SignalGroup) -> Vec<usize> {
    group.layers.resolve(name)
}

/// Matches of `name` broken out by group, in group order; groups without a match are omitted
pub fn find_name_in_dataset(name: &str, dataset: &Dataset) -> Vec<DatasetMatch> {
    dataset
        .groups
        .iter()
        .filter_map(|(group_name, group)| {
            let rows = find_name(name, group);
            (!rows.is_empty()).then(|| DatasetMatch { group: group_name.clone(), rows })
        })
        .collect()
}

/// Layer names of a group
pub fn get_layers(group: &SignalGroup) -> Vec<String> {
    group.layer_names().into_iter().map(String::from).collect()
}

/// Layer names of a dataset, defined by its time group
pub fn dataset_layers(dataset: &Dataset) -> Vec<String> {
    dataset.time().map(get_layers).unwrap_or_default()
}

/// Layer names of a raw signal-group object: fields ending in the layer suffix
pub fn layers_from_value(value: &Value) -> Vec<String> {
    value
        .as_object()
        .map(|obj| obj.keys().filter(|k| is_layer_name(k)).cloned().collect())
        .unwrap_or_default()
}

/// Samples of the primary instance of `name`
pub fn get_signal(name: &str, group: &SignalGroup) -> VtoolResult<Array1<f64>> {
    let rows = find_name(name, group);
    match rows.as_slice() {
        [] => Err(VtoolError::not_found(name, "signal group")),
        [row] => Ok(group.values.column(*row).to_owned()),
        [row, rest @ ..] => {
            warn!(signal = name, duplicates = rest.len(), "using first of several matching signals");
            Ok(group.values.column(*row).to_owned())
        }
    }
}

/// Samples, unit and group of the primary instance of `name` in a dataset.
///
/// The time group is only searched when `name` is a time signal name.
pub fn get_signal_from_dataset(name: &str, dataset: &Dataset) -> VtoolResult<(String, Array1<f64>, String)> {
    let include_time = name == names::TIME_SIGNAL || name == names::INDEX_SIGNAL;
    let matches: Vec<DatasetMatch> = find_name_in_dataset(name, dataset)
        .into_iter()
        .filter(|m| include_time || m.group != names::TIME_GROUP)
        .collect();
    let first = matches
        .first()
        .ok_or_else(|| VtoolError::not_found(name, "dataset"))?;
    if matches.len() > 1 || first.rows.len() > 1 {
        warn!(signal = name, group = %first.group, "signal found more than once, using first match");
    }
    let group = dataset
        .group(&first.group)
        .ok_or_else(|| VtoolError::not_found(first.group.clone(), "dataset groups"))?;
    let row = first.rows[0];
    Ok((
        first.group.clone(),
        group.values.column(row).to_owned(),
        group.units.get(row).cloned().unwrap_or_default(),
    ))
}
