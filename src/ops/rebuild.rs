// src/ops/rebuild.rs
//! Rebuilding datasets against a model and collecting signals across cases

use crate::config::constants::names;
use crate::error::{VtoolError, VtoolResult, WithIndex};
use crate::io::{CollectedSignals, TimeSource};
use crate::model::{AttributeValue, Dataset, DatasetArray, NameLayers, SignalGroup, SignalGroupArray};
use crate::ops::concat::reconcile_units;
use crate::validation::{check_dataset, find_name_in_dataset, get_signal_from_dataset};
use ndarray::Array2;
use tracing::{debug, warn};

fn find_in_source<'a>(candidates: &[&str], source: &'a Dataset) -> Option<(&'a SignalGroup, usize)> {
    candidates.iter().find_map(|name| {
        find_name_in_dataset(name, source)
            .into_iter()
            .find(|m| m.group != names::TIME_GROUP)
            .and_then(|m| source.group(&m.group).map(|g| (g, m.rows[0])))
    })
}

/// Reconstruct `source` with the group, layer and signal order of `model`.
///
/// Each model signal is looked up in `source` under any of its names. Signals that
/// cannot be found become NaN columns; their display names are returned alongside.
pub fn rebuild_dataset(model: &Dataset, source: &Dataset) -> VtoolResult<(Dataset, Vec<String>)> {
    check_dataset(model).into_result("model")?;
    check_dataset(source).into_result("source")?;
    let model_time = model
        .time()
        .ok_or_else(|| VtoolError::invalid_input("model", format!("missing '{}' group", names::TIME_GROUP)))?;
    let source_time = source
        .time()
        .ok_or_else(|| VtoolError::invalid_input("source", format!("missing '{}' group", names::TIME_GROUP)))?;
    let n = source_time.n_samples();

    let mut time = source_time.clone();
    time.layers = NameLayers::new();
    let time_name = source_time.layers.primary_name(0).to_string();
    for layer in model_time.layer_names() {
        time.layers.set_layer(layer, vec![time_name.clone()]);
    }

    let mut rebuilt = Dataset {
        groups: vec![(names::TIME_GROUP.to_string(), time)],
        attributes: source.attributes.clone(),
    };
    let mut missing = Vec::new();

    for (group_name, template) in &model.groups {
        if group_name == names::TIME_GROUP {
            continue;
        }
        let m = template.n_signals();
        let mut values = Array2::from_elem((n, m), f64::NAN);
        let mut units = template.units.clone();
        for j in 0..m {
            let candidates: Vec<&str> = template
                .layers
                .iter()
                .filter_map(|(_, layer)| layer.get(j).map(String::as_str))
                .filter(|name| !name.is_empty())
                .collect();
            match find_in_source(&candidates, source) {
                Some((group, row)) => {
                    values.column_mut(j).assign(&group.values.column(row));
                    if units[j].is_empty() {
                        units[j] = group.units.get(row).cloned().unwrap_or_default();
                    }
                }
                None => missing.push(template.layers.primary_name(j).to_string()),
            }
        }
        let group = SignalGroup {
            layers: template.layers.clone(),
            values,
            units,
            descriptions: template.descriptions.clone(),
        };
        rebuilt.attributes.remove(group_name);
        rebuilt.insert_group(group_name, group)?;
    }

    if !missing.is_empty() {
        warn!(count = missing.len(), signals = ?missing, "signals missing from source, filled with NaN");
    }
    Ok((rebuilt, missing))
}

/// Case label of a dataset: its `source` attribute, or the case position
fn case_name(dataset: &Dataset, index: usize) -> String {
    match dataset.attribute(names::SOURCE_ATTRIBUTE) {
        Some(AttributeValue::Text(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => format!("case_{}", index),
    }
}

/// Pull the named signals out of every dataset of an array.
///
/// Signals missing from a case become NaN columns; units are reconciled across
/// cases so the result is a homogeneous array.
pub fn collect_signals<S: AsRef<str>>(datasets: &DatasetArray, signal_names: &[S]) -> VtoolResult<CollectedSignals> {
    if signal_names.is_empty() {
        return Err(VtoolError::invalid_input("names", "no signals requested"));
    }
    for (i, dataset) in datasets.iter().enumerate() {
        check_dataset(dataset).into_result("datasets").at_index(i)?;
    }
    let mut cases = Vec::with_capacity(datasets.len());
    let mut times = Vec::with_capacity(datasets.len());
    let mut fnames = Vec::with_capacity(datasets.len());

    for (i, dataset) in datasets.iter().enumerate() {
        let n = dataset.n_samples();
        let mut columns = Vec::with_capacity(signal_names.len());
        let mut units = Vec::with_capacity(signal_names.len());
        for name in signal_names {
            match get_signal_from_dataset(name.as_ref(), dataset) {
                Ok((_, values, unit)) => {
                    columns.push(values.to_vec());
                    units.push(unit);
                }
                Err(err) if err.is_not_found() => {
                    columns.push(vec![f64::NAN; n]);
                    units.push(String::new());
                }
                Err(err) => return Err(err.at_index(i)),
            }
        }
        let values = Array2::from_shape_fn((n, columns.len()), |(r, c)| columns[c][r]);
        cases.push(SignalGroup {
            layers: NameLayers::single(signal_names),
            values,
            units,
            descriptions: vec![String::new(); signal_names.len()],
        });
        let time = dataset
            .time()
            .cloned()
            .ok_or_else(|| VtoolError::invalid_input("datasets", "missing time group"))
            .at_index(i)?;
        times.push(time);
        fnames.push(case_name(dataset, i));
    }

    let lists: Vec<&[String]> = cases.iter().map(|c| c.units.as_slice()).collect();
    let units = reconcile_units(&lists)?;
    for case in &mut cases {
        case.units = units.clone();
    }
    debug!(cases = cases.len(), signals = signal_names.len(), "collected signals");

    Ok(CollectedSignals {
        signals: SignalGroupArray::new(cases)?,
        times: Some(TimeSource::PerCase(SignalGroupArray::from_vec_unchecked(times))),
        fnames,
    })
}
