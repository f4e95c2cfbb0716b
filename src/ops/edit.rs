// src/ops/edit.rs
//! Structural add / remove / replace of single signals
//!
//! Every function validates its arguments before touching the group, so a failed
//! call leaves the input unmodified.

use crate::config::constants::names;
use crate::error::{VtoolError, VtoolResult};
use crate::model::{Dataset, SignalGroup};
use crate::ops::select::SignalRef;
use crate::validation::{check_dataset, check_signal_group};
use ndarray::{concatenate, Array1, Axis};
use tracing::debug;

/// New sample data for a signal
#[derive(Debug, Clone, PartialEq)]
pub enum SignalData {
    /// Broadcast to every sample
    Scalar(f64),
    /// One value per sample
    Column(Vec<f64>),
}

impl SignalData {
    fn to_column(&self, n: usize, parameter: &str) -> VtoolResult<Array1<f64>> {
        match self {
            SignalData::Scalar(v) => Ok(Array1::from_elem(n, *v)),
            SignalData::Column(values) if values.len() == n => Ok(Array1::from(values.clone())),
            SignalData::Column(values) => Err(VtoolError::incompatible(
                parameter,
                format!("{} values for a group with {} samples", values.len(), n),
            )),
        }
    }
}

impl From<f64> for SignalData {
    fn from(v: f64) -> Self {
        SignalData::Scalar(v)
    }
}

impl From<Vec<f64>> for SignalData {
    fn from(v: Vec<f64>) -> Self {
        SignalData::Column(v)
    }
}

/// Description of a signal to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewSignal {
    /// Name on [`NewSignal::layer`]
    pub name: String,
    /// Layer receiving the name; other layers get an empty name
    pub layer: String,
    /// Samples of the new signal
    pub data: SignalData,
    /// Unit, blank by default
    pub unit: String,
    /// Description, blank by default
    pub description: String,
}

impl NewSignal {
    /// Signal on the default layer with blank unit and description
    pub fn new(name: &str, data: impl Into<SignalData>) -> Self {
        Self {
            name: name.to_string(),
            layer: names::DEFAULT_LAYER.to_string(),
            data: data.into(),
            unit: String::new(),
            description: String::new(),
        }
    }

    /// Put the name on `layer`
    pub fn on_layer(mut self, layer: &str) -> Self {
        self.layer = layer.to_string();
        self
    }

    /// Set the unit
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// Append one column. Untouched layers are padded with an empty name.
pub fn add_signal_to_group(group: &mut SignalGroup, signal: NewSignal) -> VtoolResult<usize> {
    check_signal_group(group).into_result("group")?;
    if signal.name.is_empty() {
        return Err(VtoolError::invalid_input("name", "cannot add a signal with an empty name"));
    }
    if !crate::model::name_layers::is_layer_name(&signal.layer) {
        return Err(VtoolError::invalid_input(
            "layer",
            format!("layer name '{}' must end with '{}'", signal.layer, names::LAYER_SUFFIX),
        ));
    }
    let n = group.n_samples();
    let column = signal.data.to_column(n, "data")?;

    let column = column.insert_axis(Axis(1));
    group.values = concatenate(Axis(1), &[group.values.view(), column.view()])
        .map_err(|e| VtoolError::incompatible("data", e.to_string()))?;
    group.layers.push_row(&signal.layer, &signal.name);
    group.units.push(signal.unit);
    group.descriptions.push(signal.description);
    Ok(group.n_signals() - 1)
}

fn resolve_refs(group: &SignalGroup, refs: &[SignalRef]) -> VtoolResult<Vec<usize>> {
    let m = group.n_signals();
    let mut rows = Vec::new();
    for r in refs {
        match r {
            SignalRef::Name(name) => {
                let found = group.find(name);
                if found.is_empty() {
                    return Err(VtoolError::not_found(name.clone(), "signal group"));
                }
                rows.extend(found);
            }
            SignalRef::Index(i) if *i < m => rows.push(*i),
            SignalRef::Index(i) => {
                return Err(VtoolError::invalid_input(
                    "indices",
                    format!("index {} out of range for group with {} signals", i, m),
                ))
            }
        }
    }
    rows.sort_unstable();
    rows.dedup();
    Ok(rows)
}

/// Remove every column matching the given names (all instances) or indices.
/// Returns the number of removed columns.
pub fn remove_from_group(group: &mut SignalGroup, refs: &[SignalRef]) -> VtoolResult<usize> {
    check_signal_group(group).into_result("group")?;
    let rows = resolve_refs(group, refs)?;
    let keep: Vec<usize> = (0..group.n_signals()).filter(|j| !rows.contains(j)).collect();
    group.values = group.values.select(Axis(1), &keep);
    group.layers.remove_rows(&rows);
    group.units = keep.iter().map(|&j| group.units[j].clone()).collect();
    group.descriptions = keep.iter().map(|&j| group.descriptions[j].clone()).collect();
    Ok(rows.len())
}

/// Overwrite the data of every column matching `name`.
/// Fails with `NotFound` when nothing matches; returns the number of replaced columns.
pub fn replace_signal_in_group(group: &mut SignalGroup, name: &str, data: &SignalData) -> VtoolResult<usize> {
    check_signal_group(group).into_result("group")?;
    let rows = group.find(name);
    if rows.is_empty() {
        return Err(VtoolError::not_found(name, "signal group"));
    }
    let column = data.to_column(group.n_samples(), "data")?;
    for &j in &rows {
        group.values.column_mut(j).assign(&column);
    }
    Ok(rows.len())
}

/// Non-failing variant of [`replace_signal_in_group`] for unmatched names
pub fn try_replace_signal_in_group(group: &mut SignalGroup, name: &str, data: &SignalData) -> VtoolResult<bool> {
    match replace_signal_in_group(group, name, data) {
        Ok(_) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err),
    }
}

/// Remove every column matching `name` and append `signal` in its place
pub fn swap_signal_in_group(group: &mut SignalGroup, name: &str, signal: NewSignal) -> VtoolResult<usize> {
    check_signal_group(group).into_result("group")?;
    if group.find(name).is_empty() {
        return Err(VtoolError::not_found(name, "signal group"));
    }
    signal.data.to_column(group.n_samples(), "data")?;
    let mut updated = group.clone();
    remove_from_group(&mut updated, &[SignalRef::Name(name.to_string())])?;
    let index = add_signal_to_group(&mut updated, signal)?;
    *group = updated;
    Ok(index)
}

/// Overwrite every matching column in every non-time group of a dataset.
/// Returns the number of replaced columns; `NotFound` if none matched.
pub fn replace_signal_in_dataset(dataset: &mut Dataset, name: &str, data: &SignalData) -> VtoolResult<usize> {
    check_dataset(dataset).into_result("dataset")?;
    let n = dataset.n_samples();
    let column = data.to_column(n, "data")?;
    let mut replaced = 0;
    for (group_name, group) in dataset.groups.iter_mut() {
        if group_name == names::TIME_GROUP {
            continue;
        }
        for j in group.find(name) {
            group.values.column_mut(j).assign(&column);
            replaced += 1;
        }
    }
    if replaced == 0 {
        return Err(VtoolError::not_found(name, "dataset"));
    }
    debug!(signal = name, columns = replaced, "replaced signal in dataset");
    Ok(replaced)
}

/// Non-failing variant of [`replace_signal_in_dataset`]
pub fn try_replace_signal_in_dataset(dataset: &mut Dataset, name: &str, data: &SignalData) -> VtoolResult<bool> {
    match replace_signal_in_dataset(dataset, name, data) {
        Ok(_) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err),
    }
}

/// Remove `name` from whichever groups hold it and add `signal` to group `target`
pub fn swap_signal_in_dataset(
    dataset: &mut Dataset,
    name: &str,
    target: &str,
    signal: NewSignal,
) -> VtoolResult<usize> {
    check_dataset(dataset).into_result("dataset")?;
    if !dataset.contains_group(target) {
        return Err(VtoolError::not_found(target, "dataset groups"));
    }
    signal.data.to_column(dataset.n_samples(), "data")?;
    let mut updated = dataset.clone();
    let mut removed = 0;
    for (group_name, group) in updated.groups.iter_mut() {
        if group_name != names::TIME_GROUP && !group.find(name).is_empty() {
            removed += remove_from_group(group, &[SignalRef::Name(name.to_string())])?;
        }
    }
    if removed == 0 {
        return Err(VtoolError::not_found(name, "dataset"));
    }
    let group = updated
        .group_mut(target)
        .ok_or_else(|| VtoolError::not_found(target, "dataset groups"))?;
    let index = add_signal_to_group(group, signal)?;
    *dataset = updated;
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::check_signal_group;

    fn group() -> SignalGroup {
        let mut g = SignalGroup::from_columns(
            &["a", "b", "a"],
            &[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            &["m", "s", "m"],
        )
        .unwrap();
        g.layers.set_layer("ShortNames", vec!["A".into(), "B".into(), "".into()]);
        g
    }

    fn assert_invariants(g: &SignalGroup) {
        let m = g.n_signals();
        assert_eq!(g.units.len(), m);
        assert_eq!(g.descriptions.len(), m);
        assert!(g.layers.all_have_len(m));
        assert!(check_signal_group(g).is_valid);
    }

    #[test]
    fn test_add_pads_other_layers() {
        let mut g = group();
        let idx = add_signal_to_group(&mut g, NewSignal::new("c", vec![7.0, 8.0]).with_unit("kg")).unwrap();
        assert_eq!(idx, 3);
        assert_eq!(g.layers.layer("ShortNames").unwrap()[3], "");
        assert_eq!(g.units[3], "kg");
        assert_invariants(&g);
    }

    #[test]
    fn test_add_scalar_broadcasts() {
        let mut g = group();
        add_signal_to_group(&mut g, NewSignal::new("z", 0.5)).unwrap();
        assert_eq!(g.column_vec(3), vec![0.5, 0.5]);
    }

    #[test]
    fn test_add_wrong_length_leaves_group_untouched() {
        let mut g = group();
        let before = g.clone();
        assert!(add_signal_to_group(&mut g, NewSignal::new("c", vec![1.0])).is_err());
        assert_eq!(g, before);
    }

    #[test]
    fn test_remove_all_instances() {
        let mut g = group();
        assert_eq!(remove_from_group(&mut g, &[SignalRef::from("a")]).unwrap(), 2);
        assert_eq!(g.primary_names(), vec!["b"]);
        assert_eq!(g.units, vec!["s"]);
        assert_invariants(&g);

        assert!(remove_from_group(&mut g, &[SignalRef::from("a")]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_malformed_group_is_refused_untouched() {
        let mut g = group();
        g.units.pop();
        let before = g.clone();

        let err = remove_from_group(&mut g, &[SignalRef::from("a")]).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("Units"));
        assert_eq!(g, before);

        assert!(add_signal_to_group(&mut g, NewSignal::new("c", 1.0)).unwrap_err().is_invalid_input());
        assert!(replace_signal_in_group(&mut g, "a", &SignalData::Scalar(0.0)).unwrap_err().is_invalid_input());
        assert!(swap_signal_in_group(&mut g, "a", NewSignal::new("c", 1.0)).unwrap_err().is_invalid_input());
        assert_eq!(g, before);
    }

    #[test]
    fn test_malformed_dataset_is_refused() {
        let mut ds = Dataset::from_time(vec![0.0, 1.0]);
        ds.insert_group("G", SignalGroup::from_columns(&["a"], &[vec![1.0, 2.0]], &[""]).unwrap())
            .unwrap();
        ds.group_mut("G").unwrap().descriptions.clear();
        let before = ds.clone();

        let err = replace_signal_in_dataset(&mut ds, "a", &SignalData::Scalar(0.0)).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(swap_signal_in_dataset(&mut ds, "a", "G", NewSignal::new("b", 0.0)).unwrap_err().is_invalid_input());
        assert_eq!(ds, before);
    }

    #[test]
    fn test_replace_all_matches() {
        let mut g = group();
        assert_eq!(replace_signal_in_group(&mut g, "a", &SignalData::Scalar(0.0)).unwrap(), 2);
        assert_eq!(g.column_vec(0), vec![0.0, 0.0]);
        assert_eq!(g.column_vec(2), vec![0.0, 0.0]);
        assert_eq!(g.column_vec(1), vec![3.0, 4.0]);
        assert_invariants(&g);
    }

    #[test]
    fn test_replace_missing() {
        let mut g = group();
        let err = replace_signal_in_group(&mut g, "zz", &SignalData::Scalar(0.0)).unwrap_err();
        assert!(err.is_not_found());
        assert!(!try_replace_signal_in_group(&mut g, "zz", &SignalData::Scalar(0.0)).unwrap());
    }

    #[test]
    fn test_swap_renames_on_layer() {
        let mut g = group();
        swap_signal_in_group(&mut g, "B", NewSignal::new("bb", vec![9.0, 9.0]).on_layer("ShortNames")).unwrap();
        assert_eq!(g.n_signals(), 3);
        assert_eq!(g.layers.layer("ShortNames").unwrap()[2], "bb");
        assert_eq!(g.layers.layer("Names").unwrap()[2], "");
        assert_invariants(&g);
    }

    #[test]
    fn test_dataset_replace_and_swap() {
        let mut ds = Dataset::from_time(vec![0.0, 1.0]);
        ds.insert_group("G", SignalGroup::from_columns(&["a", "b"], &[vec![1.0, 2.0], vec![3.0, 4.0]], &["", ""]).unwrap())
            .unwrap();
        assert_eq!(replace_signal_in_dataset(&mut ds, "b", &SignalData::Column(vec![0.0, 1.0])).unwrap(), 1);
        assert!(!try_replace_signal_in_dataset(&mut ds, "Time", &SignalData::Scalar(1.0)).unwrap());

        swap_signal_in_dataset(&mut ds, "a", "G", NewSignal::new("a2", 2.0)).unwrap();
        assert_eq!(ds.group("G").unwrap().primary_names(), vec!["b", "a2"]);
    }
}
