// src/validation/mod.rs
//! Structural validity predicates and name lookup
//!
//! Predicates never fail: they return a [`Validity`] report whose `reason` names the
//! first violated invariant. Operations that would break an invariant call them and
//! turn an invalid report into an error at that point.

pub mod lookup;

pub use lookup::*;

use crate::config::constants::names;
use crate::error::{VtoolError, VtoolResult};
use crate::model::name_layers::is_layer_name;
use crate::model::{Dataset, DatasetArray, SignalGroup, SignalGroupArray};
use serde_json::Value;

/// Outcome of a structural check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validity {
    /// The value has the shape of the checked type
    pub is_type: bool,
    /// Every invariant of the checked type holds
    pub is_valid: bool,
    /// Diagnostic for the first failure; empty when valid
    pub reason: String,
}

impl Validity {
    /// Passing report
    pub fn valid() -> Self {
        Self { is_type: true, is_valid: true, reason: String::new() }
    }

    /// Right type, broken invariant
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self { is_type: true, is_valid: false, reason: reason.into() }
    }

    /// Not the expected type at all
    pub fn not_type(reason: impl Into<String>) -> Self {
        Self { is_type: false, is_valid: false, reason: reason.into() }
    }

    /// `Ok` when valid, otherwise `InvalidInput` on `parameter` carrying the reason
    pub fn into_result(self, parameter: &str) -> VtoolResult<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(VtoolError::invalid_input(parameter, self.reason))
        }
    }

    fn prefixed(self, prefix: &str) -> Self {
        if self.is_valid {
            self
        } else {
            Self { reason: format!("{}: {}", prefix, self.reason), ..self }
        }
    }
}

/// Types whose structural invariants can be audited
pub trait Validate {
    /// Structural report
    fn validity(&self) -> Validity;

    /// True when [`Validate::validity`] passes
    fn is_valid(&self) -> bool {
        self.validity().is_valid
    }
}

impl Validate for SignalGroup {
    fn validity(&self) -> Validity {
        check_signal_group(self)
    }
}

impl Validate for Dataset {
    fn validity(&self) -> Validity {
        check_dataset(self)
    }
}

impl Validate for SignalGroupArray {
    fn validity(&self) -> Validity {
        check_signal_group_array(self.as_slice(), false)
    }
}

impl Validate for DatasetArray {
    fn validity(&self) -> Validity {
        check_dataset_array(self.as_slice(), false)
    }
}

/// Check layer, units and descriptions lengths against the column count of `Values`
pub fn check_signal_group(group: &SignalGroup) -> Validity {
    let m = group.n_signals();
    if group.layers.layer_count() == 0 {
        return Validity::invalid("no name layers");
    }
    for (layer, layer_names) in group.layers.iter() {
        if !is_layer_name(layer) {
            return Validity::invalid(format!(
                "layer '{}' does not end with '{}'",
                layer,
                names::LAYER_SUFFIX
            ));
        }
        if layer_names.len() != m {
            return Validity::invalid(format!(
                "layer '{}' has {} names but Values has {} columns",
                layer,
                layer_names.len(),
                m
            ));
        }
    }
    if group.units.len() != m {
        return Validity::invalid(format!(
            "Units has {} entries but Values has {} columns",
            group.units.len(),
            m
        ));
    }
    if group.descriptions.len() != m {
        return Validity::invalid(format!(
            "Descriptions has {} entries but Values has {} columns",
            group.descriptions.len(),
            m
        ));
    }
    Validity::valid()
}

/// A time group has exactly one signal named `Time` or `Index` on every layer
pub fn check_time_group(group: &SignalGroup) -> Validity {
    let base = check_signal_group(group);
    if !base.is_valid {
        return base;
    }
    if group.n_signals() != 1 {
        return Validity::invalid(format!("time group has {} signals, expected 1", group.n_signals()));
    }
    for (layer, layer_names) in group.layers.iter() {
        let name = layer_names[0].as_str();
        if name != names::TIME_SIGNAL && name != names::INDEX_SIGNAL {
            return Validity::invalid(format!(
                "time signal is named '{}' on layer '{}', expected '{}' or '{}'",
                name,
                layer,
                names::TIME_SIGNAL,
                names::INDEX_SIGNAL
            ));
        }
    }
    Validity::valid()
}

/// Check the time group, per-group validity, shared N and shared layer set
pub fn check_dataset(dataset: &Dataset) -> Validity {
    let Some(time) = dataset.time() else {
        return Validity::invalid(format!("missing '{}' group", names::TIME_GROUP));
    };
    let tv = check_time_group(time);
    if !tv.is_valid {
        return tv.prefixed(names::TIME_GROUP);
    }
    let n = time.n_samples();
    for (i, (name, group)) in dataset.groups.iter().enumerate() {
        if dataset.groups[..i].iter().any(|(other, _)| other == name) {
            return Validity::invalid(format!("duplicate group '{}'", name));
        }
        if dataset.attributes.contains_key(name) {
            return Validity::invalid(format!("'{}' is both a group and an attribute", name));
        }
        let gv = check_signal_group(group);
        if !gv.is_valid {
            return gv.prefixed(&format!("group '{}'", name));
        }
        if group.n_samples() != n {
            return Validity::invalid(format!(
                "group '{}' has {} samples but Time has {}",
                name,
                group.n_samples(),
                n
            ));
        }
        if !group.layers.same_layer_set(&time.layers) {
            return Validity::invalid(format!(
                "group '{}' has layers [{}] but Time has [{}]",
                name,
                group.layer_names().join(", "),
                time.layer_names().join(", ")
            ));
        }
    }
    Validity::valid()
}

/// Check every element and their homogeneity (layers, names, units, M).
/// Equal N is only required when `require_uniform_len` is set.
pub fn check_signal_group_array(elements: &[SignalGroup], require_uniform_len: bool) -> Validity {
    let Some(first) = elements.first() else {
        return Validity::valid();
    };
    for (i, group) in elements.iter().enumerate() {
        let gv = check_signal_group(group);
        if !gv.is_valid {
            return gv.prefixed(&format!("element {}", i));
        }
        if let Some(reason) = homogeneity_mismatch(first, group) {
            return Validity::invalid(format!("element {}: {}", i, reason));
        }
        if require_uniform_len && group.n_samples() != first.n_samples() {
            return Validity::invalid(format!(
                "element {}: {} samples, element 0 has {}",
                i,
                group.n_samples(),
                first.n_samples()
            ));
        }
    }
    Validity::valid()
}

/// Check every dataset and that all share the same groups with matching names and units
pub fn check_dataset_array(elements: &[Dataset], require_uniform_len: bool) -> Validity {
    let Some(first) = elements.first() else {
        return Validity::valid();
    };
    for (i, dataset) in elements.iter().enumerate() {
        let dv = check_dataset(dataset);
        if !dv.is_valid {
            return dv.prefixed(&format!("element {}", i));
        }
        let mut expected = first.group_names();
        let mut actual = dataset.group_names();
        expected.sort_unstable();
        actual.sort_unstable();
        if expected != actual {
            return Validity::invalid(format!(
                "element {}: groups [{}] differ from element 0 [{}]",
                i,
                actual.join(", "),
                expected.join(", ")
            ));
        }
        for (name, group) in &dataset.groups {
            if let Some(reference) = first.group(name) {
                if let Some(reason) = homogeneity_mismatch(reference, group) {
                    return Validity::invalid(format!("element {}: group '{}': {}", i, name, reason));
                }
            }
        }
        if require_uniform_len && dataset.n_samples() != first.n_samples() {
            return Validity::invalid(format!(
                "element {}: {} samples, element 0 has {}",
                i,
                dataset.n_samples(),
                first.n_samples()
            ));
        }
    }
    Validity::valid()
}

fn homogeneity_mismatch(reference: &SignalGroup, group: &SignalGroup) -> Option<String> {
    if group.n_signals() != reference.n_signals() {
        return Some(format!("{} signals, expected {}", group.n_signals(), reference.n_signals()));
    }
    if !group.layers.same_layer_set(&reference.layers) {
        return Some(format!(
            "layers [{}], expected [{}]",
            group.layer_names().join(", "),
            reference.layer_names().join(", ")
        ));
    }
    if !group.layers.same_names(&reference.layers) {
        return Some("signal names differ".to_string());
    }
    if group.units != reference.units {
        return Some(format!(
            "units [{}], expected [{}]",
            group.units.join(", "),
            reference.units.join(", ")
        ));
    }
    None
}

/// Type and validity check of a raw JSON value as a signal group
pub fn is_signal_group_value(value: &Value) -> Validity {
    let Some(obj) = value.as_object() else {
        return Validity::not_type("not an object");
    };
    for field in [names::VALUES_FIELD, names::UNITS_FIELD, names::DESCRIPTIONS_FIELD] {
        if !obj.contains_key(field) {
            return Validity::not_type(format!("missing field '{}'", field));
        }
    }
    if !obj.keys().any(|k| is_layer_name(k)) {
        return Validity::not_type(format!("no field ending in '{}'", names::LAYER_SUFFIX));
    }
    match serde_json::from_value::<SignalGroup>(value.clone()) {
        Ok(group) => check_signal_group(&group),
        Err(err) => Validity::invalid(err.to_string()),
    }
}

/// Type and validity check of a raw JSON value as a dataset
pub fn is_dataset_value(value: &Value) -> Validity {
    let Some(obj) = value.as_object() else {
        return Validity::not_type("not an object");
    };
    let Some(time) = obj.get(names::TIME_GROUP) else {
        return Validity::not_type(format!("missing '{}' group", names::TIME_GROUP));
    };
    if !is_signal_group_value(time).is_type {
        return Validity::not_type(format!("'{}' is not a signal group", names::TIME_GROUP));
    }
    match serde_json::from_value::<Dataset>(value.clone()) {
        Ok(dataset) => check_dataset(&dataset),
        Err(err) => Validity::invalid(err.to_string()),
    }
}

/// Type and validity check of a raw JSON array of signal groups
pub fn is_signal_group_array_value(value: &Value, require_uniform_len: bool) -> Validity {
    let Some(items) = value.as_array() else {
        return Validity::not_type("not an array");
    };
    let mut groups = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let v = is_signal_group_value(item);
        if !v.is_valid {
            return v.prefixed(&format!("element {}", i));
        }
        match serde_json::from_value::<SignalGroup>(item.clone()) {
            Ok(group) => groups.push(group),
            Err(err) => return Validity::invalid(format!("element {}: {}", i, err)),
        }
    }
    check_signal_group_array(&groups, require_uniform_len)
}

/// Type and validity check of a raw JSON array of datasets
pub fn is_dataset_array_value(value: &Value, require_uniform_len: bool) -> Validity {
    let Some(items) = value.as_array() else {
        return Validity::not_type("not an array");
    };
    let mut datasets = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let v = is_dataset_value(item);
        if !v.is_valid {
            return v.prefixed(&format!("element {}", i));
        }
        match serde_json::from_value::<Dataset>(item.clone()) {
            Ok(dataset) => datasets.push(dataset),
            Err(err) => return Validity::invalid(format!("element {}: {}", i, err)),
        }
    }
    check_dataset_array(&datasets, require_uniform_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group() -> SignalGroup {
        SignalGroup::from_columns(&["a", "b"], &[vec![1.0, 2.0], vec![3.0, 4.0]], &["m", "s"]).unwrap()
    }

    #[test]
    fn test_valid_group() {
        let v = check_signal_group(&group());
        assert!(v.is_type && v.is_valid);
        assert!(v.reason.is_empty());
    }

    #[test]
    fn test_units_length_mismatch() {
        let mut g = group();
        g.units.pop();
        let v = g.validity();
        assert!(v.is_type);
        assert!(!v.is_valid);
        assert!(v.reason.contains("Units"));
    }

    #[test]
    fn test_layer_length_mismatch() {
        let mut g = group();
        g.layers.set_layer("ShortNames", vec!["x".into()]);
        let v = check_signal_group(&g);
        assert!(!v.is_valid);
        assert!(v.reason.contains("ShortNames"));
    }

    #[test]
    fn test_time_group_names() {
        assert!(check_time_group(&SignalGroup::time(vec![0.0, 1.0])).is_valid);
        assert!(check_time_group(&SignalGroup::index(3)).is_valid);
        assert!(!check_time_group(&group()).is_valid);

        let mut t = SignalGroup::time(vec![0.0]);
        t.layers.set_layer("ShortNames", vec!["t".into()]);
        assert!(!check_time_group(&t).is_valid);
    }

    #[test]
    fn test_dataset_length_invariant() {
        let mut ds = Dataset::from_time(vec![0.0, 1.0]);
        ds.groups.push(("Bad".into(), SignalGroup::from_columns(&["x"], &[vec![1.0]], &[""]).unwrap()));
        let v = check_dataset(&ds);
        assert!(!v.is_valid);
        assert!(v.reason.contains("Bad"));
    }

    #[test]
    fn test_dataset_missing_time() {
        let ds = Dataset { groups: Vec::new(), attributes: Default::default() };
        assert!(!check_dataset(&ds).is_valid);
    }

    #[test]
    fn test_array_allows_different_lengths_unless_required() {
        let a = group();
        let b = SignalGroup::from_columns(&["a", "b"], &[vec![1.0], vec![3.0]], &["m", "s"]).unwrap();
        assert!(check_signal_group_array(&[a.clone(), b.clone()], false).is_valid);
        assert!(!check_signal_group_array(&[a, b], true).is_valid);
    }

    #[test]
    fn test_array_names_must_match() {
        let a = group();
        let b = SignalGroup::from_columns(&["a", "c"], &[vec![1.0], vec![3.0]], &["m", "s"]).unwrap();
        let v = check_signal_group_array(&[a, b], false);
        assert!(v.reason.starts_with("element 1"));
    }

    #[test]
    fn test_value_predicates() {
        let v = is_signal_group_value(&json!(42));
        assert!(!v.is_type);

        let v = is_signal_group_value(&json!({"Names": ["a"], "Values": [[1.0]], "Units": ["m"]}));
        assert!(!v.is_type);
        assert!(v.reason.contains("Descriptions"));

        let v = is_signal_group_value(&json!({
            "Names": ["a", "b"], "Values": [[1.0, 2.0]], "Units": ["m"], "Descriptions": ["", ""]
        }));
        assert!(v.is_type);
        assert!(!v.is_valid);

        let v = is_signal_group_value(&serde_json::to_value(group()).unwrap());
        assert!(v.is_valid);
    }

    #[test]
    fn test_dataset_value_predicate() {
        let ds = Dataset::from_time(vec![0.0, 1.0]);
        let v = is_dataset_value(&serde_json::to_value(&ds).unwrap());
        assert!(v.is_valid, "{}", v.reason);

        let v = is_dataset_value(&json!({"source": "x"}));
        assert!(!v.is_type);
    }
}
