// src/model/array.rs
//! Homogeneous arrays of signal groups and datasets (one element per case)

use crate::error::{VtoolError, VtoolResult};
use crate::model::dataset::Dataset;
use crate::model::signal_group::SignalGroup;
use crate::validation::{check_dataset_array, check_signal_group_array};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Cases sharing name layers, names, units and M; N may differ per case.
///
/// Deserialization goes through [`SignalGroupArray::new`], so a file cannot smuggle in
/// malformed or mismatched cases.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<SignalGroup>", into = "Vec<SignalGroup>")]
pub struct SignalGroupArray {
    elements: Vec<SignalGroup>,
}

impl SignalGroupArray {
    /// Build an array, checking homogeneity once at construction
    pub fn new(elements: Vec<SignalGroup>) -> VtoolResult<Self> {
        let validity = check_signal_group_array(&elements, false);
        if !validity.is_valid {
            return Err(VtoolError::incompatible("signal group array", validity.reason));
        }
        Ok(Self { elements })
    }

    /// Wrap elements without checking; [`crate::validation`] can audit later
    pub fn from_vec_unchecked(elements: Vec<SignalGroup>) -> Self {
        Self { elements }
    }

    /// Number of cases
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True without any case
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Case `index`, if present
    pub fn get(&self, index: usize) -> Option<&SignalGroup> {
        self.elements.get(index)
    }

    /// Cases in order
    pub fn iter(&self) -> std::slice::Iter<'_, SignalGroup> {
        self.elements.iter()
    }

    /// Cases as a slice
    pub fn as_slice(&self) -> &[SignalGroup] {
        &self.elements
    }

    /// Unwrap into the underlying cases
    pub fn into_vec(self) -> Vec<SignalGroup> {
        self.elements
    }

    /// Common sample count, if every case has the same N
    pub fn uniform_len(&self) -> Option<usize> {
        let first = self.elements.first()?.n_samples();
        self.elements.iter().all(|g| g.n_samples() == first).then_some(first)
    }

    /// M (0 for an empty array)
    pub fn n_signals(&self) -> usize {
        self.elements.first().map_or(0, SignalGroup::n_signals)
    }

    /// Keep only the cases whose positions are listed, in the given order
    pub fn select_cases(&self, cases: &[usize]) -> Self {
        Self {
            elements: cases.iter().filter_map(|&i| self.elements.get(i).cloned()).collect(),
        }
    }
}

impl Index<usize> for SignalGroupArray {
    type Output = SignalGroup;

    fn index(&self, index: usize) -> &SignalGroup {
        &self.elements[index]
    }
}

impl<'a> IntoIterator for &'a SignalGroupArray {
    type Item = &'a SignalGroup;
    type IntoIter = std::slice::Iter<'a, SignalGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

/// Cases sharing the group-field set and per-group names/units; N may differ per case
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Dataset>", into = "Vec<Dataset>")]
pub struct DatasetArray {
    elements: Vec<Dataset>,
}

impl DatasetArray {
    /// Build an array, checking every dataset and their homogeneity
    pub fn new(elements: Vec<Dataset>) -> VtoolResult<Self> {
        let validity = check_dataset_array(&elements, false);
        if !validity.is_valid {
            return Err(VtoolError::incompatible("dataset array", validity.reason));
        }
        Ok(Self { elements })
    }

    /// Wrap datasets without checking them
    pub fn from_vec_unchecked(elements: Vec<Dataset>) -> Self {
        Self { elements }
    }

    /// Number of cases
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True without any case
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Case `index`, if present
    pub fn get(&self, index: usize) -> Option<&Dataset> {
        self.elements.get(index)
    }

    /// Cases in order
    pub fn iter(&self) -> std::slice::Iter<'_, Dataset> {
        self.elements.iter()
    }

    /// Cases as a slice
    pub fn as_slice(&self) -> &[Dataset] {
        &self.elements
    }

    /// Unwrap into the underlying datasets
    pub fn into_vec(self) -> Vec<Dataset> {
        self.elements
    }
}

impl Index<usize> for DatasetArray {
    type Output = Dataset;

    fn index(&self, index: usize) -> &Dataset {
        &self.elements[index]
    }
}

impl<'a> IntoIterator for &'a DatasetArray {
    type Item = &'a Dataset;
    type IntoIter = std::slice::Iter<'a, Dataset>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl TryFrom<Vec<SignalGroup>> for SignalGroupArray {
    type Error = VtoolError;

    fn try_from(elements: Vec<SignalGroup>) -> VtoolResult<Self> {
        Self::new(elements)
    }
}

impl From<SignalGroupArray> for Vec<SignalGroup> {
    fn from(array: SignalGroupArray) -> Self {
        array.elements
    }
}

impl TryFrom<Vec<Dataset>> for DatasetArray {
    type Error = VtoolError;

    fn try_from(elements: Vec<Dataset>) -> VtoolResult<Self> {
        Self::new(elements)
    }
}

impl From<DatasetArray> for Vec<Dataset> {
    fn from(array: DatasetArray) -> Self {
        array.elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(n: usize, unit: &str) -> SignalGroup {
        SignalGroup::from_columns(&["a"], &[vec![1.0; n]], &[unit]).unwrap()
    }

    #[test]
    fn test_lengths_may_differ() {
        let arr = SignalGroupArray::new(vec![case(3, "m"), case(5, "m")]).unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.uniform_len(), None);
        assert_eq!(arr.n_signals(), 1);
    }

    #[test]
    fn test_units_must_match() {
        let err = SignalGroupArray::new(vec![case(3, "m"), case(3, "ft")]).unwrap_err();
        assert!(err.is_incompatible());
        assert!(err.to_string().contains("element 1"));
    }

    #[test]
    fn test_deserialization_checks_cases() {
        let arr = SignalGroupArray::new(vec![case(2, "m"), case(3, "m")]).unwrap();
        let json = serde_json::to_value(&arr).unwrap();
        assert_eq!(serde_json::from_value::<SignalGroupArray>(json.clone()).unwrap(), arr);

        let mut mixed = json;
        mixed[1]["Units"] = serde_json::json!(["ft"]);
        let err = serde_json::from_value::<SignalGroupArray>(mixed).unwrap_err();
        assert!(err.to_string().contains("element 1"));
    }

    #[test]
    fn test_select_cases_preserves_requested_order() {
        let arr = SignalGroupArray::new(vec![case(1, "m"), case(2, "m"), case(3, "m")]).unwrap();
        let picked = arr.select_cases(&[2, 0]);
        assert_eq!(picked[0].n_samples(), 3);
        assert_eq!(picked[1].n_samples(), 1);
    }
}
