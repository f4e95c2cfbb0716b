// src/model/signal_group.rs
//! The atomic value type: M named signals sharing one sample axis of length N

use crate::config::constants::names;
use crate::error::{VtoolError, VtoolResult};
use crate::model::name_layers::{is_layer_name, NameLayers};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bundle of same-length signals with name layers, units and descriptions.
///
/// `values` is N×M (samples × signals). Fields are public so that callers can
/// build or patch groups directly; structural well-formedness is checked by
/// [`crate::validation`] rather than enforced by the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SignalGroupRepr", into = "SignalGroupRepr")]
pub struct SignalGroup {
    /// Naming conventions, one name per signal on each
    pub layers: NameLayers,
    /// Samples, N rows by M signal columns
    pub values: Array2<f64>,
    /// One unit per signal
    pub units: Vec<String>,
    /// One description per signal
    pub descriptions: Vec<String>,
}

impl SignalGroup {
    /// Build a group and check the length invariants
    pub fn new(
        layers: NameLayers,
        values: Array2<f64>,
        units: Vec<String>,
        descriptions: Vec<String>,
    ) -> VtoolResult<Self> {
        let group = Self { layers, values, units, descriptions };
        let validity = crate::validation::check_signal_group(&group);
        if !validity.is_valid {
            return Err(VtoolError::invalid_input("signal group", validity.reason));
        }
        Ok(group)
    }

    /// Build a single-layer group from per-signal columns
    pub fn from_columns<S: AsRef<str>>(
        names: &[S],
        columns: &[Vec<f64>],
        units: &[S],
    ) -> VtoolResult<Self> {
        if columns.len() != names.len() {
            return Err(VtoolError::invalid_input(
                "columns",
                format!("{} columns for {} names", columns.len(), names.len()),
            ));
        }
        let n = columns.first().map_or(0, Vec::len);
        if let Some((j, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != n) {
            return Err(VtoolError::invalid_input(
                "columns",
                format!("column {} has {} samples, expected {}", j, col.len(), n),
            ));
        }
        let values = Array2::from_shape_fn((n, columns.len()), |(i, j)| columns[j][i]);
        Self::new(
            NameLayers::single(names),
            values,
            units.iter().map(|u| u.as_ref().to_string()).collect(),
            vec![String::new(); names.len()],
        )
    }

    /// Group with zero signals but `n_samples` rows
    pub fn empty(n_samples: usize) -> Self {
        Self::empty_with_layers(n_samples, &NameLayers::single::<&str>(&[]))
    }

    /// Group with zero signals, `n_samples` rows and the layer set of `layers`
    pub fn empty_with_layers(n_samples: usize, layers: &NameLayers) -> Self {
        Self {
            layers: layers.empty_like(),
            values: Array2::zeros((n_samples, 0)),
            units: Vec::new(),
            descriptions: Vec::new(),
        }
    }

    /// Time group holding elapsed seconds
    pub fn time(samples: Vec<f64>) -> Self {
        Self::single_column(names::TIME_SIGNAL, samples, "s")
    }

    /// Index group holding sample numbers 0..n
    pub fn index(n_samples: usize) -> Self {
        Self::single_column(names::INDEX_SIGNAL, (0..n_samples).map(|i| i as f64).collect(), "")
    }

    fn single_column(name: &str, samples: Vec<f64>, unit: &str) -> Self {
        let n = samples.len();
        Self {
            layers: NameLayers::single(&[name]),
            values: Array2::from_shape_vec((n, 1), samples)
                .unwrap_or_else(|_| Array2::zeros((n, 1))),
            units: vec![unit.to_string()],
            descriptions: vec![String::new()],
        }
    }

    /// N
    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    /// M
    pub fn n_signals(&self) -> usize {
        self.values.ncols()
    }

    /// True when there is no signal
    pub fn is_empty(&self) -> bool {
        self.n_signals() == 0
    }

    /// View of column `index`, if in range
    pub fn column(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.n_signals()).then(|| self.values.column(index))
    }

    /// All rows matching `name` on any layer
    pub fn find(&self, name: &str) -> Vec<usize> {
        self.layers.resolve(name)
    }

    /// Name of every signal on the primary layer
    pub fn primary_names(&self) -> Vec<String> {
        self.layers.primary_names()
    }

    /// Layer names in order
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.layer_names()
    }

    /// Copy of the group restricted to the given sample rows
    pub fn select_samples(&self, rows: &[usize]) -> Self {
        Self {
            layers: self.layers.clone(),
            values: self.values.select(Axis(0), rows),
            units: self.units.clone(),
            descriptions: self.descriptions.clone(),
        }
    }

    /// Copy of the group restricted to the given signal columns, in order
    pub fn select_columns(&self, cols: &[usize]) -> Self {
        Self {
            layers: self.layers.select_rows(cols),
            values: self.values.select(Axis(1), cols),
            units: cols.iter().map(|&j| self.units.get(j).cloned().unwrap_or_default()).collect(),
            descriptions: cols
                .iter()
                .map(|&j| self.descriptions.get(j).cloned().unwrap_or_default())
                .collect(),
        }
    }

    /// Names, units and descriptions only (zero samples); used as a lookup reference
    pub fn header(&self) -> Self {
        Self {
            layers: self.layers.clone(),
            values: Array2::zeros((0, self.n_signals())),
            units: self.units.clone(),
            descriptions: self.descriptions.clone(),
        }
    }

    /// Column `j` as an owned vector
    pub fn column_vec(&self, j: usize) -> Vec<f64> {
        self.values.column(j).to_vec()
    }

    pub(crate) fn nan_column(n: usize) -> Array1<f64> {
        Array1::from_elem(n, f64::NAN)
    }
}

/// On-disk layout: layer fields ending in `Names`, plus `Values`, `Units`, `Descriptions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SignalGroupRepr {
    #[serde(rename = "Values")]
    values: Vec<Vec<Option<f64>>>,
    #[serde(rename = "Units")]
    units: Vec<String>,
    #[serde(rename = "Descriptions")]
    descriptions: Vec<String>,
    #[serde(flatten)]
    layers: BTreeMap<String, Vec<String>>,
}

impl TryFrom<SignalGroupRepr> for SignalGroup {
    type Error = String;

    fn try_from(repr: SignalGroupRepr) -> Result<Self, Self::Error> {
        if repr.layers.is_empty() {
            return Err(format!("no name layer (field ending in '{}')", names::LAYER_SUFFIX));
        }
        if let Some(bad) = repr.layers.keys().find(|k| !is_layer_name(k)) {
            return Err(format!("unexpected field '{}'", bad));
        }

        let n = repr.values.len();
        let m = repr.values.first().map_or(repr.units.len(), Vec::len);
        if let Some(i) = repr.values.iter().position(|row| row.len() != m) {
            return Err(format!("ragged Values: row {} has {} entries, expected {}", i, repr.values[i].len(), m));
        }
        let flat: Vec<f64> = repr
            .values
            .into_iter()
            .flatten()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        let values = Array2::from_shape_vec((n, m), flat).map_err(|e| e.to_string())?;

        // default layer first, the rest in key order
        let mut layers = NameLayers::new();
        let mut entries: Vec<(String, Vec<String>)> = repr.layers.into_iter().collect();
        entries.sort_by_key(|(k, _)| k != names::DEFAULT_LAYER);
        for (layer, layer_names) in entries {
            layers.set_layer(&layer, layer_names);
        }

        Ok(SignalGroup {
            layers,
            values,
            units: repr.units,
            descriptions: repr.descriptions,
        })
    }
}

impl From<SignalGroup> for SignalGroupRepr {
    fn from(group: SignalGroup) -> Self {
        let values = group
            .values
            .outer_iter()
            .map(|row| row.iter().map(|&v| (!v.is_nan()).then_some(v)).collect())
            .collect();
        let layers = group
            .layers
            .iter()
            .map(|(layer, layer_names)| (layer.to_string(), layer_names.to_vec()))
            .collect();
        SignalGroupRepr {
            values,
            units: group.units,
            descriptions: group.descriptions,
            layers,
        }
    }
}
