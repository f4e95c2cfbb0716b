// src/ops/select.rs
//! Column selection by name or index

use crate::error::{VtoolError, VtoolResult, WithIndex};
use crate::model::{SignalGroup, SignalGroupArray};
use crate::validation::check_signal_group;
use ndarray::Array2;

/// Reference to one signal of a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalRef {
    /// Name on any layer
    Name(String),
    /// Column index
    Index(usize),
}

impl From<&str> for SignalRef {
    fn from(name: &str) -> Self {
        SignalRef::Name(name.to_string())
    }
}

impl From<String> for SignalRef {
    fn from(name: String) -> Self {
        SignalRef::Name(name)
    }
}

impl From<usize> for SignalRef {
    fn from(index: usize) -> Self {
        SignalRef::Index(index)
    }
}

/// Build a list of name references
pub fn names<S: AsRef<str>>(names: &[S]) -> Vec<SignalRef> {
    names.iter().map(|n| SignalRef::Name(n.as_ref().to_string())).collect()
}

/// Result of [`select_from_group`]
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// One column per request, in request order
    pub group: SignalGroup,
    /// False where the request had no match and a NaN placeholder was inserted
    pub matched: Vec<bool>,
    /// Source column of each request
    pub indices: Vec<Option<usize>>,
}

/// Select one column per requested name or index.
///
/// Names resolve to their primary instance, so a duplicated request yields the same
/// source column twice. An unmatched name becomes an all-NaN column carrying the
/// requested name on every layer with blank unit and description.
pub fn select_from_group(requests: &[SignalRef], group: &SignalGroup) -> VtoolResult<Selection> {
    check_signal_group(group).into_result("group")?;
    let n = group.n_samples();
    let m = group.n_signals();

    let mut indices = Vec::with_capacity(requests.len());
    for request in requests {
        match request {
            SignalRef::Name(name) => indices.push(group.layers.resolve_primary(name)),
            SignalRef::Index(i) if *i < m => indices.push(Some(*i)),
            SignalRef::Index(i) => {
                return Err(VtoolError::invalid_input(
                    "indices",
                    format!("index {} out of range for group with {} signals", i, m),
                ))
            }
        }
    }

    let mut layers = group.layers.empty_like();
    let mut values = Array2::from_elem((n, requests.len()), f64::NAN);
    let mut units = Vec::with_capacity(requests.len());
    let mut descriptions = Vec::with_capacity(requests.len());

    for (k, (request, source)) in requests.iter().zip(&indices).enumerate() {
        match source {
            Some(j) => {
                layers.push_row_from(&group.layers, *j);
                values.column_mut(k).assign(&group.values.column(*j));
                units.push(group.units[*j].clone());
                descriptions.push(group.descriptions[*j].clone());
            }
            None => {
                let name = match request {
                    SignalRef::Name(name) => name.as_str(),
                    SignalRef::Index(_) => "",
                };
                layers.push_row_all(name);
                units.push(String::new());
                descriptions.push(String::new());
            }
        }
    }

    Ok(Selection {
        matched: indices.iter().map(Option::is_some).collect(),
        group: SignalGroup { layers, values, units, descriptions },
        indices,
    })
}

/// Select the same signals from every case of an array; the result is name-aligned
pub fn select_from_array(requests: &[SignalRef], array: &SignalGroupArray) -> VtoolResult<(SignalGroupArray, Vec<Vec<bool>>)> {
    let mut groups = Vec::with_capacity(array.len());
    let mut matched = Vec::with_capacity(array.len());
    for (i, group) in array.iter().enumerate() {
        let selection = select_from_group(requests, group).at_index(i)?;
        groups.push(selection.group);
        matched.push(selection.matched);
    }
    // placeholders carry the requested name on every layer, so units may still differ
    Ok((SignalGroupArray::from_vec_unchecked(groups), matched))
}
