// src/ops/mask.rs
//! Writing a scalar into selected rows of selected signals

use crate::config::constants::names::TIME_GROUP;
use crate::error::{VtoolError, VtoolResult};
use crate::model::{Dataset, SignalGroup};
use crate::ops::select::SignalRef;
use crate::validation::{check_dataset, check_signal_group};
use serde::{Deserialize, Serialize};

/// Which sample rows to touch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowSelector {
    /// Explicit row indices
    Indices(Vec<usize>),
    /// Boolean mask, one entry per row
    Mask(Vec<bool>),
    /// First row
    First,
    /// Last row
    Last,
    /// Every row
    All,
}

impl RowSelector {
    /// Parse one of the keywords `first`, `last`, `all`
    pub fn keyword(word: &str) -> VtoolResult<Self> {
        match word.to_ascii_lowercase().as_str() {
            "first" => Ok(RowSelector::First),
            "last" => Ok(RowSelector::Last),
            "all" => Ok(RowSelector::All),
            other => Err(VtoolError::invalid_input(
                "rows",
                format!("unknown keyword '{}', expected first, last or all", other),
            )),
        }
    }

    /// Concrete row indices for a group of `n` samples
    pub fn resolve(&self, n: usize) -> VtoolResult<Vec<usize>> {
        match self {
            RowSelector::Indices(rows) => {
                if let Some(bad) = rows.iter().find(|&&r| r >= n) {
                    return Err(VtoolError::invalid_input(
                        "rows",
                        format!("row {} out of range for {} samples", bad, n),
                    ));
                }
                Ok(rows.clone())
            }
            RowSelector::Mask(mask) if mask.len() == n => {
                Ok(mask.iter().enumerate().filter(|(_, keep)| **keep).map(|(i, _)| i).collect())
            }
            RowSelector::Mask(mask) => Err(VtoolError::invalid_input(
                "mask",
                format!("mask has {} entries for {} samples", mask.len(), n),
            )),
            RowSelector::First => Ok((n > 0).then_some(0).into_iter().collect()),
            RowSelector::Last => Ok(n.checked_sub(1).into_iter().collect()),
            RowSelector::All => Ok((0..n).collect()),
        }
    }
}

impl From<Vec<bool>> for RowSelector {
    fn from(mask: Vec<bool>) -> Self {
        RowSelector::Mask(mask)
    }
}

impl From<Vec<usize>> for RowSelector {
    fn from(rows: Vec<usize>) -> Self {
        RowSelector::Indices(rows)
    }
}

fn target_columns(group: &SignalGroup, signals: &[SignalRef]) -> VtoolResult<Vec<usize>> {
    if signals.is_empty() {
        return Ok((0..group.n_signals()).collect());
    }
    let mut columns = Vec::new();
    for signal in signals {
        match signal {
            SignalRef::Name(name) => {
                let found = group.find(name);
                if found.is_empty() {
                    return Err(VtoolError::not_found(name.clone(), "signal group"));
                }
                columns.extend(found);
            }
            SignalRef::Index(j) if *j < group.n_signals() => columns.push(*j),
            SignalRef::Index(j) => {
                return Err(VtoolError::invalid_input(
                    "signals",
                    format!("index {} out of range for {} signals", j, group.n_signals()),
                ))
            }
        }
    }
    Ok(columns)
}

fn write(group: &mut SignalGroup, columns: &[usize], rows: &[usize], value: f64) {
    for &j in columns {
        for &i in rows {
            group.values[[i, j]] = value;
        }
    }
}

/// Write `value` into the masked rows of `signals` (all signals when empty)
pub fn apply_mask(group: &mut SignalGroup, signals: &[SignalRef], mask: &[bool], value: f64) -> VtoolResult<usize> {
    apply_index(group, signals, &RowSelector::Mask(mask.to_vec()), value)
}

/// Write `value` into the selected rows of `signals` (all signals when empty).
/// Returns the number of written cells.
pub fn apply_index(group: &mut SignalGroup, signals: &[SignalRef], rows: &RowSelector, value: f64) -> VtoolResult<usize> {
    check_signal_group(group).into_result("group")?;
    let rows = rows.resolve(group.n_samples())?;
    let columns = target_columns(group, signals)?;
    write(group, &columns, &rows, value);
    Ok(rows.len() * columns.len())
}

/// Target of a dataset-wide mask
#[derive(Debug, Clone, PartialEq)]
pub enum MaskTarget {
    /// Named signals, wherever they occur outside the time group
    Signals(Vec<String>),
    /// Every signal of the named groups
    Groups(Vec<String>),
}

/// Write `value` into the selected rows of the targeted signals or groups of a dataset.
/// The time group is never written.
pub fn apply_index_to_dataset(
    dataset: &mut Dataset,
    target: &MaskTarget,
    rows: &RowSelector,
    value: f64,
) -> VtoolResult<usize> {
    check_dataset(dataset).into_result("dataset")?;
    let rows = rows.resolve(dataset.n_samples())?;
    let mut plan: Vec<(usize, Vec<usize>)> = Vec::new();
    match target {
        MaskTarget::Groups(names) => {
            for name in names {
                let pos = dataset
                    .groups
                    .iter()
                    .position(|(g, _)| g == name && g != TIME_GROUP)
                    .ok_or_else(|| VtoolError::not_found(name.clone(), "dataset groups"))?;
                plan.push((pos, (0..dataset.groups[pos].1.n_signals()).collect()));
            }
        }
        MaskTarget::Signals(names) => {
            for name in names {
                let mut found = false;
                for (pos, (group_name, group)) in dataset.groups.iter().enumerate() {
                    if group_name == TIME_GROUP {
                        continue;
                    }
                    let columns = group.find(name);
                    if !columns.is_empty() {
                        found = true;
                        plan.push((pos, columns));
                    }
                }
                if !found {
                    return Err(VtoolError::not_found(name.clone(), "dataset"));
                }
            }
        }
    }

    let mut written = 0;
    for (pos, columns) in plan {
        write(&mut dataset.groups[pos].1, &columns, &rows, value);
        written += columns.len() * rows.len();
    }
    Ok(written)
}

/// Boolean-mask form of [`apply_index_to_dataset`]
pub fn apply_mask_to_dataset(dataset: &mut Dataset, target: &MaskTarget, mask: &[bool], value: f64) -> VtoolResult<usize> {
    apply_index_to_dataset(dataset, target, &RowSelector::Mask(mask.to_vec()), value)
}
