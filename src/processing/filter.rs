// src/processing/filter.rs
//! Case filtering by the valid range or value set of one signal

use crate::config::stats_options::CaseFilter;
use crate::error::{VtoolResult, WithIndex};
use crate::model::SignalGroupArray;
use crate::validation::get_signal;

impl CaseFilter {
    /// True if `value` lies in one of the ranges or equals one of the values
    pub fn accepts(&self, value: f64) -> bool {
        self.ranges.iter().any(|r| value >= r[0] && value <= r[1]) || self.values.iter().any(|&v| v == value)
    }

    /// A case passes when every non-NaN sample is accepted.
    ///
    /// A case without valid samples fails.
    pub fn accepts_case(&self, samples: &[f64]) -> bool {
        let mut valid = samples.iter().copied().filter(|v| !v.is_nan()).peekable();
        valid.peek().is_some() && valid.all(|v| self.accepts(v))
    }
}

/// Positions of the cases that pass `filter`, in case order
pub fn filter_cases(array: &SignalGroupArray, filter: &CaseFilter) -> VtoolResult<Vec<usize>> {
    let mut keep = Vec::with_capacity(array.len());
    for (i, group) in array.iter().enumerate() {
        let column = get_signal(&filter.name, group).at_index(i)?;
        if filter.accepts_case(&column.to_vec()) {
            keep.push(i);
        }
    }
    Ok(keep)
}
