// src/utils/batch.rs
//! Per-case batch driver
//!
//! Elements are evaluated independently, sequentially or on the rayon pool. Results
//! keep input order and the first failing index wins, whatever the evaluation order.

use crate::error::{VtoolResult, WithIndex};
use rayon::prelude::*;

/// Map `f` over `0..n`, preserving order
pub fn map_indexed<T, F>(n: usize, parallel: bool, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if parallel {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}

/// Fallible [`map_indexed`]; the lowest failing index aborts the batch with a
/// [`crate::error::VtoolError::Batch`] annotation
pub fn try_map_indexed<T, F>(n: usize, parallel: bool, f: F) -> VtoolResult<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> VtoolResult<T> + Sync + Send,
{
    let results = map_indexed(n, parallel, f);
    let mut out = Vec::with_capacity(n);
    for (i, result) in results.into_iter().enumerate() {
        out.push(result.at_index(i)?);
    }
    Ok(out)
}
