// src/processing/combine.rs
//! Combination of stats results computed over disjoint bin ranges
//!
//! Per-bin and per-case statistics are concatenated in file order. Global statistics
//! are rebuilt from the per-file globals: min and max exactly, the mean weighted by
//! case count. Global percentiles cannot be recovered and are NaN.
//!
//! A gap between the last edge of one file and the first edge of the next becomes an
//! empty bin with NaN statistics, so the combined edges always bound the combined bins.

use crate::error::{VtoolError, VtoolResult};
use crate::io::StatsFile;
use crate::model::SignalGroupArray;
use crate::processing::aggregate::{Info, StatCube, StatMatrix, StatSet, Stats};
use crate::processing::binning::{bin_title, BinResult};
use crate::processing::nanstats::{nan_max, nan_min, Summary};
use ndarray::{concatenate, Array, Axis, Dimension, Ix2, Ix3, RemoveAxis};
use std::collections::HashSet;
use tracing::{info, warn};

/// Combine stats files whose bins are disjoint and supplied in increasing order
pub fn combine_stats_files(files: &[StatsFile]) -> VtoolResult<StatsFile> {
    let first = files
        .first()
        .ok_or_else(|| VtoolError::invalid_input("files", "nothing to combine"))?;
    validate_combination(files)?;
    if files.len() == 1 {
        return Ok(first.clone());
    }

    let gaps = gap_before(files);
    let mut stats = Vec::with_capacity(first.stats.len());
    for (k, head) in first.stats.iter().enumerate() {
        let parts: Vec<&Stats> = files.iter().map(|f| &f.stats[k]).collect();
        let weights: Vec<usize> = files.iter().map(|f| f.info.n_cases()).collect();
        stats.push(combine_stats(&head.name, &parts, &weights, &gaps)?);
    }

    let info = combine_info(files, &gaps);
    info!(files = files.len(), cases = info.n_cases(), bins = info.n_bins(), "combined stats files");
    Ok(StatsFile { stats, info })
}

/// Every check runs before any output is built
fn validate_combination(files: &[StatsFile]) -> VtoolResult<()> {
    let first = &files[0];
    let names = first.info.signal_names();
    let arrays: Vec<&str> = first.stats.iter().map(|s| s.name.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut last_edge = f64::NEG_INFINITY;

    for (i, file) in files.iter().enumerate() {
        if file.info.signal_names() != names {
            return Err(VtoolError::incompatible(
                "signal names",
                format!("file {} has {:?}, file 0 has {:?}", i, file.info.signal_names(), names),
            ));
        }
        let these: Vec<&str> = file.stats.iter().map(|s| s.name.as_str()).collect();
        if these != arrays {
            return Err(VtoolError::incompatible(
                "arrays",
                format!("file {} has {:?}, file 0 has {:?}", i, these, arrays),
            ));
        }
        if file.info.reference != first.info.reference {
            return Err(VtoolError::incompatible(
                "reference",
                format!("file {} uses '{}', file 0 uses '{}'", i, file.info.reference, first.info.reference),
            ));
        }
        if file.info.class_names != first.info.class_names || file.info.edges2 != first.info.edges2 {
            return Err(VtoolError::incompatible(
                "classification",
                format!("file {} was classified differently from file 0", i),
            ));
        }
        for (s, head) in file.stats.iter().zip(&first.stats) {
            if spectral_fields(s) != spectral_fields(head) {
                return Err(VtoolError::incompatible(
                    "statistic fields",
                    format!("file {}: spectral fields of '{}' differ from file 0", i, s.name),
                ));
            }
        }
        if file.info.freq != first.info.freq || file.info.db != first.info.db {
            return Err(VtoolError::incompatible(
                "frequency axis",
                format!("file {} was computed with a different spectral setup", i),
            ));
        }
        if let Some(&start) = file.info.edges.first() {
            if start > last_edge && last_edge.is_finite() && file.info.edges2.is_some() {
                return Err(VtoolError::invalid_input(
                    "edges",
                    format!("file {}: gap from {} to {} in a two-dimensional classification", i, last_edge, start),
                ));
            }
        }
        for &edge in &file.info.edges {
            if edge < last_edge {
                return Err(VtoolError::invalid_input(
                    "edges",
                    format!("file {}: edge {} below preceding edge {}", i, edge, last_edge),
                ));
            }
            last_edge = edge;
        }
        for name in &file.info.fnames {
            if !seen.insert(name.as_str()) {
                return Err(VtoolError::incompatible(
                    "fnames",
                    format!("file {}: case '{}' already present in an earlier file", i, name),
                ));
            }
        }
        check_shapes(file, names.len()).map_err(|reason| {
            VtoolError::incompatible("shapes", format!("file {}: {}", i, reason))
        })?;
    }
    Ok(())
}

fn spectral_fields(stats: &Stats) -> [bool; 5] {
    [
        stats.psd_stats.is_some(),
        stats.err_psd_stats.is_some(),
        stats.rel_psd_stats.is_some(),
        stats.coherence_stats.is_some(),
        stats.phase_stats.is_some(),
    ]
}

fn check_set<D: Dimension>(set: &StatSet<D>, expected: &[usize], what: &str) -> Result<(), String> {
    match set.fields().iter().find(|f| f.shape() != expected) {
        Some(field) => Err(format!("{} has shape {:?}, expected {:?}", what, field.shape(), expected)),
        None => Ok(()),
    }
}

/// Matrix and cube shapes must agree with the file's own bin, case and signal counts
fn check_shapes(file: &StatsFile, m: usize) -> Result<(), String> {
    let (p, c) = (file.info.n_bins(), file.info.n_cases());
    if file.info.fnames.len() != c {
        return Err(format!("{} file names for {} cases", file.info.fnames.len(), c));
    }
    let nf = file.info.freq.as_ref().map_or(0, Vec::len);
    for s in &file.stats {
        for (set, rows, what) in [
            (&s.lt_min, p, "LtMin"),
            (&s.lt_max, p, "LtMax"),
            (&s.lt_mean, p, "LtMean"),
            (&s.st_stats, p, "StStats"),
            (&s.st_err, p, "StErr"),
            (&s.case_stats, c, "CaseStats"),
            (&s.case_err, c, "CaseErr"),
            (&s.global_stats, 1, "GlobalStats"),
            (&s.global_err, 1, "GlobalErr"),
        ] {
            check_set(set, &[rows, m], what)?;
        }
        for (cube, what) in [
            (&s.psd_stats, "PsdStats"),
            (&s.err_psd_stats, "ErrPsdStats"),
            (&s.rel_psd_stats, "RelPsdStats"),
            (&s.coherence_stats, "CoherenceStats"),
            (&s.phase_stats, "PhaseStats"),
        ] {
            if let Some(cube) = cube {
                check_set(cube, &[nf, m, p], what)?;
            }
        }
        if let Some(data) = &s.data {
            if data.len() != c {
                return Err(format!("'{}' keeps {} cases of data for {} cases", s.name, data.len(), c));
            }
        }
    }
    Ok(())
}

/// Whether an empty bin must be inserted ahead of each file
fn gap_before(files: &[StatsFile]) -> Vec<bool> {
    let mut gaps = vec![false; files.len()];
    for (k, pair) in files.windows(2).enumerate() {
        if let (Some(&last), Some(&start)) = (pair[0].info.edges.last(), pair[1].info.edges.first()) {
            if start > last {
                warn!(from = last, to = start, "bin ranges are not adjacent, inserting an empty bin");
                gaps[k + 1] = true;
            }
        }
    }
    gaps
}

/// Concatenate every field along `axis`
fn concat_sets<D: RemoveAxis>(sets: &[&StatSet<D>], axis: Axis, what: &str) -> VtoolResult<StatSet<D>> {
    let mut joined = Vec::with_capacity(6);
    for field in 0..6 {
        let views: Vec<_> = sets.iter().map(|s| s.fields()[field].view()).collect();
        let array: Array<f64, D> =
            concatenate(axis, &views).map_err(|e| VtoolError::incompatible(what, e.to_string()))?;
        joined.push(array);
    }
    let [min, max, mean, p05, p50, p95]: [Array<f64, D>; 6] = joined
        .try_into()
        .map_err(|_| VtoolError::incompatible(what, "statistic field count"))?;
    Ok(StatSet { min, max, mean, p05, p50, p95 })
}

/// Global statistics from per-file globals and case counts
fn combine_global(parts: &[&StatMatrix], weights: &[usize]) -> StatMatrix {
    let m = parts.first().map_or(0, |p| p.shape()[1]);
    let mut out = StatSet::nan(Ix2(1, m));
    for j in 0..m {
        let mins: Vec<f64> = parts.iter().map(|p| p.min[[0, j]]).collect();
        let maxs: Vec<f64> = parts.iter().map(|p| p.max[[0, j]]).collect();
        let (sum, weight) = parts
            .iter()
            .zip(weights)
            .filter(|(p, _)| !p.mean[[0, j]].is_nan())
            .fold((0.0, 0usize), |(sum, weight), (p, &n)| (sum + p.mean[[0, j]] * n as f64, weight + n));
        let summary = Summary {
            min: nan_min(&mins),
            max: nan_max(&maxs),
            mean: if weight > 0 { sum / weight as f64 } else { f64::NAN },
            ..Summary::NAN
        };
        out.put([0, j], &summary);
    }
    out
}

/// Interleave a NaN filler ahead of every part that follows a gap
fn with_fillers<'a, D: Dimension>(sets: &[&'a StatSet<D>], gaps: &[bool], filler: &'a StatSet<D>) -> Vec<&'a StatSet<D>> {
    let mut out = Vec::with_capacity(sets.len() * 2);
    for (&set, &gap) in sets.iter().zip(gaps) {
        if gap {
            out.push(filler);
        }
        out.push(set);
    }
    out
}

fn concat_optional(
    parts: &[&Stats],
    gaps: &[bool],
    pick: impl Fn(&Stats) -> Option<&StatCube>,
    what: &str,
) -> VtoolResult<Option<StatCube>> {
    let Some(sets) = parts.iter().map(|&s| pick(s)).collect::<Option<Vec<_>>>() else {
        return Ok(None);
    };
    let shape = sets[0].shape();
    let filler = StatSet::nan(Ix3(shape[0], shape[1], 1));
    concat_sets(&with_fillers(&sets, gaps, &filler), Axis(2), what).map(Some)
}

fn concat_rows(parts: &[&Stats], gaps: &[bool], pick: impl Fn(&Stats) -> &StatMatrix, what: &str) -> VtoolResult<StatMatrix> {
    let sets: Vec<&StatMatrix> = parts.iter().map(|&s| pick(s)).collect();
    let filler = StatSet::nan(Ix2(1, sets[0].shape()[1]));
    concat_sets(&with_fillers(&sets, gaps, &filler), Axis(0), what)
}

fn combine_stats(name: &str, parts: &[&Stats], weights: &[usize], gaps: &[bool]) -> VtoolResult<Stats> {
    let globals: Vec<&StatMatrix> = parts.iter().map(|s| &s.global_stats).collect();
    let global_errs: Vec<&StatMatrix> = parts.iter().map(|s| &s.global_err).collect();
    let data: Option<Vec<&SignalGroupArray>> = parts.iter().map(|s| s.data.as_ref()).collect();
    // per-case rows never receive fillers
    let cases = vec![false; parts.len()];

    Ok(Stats {
        name: name.to_string(),
        lt_min: concat_rows(parts, gaps, |s| &s.lt_min, "LtMin")?,
        lt_max: concat_rows(parts, gaps, |s| &s.lt_max, "LtMax")?,
        lt_mean: concat_rows(parts, gaps, |s| &s.lt_mean, "LtMean")?,
        st_stats: concat_rows(parts, gaps, |s| &s.st_stats, "StStats")?,
        st_err: concat_rows(parts, gaps, |s| &s.st_err, "StErr")?,
        case_stats: concat_rows(parts, &cases, |s| &s.case_stats, "CaseStats")?,
        case_err: concat_rows(parts, &cases, |s| &s.case_err, "CaseErr")?,
        global_stats: combine_global(&globals, weights),
        global_err: combine_global(&global_errs, weights),
        psd_stats: concat_optional(parts, gaps, |s| s.psd_stats.as_ref(), "PsdStats")?,
        err_psd_stats: concat_optional(parts, gaps, |s| s.err_psd_stats.as_ref(), "ErrPsdStats")?,
        rel_psd_stats: concat_optional(parts, gaps, |s| s.rel_psd_stats.as_ref(), "RelPsdStats")?,
        coherence_stats: concat_optional(parts, gaps, |s| s.coherence_stats.as_ref(), "CoherenceStats")?,
        phase_stats: concat_optional(parts, gaps, |s| s.phase_stats.as_ref(), "PhaseStats")?,
        data: data
            .map(|arrays| SignalGroupArray::new(arrays.into_iter().flat_map(|a| a.iter().cloned()).collect()))
            .transpose()?,
    })
}

/// Unit suffix of a bin title built by [`bin_title`]
fn title_unit(bin: &BinResult, lo: f64, hi: f64) -> String {
    bin.title
        .strip_prefix(&format!("{} - {}", lo, hi))
        .map(|rest| rest.trim().to_string())
        .unwrap_or_default()
}

/// Bins renumbered consecutively, class vectors shifted to match
fn combine_info(files: &[StatsFile], gaps: &[bool]) -> Info {
    let first = &files[0].info;
    let mut edges: Vec<f64> = Vec::new();
    let mut iclass = Vec::new();
    let mut bins: Vec<BinResult> = Vec::new();
    let mut fnames = Vec::new();

    for (file, &gap) in files.iter().zip(gaps) {
        let mut next = file.info.edges.as_slice();
        if let (Some(&last), Some(&start)) = (edges.last(), next.first()) {
            if gap {
                let unit = match (bins.last(), edges.len()) {
                    (Some(bin), len) if len >= 2 => title_unit(bin, edges[len - 2], last),
                    _ => String::new(),
                };
                bins.push(BinResult {
                    index: bins.len() + 1,
                    center: 0.5 * (last + start),
                    center2: None,
                    count: 0,
                    title: bin_title(last, start, &unit),
                });
            } else if last == start {
                next = &next[1..];
            }
        }
        let offset = bins.len();
        edges.extend_from_slice(next);
        iclass.extend(file.info.iclass.iter().map(|&c| if c == 0 { 0 } else { c + offset }));
        bins.extend(file.info.bins.iter().cloned().map(|mut b| {
            b.index += offset;
            b
        }));
        fnames.extend(file.info.fnames.iter().cloned());
    }

    Info {
        edges,
        iclass,
        bins,
        fnames,
        ..first.clone()
    }
}
