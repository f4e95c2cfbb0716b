// src/processing/aggregate.rs
//! Binned statistical and spectral aggregation across cases
//!
//! Every analysed array is compared with a reference array case by case. Three
//! reduction paths share one binning:
//!
//! - long-time (`Lt*`): each case is first reduced to min/max/mean per signal, then
//!   the six statistics are taken over those per-case scalars within each bin
//! - short-time (`St*`, `Case*`, `Global*`): samples are pooled without time-domain
//!   reduction, per bin, per case and over every case respectively
//! - spectral (`*Psd*`): per-case Welch spectra reduced per bin along the case axis
//!
//! Error statistics use `candidate - reference`. Case order is positional and kept in
//! lockstep across signals, times, file names and the class vector.

use crate::config::analysis_config::{validate_analysis_config, AnalysisConfig};
use crate::config::stats_options::{validate_stats_options, CaseFilter, Classification, StatsOptions};
use crate::error::{VtoolError, VtoolResult};
use crate::io::{CollectedSignals, StatsFile, TimeSource};
use crate::model::{SignalGroup, SignalGroupArray};
use crate::ops::select::{names, select_from_array};
use crate::processing::binning::{combine_class_vectors, compute_class_vector, BinResult, ClassVector};
use crate::processing::filter::filter_cases;
use crate::processing::nanstats::{nan_max, nan_mean, nan_min, summarize, Statistic, Summary};
use crate::processing::spectral::{matches_sample_rate, resample_uniform, resolve_sample_rate, to_db, SpectralEstimator};
use crate::utils::batch::{map_indexed, try_map_indexed};
use crate::utils::progress::ProgressReporter;
use ndarray::{Array, Array2, Dimension, Ix2, Ix3, NdIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// The six reported statistics, one array per field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StatSet<D: Dimension> {
    /// Minimum
    #[serde(with = "crate::utils::serde_array")]
    pub min: Array<f64, D>,
    /// Maximum
    #[serde(with = "crate::utils::serde_array")]
    pub max: Array<f64, D>,
    /// Mean
    #[serde(with = "crate::utils::serde_array")]
    pub mean: Array<f64, D>,
    /// 5th percentile
    #[serde(with = "crate::utils::serde_array")]
    pub p05: Array<f64, D>,
    /// Median
    #[serde(with = "crate::utils::serde_array")]
    pub p50: Array<f64, D>,
    /// 95th percentile
    #[serde(with = "crate::utils::serde_array")]
    pub p95: Array<f64, D>,
}

/// Rows × signals
pub type StatMatrix = StatSet<Ix2>;
/// Frequencies × signals × bins
pub type StatCube = StatSet<Ix3>;

impl<D: Dimension> StatSet<D> {
    /// Every field NaN
    pub fn nan(dim: D) -> Self {
        let filled = Array::from_elem(dim, f64::NAN);
        Self {
            min: filled.clone(),
            max: filled.clone(),
            mean: filled.clone(),
            p05: filled.clone(),
            p50: filled.clone(),
            p95: filled,
        }
    }

    /// Store a summary at `index` in every field
    pub fn put<I: NdIndex<D> + Copy>(&mut self, index: I, summary: &Summary) {
        self.min[index] = summary.min;
        self.max[index] = summary.max;
        self.mean[index] = summary.mean;
        self.p05[index] = summary.p05;
        self.p50[index] = summary.p50;
        self.p95[index] = summary.p95;
    }

    /// Summary read back from `index`
    pub fn get<I: NdIndex<D> + Copy>(&self, index: I) -> Summary {
        Summary {
            min: self.min[index],
            max: self.max[index],
            mean: self.mean[index],
            p05: self.p05[index],
            p50: self.p50[index],
            p95: self.p95[index],
        }
    }

    /// Fields in the order of [`crate::config::constants::stats::FIELDS`]
    pub fn fields(&self) -> [&Array<f64, D>; 6] {
        [&self.min, &self.max, &self.mean, &self.p05, &self.p50, &self.p95]
    }

    /// Shape shared by every field
    pub fn shape(&self) -> &[usize] {
        self.min.shape()
    }
}

/// Statistics of one analysed array against the reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Stats {
    /// Array name
    #[serde(rename = "name")]
    pub name: String,
    /// Per-bin statistics of the per-case minimum (P×M)
    pub lt_min: StatMatrix,
    /// Per-bin statistics of the per-case maxima
    pub lt_max: StatMatrix,
    /// Per-bin statistics of the per-case means
    pub lt_mean: StatMatrix,
    /// Pooled samples per bin (P×M)
    pub st_stats: StatMatrix,
    /// Pooled error against the reference per bin
    pub st_err: StatMatrix,
    /// Pooled samples per case (C×M)
    pub case_stats: StatMatrix,
    /// Error against the reference per case
    pub case_err: StatMatrix,
    /// Pooled samples over every case (1×M)
    pub global_stats: StatMatrix,
    /// Error against the reference over all cases
    pub global_err: StatMatrix,
    /// Per-bin statistics of the per-case PSD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psd_stats: Option<StatCube>,
    /// PSD of the difference to the reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_psd_stats: Option<StatCube>,
    /// PSD relative to the reference PSD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel_psd_stats: Option<StatCube>,
    /// Coherence magnitude with the reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coherence_stats: Option<StatCube>,
    /// Negative coherence phase with the reference, degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_stats: Option<StatCube>,
    /// Selected cases, kept on request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SignalGroupArray>,
}

/// Companion record of a stats result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// First-dimension bin edges after trimming; empty when unclassified
    pub edges: Vec<f64>,
    /// Second-dimension edges of a two-dimensional classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges2: Option<Vec<f64>>,
    /// Bin of every kept case, 0 for rejected
    pub iclass: Vec<usize>,
    /// One entry per bin
    pub bins: Vec<BinResult>,
    /// Classifying signals
    #[serde(default)]
    pub class_names: Vec<String>,
    /// Reduction used to classify
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistic: Option<Statistic>,
    /// Filter applied before classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<CaseFilter>,
    /// Name of the reference array
    pub reference: String,
    /// Names and units of the analysed signals
    pub signals: SignalGroup,
    /// Source of every kept case
    pub fnames: Vec<String>,
    /// Frequency axis of the spectral cubes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<Vec<f64>>,
    /// Frequency resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub df: Option<f64>,
    /// Spectral cubes are in dB
    #[serde(default)]
    pub db: bool,
}

impl Info {
    /// Kept cases, rejected ones included
    pub fn n_cases(&self) -> usize {
        self.iclass.len()
    }

    /// Number of bins
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Primary names of the analysed signals
    pub fn signal_names(&self) -> Vec<String> {
        self.signals.primary_names()
    }
}

/// Named case arrays plus the per-case companions shared by all of them
#[derive(Debug, Clone, PartialEq)]
pub struct StatsInput {
    /// Named arrays; all have the same case count
    pub arrays: Vec<(String, SignalGroupArray)>,
    /// Time base, shared or per case
    pub times: Option<TimeSource>,
    /// Source file of each case
    pub fnames: Vec<String>,
}

impl StatsInput {
    /// Single-array input from a collected-signals container
    pub fn from_collected(name: &str, collected: CollectedSignals) -> Self {
        Self {
            arrays: vec![(name.to_string(), collected.signals)],
            times: collected.times,
            fnames: collected.fnames,
        }
    }

    /// Add another array with the same cases
    pub fn with_array(mut self, name: &str, array: SignalGroupArray) -> Self {
        self.arrays.push((name.to_string(), array));
        self
    }

    /// Array names in order
    pub fn array_names(&self) -> Vec<String> {
        self.arrays.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Array called `name`
    pub fn array(&self, name: &str) -> Option<&SignalGroupArray> {
        self.arrays.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }
}

/// Spectra of one case of one array, each `n_freqs × M`
struct CaseSpectra {
    psd: Array2<f64>,
    err: Array2<f64>,
    rel: Array2<f64>,
    coherence: Array2<f64>,
    phase: Array2<f64>,
}

/// Spectral settings resolved once per run
struct SpectralContext {
    estimator: SpectralEstimator,
    db: bool,
}

/// Compute binned statistics of every analysed array against the reference.
///
/// Steps: select signals, filter cases, classify the reference, then reduce each
/// array. A failure in any case aborts the whole computation.
pub fn compute_stats_array(
    input: &StatsInput,
    options: &StatsOptions,
    config: &AnalysisConfig,
) -> VtoolResult<StatsFile> {
    validate_analysis_config(config)?;
    validate_stats_options(options)?;

    let available = input.array_names();
    let analysed: Vec<String> = if options.array_names.is_empty() {
        available.clone()
    } else {
        options.array_names.clone()
    };
    let reference = options
        .reference_name(&available)
        .ok_or_else(|| VtoolError::invalid_input("array_names", "no input arrays"))?
        .to_string();
    if !analysed.contains(&reference) {
        return Err(VtoolError::not_found(reference, "analysed arrays"));
    }
    let reference_full = input
        .array(&reference)
        .ok_or_else(|| VtoolError::not_found(reference.as_str(), "stats input"))?;
    let n_cases = reference_full.len();
    if n_cases == 0 {
        return Err(VtoolError::invalid_input(reference.as_str(), "array has no cases"));
    }
    check_companions(input, n_cases)?;

    let selection: Vec<String> = if options.selections.is_empty() {
        reference_full[0].primary_names()
    } else {
        options.selections.clone()
    };
    let requests = names(&selection);

    let mut selected = Vec::with_capacity(analysed.len());
    for name in &analysed {
        let array = input
            .array(name)
            .ok_or_else(|| VtoolError::not_found(name.as_str(), "stats input"))?;
        if array.len() != n_cases {
            return Err(VtoolError::incompatible(
                name.as_str(),
                format!("{} cases, reference '{}' has {}", array.len(), reference, n_cases),
            ));
        }
        let (subset, matched) = select_from_array(&requests, array)?;
        for (j, signal) in selection.iter().enumerate() {
            let missing = matched.iter().filter(|m| !m[j]).count();
            if missing > 0 {
                warn!(array = %name, signal = %signal, cases = missing, "signal missing, using NaN placeholder");
            }
        }
        selected.push((name.clone(), subset));
    }

    let keep: Vec<usize> = match &options.filter {
        Some(filter) => {
            let keep = filter_cases(reference_full, filter)?;
            info!(signal = %filter.name, kept = keep.len(), total = n_cases, "filtered cases");
            keep
        }
        None => (0..n_cases).collect(),
    };
    if keep.is_empty() {
        return Err(VtoolError::invalid_input("filter", "every case was rejected"));
    }
    let reference_kept = reference_full.select_cases(&keep);
    let selected: Vec<(String, SignalGroupArray)> = selected
        .into_iter()
        .map(|(name, array)| (name, array.select_cases(&keep)))
        .collect();
    let fnames: Vec<String> = keep
        .iter()
        .map(|&i| input.fnames.get(i).cloned().unwrap_or_else(|| format!("case_{}", i)))
        .collect();
    let times: Vec<Option<Vec<f64>>> = keep
        .iter()
        .map(|&i| input.times.as_ref().and_then(|t| t.case_values(i)))
        .collect();

    let class = match &options.classification {
        Some(classification) => classify(&reference_kept, classification)?,
        None => unclassified(keep.len()),
    };
    debug!(bins = class.n_bins(), rejected = class.iclass.iter().filter(|&&c| c == 0).count(), "classified cases");

    let reference_selected = selected
        .iter()
        .find(|(name, _)| *name == reference)
        .map(|(_, array)| array.clone())
        .ok_or_else(|| VtoolError::not_found(reference.as_str(), "analysed arrays"))?;

    let spectral = if options.spectral {
        let fs = resolve_sample_rate(&config.spectral, times[0].as_deref())?;
        let estimator = SpectralEstimator::new(&config.spectral, fs)?;
        info!(fs, nfft = estimator.nfft(), df = estimator.df(), "spectral estimation enabled");
        Some(SpectralContext { estimator, db: config.spectral.db })
    } else {
        None
    };

    let mut results = Vec::with_capacity(selected.len());
    for (name, array) in &selected {
        info!(array = %name, cases = array.len(), "aggregating");
        let stats = aggregate_array(name, array, &reference_selected, &times, &class, spectral.as_ref(), options, config)?;
        results.push(stats);
    }

    let info = Info {
        edges: class.edges.clone(),
        edges2: options
            .classification
            .as_ref()
            .and_then(|c| c.edges2.clone()),
        iclass: class.iclass.clone(),
        bins: class.bins.clone(),
        class_names: options
            .classification
            .as_ref()
            .map(|c| c.names.clone())
            .unwrap_or_default(),
        statistic: options.classification.as_ref().map(|c| c.statistic),
        filter: options.filter.clone(),
        reference,
        signals: reference_selected
            .get(0)
            .map(SignalGroup::header)
            .unwrap_or_else(|| SignalGroup::empty(0)),
        fnames,
        freq: spectral.as_ref().map(|s| s.estimator.frequencies()),
        df: spectral.as_ref().map(|s| s.estimator.df()),
        db: spectral.as_ref().is_some_and(|s| s.db),
    };
    Ok(StatsFile { stats: results, info })
}

fn check_companions(input: &StatsInput, n_cases: usize) -> VtoolResult<()> {
    if !input.fnames.is_empty() && input.fnames.len() != n_cases {
        return Err(VtoolError::incompatible(
            "fnames",
            format!("{} file names for {} cases", input.fnames.len(), n_cases),
        ));
    }
    if let Some(TimeSource::PerCase(times)) = &input.times {
        if times.len() != n_cases {
            return Err(VtoolError::incompatible(
                "TIMES",
                format!("{} time groups for {} cases", times.len(), n_cases),
            ));
        }
    }
    Ok(())
}

/// Classify by one signal, or two combined
fn classify(array: &SignalGroupArray, classification: &Classification) -> VtoolResult<ClassVector> {
    let first = compute_class_vector(array, &classification.names[0], classification.statistic, &classification.edges1)?;
    match (classification.names.get(1), &classification.edges2) {
        (Some(second), Some(edges2)) => {
            let second = compute_class_vector(array, second, classification.statistic, edges2)?;
            combine_class_vectors(&first, &second)
        }
        _ => Ok(first),
    }
}

/// Every case in a single bin
fn unclassified(n: usize) -> ClassVector {
    ClassVector {
        iclass: vec![1; n],
        edges: Vec::new(),
        bins: vec![BinResult {
            index: 1,
            center: f64::NAN,
            center2: None,
            count: n,
            title: "all cases".to_string(),
        }],
        values: vec![f64::NAN; n],
    }
}

/// Case positions of each bin `1..=P`
fn bin_members(iclass: &[usize], n_bins: usize) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); n_bins];
    for (i, &k) in iclass.iter().enumerate() {
        if k >= 1 && k <= n_bins {
            groups[k - 1].push(i);
        }
    }
    groups
}

/// Summaries of the values `pool(case, signal)` contributes, gathered over each group
/// of cases; one output row per group
fn summarize_groups<F>(groups: &[Vec<usize>], m: usize, parallel: bool, pool: F) -> StatMatrix
where
    F: Fn(usize, usize, &mut Vec<f64>) + Sync + Send,
{
    let rows: Vec<Vec<Summary>> = map_indexed(groups.len(), parallel, |r| {
        (0..m)
            .map(|j| {
                let mut values = Vec::new();
                for &i in &groups[r] {
                    pool(i, j, &mut values);
                }
                summarize(&values)
            })
            .collect()
    });
    let mut out = StatSet::nan(Ix2(groups.len(), m));
    for (r, row) in rows.iter().enumerate() {
        for (j, summary) in row.iter().enumerate() {
            out.put([r, j], summary);
        }
    }
    out
}

/// Per-bin reduction along the case axis of per-case spectra
fn summarize_spectra<F>(spectra: &[CaseSpectra], bins: &[Vec<usize>], shape: (usize, usize), db: bool, field: F) -> StatCube
where
    F: Fn(&CaseSpectra) -> &Array2<f64>,
{
    let (nf, m) = shape;
    let mut out = StatSet::nan(Ix3(nf, m, bins.len()));
    for (r, members) in bins.iter().enumerate() {
        for f in 0..nf {
            for j in 0..m {
                let pool: Vec<f64> = members.iter().map(|&i| field(&spectra[i])[[f, j]]).collect();
                let summary = summarize(&pool);
                let summary = if db { summary.map(to_db) } else { summary };
                out.put([f, j, r], &summary);
            }
        }
    }
    out
}

/// Per-case min, max and mean of every signal, each C×M
fn long_time_values(array: &SignalGroupArray, parallel: bool) -> [Array2<f64>; 3] {
    let m = array.n_signals();
    let rows: Vec<Vec<[f64; 3]>> = map_indexed(array.len(), parallel, |i| {
        (0..m)
            .map(|j| {
                let column = array[i].column_vec(j);
                [nan_min(&column), nan_max(&column), nan_mean(&column)]
            })
            .collect()
    });
    let pick = |k: usize| Array2::from_shape_fn((array.len(), m), |(i, j)| rows[i][j][k]);
    [pick(0), pick(1), pick(2)]
}

/// Sample-wise `candidate - reference` of every case
fn error_values(array: &SignalGroupArray, reference: &SignalGroupArray) -> VtoolResult<Vec<Array2<f64>>> {
    let mut out = Vec::with_capacity(array.len());
    for (i, (case, base)) in array.iter().zip(reference.iter()).enumerate() {
        if case.values.dim() != base.values.dim() {
            let (n, m) = case.values.dim();
            let (rn, rm) = base.values.dim();
            return Err(VtoolError::incompatible(
                "case length",
                format!("{}×{} samples vs reference {}×{}", n, m, rn, rm),
            )
            .at_index(i));
        }
        out.push(&case.values - &base.values);
    }
    Ok(out)
}

/// Columns of a case on the estimator's uniform grid
fn spectral_columns(group: &SignalGroup, time: Option<&[f64]>, fs: f64) -> VtoolResult<Vec<Vec<f64>>> {
    (0..group.n_signals())
        .map(|j| {
            let column = group.column_vec(j);
            match time {
                Some(t) if t.len() == column.len() && !matches_sample_rate(t, fs) => resample_uniform(t, &column, fs),
                _ => Ok(column),
            }
        })
        .collect()
}

fn case_spectra(
    estimator: &SpectralEstimator,
    case: &SignalGroup,
    base: &SignalGroup,
    time: Option<&[f64]>,
) -> VtoolResult<CaseSpectra> {
    let fs = estimator.sample_rate_hz();
    let x = spectral_columns(base, time, fs)?;
    let y = spectral_columns(case, time, fs)?;
    let nf = estimator.n_freqs();
    let m = y.len();
    let mut out = CaseSpectra {
        psd: Array2::from_elem((nf, m), f64::NAN),
        err: Array2::from_elem((nf, m), f64::NAN),
        rel: Array2::from_elem((nf, m), f64::NAN),
        coherence: Array2::from_elem((nf, m), f64::NAN),
        phase: Array2::from_elem((nf, m), f64::NAN),
    };
    for j in 0..m {
        let pair = estimator.spect_signals(&x[j], &y[j]);
        let diff: Vec<f64> = y[j].iter().zip(&x[j]).map(|(c, r)| c - r).collect();
        let err = estimator.psd(&diff);
        for k in 0..nf {
            out.psd[[k, j]] = pair.pyy[k];
            out.err[[k, j]] = err[k];
            out.rel[[k, j]] = pair.pyy[k] / pair.pxx[k];
            out.coherence[[k, j]] = pair.coherence[k];
            out.phase[[k, j]] = pair.phase_deg[k];
        }
    }
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn aggregate_array(
    name: &str,
    array: &SignalGroupArray,
    reference: &SignalGroupArray,
    times: &[Option<Vec<f64>>],
    class: &ClassVector,
    spectral: Option<&SpectralContext>,
    options: &StatsOptions,
    config: &AnalysisConfig,
) -> VtoolResult<Stats> {
    let parallel = config.parallel;
    let n_cases = array.len();
    let m = array.n_signals();
    let bins = bin_members(&class.iclass, class.n_bins());
    let each_case: Vec<Vec<usize>> = (0..n_cases).map(|i| vec![i]).collect();
    let every_case: Vec<Vec<usize>> = vec![(0..n_cases).collect()];

    let [lt_min, lt_max, lt_mean] = long_time_values(array, parallel);
    let errors = error_values(array, reference).map_err(|e| VtoolError::incompatible(name, e.to_string()))?;

    let samples = |i: usize, j: usize, pool: &mut Vec<f64>| pool.extend(array[i].values.column(j).iter().copied());
    let error_samples = |i: usize, j: usize, pool: &mut Vec<f64>| pool.extend(errors[i].column(j).iter().copied());

    let mut stats = Stats {
        name: name.to_string(),
        lt_min: summarize_groups(&bins, m, parallel, |i, j, pool| pool.push(lt_min[[i, j]])),
        lt_max: summarize_groups(&bins, m, parallel, |i, j, pool| pool.push(lt_max[[i, j]])),
        lt_mean: summarize_groups(&bins, m, parallel, |i, j, pool| pool.push(lt_mean[[i, j]])),
        st_stats: summarize_groups(&bins, m, parallel, samples),
        st_err: summarize_groups(&bins, m, parallel, error_samples),
        case_stats: summarize_groups(&each_case, m, parallel, samples),
        case_err: summarize_groups(&each_case, m, parallel, error_samples),
        global_stats: summarize_groups(&every_case, m, parallel, samples),
        global_err: summarize_groups(&every_case, m, parallel, error_samples),
        psd_stats: None,
        err_psd_stats: None,
        rel_psd_stats: None,
        coherence_stats: None,
        phase_stats: None,
        data: options.include_data.then(|| array.clone()),
    };

    if let Some(context) = spectral {
        let progress = ProgressReporter::new("spectra", n_cases, config.progress_step_percent);
        let spectra = try_map_indexed(n_cases, parallel, |i| {
            let result = case_spectra(&context.estimator, &array[i], &reference[i], times[i].as_deref());
            progress.tick();
            result
        })?;
        let shape = (context.estimator.n_freqs(), m);
        stats.psd_stats = Some(summarize_spectra(&spectra, &bins, shape, context.db, |c| &c.psd));
        stats.err_psd_stats = Some(summarize_spectra(&spectra, &bins, shape, context.db, |c| &c.err));
        stats.rel_psd_stats = Some(summarize_spectra(&spectra, &bins, shape, context.db, |c| &c.rel));
        stats.coherence_stats = Some(summarize_spectra(&spectra, &bins, shape, false, |c| &c.coherence));
        stats.phase_stats = Some(summarize_spectra(&spectra, &bins, shape, false, |c| &c.phase));
    }
    debug!(array = name, signals = m, bins = bins.len(), "aggregated");
    Ok(stats)
}
