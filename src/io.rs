// src/io.rs
//! JSON persistence of collected signals and statistics results

use crate::error::{VtoolError, VtoolResult};
use crate::model::{SignalGroup, SignalGroupArray};
use crate::processing::aggregate::{Info, Stats};
use crate::validation::check_signal_group_array;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Time vectors accompanying a collected signal array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeSource {
    /// One time group per case
    PerCase(SignalGroupArray),
    /// One time group shared by every case
    Shared(SignalGroup),
}

impl TimeSource {
    /// Time samples of case `index`
    pub fn case_values(&self, index: usize) -> Option<Vec<f64>> {
        let group = match self {
            TimeSource::PerCase(array) => array.get(index)?,
            TimeSource::Shared(group) => group,
        };
        (group.n_signals() == 1).then(|| group.column_vec(0))
    }
}

/// Container produced by file collection and consumed by the aggregation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedSignals {
    /// One signal group per case
    #[serde(rename = "SIGNALS")]
    pub signals: SignalGroupArray,
    /// Time base, shared or per case
    #[serde(rename = "TIMES", alias = "Time", default, skip_serializing_if = "Option::is_none")]
    pub times: Option<TimeSource>,
    /// Source file of each case
    #[serde(default)]
    pub fnames: Vec<String>,
}

impl CollectedSignals {
    /// Collection without time information or file names
    pub fn new(signals: SignalGroupArray) -> Self {
        let fnames = (0..signals.len()).map(|i| format!("case_{}", i)).collect();
        Self { signals, times: None, fnames }
    }

    /// Number of cases
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// True without any case
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Time samples of case `index`, if time information is present
    pub fn case_time(&self, index: usize) -> Option<Vec<f64>> {
        self.times.as_ref()?.case_values(index)
    }

    /// Check that signals, times and file names stay aligned case by case
    pub fn validate(&self) -> VtoolResult<()> {
        let validity = check_signal_group_array(self.signals.as_slice(), false);
        if !validity.is_valid {
            return Err(VtoolError::incompatible("SIGNALS", validity.reason));
        }
        if self.fnames.len() != self.signals.len() {
            return Err(VtoolError::incompatible(
                "fnames",
                format!("{} file names for {} cases", self.fnames.len(), self.signals.len()),
            ));
        }
        match &self.times {
            Some(TimeSource::PerCase(times)) => {
                if times.len() != self.signals.len() {
                    return Err(VtoolError::incompatible(
                        "TIMES",
                        format!("{} time groups for {} cases", times.len(), self.signals.len()),
                    ));
                }
                for (i, (time, case)) in times.iter().zip(self.signals.iter()).enumerate() {
                    if time.n_samples() != case.n_samples() {
                        return Err(VtoolError::incompatible(
                            "TIMES",
                            format!("case {}: {} time samples for {} signal samples", i, time.n_samples(), case.n_samples()),
                        ));
                    }
                }
            }
            Some(TimeSource::Shared(time)) => {
                if let Some(i) = self.signals.iter().position(|c| c.n_samples() != time.n_samples()) {
                    return Err(VtoolError::incompatible(
                        "Time",
                        format!("case {} has {} samples, shared time has {}", i, self.signals[i].n_samples(), time.n_samples()),
                    ));
                }
            }
            None => {}
        }
        Ok(())
    }

    /// Keep only `cases`, filtering signals, times and file names in lockstep
    pub fn select_cases(&self, cases: &[usize]) -> Self {
        let times = self.times.as_ref().map(|t| match t {
            TimeSource::PerCase(array) => TimeSource::PerCase(array.select_cases(cases)),
            TimeSource::Shared(group) => TimeSource::Shared(group.clone()),
        });
        Self {
            signals: self.signals.select_cases(cases),
            times,
            fnames: cases.iter().filter_map(|&i| self.fnames.get(i).cloned()).collect(),
        }
    }
}

/// Stats results and their companion info, as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsFile {
    /// One entry per analysed array, reference included
    #[serde(rename = "Stats")]
    pub stats: Vec<Stats>,
    /// Classification and provenance shared by every entry
    #[serde(rename = "Info")]
    pub info: Info,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> VtoolResult<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> VtoolResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Load and validate a collected-signals file
pub fn load_collected_signals(path: impl AsRef<Path>) -> VtoolResult<CollectedSignals> {
    let path = path.as_ref();
    let mut collected: CollectedSignals = read_json(path)?;
    if collected.fnames.is_empty() && !collected.signals.is_empty() {
        collected.fnames = CollectedSignals::new(collected.signals.clone()).fnames;
    }
    collected.validate()?;
    info!(path = %path.display(), cases = collected.len(), "loaded collected signals");
    Ok(collected)
}

/// Write collected signals as JSON
pub fn save_collected_signals(path: impl AsRef<Path>, collected: &CollectedSignals) -> VtoolResult<()> {
    write_json(path.as_ref(), collected)
}

/// Read a stats file written by [`save_stats_file`]
pub fn load_stats_file(path: impl AsRef<Path>) -> VtoolResult<StatsFile> {
    let path = path.as_ref();
    let file: StatsFile = read_json(path)?;
    info!(path = %path.display(), arrays = file.stats.len(), "loaded stats file");
    Ok(file)
}

/// Write a stats file as JSON
pub fn save_stats_file(path: impl AsRef<Path>, file: &StatsFile) -> VtoolResult<()> {
    write_json(path.as_ref(), file)
}
