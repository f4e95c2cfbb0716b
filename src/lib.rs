//! VTool Core: signal group data model with binned statistical and spectral aggregation
//!
//! The library models measurement data as *signal groups* (N samples × M named
//! signals with units and descriptions, addressable through several naming
//! conventions at once) collected into *datasets* that share a time base. Arrays of
//! either type represent a batch of cases. On top of the model it provides:
//!
//! - Validity checks and name lookup ([`validation`])
//! - Selection and atomic mutation: select, replace, concat, merge, resample, mask ([`ops`])
//! - Case classification into bins by a per-case statistic ([`processing::binning`])
//! - Long-time, short-time and spectral statistics per bin ([`processing::aggregate`])
//! - Combination of stats results over disjoint bins ([`processing::combine`])
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vtool_core::config::{AnalysisConfig, StatsOptions};
//! use vtool_core::io::load_collected_signals;
//! use vtool_core::processing::{compute_stats_array, StatsInput};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let collected = load_collected_signals("collected.json")?;
//!     let input = StatsInput::from_collected("SIGNALS", collected);
//!     let result = compute_stats_array(&input, &StatsOptions::default(), &AnalysisConfig::default())?;
//!     println!("{} bins over {} cases", result.info.n_bins(), result.info.n_cases());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod ops;
pub mod processing;
pub mod utils;
pub mod validation;

// Re-export commonly used types for convenience
pub use error::{VtoolError, VtoolResult};
pub use model::{AttributeValue, Dataset, DatasetArray, NameLayers, SignalGroup, SignalGroupArray};
pub use validation::{Validate, Validity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Signal group data model with binned statistical and spectral aggregation".to_string(),
        features: vec![
            "Signal group and dataset validation".to_string(),
            "Atomic selection and mutation operations".to_string(),
            "Case classification".to_string(),
            "Binned statistics and Welch spectra".to_string(),
            "Stats file combination".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
