// src/config/mod.rs
//! Configuration of the analysis engines
//!
//! [`VtoolConfig`] has two sections: `[analysis]` ([`AnalysisConfig`], process-wide
//! engine settings) and `[stats]` ([`StatsOptions`], the options of one aggregation
//! run). [`ConfigLoader`] layers defaults, TOML files and environment overrides.

pub mod analysis_config;
pub mod constants;
pub mod loader;
pub mod stats_options;

pub use analysis_config::{validate_analysis_config, AnalysisConfig, SpectralConfig, WindowType};
pub use loader::ConfigLoader;
pub use stats_options::{validate_stats_options, CaseFilter, Classification, StatsOptions};

use crate::error::VtoolResult;
use serde::{Deserialize, Serialize};

/// Complete configuration file contents
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct VtoolConfig {
    /// Execution and spectral settings
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// What to aggregate and how to classify
    #[serde(default)]
    pub stats: StatsOptions,
}

/// Validate both sections
pub fn validate_config(config: &VtoolConfig) -> VtoolResult<()> {
    validate_analysis_config(&config.analysis)?;
    validate_stats_options(&config.stats)
}
