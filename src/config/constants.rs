// src/config/constants.rs
//! Crate-wide constants

/// Naming conventions of the signal group / dataset model
pub mod names {
    /// Name of the mandatory time group of a dataset
    pub const TIME_GROUP: &str = "Time";
    /// Accepted names of the single signal inside a time group
    pub const TIME_SIGNAL: &str = "Time";
    /// Alternative name of the time signal for sample-index axes
    pub const INDEX_SIGNAL: &str = "Index";
    /// Field names ending in this suffix are name layers
    pub const LAYER_SUFFIX: &str = "Names";
    /// Layer used when a caller does not name one
    pub const DEFAULT_LAYER: &str = "Names";
    /// Field holding the N×M sample matrix
    pub const VALUES_FIELD: &str = "Values";
    /// Field holding one unit per signal
    pub const UNITS_FIELD: &str = "Units";
    /// Field holding one description per signal
    pub const DESCRIPTIONS_FIELD: &str = "Descriptions";
    /// Dataset attribute naming the file a case was read from
    pub const SOURCE_ATTRIBUTE: &str = "source";
}

/// Statistical reduction constants
pub mod stats {
    /// Percentiles reported in every statistic set
    pub const P05: f64 = 5.0;
    /// Median
    pub const P50: f64 = 50.0;
    /// 95th percentile
    pub const P95: f64 = 95.0;
    /// Field names of a statistic set, in output order
    pub const FIELDS: [&str; 6] = ["min", "max", "mean", "p05", "p50", "p95"];
    /// Maximum number of classification dimensions
    pub const MAX_CLASS_DIMENSIONS: usize = 2;
}

/// Spectral estimation constants
pub mod spectral {
    /// Frequency resolution used when none is configured
    pub const DEFAULT_DF_HZ: f64 = 0.1;
    /// Welch segment overlap
    pub const DEFAULT_OVERLAP_PERCENT: f64 = 50.0;
    /// Smallest FFT length produced by rounding `fs / df`
    pub const MIN_FFT_LENGTH: usize = 2;
    /// Relative tolerance when comparing sample intervals of two cases
    pub const SAMPLE_INTERVAL_TOLERANCE: f64 = 1e-6;
}

/// Progress reporting constants
pub mod progress {
    /// Percent of completed cases between progress events
    pub const DEFAULT_STEP_PERCENT: u32 = 10;
}

/// Configuration file and environment conventions
pub mod paths {
    /// Configuration file looked up in the working directory
    pub const DEFAULT_CONFIG_FILE: &str = "vtool.toml";
    /// Prefix of environment overrides
    pub const ENV_PREFIX: &str = "VTOOL";
    /// Separator between prefix, section and key in override variables
    pub const ENV_SEPARATOR: &str = "__";
}
