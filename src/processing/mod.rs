// src/processing/mod.rs
//! Statistical and spectral processing of case arrays

pub mod aggregate;
pub mod binning;
pub mod combine;
pub mod filter;
pub mod nanstats;
pub mod spectral;
pub mod windowing;

pub use aggregate::{compute_stats_array, Info, StatCube, StatMatrix, StatSet, Stats, StatsInput};
pub use binning::{assign_bin, classify_values, combine_class_vectors, compute_class_vector, BinResult, ClassVector};
pub use combine::combine_stats_files;
pub use filter::filter_cases;
pub use nanstats::{summarize, Statistic, Summary};
pub use spectral::{resolve_sample_rate, to_db, SpectPair, SpectralEstimator};
pub use windowing::{generate_window_function, Segmentation};
