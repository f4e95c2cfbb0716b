// src/utils/mod.rs
//! Shared helpers: batch evaluation, progress reporting and array serialization

pub mod batch;
pub mod progress;
pub mod serde_array;

pub use batch::{map_indexed, try_map_indexed};
pub use progress::ProgressReporter;
