// src/model/mod.rs
//! Data model: signal groups, datasets and their homogeneous arrays

pub mod array;
pub mod dataset;
pub mod name_layers;
pub mod signal_group;
pub mod time;

pub use array::{DatasetArray, SignalGroupArray};
pub use dataset::{AttributeValue, Dataset, TIME_ORIGIN_ATTRIBUTE};
pub use name_layers::NameLayers;
pub use signal_group::SignalGroup;
pub use time::TimeAxis;
