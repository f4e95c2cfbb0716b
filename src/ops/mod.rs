// src/ops/mod.rs
//! Selection and mutation operations over signal groups, datasets and their arrays
//!
//! Operations either fully succeed or leave their input untouched. Mutating functions
//! take `&mut` and validate every argument before the first write; the others return
//! a new value.

pub mod concat;
pub mod edit;
pub mod mask;
pub mod merge;
pub mod pad;
pub mod rebuild;
pub mod resample;
pub mod select;

pub use concat::{concat_datasets, concat_signal_groups, reconcile_units};
pub use edit::{
    add_signal_to_group, remove_from_group, replace_signal_in_dataset, replace_signal_in_group,
    swap_signal_in_dataset, swap_signal_in_group, try_replace_signal_in_dataset,
    try_replace_signal_in_group, NewSignal, SignalData,
};
pub use mask::{apply_index, apply_index_to_dataset, apply_mask, apply_mask_to_dataset, MaskTarget, RowSelector};
pub use merge::{merge_datasets, merge_signal_groups, MergeConflict};
pub use pad::{equalize_lengths, pad_dataset, pad_signal_group, truncate_signal_group, LengthTarget, PadMode};
pub use rebuild::{collect_signals, rebuild_dataset};
pub use resample::{
    downsample_dataset, interp1, limit_time_range, resample_dataset, resample_signal_group,
    Extrapolation, InterpMethod, ResampleOptions, ResampleTarget,
};
pub use select::{select_from_array, select_from_group, Selection, SignalRef};
