// src/processing/windowing.rs
//! Window functions and overlapping segmentation for spectral estimation

use crate::config::analysis_config::WindowType;
use std::f64::consts::PI;

/// Segment layout of a Welch estimate over a signal of fixed length
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// Segment length (FFT size)
    pub segment_len: usize,
    /// Distance between consecutive segment starts
    pub hop_size: usize,
    /// Start index of every segment
    pub starts: Vec<usize>,
}

impl Segmentation {
    /// Lay out segments of `segment_len` samples with `overlap_percent` overlap.
    ///
    /// A signal shorter than one segment gets a single segment starting at 0; the
    /// caller zero-pads it.
    pub fn new(signal_len: usize, segment_len: usize, overlap_percent: f64) -> Self {
        let segment_len = segment_len.max(1);
        let hop_size = (((1.0 - overlap_percent / 100.0) * segment_len as f64).round() as usize).max(1);
        let starts = if signal_len <= segment_len {
            vec![0]
        } else {
            (0..=signal_len - segment_len).step_by(hop_size).collect()
        };
        Self { segment_len, hop_size, starts }
    }

    /// Number of segments
    pub fn count(&self) -> usize {
        self.starts.len()
    }
}

/// Symmetric window of `size` samples
pub fn generate_window_function(window_type: WindowType, size: usize) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    let denom = (size - 1) as f64;
    match window_type {
        WindowType::Rectangular => vec![1.0; size],
        WindowType::Hamming => (0..size)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / denom).cos())
            .collect(),
        WindowType::Hann => (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / denom).cos()))
            .collect(),
        WindowType::Blackman => (0..size)
            .map(|i| {
                let n = i as f64 / denom;
                0.42 - 0.5 * (2.0 * PI * n).cos() + 0.08 * (4.0 * PI * n).cos()
            })
            .collect(),
    }
}

/// Sum of squared window coefficients, used to normalise power
pub fn window_power(window: &[f64]) -> f64 {
    window.iter().map(|w| w * w).sum()
}
