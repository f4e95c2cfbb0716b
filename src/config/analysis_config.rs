// src/config/analysis_config.rs
//! Analysis configuration shared by the aggregation and spectral engines

use crate::config::constants::spectral;
use crate::error::{VtoolError, VtoolResult};
use serde::{Deserialize, Serialize};

/// Configuration passed explicitly to the statistical aggregation entry point
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Welch estimator settings
    #[serde(default)]
    pub spectral: SpectralConfig,

    /// Evaluate independent per-case reductions on the rayon pool
    #[serde(default = "defaults::parallel")]
    pub parallel: bool,

    /// Granularity of percent-complete progress events
    #[serde(default = "defaults::progress_step_percent")]
    pub progress_step_percent: u32,
}

/// Spectral estimation settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SpectralConfig {
    /// Frequency resolution in Hz; sets the FFT window length
    #[serde(default = "defaults::df_hz")]
    pub df_hz: f64,

    /// Segment taper
    #[serde(default = "defaults::window")]
    pub window: WindowType,

    /// Overlap between consecutive segments, percent of the segment length
    #[serde(default = "defaults::overlap_percent")]
    pub overlap_percent: f64,

    /// Fixed sample rate; derived from the first case's time vector when absent
    #[serde(default)]
    pub sample_rate_hz: Option<f64>,

    /// Report PSD statistics as 10*log10(|x|)
    #[serde(default = "defaults::db")]
    pub db: bool,
}

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    /// No taper
    Rectangular,
    /// Hamming window
    Hamming,
    /// Hann window, also accepted as `hanning`
    #[serde(alias = "hanning")]
    Hann,
    /// Blackman window
    Blackman,
}

mod defaults {
    use super::WindowType;
    use crate::config::constants::{progress, spectral};

    /// Per-case work runs on the rayon pool
    pub fn parallel() -> bool { true }
    /// Progress events every 10 %
    pub fn progress_step_percent() -> u32 { progress::DEFAULT_STEP_PERCENT }
    /// Target frequency resolution
    pub fn df_hz() -> f64 { spectral::DEFAULT_DF_HZ }
    /// Hann taper
    pub fn window() -> WindowType { WindowType::Hann }
    /// Half-overlapping segments
    pub fn overlap_percent() -> f64 { spectral::DEFAULT_OVERLAP_PERCENT }
    /// Spectra reported in dB
    pub fn db() -> bool { true }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            spectral: SpectralConfig::default(),
            parallel: defaults::parallel(),
            progress_step_percent: defaults::progress_step_percent(),
        }
    }
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            df_hz: defaults::df_hz(),
            window: defaults::window(),
            overlap_percent: defaults::overlap_percent(),
            sample_rate_hz: None,
            db: defaults::db(),
        }
    }
}

impl SpectralConfig {
    /// FFT window length for a given sample rate: `round(fs / df)`, at least 2
    pub fn fft_length(&self, sample_rate_hz: f64) -> usize {
        let n = (sample_rate_hz / self.df_hz).round();
        if n.is_finite() && n >= spectral::MIN_FFT_LENGTH as f64 {
            n as usize
        } else {
            spectral::MIN_FFT_LENGTH
        }
    }
}

/// Validate an analysis configuration
pub fn validate_analysis_config(config: &AnalysisConfig) -> VtoolResult<()> {
    let sp = &config.spectral;
    if !(sp.df_hz.is_finite() && sp.df_hz > 0.0) {
        return Err(VtoolError::invalid_input(
            "spectral.df_hz",
            format!("frequency resolution must be positive, got {}", sp.df_hz),
        ));
    }
    if !(0.0..100.0).contains(&sp.overlap_percent) {
        return Err(VtoolError::invalid_input(
            "spectral.overlap_percent",
            format!("overlap must be within [0, 100), got {}", sp.overlap_percent),
        ));
    }
    if let Some(fs) = sp.sample_rate_hz {
        if !(fs.is_finite() && fs > 0.0) {
            return Err(VtoolError::invalid_input(
                "spectral.sample_rate_hz",
                format!("sample rate must be positive, got {}", fs),
            ));
        }
        if fs < 2.0 * sp.df_hz {
            return Err(VtoolError::invalid_input(
                "spectral.df_hz",
                format!("resolution {} Hz too coarse for sample rate {} Hz", sp.df_hz, fs),
            ));
        }
    }
    if config.progress_step_percent == 0 || config.progress_step_percent > 100 {
        return Err(VtoolError::invalid_input(
            "progress_step_percent",
            format!("must be within 1..=100, got {}", config.progress_step_percent),
        ));
    }
    Ok(())
}
