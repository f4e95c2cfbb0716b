// src/processing/spectral.rs
//! Welch power spectral density, cross spectra and coherence
//!
//! All spectra are one-sided with `nfft / 2 + 1` bins, `nfft = round(fs / df)`.
//! Segments containing NaN are skipped; a signal without any usable segment yields
//! an all-NaN spectrum of the regular length.

use crate::config::analysis_config::SpectralConfig;
use crate::config::constants::spectral;
use crate::error::{VtoolError, VtoolResult};
use crate::model::time::{sample_interval, uniform_grid};
use crate::ops::resample::{interp1, ResampleOptions};
use crate::processing::windowing::{generate_window_function, window_power, Segmentation};
use ndarray::Array2;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Welch estimator for one sample rate and resolution
#[derive(Clone)]
pub struct SpectralEstimator {
    sample_rate_hz: f64,
    nfft: usize,
    overlap_percent: f64,
    window: Vec<f64>,
    window_power: f64,
    fft: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for SpectralEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralEstimator")
            .field("sample_rate_hz", &self.sample_rate_hz)
            .field("nfft", &self.nfft)
            .field("overlap_percent", &self.overlap_percent)
            .finish()
    }
}

/// Auto and cross spectra of a signal pair
#[derive(Debug, Clone, PartialEq)]
pub struct SpectPair {
    /// PSD of the first operand
    pub pxx: Vec<f64>,
    /// PSD of the second operand
    pub pyy: Vec<f64>,
    /// Cross spectrum `conj(X) * Y`
    pub pxy: Vec<Complex<f64>>,
    /// |Cxy|
    pub coherence: Vec<f64>,
    /// Negative phase of Cxy in degrees
    pub phase_deg: Vec<f64>,
}

impl SpectralEstimator {
    /// Estimator for `sample_rate_hz` with the configured resolution and window
    pub fn new(config: &SpectralConfig, sample_rate_hz: f64) -> VtoolResult<Self> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(VtoolError::invalid_input(
                "sample_rate_hz",
                format!("sample rate must be positive, got {}", sample_rate_hz),
            ));
        }
        let nfft = config.fft_length(sample_rate_hz);
        let window = generate_window_function(config.window, nfft);
        let power = window_power(&window);
        let fft = FftPlanner::<f64>::new().plan_fft_forward(nfft);
        Ok(Self {
            sample_rate_hz,
            nfft,
            overlap_percent: config.overlap_percent,
            window,
            window_power: power,
            fft,
        })
    }

    /// FFT length
    pub fn nfft(&self) -> usize {
        self.nfft
    }

    /// Sampling rate the estimator was built for
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    /// Number of one-sided frequency bins
    pub fn n_freqs(&self) -> usize {
        self.nfft / 2 + 1
    }

    /// Effective resolution `fs / nfft`
    pub fn df(&self) -> f64 {
        self.sample_rate_hz / self.nfft as f64
    }

    /// Frequencies of the one-sided bins
    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.n_freqs()).map(|k| k as f64 * self.df()).collect()
    }

    /// Windowed FFT of every NaN-free segment
    fn segment_spectra(&self, x: &[f64]) -> Vec<Vec<Complex<f64>>> {
        let layout = Segmentation::new(x.len(), self.nfft, self.overlap_percent);
        let mut spectra = Vec::with_capacity(layout.count());
        for &start in &layout.starts {
            let end = (start + self.nfft).min(x.len());
            let segment = &x[start..end];
            if segment.is_empty() || segment.iter().any(|v| v.is_nan()) {
                continue;
            }
            let mut buffer: Vec<Complex<f64>> = segment
                .iter()
                .zip(&self.window)
                .map(|(&v, &w)| Complex::new(v * w, 0.0))
                .collect();
            buffer.resize(self.nfft, Complex::new(0.0, 0.0));
            self.fft.process(&mut buffer);
            spectra.push(buffer);
        }
        spectra
    }

    /// One-sided scaling of bin `k`
    fn scale(&self, k: usize) -> f64 {
        let edge = k == 0 || (self.nfft % 2 == 0 && k == self.nfft / 2);
        let factor = if edge { 1.0 } else { 2.0 };
        factor / (self.sample_rate_hz * self.window_power)
    }

    fn average_cross(&self, sx: &[Vec<Complex<f64>>], sy: &[Vec<Complex<f64>>]) -> Vec<Complex<f64>> {
        let nf = self.n_freqs();
        let count = sx.len().min(sy.len());
        if count == 0 {
            return vec![Complex::new(f64::NAN, f64::NAN); nf];
        }
        (0..nf)
            .map(|k| {
                let sum: Complex<f64> = sx.iter().zip(sy).map(|(a, b)| a[k].conj() * b[k]).sum();
                sum * (self.scale(k) / count as f64)
            })
            .collect()
    }

    /// One-sided power spectral density
    pub fn psd(&self, x: &[f64]) -> Vec<f64> {
        let sx = self.segment_spectra(x);
        if sx.is_empty() {
            return vec![f64::NAN; self.n_freqs()];
        }
        self.average_cross(&sx, &sx).into_iter().map(|c| c.re).collect()
    }

    /// One-sided cross spectral density `conj(X) * Y`
    pub fn cpsd(&self, x: &[f64], y: &[f64]) -> Vec<Complex<f64>> {
        let (sx, sy) = self.paired_segments(x, y);
        self.average_cross(&sx, &sy)
    }

    /// Segments usable in both signals, so that cross terms average over the same windows
    fn paired_segments(&self, x: &[f64], y: &[f64]) -> (Vec<Vec<Complex<f64>>>, Vec<Vec<Complex<f64>>>) {
        let n = x.len().min(y.len());
        let valid = |i: usize| !x[i].is_nan() && !y[i].is_nan();
        let mask: Vec<bool> = (0..n).map(valid).collect();
        let masked = |s: &[f64]| -> Vec<f64> {
            s[..n].iter().zip(&mask).map(|(&v, &ok)| if ok { v } else { f64::NAN }).collect()
        };
        (self.segment_spectra(&masked(x)), self.segment_spectra(&masked(y)))
    }

    /// Auto spectra, cross spectrum and coherence of a pair.
    ///
    /// `pxx` and `pyy` use every usable segment of their own signal. The cross
    /// spectrum and the coherence normaliser only use segments valid in both, so
    /// coherence stays within `[0, 1]`. An all-NaN operand makes the cross terms NaN
    /// while the other operand's own spectrum is still estimated.
    pub fn spect_signals(&self, x: &[f64], y: &[f64]) -> SpectPair {
        let (sx, sy) = self.paired_segments(x, y);
        let pxy = self.average_cross(&sx, &sy);
        let paired_xx = self.average_cross(&sx, &sx);
        let paired_yy = self.average_cross(&sy, &sy);
        let cxy: Vec<Complex<f64>> = pxy
            .iter()
            .zip(paired_xx.iter().zip(&paired_yy))
            .map(|(p, (a, b))| *p / (a.re.abs().sqrt() * b.re.abs().sqrt()))
            .collect();
        SpectPair {
            coherence: cxy.iter().map(|c| c.norm()).collect(),
            phase_deg: cxy.iter().map(|c| -c.arg().to_degrees()).collect(),
            pxx: self.psd(x),
            pyy: self.psd(y),
            pxy,
        }
    }

    /// PSD of every column; result is `n_freqs × M`
    pub fn psd_columns(&self, values: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::from_elem((self.n_freqs(), values.ncols()), f64::NAN);
        for (j, column) in values.columns().into_iter().enumerate() {
            let x = column.to_vec();
            for (k, p) in self.psd(&x).into_iter().enumerate() {
                out[[k, j]] = p;
            }
        }
        out
    }
}

/// Sample rate from configuration, else the median interval of `time`
pub fn resolve_sample_rate(config: &SpectralConfig, time: Option<&[f64]>) -> VtoolResult<f64> {
    if let Some(fs) = config.sample_rate_hz {
        return Ok(fs);
    }
    let dt = time.and_then(sample_interval).ok_or_else(|| {
        VtoolError::invalid_input(
            "spectral.sample_rate_hz",
            "no sample rate configured and no usable time vector",
        )
    })?;
    if !(dt > 0.0) {
        return Err(VtoolError::invalid_input("time", format!("non-positive sample interval {}", dt)));
    }
    Ok(1.0 / dt)
}

/// True if `time` is sampled at `fs` within tolerance
pub fn matches_sample_rate(time: &[f64], fs: f64) -> bool {
    match sample_interval(time) {
        Some(dt) => ((dt * fs) - 1.0).abs() <= spectral::SAMPLE_INTERVAL_TOLERANCE,
        None => true,
    }
}

/// Linear resampling of `values(time)` onto a uniform grid at `fs`
pub fn resample_uniform(time: &[f64], values: &[f64], fs: f64) -> VtoolResult<Vec<f64>> {
    let (Some(&start), Some(&end)) = (time.first(), time.last()) else {
        return Ok(Vec::new());
    };
    let grid = uniform_grid(start, end, 1.0 / fs);
    interp1(time, values, &grid, ResampleOptions::default())
}

/// `10 * log10(|x|)`
pub fn to_db(x: f64) -> f64 {
    10.0 * x.abs().log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::analysis_config::WindowType;
    use std::f64::consts::PI;

    fn config(df: f64, window: WindowType) -> SpectralConfig {
        SpectralConfig { df_hz: df, window, ..Default::default() }
    }

    #[test]
    fn test_lengths_follow_resolution() {
        let est = SpectralEstimator::new(&config(1.0, WindowType::Hann), 64.0).unwrap();
        assert_eq!(est.nfft(), 64);
        assert_eq!(est.n_freqs(), 33);
        assert_eq!(est.frequencies()[32], 32.0);
    }

    #[test]
    fn test_sine_power_matches_variance() {
        let fs = 32.0;
        let est = SpectralEstimator::new(&config(1.0, WindowType::Rectangular), fs).unwrap();
        let x: Vec<f64> = (0..32).map(|i| (2.0 * PI * 4.0 * i as f64 / fs).sin()).collect();
        let p = est.psd(&x);
        let total: f64 = p.iter().sum::<f64>() * est.df();
        assert!((total - 0.5).abs() < 1e-9);
        let peak = p.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(p[4], peak);
    }

    #[test]
    fn test_all_nan_signal_gives_nan_spectrum() {
        let est = SpectralEstimator::new(&config(0.5, WindowType::Hann), 10.0).unwrap();
        let x = vec![f64::NAN; 100];
        let p = est.psd(&x);
        assert_eq!(p.len(), est.n_freqs());
        assert!(p.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_nan_operand_keeps_other_auto_spectrum() {
        let est = SpectralEstimator::new(&config(1.0, WindowType::Hann), 16.0).unwrap();
        let x = vec![f64::NAN; 64];
        let y: Vec<f64> = (0..64).map(|i| (i as f64 * 0.3).cos()).collect();
        let pair = est.spect_signals(&x, &y);
        assert!(pair.pxx.iter().all(|v| v.is_nan()));
        assert!(pair.pyy.iter().all(|v| !v.is_nan()));
        assert!(pair.pxy.iter().all(|c| c.re.is_nan()));
        assert!(pair.coherence.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_self_coherence_is_one() {
        let est = SpectralEstimator::new(&config(1.0, WindowType::Hann), 16.0).unwrap();
        let x: Vec<f64> = (0..64).map(|i| (i as f64 * 0.7).sin() + 0.1 * i as f64).collect();
        let pair = est.spect_signals(&x, &x);
        for (c, ph) in pair.coherence.iter().zip(&pair.phase_deg).skip(1) {
            assert!((c - 1.0).abs() < 1e-9);
            assert!(ph.abs() < 1e-6);
        }
    }

    #[test]
    fn test_partly_nan_operand_keeps_coherence_bounded() {
        let est = SpectralEstimator::new(&config(1.0, WindowType::Hann), 16.0).unwrap();
        let clean: Vec<f64> = (0..512).map(|i| (i as f64 * 0.9).sin() + 0.3 * (i as f64 * 2.1).cos()).collect();
        let mut x = clean.clone();
        let mut y: Vec<f64> = clean.iter().map(|v| 0.5 * v + 0.2).collect();
        for i in 0..128 {
            x[i] = f64::NAN;
            y[i] = 0.0;
        }
        let pair = est.spect_signals(&x, &y);
        let finite: Vec<f64> = pair.coherence.iter().copied().filter(|c| c.is_finite()).collect();
        assert!(!finite.is_empty());
        assert!(finite.iter().all(|&c| c <= 1.0 + 1e-9));
        // auto spectra still use every segment of their own signal
        assert_eq!(pair.pyy, est.psd(&y));
    }

    #[test]
    fn test_short_signal_is_zero_padded() {
        let est = SpectralEstimator::new(&config(0.1, WindowType::Hann), 10.0).unwrap();
        let p = est.psd(&[1.0, 2.0, 3.0]);
        assert_eq!(p.len(), 51);
        assert!(p.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_sample_rate_resolution() {
        let cfg = SpectralConfig::default();
        let t: Vec<f64> = (0..10).map(|i| i as f64 * 0.01).collect();
        assert!((resolve_sample_rate(&cfg, Some(&t)).unwrap() - 100.0).abs() < 1e-6);
        assert!(resolve_sample_rate(&cfg, None).is_err());
        let fixed = SpectralConfig { sample_rate_hz: Some(50.0), ..Default::default() };
        assert_eq!(resolve_sample_rate(&fixed, None).unwrap(), 50.0);
        assert!(matches_sample_rate(&t, 100.0));
        assert!(!matches_sample_rate(&t, 50.0));
    }

    #[test]
    fn test_db() {
        assert_eq!(to_db(100.0), 20.0);
        assert_eq!(to_db(-10.0), 10.0);
    }
}
