// src/model/time.rs
//! Elapsed vs absolute time axes and sample-grid helpers

/// A time axis in one of two distinguishable representations
#[derive(Debug, Clone, PartialEq)]
pub enum TimeAxis {
    /// Seconds since the start of the record
    Elapsed(Vec<f64>),
    /// Seconds since the Unix epoch
    Absolute(Vec<f64>),
}

impl TimeAxis {
    /// Build an absolute axis from an origin and elapsed offsets
    pub fn absolute_from_elapsed(origin: f64, elapsed: &[f64]) -> Self {
        TimeAxis::Absolute(elapsed.iter().map(|t| origin + t).collect())
    }

    /// Split into an optional origin and elapsed seconds.
    ///
    /// For an absolute axis the origin is the first finite sample.
    pub fn to_elapsed(&self) -> (Option<f64>, Vec<f64>) {
        match self {
            TimeAxis::Elapsed(t) => (None, t.clone()),
            TimeAxis::Absolute(t) => {
                let origin = t.iter().copied().find(|v| v.is_finite()).unwrap_or(0.0);
                (Some(origin), t.iter().map(|v| v - origin).collect())
            }
        }
    }

    /// True for epoch-based samples
    pub fn is_absolute(&self) -> bool {
        matches!(self, TimeAxis::Absolute(_))
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples().len()
    }

    /// True without any sample
    pub fn is_empty(&self) -> bool {
        self.samples().is_empty()
    }

    /// Raw samples: seconds since the epoch or elapsed seconds
    pub fn samples(&self) -> &[f64] {
        match self {
            TimeAxis::Elapsed(t) | TimeAxis::Absolute(t) => t,
        }
    }
}

/// True if every sample is finite and larger than its predecessor
pub fn is_strictly_increasing(t: &[f64]) -> bool {
    t.iter().all(|v| v.is_finite()) && t.windows(2).all(|w| w[1] > w[0])
}

/// Median spacing of a time vector, `None` for fewer than two samples
pub fn sample_interval(t: &[f64]) -> Option<f64> {
    let mut diffs: Vec<f64> = t
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| d.is_finite())
        .collect();
    if diffs.is_empty() {
        return None;
    }
    diffs.sort_by(|a, b| a.total_cmp(b));
    let mid = diffs.len() / 2;
    Some(if diffs.len() % 2 == 0 {
        0.5 * (diffs[mid - 1] + diffs[mid])
    } else {
        diffs[mid]
    })
}

/// Uniform grid `start, start+dt, ...` up to and including `end` (within rounding)
pub fn uniform_grid(start: f64, end: f64, dt: f64) -> Vec<f64> {
    if !(dt > 0.0) || !start.is_finite() || !end.is_finite() || end < start {
        return Vec::new();
    }
    let steps = ((end - start) / dt + 1e-9).floor() as usize;
    (0..=steps).map(|k| start + k as f64 * dt).collect()
}
