// src/utils/progress.rs
//! Coarse percent-complete progress events for long per-case loops

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Emits an `info!` event each time another `step_percent` of the work completes.
///
/// Safe to tick from rayon workers; events may then arrive slightly out of order.
#[derive(Debug)]
pub struct ProgressReporter {
    stage: &'static str,
    total: usize,
    step_percent: u32,
    done: AtomicUsize,
}

impl ProgressReporter {
    /// Reporter for `total` items, logging every `step_percent`
    pub fn new(stage: &'static str, total: usize, step_percent: u32) -> Self {
        Self {
            stage,
            total,
            step_percent: step_percent.clamp(1, 100),
            done: AtomicUsize::new(0),
        }
    }

    /// Percent complete after `done` items
    fn percent(&self, done: usize) -> u32 {
        if self.total == 0 {
            return 100;
        }
        ((done.min(self.total) * 100) / self.total) as u32
    }

    /// Record one finished item; returns the percentage if an event was emitted
    pub fn tick(&self) -> Option<u32> {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let before = self.percent(done - 1) / self.step_percent;
        let now = self.percent(done);
        if now / self.step_percent > before {
            info!(stage = self.stage, percent = now, done, total = self.total, "progress");
            Some(now)
        } else {
            None
        }
    }

    /// Items finished so far
    pub fn completed(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_every_step() {
        let progress = ProgressReporter::new("psd", 10, 20);
        let events: Vec<u32> = (0..10).filter_map(|_| progress.tick()).collect();
        assert_eq!(events, vec![20, 40, 60, 80, 100]);
        assert_eq!(progress.completed(), 10);
    }

    #[test]
    fn test_small_batches_report_each_item() {
        let progress = ProgressReporter::new("lt", 3, 10);
        let events: Vec<u32> = (0..3).filter_map(|_| progress.tick()).collect();
        assert_eq!(events, vec![33, 66, 100]);
    }
}
