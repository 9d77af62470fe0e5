use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Counters shared by the workers of one run.
///
/// Only used for progress reporting; the summary is built from job results.
#[derive(Debug)]
pub struct RunStats {
    total: usize,
    report_every: usize,
    started: Instant,
    completed: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl RunStats {
    pub fn new(total: usize, report_every: usize) -> Self {
        Self {
            total,
            report_every: report_every.max(1),
            started: Instant::now(),
            completed: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Count a finished job and log progress every `report_every` jobs.
    /// Returns the number of jobs completed so far, this one included.
    pub fn record(&self, succeeded: bool) -> usize {
        if succeeded {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        let completed = self.completed.fetch_add(1, Ordering::AcqRel) + 1;

        if completed % self.report_every == 0 || completed == self.total {
            tracing::info!(
                completed,
                total = self.total,
                succeeded = self.succeeded.load(Ordering::Relaxed),
                failed = self.failed.load(Ordering::Relaxed),
                rate = format_args!("{:.2} jobs/sec", self.throughput_at(completed)),
                "Progress"
            );
        }
        completed
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Completed jobs per second since the run started
    pub fn throughput(&self) -> f64 {
        self.throughput_at(self.completed())
    }

    fn throughput_at(&self, completed: usize) -> f64 {
        let secs = self.started.elapsed().as_secs_f64();
        if secs > 0.0 {
            completed as f64 / secs
        } else {
            0.0
        }
    }
}
