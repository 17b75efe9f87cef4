use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
enum Timing {
    Idle,
    Running(Instant),
    Done(Duration),
}

/// State a running search shares with its monitors.
#[derive(Debug)]
pub(crate) struct Progress {
    pub(crate) stop: AtomicBool,
    pub(crate) best_bits: AtomicU64,
    pub(crate) iterations: Vec<AtomicU64>,
    timing: Mutex<Timing>,
}

impl Progress {
    pub(crate) fn new(threads: usize) -> Progress {
        Progress {
            stop: AtomicBool::new(false),
            best_bits: AtomicU64::new(f64::INFINITY.to_bits()),
            iterations: (0..threads).map(|_| AtomicU64::new(0)).collect(),
            timing: Mutex::new(Timing::Idle),
        }
    }

    /// Clears the counters for a new run and starts its clock.
    pub(crate) fn begin(&self) -> Instant {
        for counter in &self.iterations {
            counter.store(0, Ordering::Relaxed);
        }
        let now = Instant::now();
        *self.timing.lock() = Timing::Running(now);
        now
    }

    pub(crate) fn finish(&self, elapsed: Duration) {
        *self.timing.lock() = Timing::Done(elapsed);
    }

    pub(crate) fn stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub(crate) fn iterations_snapshot(&self) -> Vec<u64> {
        self.iterations.iter().map(|c| c.load(Ordering::Relaxed)).collect()
    }
}

/// Read-only view of a [`Trainer`](crate::train::Trainer) plus its stop
/// switch, safe to use from other threads while a search runs.
#[derive(Debug, Clone)]
pub struct TrainerMonitor {
    pub(crate) progress: Arc<Progress>,
}

impl TrainerMonitor {
    /// Asks every worker to stop at the top of its next iteration. The
    /// request is permanent: later searches on the same trainer return at once.
    pub fn request_stop(&self) {
        self.progress.stop.store(true, Ordering::Release);
    }

    pub fn is_stopping(&self) -> bool {
        self.progress.stopping()
    }

    /// Lowest test error found by the current or last search.
    pub fn best_value(&self) -> f64 {
        f64::from_bits(self.progress.best_bits.load(Ordering::Acquire))
    }

    /// Time since the current search started, or the length of the last one.
    pub fn elapsed(&self) -> Duration {
        match *self.progress.timing.lock() {
            Timing::Idle => Duration::ZERO,
            Timing::Running(started) => started.elapsed(),
            Timing::Done(elapsed) => elapsed,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.progress.timing.lock(), Timing::Running(_))
    }

    /// Seeds completed by each worker, indexed by worker.
    pub fn iterations_by_thread(&self) -> Vec<u64> {
        self.progress.iterations_snapshot()
    }

    pub fn total_iterations(&self) -> u64 {
        self.iterations_by_thread().iter().sum()
    }
}
