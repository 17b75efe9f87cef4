use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, trace};

use crate::activation::ActivationKind;
use crate::data::Dataset;
use crate::error::{NnError, Result};
use crate::network::Model;
use crate::train::best::BestTracker;
use crate::train::monitor::{Progress, TrainerMonitor};
use crate::train::train_config::{TrainerConfig, SEED_SPACE};
use crate::train::train_result::{SearchOutcome, TrainResult};

/// First seed of each of `n` equal, non-overlapping ranges covering the
/// signed 32-bit seed space, starting at `i32::MIN`.
pub fn build_seed_steps(n: usize) -> Vec<i32> {
    if n == 0 {
        return Vec::new();
    }
    let stride = SEED_SPACE / n as u64;
    (0..n as u64)
        .map(|k| (i64::from(i32::MIN) + (k * stride) as i64) as i32)
        .collect()
}

/// Races independent training runs across the seed space and the
/// activation table, keeping the network with the lowest test error.
///
/// Worker `k` starts at `build_seed_steps(threads)[k]` and walks its range
/// one seed per iteration. Each iteration trains a fresh clone of the base
/// network for every activation pair. Limits are checked at the top of each
/// iteration, so a trial in progress always runs to the end.
#[derive(Debug)]
pub struct Trainer {
    config: TrainerConfig,
    progress: Arc<Progress>,
}

struct Search<'a, N> {
    base: &'a N,
    data: &'a Dataset,
    epochs: usize,
    cap: u64,
    budget: Duration,
    started: Instant,
    progress: &'a Progress,
    tracker: &'a BestTracker<'a, N>,
}

/// Stops the other workers if this one unwinds.
struct PanicGuard<'a> {
    worker: usize,
    progress: &'a Progress,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("search worker {} panicked, stopping the search", self.worker);
            self.progress.stop.store(true, Ordering::Release);
        }
    }
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Result<Trainer> {
        config.validate()?;
        let progress = Arc::new(Progress::new(config.threads));
        Ok(Trainer { config, progress })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn monitor(&self) -> TrainerMonitor {
        TrainerMonitor { progress: Arc::clone(&self.progress) }
    }

    /// Runs the search and waits for every worker.
    ///
    /// Returns `best: None` when no trial scored below `+∞`. A worker error
    /// stops the rest and is returned once all of them have been joined.
    pub fn train<N: Model>(&self, base: &N, data: &Dataset) -> Result<SearchOutcome<N>> {
        let threads = self.config.threads;
        let starts = build_seed_steps(threads);
        let cap = self.config.iteration_cap();
        let tracker = BestTracker::new(&self.progress.best_bits, self.config.checkpoint_path.as_deref());

        info!(
            "searching {threads} seed ranges x {} activations, {} epochs per trial, {} seeds per worker, {:.2} min budget",
            ActivationKind::ALL.len(),
            self.config.epochs,
            cap,
            self.config.minutes_to_train
        );

        let started = self.progress.begin();
        let search = Search {
            base,
            data,
            epochs: self.config.epochs,
            cap,
            budget: self.config.time_budget(),
            started,
            progress: &self.progress,
            tracker: &tracker,
        };

        let mut failure: Option<NnError> = None;
        thread::scope(|scope| {
            let handles: Vec<_> = starts
                .iter()
                .enumerate()
                .map(|(worker, &start)| {
                    let search = &search;
                    scope.spawn(move || {
                        let _guard = PanicGuard { worker, progress: search.progress };
                        search.run(worker, start)
                    })
                })
                .collect();

            for (worker, handle) in handles.into_iter().enumerate() {
                let outcome = handle.join().unwrap_or(Err(NnError::WorkerPanicked { worker }));
                if let Err(e) = outcome {
                    error!("search worker {worker} failed: {e}");
                    self.progress.stop.store(true, Ordering::Release);
                    failure.get_or_insert(e);
                }
            }
        });

        let elapsed = started.elapsed();
        self.progress.finish(elapsed);
        if let Some(e) = failure {
            return Err(e);
        }

        let seeds = self.progress.iterations_snapshot();
        let (best_value, best) = tracker.into_best();
        let result = TrainResult {
            total_seeds: seeds.iter().sum(),
            threads,
            seeds_by_thread: seeds.into_iter().enumerate().collect::<BTreeMap<_, _>>(),
            best_value,
            total_time_minutes: elapsed.as_secs_f64() / 60.0,
            seed_range_starts: starts,
            cancelled: self.progress.stopping(),
        };
        info!(
            "search finished after {:.2} min: {} seeds, best error {}{}",
            result.total_time_minutes,
            result.total_seeds,
            result.best_value,
            if result.cancelled { " (cancelled)" } else { "" }
        );
        Ok(SearchOutcome { best, result })
    }
}

impl<N: Model> Search<'_, N> {
    fn keep_going(&self, iterations: u64) -> bool {
        iterations < self.cap && !self.progress.stopping() && self.started.elapsed() < self.budget
    }

    fn run(&self, worker: usize, start: i32) -> Result<()> {
        let counter = &self.progress.iterations[worker];
        let mut seed = start;
        let mut iterations = 0u64;
        while self.keep_going(iterations) {
            for kind in ActivationKind::ALL {
                let mut candidate = self.base.reseeded(seed)?;
                candidate.set_activation(kind);
                candidate.train_dataset(self.data, self.epochs)?;
                let error = candidate.test_dataset(self.data)?;
                trace!("worker {worker}: seed {seed} {kind:?} -> {error}");
                self.tracker.offer(error, candidate);
            }
            iterations += 1;
            counter.store(iterations, Ordering::Relaxed);
            seed = seed.wrapping_add(1);
        }
        Ok(())
    }
}
