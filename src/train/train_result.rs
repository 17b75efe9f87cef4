use std::collections::BTreeMap;

use serde::Serialize;

/// Summary of one [`Trainer::train`](crate::train::Trainer::train) call.
///
/// Serializes to JSON; a `best_value` of `+∞` (nothing beat the baseline)
/// is written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainResult {
    /// Seeds tried across all workers. Each seed is trained once per
    /// activation pair.
    pub total_seeds: u64,
    pub threads: usize,
    /// Seeds tried by each worker.
    pub seeds_by_thread: BTreeMap<usize, u64>,
    pub best_value: f64,
    pub total_time_minutes: f64,
    /// First seed of each worker's range.
    pub seed_range_starts: Vec<i32>,
    /// Whether a stop request ended the search.
    pub cancelled: bool,
}

impl TrainResult {
    pub fn found_improvement(&self) -> bool {
        self.best_value < f64::INFINITY
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// The best network a search found, if any trial beat `+∞`, with the run summary.
#[derive(Debug)]
pub struct SearchOutcome<N> {
    pub best: Option<N>,
    pub result: TrainResult,
}
