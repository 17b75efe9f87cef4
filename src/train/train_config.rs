use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::error::{NnError, Result};

/// Number of distinct 32-bit seeds shared out between the workers.
pub const SEED_SPACE: u64 = 1 << 32;

/// Configuration for a [`Trainer`](crate::train::Trainer) search.
///
/// # Fields
/// - `threads`:          workers, each owning one contiguous seed range
/// - `minutes_to_train`: wall-clock budget, checked once per outer iteration
/// - `epochs`:           training epochs per trial
/// - `max_iterations`:   optional per-worker cap on seeds tried; never above
///                       the size of the worker's seed range
/// - `checkpoint_path`:  where every new best network is written, if set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub threads: usize,
    pub minutes_to_train: f64,
    pub epochs: usize,
    pub max_iterations: Option<u64>,
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            threads: 50,
            minutes_to_train: 1.0,
            epochs: 10_000,
            max_iterations: None,
            checkpoint_path: None,
        }
    }
}

impl TrainerConfig {
    /// Creates a `TrainerConfig` with no iteration cap and no checkpoint.
    pub fn new(threads: usize, minutes_to_train: f64, epochs: usize) -> Self {
        TrainerConfig {
            threads,
            minutes_to_train,
            epochs,
            ..TrainerConfig::default()
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(NnError::InvalidConfig("at least one thread is required".into()));
        }
        if self.threads as u64 > SEED_SPACE {
            return Err(NnError::InvalidConfig(format!(
                "{} threads cannot share {SEED_SPACE} seeds",
                self.threads
            )));
        }
        if self.minutes_to_train.is_nan() || self.minutes_to_train < 0.0 {
            return Err(NnError::InvalidConfig(format!(
                "minutes_to_train must be non-negative, got {}",
                self.minutes_to_train
            )));
        }
        Ok(())
    }

    /// Seeds each worker may try: its share of the seed space, lowered by
    /// `max_iterations` when that is smaller.
    pub fn iteration_cap(&self) -> u64 {
        let share = SEED_SPACE / self.threads.max(1) as u64;
        self.max_iterations.map_or(share, |max| max.min(share))
    }

    /// The wall-clock budget; budgets too large for a `Duration` never expire.
    pub fn time_budget(&self) -> Duration {
        Duration::try_from_secs_f64(self.minutes_to_train * 60.0).unwrap_or(Duration::MAX)
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a config; missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<TrainerConfig> {
        let reader = BufReader::new(File::open(path)?);
        let config: TrainerConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
