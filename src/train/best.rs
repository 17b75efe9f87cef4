use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::network::Model;

struct Best<N> {
    value: f64,
    network: Option<N>,
}

/// The best network seen so far, shared between search workers.
///
/// Offers are compared and stored under one lock, so an improvement can
/// never be overwritten by a worse one. The current value is mirrored in an
/// atomic so monitors and losing offers can read it without locking.
pub(crate) struct BestTracker<'a, N> {
    mirror: &'a AtomicU64,
    checkpoint: Option<&'a Path>,
    slot: Mutex<Best<N>>,
}

impl<'a, N: Model> BestTracker<'a, N> {
    /// Starts at `+∞`; `mirror` is reset to match.
    pub(crate) fn new(mirror: &'a AtomicU64, checkpoint: Option<&'a Path>) -> Self {
        mirror.store(f64::INFINITY.to_bits(), Ordering::Release);
        BestTracker {
            mirror,
            checkpoint,
            slot: Mutex::new(Best { value: f64::INFINITY, network: None }),
        }
    }

    pub(crate) fn best_value(&self) -> f64 {
        f64::from_bits(self.mirror.load(Ordering::Acquire))
    }

    /// Keeps `candidate` if `error` is strictly below the current best and
    /// writes the checkpoint before releasing the lock. NaN never wins.
    pub(crate) fn offer(&self, error: f64, mut candidate: N) -> bool {
        if !(error < self.best_value()) {
            return false;
        }
        let mut best = self.slot.lock();
        if !(error < best.value) {
            return false;
        }
        debug!(
            "new best {error:.6} (seed {}, {:?}), was {}",
            candidate.seed(),
            candidate.activation(),
            best.value
        );
        if let Some(path) = self.checkpoint {
            if let Err(e) = candidate.save_to_file(path) {
                warn!("could not write checkpoint {}: {e}", path.display());
            }
        }
        best.value = error;
        best.network = Some(candidate);
        self.mirror.store(error.to_bits(), Ordering::Release);
        true
    }

    pub(crate) fn into_best(self) -> (f64, Option<N>) {
        let best = self.slot.into_inner();
        (best.value, best.network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationKind;
    use crate::network::{DeepNetwork, LayerSpec};

    fn network(seed: i32) -> DeepNetwork {
        DeepNetwork::new(&[LayerSpec::new(1, 1, 1)], seed, 0.1, ActivationKind::Sigmoid).unwrap()
    }

    #[test]
    fn only_strict_improvements_win() {
        let mirror = AtomicU64::new(0);
        let tracker = BestTracker::new(&mirror, None);
        assert_eq!(tracker.best_value(), f64::INFINITY);
        assert!(!tracker.offer(f64::INFINITY, network(0)));
        assert!(!tracker.offer(f64::NAN, network(1)));
        assert!(tracker.offer(3.0, network(2)));
        assert!(!tracker.offer(3.0, network(3)));
        assert!(!tracker.offer(4.0, network(4)));
        assert!(tracker.offer(1.5, network(5)));
        assert_eq!(f64::from_bits(mirror.load(Ordering::Acquire)), 1.5);

        let (value, best) = tracker.into_best();
        assert_eq!(value, 1.5);
        assert_eq!(best.map(|n| n.seed()), Some(5));
    }

    #[test]
    fn concurrent_offers_keep_the_minimum() {
        let mirror = AtomicU64::new(0);
        let tracker = BestTracker::new(&mirror, None);
        let observed = Mutex::new(Vec::new());

        std::thread::scope(|s| {
            for worker in 0..8 {
                let tracker = &tracker;
                s.spawn(move || {
                    for i in 0..50 {
                        let error = ((worker * 50 + i) as f64 * 0.37).sin().abs() * 100.0 + worker as f64;
                        tracker.offer(error, network(worker * 50 + i));
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..200 {
                    observed.lock().push(tracker.best_value());
                }
            });
        });

        let expected = (0..8)
            .flat_map(|w| (0..50).map(move |i| ((w * 50 + i) as f64 * 0.37).sin().abs() * 100.0 + w as f64))
            .fold(f64::INFINITY, f64::min);
        let observed = observed.into_inner();
        assert!(observed.windows(2).all(|w| w[1] <= w[0]));

        let (value, best) = tracker.into_best();
        assert_eq!(value, expected);
        let seed = best.unwrap().seed() as usize;
        let (w, i) = (seed / 50, seed % 50);
        assert_eq!(((w * 50 + i) as f64 * 0.37).sin().abs() * 100.0 + w as f64, expected);
    }

    #[test]
    fn improvements_are_checkpointed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best.model");
        let mirror = AtomicU64::new(0);
        let tracker = BestTracker::new(&mirror, Some(path.as_path()));
        tracker.offer(2.0, network(7));
        tracker.offer(5.0, network(8));
        let saved = DeepNetwork::<crate::math::Matrix>::load_from_file(&path).unwrap();
        assert_eq!(saved.seed(), 7);
    }
}
