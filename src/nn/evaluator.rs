use super::cache::Lru;
use super::features;
use crate::Millis;
use crate::Value;
use crate::game::Board;
use crate::game::Stone;
use crate::game::Transform;
use crate::game::canonical;
use std::sync::Arc;
use std::sync::Mutex;

/// one network response: a policy over the n*n cells (not yet masked to
/// legal moves) and a scalar value in [-1, 1] from the side-to-move's view
#[derive(Debug, Clone)]
pub struct Prediction {
    pub policy: Vec<f32>,
    pub value: Value,
}

/// the policy/value oracle contract. implementations must be thread-safe;
/// batching is mandatory for throughput but not for correctness.
pub trait Evaluator: Send + Sync {
    fn board_size(&self) -> usize;
    fn fingerprint(&self) -> String;
    fn predict(&self, batch: &[Vec<f32>]) -> Vec<Prediction>;
}

/// how many root symmetries a think budget affords: 8 by default, 4 on a
/// short clock, 1 in fast mode
pub fn symmetries_for(budget_ms: Millis, fast: bool) -> usize {
    if fast || budget_ms <= crate::SYMMETRY_BUDGET_FAST_MS {
        1
    } else if budget_ms <= crate::SYMMETRY_BUDGET_HALF_MS {
        4
    } else {
        8
    }
}

/// an Evaluator wrapped with the prediction cache and the symmetry
/// machinery. cached policies are stored in the canonical orientation and
/// rotated back through the querying board's canonicalizing transform, so
/// all eight orientations of a position share one entry.
pub struct Oracle {
    evaluator: Arc<dyn Evaluator>,
    cache: Mutex<Lru<Prediction>>,
}

impl Oracle {
    pub fn new(evaluator: Arc<dyn Evaluator>, cache_capacity: usize) -> Self {
        Self {
            evaluator,
            cache: Mutex::new(Lru::new(cache_capacity)),
        }
    }

    pub fn board_size(&self) -> usize {
        self.evaluator.board_size()
    }
    pub fn fingerprint(&self) -> String {
        self.evaluator.fingerprint()
    }
    pub fn evaluator(&self) -> Arc<dyn Evaluator> {
        self.evaluator.clone()
    }

    fn key(board: &Board, to_move: Stone) -> (String, Transform) {
        let (encoding, transform) = canonical(board);
        (format!("{}:{}", encoding, to_move.code()), transform)
    }

    fn to_canonical(prediction: &Prediction, transform: Transform, n: usize) -> Prediction {
        Prediction {
            policy: transform.policy(&prediction.policy, n),
            value: prediction.value,
        }
    }

    fn from_canonical(prediction: &Prediction, transform: Transform, n: usize) -> Prediction {
        Prediction {
            policy: transform.inverse().policy(&prediction.policy, n),
            value: prediction.value,
        }
    }

    /// evaluate a batch of positions, serving symmetric repeats from cache
    pub fn batch(&self, requests: &[(Board, Stone)]) -> Vec<Prediction> {
        let n = self.board_size();
        let keyed = requests
            .iter()
            .map(|(board, stone)| Self::key(board, *stone))
            .collect::<Vec<_>>();
        let mut out: Vec<Option<Prediction>> = vec![None; requests.len()];
        {
            let mut cache = self.cache.lock().expect("prediction cache lock");
            for (i, (key, transform)) in keyed.iter().enumerate() {
                if let Some(hit) = cache.get(key) {
                    out[i] = Some(Self::from_canonical(hit, *transform, n));
                }
            }
        }
        let misses = (0..requests.len())
            .filter(|&i| out[i].is_none())
            .collect::<Vec<_>>();
        if !misses.is_empty() {
            let encodings = misses
                .iter()
                .map(|&i| features::encode(&requests[i].0, requests[i].1))
                .collect::<Vec<_>>();
            let predictions = self.evaluator.predict(&encodings);
            let mut cache = self.cache.lock().expect("prediction cache lock");
            for (&i, prediction) in misses.iter().zip(predictions.into_iter()) {
                let (ref key, transform) = keyed[i];
                cache.insert(key.clone(), Self::to_canonical(&prediction, transform, n));
                out[i] = Some(prediction);
            }
        }
        out.into_iter().map(|p| p.expect("filled")).collect()
    }

    /// single-position convenience
    pub fn raw(&self, board: &Board, to_move: Stone) -> Prediction {
        self.batch(&[(board.clone(), to_move)]).remove(0)
    }

    /// root evaluation averaged over `symmetries` orientations: each
    /// symmetric board is evaluated, its policy rotated back to the query
    /// orientation, and the results arithmetically averaged. the average is
    /// what lands in the cache.
    pub fn root(&self, board: &Board, to_move: Stone, symmetries: usize) -> Prediction {
        let n = self.board_size();
        let transforms = &Transform::ALL[..symmetries.clamp(1, 8)];
        let encodings = transforms
            .iter()
            .map(|t| features::encode(&t.board(board), to_move))
            .collect::<Vec<_>>();
        let predictions = self.evaluator.predict(&encodings);
        let mut policy = vec![0.0f32; n * n];
        let mut value = 0.0f32;
        for (t, prediction) in transforms.iter().zip(predictions.iter()) {
            let restored = Self::from_canonical(prediction, *t, n);
            for (acc, p) in policy.iter_mut().zip(restored.policy.iter()) {
                *acc += p;
            }
            value += restored.value;
        }
        let count = transforms.len() as f32;
        for p in policy.iter_mut() {
            *p /= count;
        }
        let averaged = Prediction {
            policy,
            value: value / count,
        };
        let (key, transform) = Self::key(board, to_move);
        self.cache
            .lock()
            .expect("prediction cache lock")
            .insert(key, Self::to_canonical(&averaged, transform, n));
        averaged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Point;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    /// deterministic fake: policy peaks at the first empty-ish index,
    /// value derived from input checksum. counts every network call.
    struct Counting {
        calls: AtomicUsize,
    }

    impl Evaluator for Counting {
        fn board_size(&self) -> usize {
            15
        }
        fn fingerprint(&self) -> String {
            "counting".into()
        }
        fn predict(&self, batch: &[Vec<f32>]) -> Vec<Prediction> {
            self.calls.fetch_add(batch.len(), Ordering::Relaxed);
            batch
                .iter()
                .map(|input| {
                    let sum = input.iter().sum::<f32>();
                    let mut policy = vec![1.0 / 225.0; 225];
                    policy[0] = 2.0 / 225.0;
                    Prediction {
                        policy,
                        value: (sum / 1000.0).tanh(),
                    }
                })
                .collect()
        }
    }

    #[test]
    fn symmetric_positions_share_cache_entries() {
        let counting = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let oracle = Oracle::new(counting.clone(), 64);
        let mut board = Board::empty(15);
        board.put(Point::from((3, 5)), Stone::Black);
        let _ = oracle.raw(&board, Stone::White);
        for t in Transform::ALL {
            let _ = oracle.raw(&t.board(&board), Stone::White);
        }
        // the eight orientations cost one network call between them
        assert_eq!(counting.calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn cache_hit_skips_network() {
        let counting = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let oracle = Oracle::new(counting.clone(), 64);
        let mut board = Board::empty(15);
        board.put(Point::from((3, 5)), Stone::Black);
        let first = oracle.raw(&board, Stone::White);
        let calls = counting.calls.load(Ordering::Relaxed);
        let second = oracle.raw(&board, Stone::White);
        assert_eq!(counting.calls.load(Ordering::Relaxed), calls);
        assert!((first.value - second.value).abs() < 1e-6);
    }

    #[test]
    fn rotated_query_served_from_cache_in_rotated_orientation() {
        let counting = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let oracle = Oracle::new(counting.clone(), 64);
        let mut board = Board::empty(15);
        board.put(Point::from((3, 5)), Stone::Black);
        let base = oracle.raw(&board, Stone::White);
        let calls = counting.calls.load(Ordering::Relaxed);
        let rotated = oracle.raw(&Transform::Rotate90.board(&board), Stone::White);
        assert_eq!(counting.calls.load(Ordering::Relaxed), calls);
        // the cached policy came back through the rotated orientation
        let moved = Transform::Rotate90.policy(&base.policy, 15);
        for (a, b) in moved.iter().zip(rotated.policy.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn root_averages_symmetries() {
        let counting = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let oracle = Oracle::new(counting.clone(), 64);
        let board = Board::empty(15);
        let averaged = oracle.root(&board, Stone::Black, 8);
        assert_eq!(counting.calls.load(Ordering::Relaxed), 8);
        let sum = averaged.policy.iter().sum::<f32>();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn budget_controls_symmetry_count() {
        assert_eq!(symmetries_for(2_000, false), 8);
        assert_eq!(symmetries_for(1_200, false), 4);
        assert_eq!(symmetries_for(900, false), 1);
        assert_eq!(symmetries_for(5_000, true), 1);
    }
}
