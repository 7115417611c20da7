use crate::Visits;
use crate::nn::Lru;
use std::sync::Mutex;

/// one transposition record: the running mean of observed leaf values, how
/// many observations fed it, and (once) the network prior vector from the
/// first evaluation. priors are stored in the canonical orientation; the
/// consumer rotates them through the querying board's canonicalizing
/// transform.
#[derive(Debug, Clone)]
pub struct TtEntry {
    pub mean: f32,
    pub visits: Visits,
    pub priors: Option<Vec<f32>>,
}

/// process-lifetime cache of analyzed positions, keyed by canonical board
/// encoding plus side-to-move. a plain mutex around the LRU: hit rate
/// matters more than write throughput here.
pub struct TranspositionTable {
    slots: Mutex<Lru<TtEntry>>,
}

impl TranspositionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Lru::new(capacity)),
        }
    }

    pub fn probe(&self, key: &str) -> Option<TtEntry> {
        self.slots.lock().expect("tt lock").get(key).cloned()
    }

    /// fold one observed leaf value into the running mean
    pub fn observe(&self, key: &str, value: f32) {
        let mut slots = self.slots.lock().expect("tt lock");
        if slots.get(key).is_none() {
            slots.insert(
                key.to_string(),
                TtEntry {
                    mean: 0.0,
                    visits: 0,
                    priors: None,
                },
            );
        }
        let entry = slots.get_mut(key).expect("present");
        entry.visits += 1;
        entry.mean += (value - entry.mean) / entry.visits as f32;
    }

    /// record the prior vector for a key if it has none yet
    pub fn stash_priors(&self, key: &str, priors: Vec<f32>) {
        let mut slots = self.slots.lock().expect("tt lock");
        if slots.get(key).is_none() {
            slots.insert(
                key.to_string(),
                TtEntry {
                    mean: 0.0,
                    visits: 0,
                    priors: None,
                },
            );
        }
        let entry = slots.get_mut(key).expect("present");
        if entry.priors.is_none() {
            entry.priors = Some(priors);
        }
    }
}
