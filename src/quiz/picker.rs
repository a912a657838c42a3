use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use rand::seq::IteratorRandom;
use rand::Rng;
use teloxide::types::UserId;

#[derive(Debug, Default)]
struct History {
    topic: String,
    served: HashSet<usize>,
}

/// Hands out question indices without repeating one until the whole topic
/// has been served to that user.
///
/// History is kept in memory only and is lost on restart.
#[derive(Debug, Default)]
pub struct Picker {
    history: Mutex<HashMap<UserId, History>>,
}

impl Picker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pick(&self, user: UserId, topic: &str, len: usize, explicit: Option<i64>) -> usize {
        self.pick_with(user, topic, len, explicit, &mut rand::thread_rng())
    }

    /// `len` must be non-zero; `Topic::load` never yields an empty topic.
    ///
    /// An explicit index is only wrapped into range; it is not recorded, so
    /// re-reading the question being answered leaves the cycle untouched.
    pub fn pick_with<R: Rng + ?Sized>(
        &self,
        user: UserId,
        topic: &str,
        len: usize,
        explicit: Option<i64>,
        rng: &mut R,
    ) -> usize {
        if let Some(index) = explicit {
            return normalize(index, len);
        }

        let mut history = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = history.entry(user).or_default();

        if entry.topic != topic {
            entry.topic = topic.to_string();
            entry.served.clear();
        }
        // Indices from a larger version of the file would never be reached again.
        entry.served.retain(|&index| index < len);
        if entry.served.len() >= len {
            entry.served.clear();
        }

        let index = (0..len)
            .filter(|index| !entry.served.contains(index))
            .choose(rng)
            .unwrap_or(0);
        entry.served.insert(index);

        log::debug!(
            "picked question {index} of {topic} for user {} ({}/{len} served)",
            user.0,
            entry.served.len()
        );
        index
    }

    /// Number of questions already served to `user` in the current cycle.
    #[cfg(test)]
    pub fn served(&self, user: UserId) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .map_or(0, |entry| entry.served.len())
    }
}

/// Wraps any index into `[0, len)`.
pub fn normalize(index: i64, len: usize) -> usize {
    index.rem_euclid(len as i64) as usize
}
