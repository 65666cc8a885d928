//! Read-only congestion view handed to path finders.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use fl_core::Lane;

/// A point-in-time copy of per-lane congestion scores.
///
/// Scores live in the traffic manager and mutate on every reservation; path
/// finders only ever see a snapshot so a single search is internally
/// consistent.  The map is ordered so [`fingerprint`](Self::fingerprint) is
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CongestionSnapshot {
    scores: BTreeMap<Lane, f64>,
}

impl CongestionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score for `lane`; lanes never reserved score 0.0.
    #[inline]
    pub fn get(&self, lane: Lane) -> f64 {
        self.scores.get(&lane).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, lane: Lane, score: f64) {
        self.scores.insert(lane, score);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Lane, f64)> + '_ {
        self.scores.iter().map(|(&l, &s)| (l, s))
    }

    /// Hash of the full snapshot contents.  Two snapshots with identical
    /// scores produce the same fingerprint; any score change produces a
    /// different one (up to hash collisions).
    pub fn fingerprint(&self) -> u64 {
        let mut h = FxHasher::default();
        self.scores.len().hash(&mut h);
        for (lane, score) in &self.scores {
            lane.hash(&mut h);
            score.to_bits().hash(&mut h);
        }
        h.finish()
    }
}

impl FromIterator<(Lane, f64)> for CongestionSnapshot {
    fn from_iter<I: IntoIterator<Item = (Lane, f64)>>(iter: I) -> Self {
        Self { scores: iter.into_iter().collect() }
    }
}
