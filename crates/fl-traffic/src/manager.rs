//! `TrafficManager`: the authoritative lane-reservation table.
//!
//! # Tables
//!
//! | Table        | Key        | Value                     |
//! |--------------|------------|---------------------------|
//! | `holders`    | `Lane`     | robot currently holding it |
//! | `queues`     | `Lane`     | `LaneQueue` of waiters     |
//! | `congestion` | `Lane`     | EWMA usage score in [0, 1) |
//! | `priorities` | `RobotId`  | arbitration weight         |
//!
//! A lane absent from `holders` is free.  Congestion is bumped every time a
//! lane is granted (by `reserve_path`, `try_reserve_lane`, or queue
//! promotion):
//!
//! ```text
//! score ← 0.9 × score + 0.1
//! ```
//!
//! so a lane reserved `n` times from zero scores `1 − 0.9ⁿ`.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use log::{debug, trace};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use fl_core::{Lane, Point, RobotId, VertexId};
use fl_graph::CongestionSnapshot;

use crate::collision::{detect_collisions, CollisionPair};
use crate::queue::LaneQueue;

/// Weight kept from the previous congestion score on each grant.
pub const CONGESTION_DECAY: f64 = 0.9;

// ── LaneStatus ────────────────────────────────────────────────────────────────

/// Observable state of a single lane.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum LaneStatus {
    /// No holder.
    Free,
    /// Held, nobody (live) waiting.
    Reserved,
    /// Held, with at least one live waiter.
    Contested,
}

impl LaneStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LaneStatus::Free      => "free",
            LaneStatus::Reserved  => "reserved",
            LaneStatus::Contested => "contested",
        }
    }
}

impl std::fmt::Display for LaneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── TrafficState ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct TrafficState {
    holders:    FxHashMap<Lane, RobotId>,
    queues:     FxHashMap<Lane, LaneQueue>,
    congestion: FxHashMap<Lane, f64>,
    priorities: FxHashMap<RobotId, f64>,
}

impl TrafficState {
    fn bump(&mut self, lane: Lane) {
        let score = self.congestion.entry(lane).or_insert(0.0);
        *score = CONGESTION_DECAY * *score + (1.0 - CONGESTION_DECAY);
    }

    /// Free `lane` (held by `robot`) and hand it to the oldest live waiter.
    fn release_lane(&mut self, lane: Lane, robot: &RobotId, now: Instant) {
        if self.holders.get(&lane) != Some(robot) {
            return;
        }
        self.holders.remove(&lane);

        let Some(queue) = self.queues.get_mut(&lane) else {
            trace!("{robot} released {lane:?}");
            return;
        };
        let mut expired = Vec::new();
        let next = queue.pop_live(now, &mut expired);
        if queue.is_empty() {
            self.queues.remove(&lane);
        }
        for stale in &expired {
            debug!("{lane:?}: dropped expired waiter {stale}");
        }
        if let Some(next) = next {
            debug!("{robot} released {lane:?}; promoted {next}");
            self.holders.insert(lane, next);
            self.bump(lane);
        } else {
            trace!("{robot} released {lane:?}");
        }
    }

    fn withdraw(&mut self, robot: &RobotId) {
        self.queues.retain(|_, q| {
            q.remove(robot);
            !q.is_empty()
        });
    }
}

/// Unique lanes of `path`, in traversal order.
fn path_lanes(path: &[VertexId]) -> Vec<Lane> {
    let mut lanes = Lane::from_path(path);
    let mut seen = BTreeSet::new();
    lanes.retain(|l| seen.insert(*l));
    lanes
}

// ── TrafficManager ────────────────────────────────────────────────────────────

/// Shared lane-reservation, queueing, congestion, and priority state.
///
/// Cheap to share: wrap it in an `Arc` and hand a clone to every worker.
#[derive(Default)]
pub struct TrafficManager {
    state: Mutex<TrafficState>,
}

impl TrafficManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Reservation ───────────────────────────────────────────────────────

    /// Reserve every lane along `path` for `robot`, or none of them.
    ///
    /// Succeeds iff each lane is free or already held by `robot`.  On
    /// success each lane's congestion is bumped once.  Paths shorter than
    /// two vertices contain no lanes and trivially succeed.
    pub fn reserve_path(&self, robot: &RobotId, path: &[VertexId]) -> bool {
        let lanes = path_lanes(path);
        let mut st = self.state.lock();

        if let Some(lane) = lanes
            .iter()
            .find(|&&l| st.holders.get(&l).is_some_and(|h| h != robot))
        {
            trace!("{robot} reserve failed: {lane:?} held by {}", st.holders[lane]);
            return false;
        }

        for &lane in &lanes {
            st.holders.insert(lane, robot.clone());
            st.bump(lane);
        }
        debug!("{robot} reserved {} lane(s)", lanes.len());
        true
    }

    /// Release every lane along `path` that `robot` holds, promoting the
    /// oldest live waiter on each.  Lanes held by others are untouched.
    pub fn release_path(&self, robot: &RobotId, path: &[VertexId]) {
        let now = Instant::now();
        let mut st = self.state.lock();
        for lane in path_lanes(path) {
            st.release_lane(lane, robot, now);
        }
    }

    /// Grant `lane` to `robot` if it is free (or already theirs); otherwise
    /// join its waiting queue with an expiry of `timeout` from now.
    ///
    /// Re-queueing a robot that is already waiting refreshes its expiry and
    /// keeps its place.
    pub fn try_reserve_lane(&self, robot: &RobotId, lane: Lane, timeout: Duration) -> bool {
        let now = Instant::now();
        let mut st = self.state.lock();

        match st.holders.get(&lane) {
            Some(h) if h == robot => return true,
            Some(_) => {
                let expires = now + timeout;
                if st.queues.entry(lane).or_default().enqueue(robot, expires) {
                    debug!("{robot} queued for {lane:?}");
                }
                return false;
            }
            None => {}
        }

        st.holders.insert(lane, robot.clone());
        st.bump(lane);
        if let Some(q) = st.queues.get_mut(&lane) {
            q.remove(robot);
            if q.is_empty() {
                st.queues.remove(&lane);
            }
        }
        trace!("{robot} took free {lane:?}");
        true
    }

    /// Release everything `robot` holds (promoting waiters) and withdraw it
    /// from every queue.  Returns the released lanes in sorted order.
    pub fn release_all(&self, robot: &RobotId) -> Vec<Lane> {
        let now = Instant::now();
        let mut st = self.state.lock();

        st.withdraw(robot);
        let mut held: Vec<Lane> = st
            .holders
            .iter()
            .filter(|(_, h)| *h == robot)
            .map(|(l, _)| *l)
            .collect();
        held.sort_unstable();
        for &lane in &held {
            st.release_lane(lane, robot, now);
        }
        if !held.is_empty() {
            debug!("{robot} released all ({} lane(s))", held.len());
        }
        held
    }

    /// Drop all holders, queues and priorities.  Congestion history is kept
    /// so routing still avoids historically busy lanes.
    pub fn clear_reservations(&self) {
        let mut st = self.state.lock();
        st.holders.clear();
        st.queues.clear();
        st.priorities.clear();
    }

    /// Drop everything, congestion included.
    pub fn reset(&self) {
        *self.state.lock() = TrafficState::default();
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn lane_status(&self, lane: Lane) -> LaneStatus {
        let now = Instant::now();
        let mut st = self.state.lock();
        if !st.holders.contains_key(&lane) {
            return LaneStatus::Free;
        }
        let live = match st.queues.get_mut(&lane) {
            Some(q) => {
                q.prune(now);
                !q.is_empty()
            }
            None => false,
        };
        if live { LaneStatus::Contested } else { LaneStatus::Reserved }
    }

    pub fn holder(&self, lane: Lane) -> Option<RobotId> {
        self.state.lock().holders.get(&lane).cloned()
    }

    /// Lanes currently held by `robot`, sorted.
    pub fn held_lanes(&self, robot: &RobotId) -> Vec<Lane> {
        let st = self.state.lock();
        let mut lanes: Vec<Lane> = st
            .holders
            .iter()
            .filter(|(_, h)| *h == robot)
            .map(|(l, _)| *l)
            .collect();
        lanes.sort_unstable();
        lanes
    }

    /// Total number of held lanes across all robots.
    pub fn reserved_count(&self) -> usize {
        self.state.lock().holders.len()
    }

    /// Waiters on `lane`, expired entries included until pruned.
    pub fn queue_len(&self, lane: Lane) -> usize {
        self.state.lock().queues.get(&lane).map_or(0, LaneQueue::len)
    }

    /// Waiting robots on `lane`, oldest first.
    pub fn waiters(&self, lane: Lane) -> Vec<RobotId> {
        self.state
            .lock()
            .queues
            .get(&lane)
            .map(|q| q.robots().cloned().collect())
            .unwrap_or_default()
    }

    /// Lanes along `path` held by a robot other than `robot`.
    pub fn blocking_lanes(&self, robot: &RobotId, path: &[VertexId]) -> Vec<Lane> {
        let st = self.state.lock();
        path_lanes(path)
            .into_iter()
            .filter(|l| st.holders.get(l).is_some_and(|h| h != robot))
            .collect()
    }

    pub fn congestion(&self, lane: Lane) -> f64 {
        self.state.lock().congestion.get(&lane).copied().unwrap_or(0.0)
    }

    /// Consistent copy of every non-zero congestion score, for routing.
    pub fn congestion_snapshot(&self) -> CongestionSnapshot {
        self.state
            .lock()
            .congestion
            .iter()
            .map(|(&l, &s)| (l, s))
            .collect()
    }

    // ── Priority ──────────────────────────────────────────────────────────

    pub fn set_priority(&self, robot: &RobotId, weight: f64) {
        self.state.lock().priorities.insert(robot.clone(), weight);
    }

    /// Weight of `robot`; robots never given one weigh 0.0.
    pub fn priority(&self, robot: &RobotId) -> f64 {
        self.state.lock().priorities.get(robot).copied().unwrap_or(0.0)
    }

    /// The robot that should proceed when `a` and `b` contend.  Ties go to
    /// `a`.
    pub fn negotiate_priority(&self, a: &RobotId, b: &RobotId) -> RobotId {
        let st = self.state.lock();
        let wa = st.priorities.get(a).copied().unwrap_or(0.0);
        let wb = st.priorities.get(b).copied().unwrap_or(0.0);
        if wa >= wb { a.clone() } else { b.clone() }
    }

    // ── Proximity ─────────────────────────────────────────────────────────

    /// See [`detect_collisions`].  Needs no traffic state; provided here so
    /// callers have a single traffic entry point.
    pub fn detect_collisions<'a, I>(&self, positions: I, threshold: f64) -> BTreeSet<CollisionPair>
    where
        I: IntoIterator<Item = (&'a RobotId, &'a Point)>,
    {
        detect_collisions(positions, threshold)
    }
}
