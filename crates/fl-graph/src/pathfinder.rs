//! Path-finding trait and the default congestion-weighted A*.
//!
//! # Pluggability
//!
//! `fl-fleet` calls routing via the [`PathFinder`] trait, so applications can
//! swap in other strategies (precomputed tables, time-expanded search)
//! without touching the controller.  [`CongestionAStar`] is the default and
//! [`CachedPathFinder`] memoizes any implementation.
//!
//! # Cost model
//!
//! ```text
//! edge cost  = length × (1 + congestion(lane) × penalty)
//! heuristic  = straight-line distance to the goal
//! ```
//!
//! Congestion is never negative, so every edge costs at least its length and
//! the straight-line heuristic stays admissible (and consistent).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use log::trace;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use fl_core::{Lane, VertexId};

use crate::{CongestionSnapshot, GraphError, GraphResult, NavGraph};

// ── PathFinder trait ──────────────────────────────────────────────────────────

/// Pluggable routing engine.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync`: one instance is shared by every
/// robot worker thread.
pub trait PathFinder: Send + Sync {
    /// Vertex sequence from `start` to `end`, both inclusive.
    ///
    /// Returns an empty `Vec` when `start == end`, when either endpoint is
    /// not in `graph`, or when no route exists.
    fn find_path(
        &self,
        graph:      &NavGraph,
        start:      VertexId,
        end:        VertexId,
        congestion: &CongestionSnapshot,
    ) -> Vec<VertexId>;

    /// Like [`find_path`](Self::find_path) but distinguishes the empty cases
    /// with typed errors.  `start == end` yields `Ok(vec![])`.
    fn route(
        &self,
        graph:      &NavGraph,
        start:      VertexId,
        end:        VertexId,
        congestion: &CongestionSnapshot,
    ) -> GraphResult<Vec<VertexId>> {
        for v in [start, end] {
            if !graph.contains(v) {
                return Err(GraphError::VertexNotFound(v));
            }
        }
        let path = self.find_path(graph, start, end, congestion);
        if path.is_empty() && start != end {
            return Err(GraphError::NoRoute { from: start, to: end });
        }
        Ok(path)
    }
}

// ── CongestionAStar ───────────────────────────────────────────────────────────

/// A* over the navigation graph with congestion-inflated edge costs.
#[derive(Clone, Copy, Debug)]
pub struct CongestionAStar {
    penalty_factor: f64,
}

impl CongestionAStar {
    pub const DEFAULT_PENALTY: f64 = 2.0;

    /// Non-finite or negative penalties are treated as 0 (plain shortest
    /// path) so the heuristic can never overestimate.
    pub fn new(penalty_factor: f64) -> Self {
        let penalty_factor = if penalty_factor.is_finite() && penalty_factor > 0.0 {
            penalty_factor
        } else {
            0.0
        };
        Self { penalty_factor }
    }

    pub fn penalty_factor(&self) -> f64 {
        self.penalty_factor
    }
}

impl Default for CongestionAStar {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PENALTY)
    }
}

impl PathFinder for CongestionAStar {
    fn find_path(
        &self,
        graph:      &NavGraph,
        start:      VertexId,
        end:        VertexId,
        congestion: &CongestionSnapshot,
    ) -> Vec<VertexId> {
        astar(graph, start, end, congestion, self.penalty_factor)
    }
}

/// Cost of traversing `lane` (length `base`) under `congestion`.
#[inline]
fn edge_cost(base: f64, lane: Lane, congestion: &CongestionSnapshot, penalty: f64) -> f64 {
    base * (1.0 + congestion.get(lane).max(0.0) * penalty)
}

/// Heap entry.  Ordered so `BinaryHeap` (a max-heap) pops the lowest
/// f-score first, and among equal f-scores the lowest vertex id.
#[derive(Clone, Copy)]
struct Frontier {
    f:      f64,
    g:      f64,
    vertex: VertexId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn astar(
    graph:      &NavGraph,
    start:      VertexId,
    end:        VertexId,
    congestion: &CongestionSnapshot,
    penalty:    f64,
) -> Vec<VertexId> {
    if start == end || !graph.contains(start) || !graph.contains(end) {
        return Vec::new();
    }

    let pos  = graph.vertices();
    let goal = pos[end.index()];
    let n    = graph.vertex_count();

    let mut g_score = vec![f64::INFINITY; n];
    let mut prev    = vec![VertexId::NONE; n];
    let mut closed  = vec![false; n];

    g_score[start.index()] = 0.0;
    let mut open = BinaryHeap::new();
    open.push(Frontier { f: pos[start.index()].distance(goal), g: 0.0, vertex: start });

    let mut expanded = 0usize;
    while let Some(Frontier { g, vertex, .. }) = open.pop() {
        // Skip stale heap entries.
        if closed[vertex.index()] || g > g_score[vertex.index()] {
            continue;
        }
        if vertex == end {
            trace!("A* {start} -> {end}: cost {g:.3}, expanded {expanded}");
            return reconstruct(&prev, start, end);
        }
        closed[vertex.index()] = true;
        expanded += 1;

        let here = pos[vertex.index()];
        for &next in graph.neighbors(vertex) {
            if closed[next.index()] {
                continue;
            }
            let there = pos[next.index()];
            let cost  = edge_cost(here.distance(there), Lane::new(vertex, next), congestion, penalty);
            let tentative = g + cost;
            if tentative < g_score[next.index()] {
                g_score[next.index()] = tentative;
                prev[next.index()] = vertex;
                open.push(Frontier { f: tentative + there.distance(goal), g: tentative, vertex: next });
            }
        }
    }

    trace!("A* {start} -> {end}: unreachable after expanding {expanded}");
    Vec::new()
}

fn reconstruct(prev: &[VertexId], start: VertexId, end: VertexId) -> Vec<VertexId> {
    let mut path = vec![end];
    let mut cur = end;
    while cur != start {
        cur = prev[cur.index()];
        path.push(cur);
    }
    path.reverse();
    path
}

/// Total congestion-weighted cost of `path`, or `None` if two consecutive
/// vertices are not joined by a lane of `graph`.
pub fn path_cost(
    graph:      &NavGraph,
    path:       &[VertexId],
    congestion: &CongestionSnapshot,
    penalty:    f64,
) -> Option<f64> {
    let mut total = 0.0;
    for lane in Lane::from_path(path) {
        if !graph.contains_lane(lane) {
            return None;
        }
        let base = graph.lane_length(lane).ok()?;
        total += edge_cost(base, lane, congestion, penalty);
    }
    Some(total)
}

// ── CachedPathFinder ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct PathKey {
    revision:    u64,
    start:       VertexId,
    end:         VertexId,
    fingerprint: u64,
}

/// Memoizing wrapper around any [`PathFinder`].
///
/// The key includes the graph revision and the congestion fingerprint, so a
/// route is only reused when the exact same congestion state is observed
/// again.  When the cache reaches `capacity` it is cleared wholesale;
/// `capacity == 0` disables caching.
pub struct CachedPathFinder<P: PathFinder> {
    inner:    P,
    capacity: usize,
    cache:    Mutex<FxHashMap<PathKey, Vec<VertexId>>>,
    hits:     AtomicU64,
    misses:   AtomicU64,
}

impl<P: PathFinder> CachedPathFinder<P> {
    pub fn new(inner: P, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            cache:  Mutex::new(FxHashMap::default()),
            hits:   AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// `(hits, misses)` since construction.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(AtomicOrdering::Relaxed), self.misses.load(AtomicOrdering::Relaxed))
    }
}

impl<P: PathFinder> PathFinder for CachedPathFinder<P> {
    fn find_path(
        &self,
        graph:      &NavGraph,
        start:      VertexId,
        end:        VertexId,
        congestion: &CongestionSnapshot,
    ) -> Vec<VertexId> {
        if self.capacity == 0 {
            return self.inner.find_path(graph, start, end, congestion);
        }

        let key = PathKey {
            revision:    graph.revision(),
            start,
            end,
            fingerprint: congestion.fingerprint(),
        };
        if let Some(path) = self.cache.lock().get(&key) {
            self.hits.fetch_add(1, AtomicOrdering::Relaxed);
            return path.clone();
        }

        // Search outside the lock; a concurrent duplicate search is harmless.
        self.misses.fetch_add(1, AtomicOrdering::Relaxed);
        let path = self.inner.find_path(graph, start, end, congestion);

        let mut cache = self.cache.lock();
        if cache.len() >= self.capacity {
            cache.clear();
        }
        cache.insert(key, path.clone());
        path
    }
}
