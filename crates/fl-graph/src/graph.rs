//! Navigation graph representation and builder.
//!
//! # Data layout
//!
//! Lanes are undirected.  Adjacency uses **Compressed Sparse Row (CSR)**
//! format: the neighbors of `VertexId v` occupy
//!
//! ```text
//! adj[ adj_start[v] .. adj_start[v+1] ]
//! ```
//!
//! sorted ascending, so iteration order is deterministic and independent of
//! the order lanes were added in.  The canonical lane list is kept sorted as
//! well, which makes `contains_lane` a binary search.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(x, y)` to the nearest `VertexId`.  Used to
//! snap free positions back onto the graph and for radius queries.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashSet;

use fl_core::{Lane, Point, VertexId};

use crate::{GraphError, GraphResult};

/// Source of unique graph revisions.  Path caches key on the revision so a
/// reloaded graph can never serve routes computed against its predecessor.
static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

// ── R-tree vertex entry ───────────────────────────────────────────────────────

#[derive(Clone)]
struct VertexEntry {
    point: [f64; 2],
    id: VertexId,
}

impl RTreeObject for VertexEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for VertexEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── NavGraph ──────────────────────────────────────────────────────────────────

/// Immutable undirected navigation graph.
///
/// Do not construct directly; use [`NavGraphBuilder`].  Share between
/// threads as `Arc<NavGraph>`.
pub struct NavGraph {
    vertex_pos:  Vec<Point>,
    vertex_name: Vec<String>,
    /// Sorted, deduplicated canonical lanes.
    lanes:       Vec<Lane>,
    /// CSR row pointer, length `vertex_count + 1`.
    adj_start:   Vec<u32>,
    adj:         Vec<VertexId>,
    spatial_idx: RTree<VertexEntry>,
    revision:    u64,
}

impl NavGraph {
    /// Construct a graph with no vertices.  Every routing request fails.
    pub fn empty() -> Self {
        NavGraphBuilder::new().build()
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn vertex_count(&self) -> usize {
        self.vertex_pos.len()
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_pos.is_empty()
    }

    /// Unique identity of this graph instance.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ── Vertex data ───────────────────────────────────────────────────────

    #[inline]
    pub fn contains(&self, v: VertexId) -> bool {
        v.index() < self.vertex_pos.len()
    }

    /// Vertex coordinates in id order.
    pub fn vertices(&self) -> &[Point] {
        &self.vertex_pos
    }

    pub fn position(&self, v: VertexId) -> GraphResult<Point> {
        self.vertex_pos
            .get(v.index())
            .copied()
            .ok_or(GraphError::VertexNotFound(v))
    }

    pub fn name(&self, v: VertexId) -> GraphResult<&str> {
        self.vertex_name
            .get(v.index())
            .map(String::as_str)
            .ok_or(GraphError::VertexNotFound(v))
    }

    /// Iterator over every `VertexId` in ascending order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertex_pos.len()).map(|i| VertexId(i as u32))
    }

    // ── Lanes & adjacency ─────────────────────────────────────────────────

    /// Canonical lanes, sorted.
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn contains_lane(&self, lane: Lane) -> bool {
        self.lanes.binary_search(&lane).is_ok()
    }

    /// Neighbors of `v` in ascending id order.  Empty for unknown vertices.
    #[inline]
    pub fn neighbors(&self, v: VertexId) -> &[VertexId] {
        if !self.contains(v) {
            return &[];
        }
        let start = self.adj_start[v.index()] as usize;
        let end   = self.adj_start[v.index() + 1] as usize;
        &self.adj[start..end]
    }

    /// Euclidean length of `lane`.
    pub fn lane_length(&self, lane: Lane) -> GraphResult<f64> {
        Ok(self.position(lane.lo())?.distance(self.position(lane.hi())?))
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Nearest vertex to `pos`.  `None` only for an empty graph.
    pub fn nearest_vertex(&self, pos: Point) -> Option<VertexId> {
        self.spatial_idx.nearest_neighbor(&[pos.x, pos.y]).map(|e| e.id)
    }

    /// The vertex located at `pos` (within `tolerance`), if any.
    pub fn vertex_at(&self, pos: Point, tolerance: f64) -> Option<VertexId> {
        let v = self.nearest_vertex(pos)?;
        let p = self.vertex_pos[v.index()];
        (p.distance(pos) <= tolerance).then_some(v)
    }

    /// All vertices within `radius` of `pos`, sorted by ascending distance
    /// (ties by id).
    pub fn vertices_within(&self, pos: Point, radius: f64) -> Vec<VertexId> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let mut hits: Vec<(f64, VertexId)> = self
            .spatial_idx
            .locate_within_distance([pos.x, pos.y], radius * radius)
            .map(|e| (e.distance_2(&[pos.x, pos.y]), e.id))
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        hits.into_iter().map(|(_, v)| v).collect()
    }

    /// Breadth-first search from `start` for the first vertex satisfying
    /// `accept`, visiting neighbors in ascending id order.  `start` itself is
    /// tested first.
    pub fn bfs_find<F>(&self, start: VertexId, mut accept: F) -> Option<VertexId>
    where
        F: FnMut(VertexId) -> bool,
    {
        if !self.contains(start) {
            return None;
        }
        if accept(start) {
            return Some(start);
        }
        let mut visited = vec![false; self.vertex_count()];
        visited[start.index()] = true;
        let mut queue = VecDeque::from([start]);
        while let Some(v) = queue.pop_front() {
            for &n in self.neighbors(v) {
                if visited[n.index()] {
                    continue;
                }
                if accept(n) {
                    return Some(n);
                }
                visited[n.index()] = true;
                queue.push_back(n);
            }
        }
        None
    }
}

// ── Generated names ───────────────────────────────────────────────────────────

const NAME_PREFIXES: [&str; 8] = ["North", "South", "East", "West", "Central", "Main", "Gate", "Hub"];
const NAME_SUFFIXES: [&str; 8] = [
    "Entrance", "Exit", "Junction", "Terminal", "Node", "Point", "Station", "Zone",
];

/// Display name for an unnamed vertex at `index`.
///
/// The first eight vertices get descriptive names; the rest get a
/// letter-number code (`A1`…`Z1`, `A2`…).
pub fn generated_name(index: usize) -> String {
    if index < NAME_PREFIXES.len() {
        let sep = if index % 2 == 0 { " " } else { "-" };
        format!("{}{sep}{}", NAME_PREFIXES[index], NAME_SUFFIXES[index])
    } else {
        let letter = (b'A' + (index % 26) as u8) as char;
        format!("{letter}{}", index / 26 + 1)
    }
}

// ── NavGraphBuilder ───────────────────────────────────────────────────────────

/// Construct a [`NavGraph`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use fl_core::Point;
/// use fl_graph::NavGraphBuilder;
///
/// let mut b = NavGraphBuilder::new();
/// let a = b.add_vertex(Point::new(0.0, 0.0), Some("dock"));
/// let c = b.add_vertex(Point::new(4.0, 0.0), None);
/// b.add_lane(a, c).unwrap();
/// let g = b.build();
/// assert_eq!(g.vertex_count(), 2);
/// assert_eq!(g.lane_count(), 1);
/// ```
#[derive(Default)]
pub struct NavGraphBuilder {
    vertices: Vec<Point>,
    names:    Vec<Option<String>>,
    lanes:    Vec<Lane>,
}

impl NavGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, lanes: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            names:    Vec::with_capacity(vertices),
            lanes:    Vec::with_capacity(lanes),
        }
    }

    /// Add a vertex and return its `VertexId` (sequential from 0).
    pub fn add_vertex(&mut self, pos: Point, name: Option<&str>) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(pos);
        self.names.push(name.map(str::to_owned));
        id
    }

    /// Add an undirected lane.  The pair is canonicalized; adding the same
    /// lane twice (in either direction) is harmless.
    pub fn add_lane(&mut self, a: VertexId, b: VertexId) -> GraphResult<Lane> {
        for v in [a, b] {
            if v.index() >= self.vertices.len() {
                return Err(GraphError::VertexNotFound(v));
            }
        }
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        let lane = Lane::new(a, b);
        self.lanes.push(lane);
        Ok(lane)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Consume the builder and produce a [`NavGraph`].
    pub fn build(self) -> NavGraph {
        let n = self.vertices.len();

        let mut lanes = self.lanes;
        lanes.sort_unstable();
        lanes.dedup();

        // CSR: count degrees, prefix-sum, then fill.
        let mut adj_start = vec![0u32; n + 1];
        for lane in &lanes {
            adj_start[lane.lo().index() + 1] += 1;
            adj_start[lane.hi().index() + 1] += 1;
        }
        for i in 1..=n {
            adj_start[i] += adj_start[i - 1];
        }
        let mut fill = adj_start.clone();
        let mut adj = vec![VertexId::NONE; adj_start[n] as usize];
        for lane in &lanes {
            for (from, to) in [(lane.lo(), lane.hi()), (lane.hi(), lane.lo())] {
                adj[fill[from.index()] as usize] = to;
                fill[from.index()] += 1;
            }
        }
        for v in 0..n {
            adj[adj_start[v] as usize..adj_start[v + 1] as usize].sort_unstable();
        }

        let mut vertex_name: Vec<String> = Vec::with_capacity(n);
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for (i, name) in self.names.into_iter().enumerate() {
            let mut name = name.unwrap_or_else(|| generated_name(i));
            if seen.contains(&name) {
                name = format!("{name}_{i}");
            }
            seen.insert(name.clone());
            vertex_name.push(name);
        }

        let entries: Vec<VertexEntry> = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, p)| VertexEntry { point: [p.x, p.y], id: VertexId(i as u32) })
            .collect();

        NavGraph {
            vertex_pos: self.vertices,
            vertex_name,
            lanes,
            adj_start,
            adj,
            spatial_idx: RTree::bulk_load(entries),
            revision: NEXT_REVISION.fetch_add(1, Ordering::Relaxed),
        }
    }
}
