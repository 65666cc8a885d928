//! Path → dense waypoint sequence.
//!
//! Each lane `a → b` of length `L` is split into
//! `n = max(MIN_POINTS_PER_LANE, ceil(L / spacing))` points at
//! `a + (b − a) · k/n` for `k = 1..=n`.  The start vertex itself is not
//! emitted (the robot is already there); the last point of every lane is
//! exactly the lane's end vertex and carries it in `reached`.

use fl_core::{Point, VertexId};
use fl_graph::NavGraph;

use crate::FleetResult;

pub const MIN_POINTS_PER_LANE: usize = 3;

/// One interpolated movement point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Waypoint {
    pub pos:     Point,
    /// `Some(v)` when this point is vertex `v`.
    pub reached: Option<VertexId>,
}

/// Number of points emitted for a lane of `length`.
pub fn points_for(length: f64, spacing: f64) -> usize {
    if !(length.is_finite() && spacing.is_finite() && spacing > 0.0) {
        return MIN_POINTS_PER_LANE;
    }
    ((length / spacing).ceil() as usize).max(MIN_POINTS_PER_LANE)
}

/// Interpolate `path` over `graph`.  Paths with fewer than two vertices
/// yield no waypoints.
pub fn interpolate(graph: &NavGraph, path: &[VertexId], spacing: f64) -> FleetResult<Vec<Waypoint>> {
    let mut out = Vec::new();
    for pair in path.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let a = graph.position(from)?;
        let b = graph.position(to)?;
        let n = points_for(a.distance(b), spacing);
        out.reserve(n);
        for k in 1..n {
            out.push(Waypoint { pos: a.lerp(b, k as f64 / n as f64), reached: None });
        }
        out.push(Waypoint { pos: b, reached: Some(to) });
    }
    Ok(out)
}
