//! Planar coordinates and the canonical lane key.
//!
//! Navigation graphs use a flat local frame (metres or map units), so plain
//! Euclidean distance is exact here; there is no geodesic correction.

use std::fmt;

use crate::VertexId;

// ── Point ─────────────────────────────────────────────────────────────────────

/// A position in the navigation frame.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        self.distance_sq(other).sqrt()
    }

    #[inline]
    pub fn distance_sq(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Linear interpolation: `t = 0` → `self`, `t = 1` → `other`.
    #[inline]
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// `true` if both coordinates are finite (no NaN / ±inf).
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

// ── Lane ──────────────────────────────────────────────────────────────────────

/// An undirected lane between two vertices, always stored as `(min, max)`.
///
/// The fields are private so a non-canonical lane can never be built; every
/// reservation, queue, and congestion table is keyed by this type.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lane {
    lo: VertexId,
    hi: VertexId,
}

impl Lane {
    /// Canonicalize the pair `(a, b)`.
    #[inline]
    pub fn new(a: VertexId, b: VertexId) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    #[inline]
    pub fn lo(self) -> VertexId {
        self.lo
    }

    #[inline]
    pub fn hi(self) -> VertexId {
        self.hi
    }

    #[inline]
    pub fn touches(self, v: VertexId) -> bool {
        self.lo == v || self.hi == v
    }

    /// The endpoint opposite `v`, or `None` if `v` is not an endpoint.
    pub fn other(self, v: VertexId) -> Option<VertexId> {
        if v == self.lo {
            Some(self.hi)
        } else if v == self.hi {
            Some(self.lo)
        } else {
            None
        }
    }

    /// Canonical lanes traversed by a vertex path, in path order.
    ///
    /// Paths shorter than two vertices traverse no lanes.
    pub fn from_path(path: &[VertexId]) -> Vec<Lane> {
        path.windows(2).map(|w| Lane::new(w[0], w[1])).collect()
    }
}

impl From<(VertexId, VertexId)> for Lane {
    fn from((a, b): (VertexId, VertexId)) -> Self {
        Lane::new(a, b)
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lo.0, self.hi.0)
    }
}
