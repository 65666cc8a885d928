//! Proximity ("collision") detection over robot positions.
//!
//! Positions are bucketed into a uniform grid whose cell edge is
//! `2 × threshold`.  Any two robots closer than `threshold` are then in the
//! same cell or in adjacent cells, so each occupied cell is compared only
//! against itself and its four *forward* neighbors:
//!
//! ```text
//!   (-1,+1) ( 0,+1) (+1,+1)
//!           ( 0, 0) (+1, 0)
//! ```
//!
//! The four backward neighbors are covered when those cells take their own
//! turn, so every unordered cell pair is visited exactly once.
//!
//! The result is advisory: movement workers do not consult it.

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;

use fl_core::{Point, RobotId};

const FORWARD_NEIGHBORS: [(i64, i64); 4] = [(1, 0), (1, 1), (0, 1), (-1, 1)];

/// An unordered pair of distinct robots, stored with the smaller id first.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct CollisionPair {
    first:  RobotId,
    second: RobotId,
}

impl CollisionPair {
    pub fn new(a: RobotId, b: RobotId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> &RobotId {
        &self.first
    }

    pub fn second(&self) -> &RobotId {
        &self.second
    }

    pub fn contains(&self, robot: &RobotId) -> bool {
        &self.first == robot || &self.second == robot
    }
}

impl fmt::Display for CollisionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.first, self.second)
    }
}

#[inline]
fn cell_of(p: Point, cell: f64) -> (i64, i64) {
    ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64)
}

/// Every pair of robots whose Euclidean distance is strictly below
/// `threshold`.
///
/// A non-positive or non-finite threshold yields an empty set, as do
/// positions with non-finite coordinates (those robots are skipped).
pub fn detect_collisions<'a, I>(positions: I, threshold: f64) -> BTreeSet<CollisionPair>
where
    I: IntoIterator<Item = (&'a RobotId, &'a Point)>,
{
    let mut pairs = BTreeSet::new();
    if !(threshold.is_finite() && threshold > 0.0) {
        return pairs;
    }

    let robots: Vec<(&RobotId, Point)> = positions
        .into_iter()
        .filter(|(_, p)| p.is_finite())
        .map(|(r, p)| (r, *p))
        .collect();

    let cell = threshold * 2.0;
    let mut grid: FxHashMap<(i64, i64), Vec<usize>> = FxHashMap::default();
    for (i, (_, p)) in robots.iter().enumerate() {
        grid.entry(cell_of(*p, cell)).or_default().push(i);
    }

    let threshold_sq = threshold * threshold;
    let mut check = |i: usize, j: usize| {
        let (ra, pa) = robots[i];
        let (rb, pb) = robots[j];
        if ra != rb && pa.distance_sq(pb) < threshold_sq {
            pairs.insert(CollisionPair::new(ra.clone(), rb.clone()));
        }
    };

    for (&(cx, cy), members) in &grid {
        for (k, &i) in members.iter().enumerate() {
            for &j in &members[k + 1..] {
                check(i, j);
            }
        }
        for (dx, dy) in FORWARD_NEIGHBORS {
            // Far-out coordinates saturate to the i64 edge; no cell beyond it.
            let (Some(nx), Some(ny)) = (cx.checked_add(dx), cy.checked_add(dy)) else {
                continue;
            };
            let Some(others) = grid.get(&(nx, ny)) else {
                continue;
            };
            for &i in members {
                for &j in others {
                    check(i, j);
                }
            }
        }
    }

    pairs
}
