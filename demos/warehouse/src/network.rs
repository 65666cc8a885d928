//! Warehouse floor layout.
//!
//! A 4×3 grid of aisle junctions, 2 m apart, with a charging dock hanging
//! off the west edge.  Only the dock and the four corners carry explicit
//! names; the rest fall back to generated ones.

use fl_core::{Point, VertexId};
use fl_graph::{GraphResult, NavGraph, NavGraphBuilder};

pub const COLS:    usize = 4;
pub const ROWS:    usize = 3;
pub const SPACING: f64   = 2.0;

/// Build the floor.  Returns `(graph, dock)`.
pub fn build_floor() -> GraphResult<(NavGraph, VertexId)> {
    let mut b = NavGraphBuilder::with_capacity(COLS * ROWS + 1, 2 * COLS * ROWS);

    let mut ids = Vec::with_capacity(COLS * ROWS);
    for row in 0..ROWS {
        for col in 0..COLS {
            let name = match (col, row) {
                (0, 0)                                   => Some("Inbound Bay"),
                (c, 0) if c == COLS - 1                  => Some("Outbound Bay"),
                (0, r) if r == ROWS - 1                  => Some("Cold Store"),
                (c, r) if c == COLS - 1 && r == ROWS - 1 => Some("Packing Station"),
                _                                        => None,
            };
            let pos = Point::new(col as f64 * SPACING, row as f64 * SPACING);
            ids.push(b.add_vertex(pos, name));
        }
    }

    for row in 0..ROWS {
        for col in 0..COLS {
            let here = ids[row * COLS + col];
            if col + 1 < COLS {
                b.add_lane(here, ids[row * COLS + col + 1])?;
            }
            if row + 1 < ROWS {
                b.add_lane(here, ids[(row + 1) * COLS + col])?;
            }
        }
    }

    let dock = b.add_vertex(Point::new(-SPACING, SPACING), Some("Charging Dock"));
    b.add_lane(dock, ids[COLS])?;

    Ok((b.build(), dock))
}

/// Vertex at grid cell `(col, row)`.
pub fn cell(col: usize, row: usize) -> VertexId {
    VertexId((row * COLS + col) as u32)
}
