//! `fl-graph`: navigation graph, spatial indexing, and routing.
//!
//! # Crate layout
//!
//! | Module           | Contents                                                 |
//! |------------------|----------------------------------------------------------|
//! | [`graph`]        | `NavGraph` (CSR adjacency + R-tree), `NavGraphBuilder`   |
//! | [`congestion`]   | `CongestionSnapshot`, read-only view of lane scores      |
//! | [`pathfinder`]   | `PathFinder` trait, `CongestionAStar`, `CachedPathFinder`|
//! | [`error`]        | `GraphError`, `GraphResult<T>`                           |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Enables `fl-core/serde`; fl-graph adds no derives.           |

pub mod congestion;
pub mod error;
pub mod graph;
pub mod pathfinder;

#[cfg(test)]
mod tests;

pub use congestion::CongestionSnapshot;
pub use error::{GraphError, GraphResult};
pub use graph::{NavGraph, NavGraphBuilder};
pub use pathfinder::{path_cost, CachedPathFinder, CongestionAStar, PathFinder};
