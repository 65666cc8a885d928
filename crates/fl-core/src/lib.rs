//! `fl-core`: foundational types for the fleet traffic framework.
//!
//! This crate is a dependency of every other `fl-*` crate.  It intentionally
//! has no `fl-*` dependencies and minimal external ones (only `thiserror`,
//! plus optional `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                                 |
//! |--------------|----------------------------------------------------------|
//! | [`ids`]      | `VertexId`, `RobotId`                                    |
//! | [`geometry`] | `Point`, `Lane` (canonical undirected vertex pair)       |
//! | [`status`]   | `RobotStatus` movement state machine labels              |
//! | [`config`]   | `FleetConfig` timing and routing knobs                   |
//! | [`error`]    | `CoreError`, `CoreResult`                                |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod status;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::FleetConfig;
pub use error::{CoreError, CoreResult};
pub use geometry::{Lane, Point};
pub use ids::{RobotId, VertexId};
pub use status::RobotStatus;
