//! `fl-traffic`: the shared traffic state every robot worker coordinates
//! through.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`manager`]   | `TrafficManager`: reservations, queues, congestion, priority |
//! | [`queue`]     | `LaneQueue`: per-lane FIFO of waiters with expiry          |
//! | [`collision`] | `detect_collisions` spatial-hash proximity check            |
//!
//! # Locking model
//!
//! All mutable traffic tables sit behind **one** `parking_lot::Mutex` inside
//! [`TrafficManager`].  Each public operation takes the lock once, does a
//! short non-blocking update, and returns; nothing sleeps or calls out while
//! holding it.  That single domain is what makes multi-lane reservation
//! all-or-nothing.
//!
//! There is deliberately no global lock ordering across robots: two robots
//! requesting overlapping paths can starve each other.  Workers bound this
//! with backoff and re-planning.

pub mod collision;
pub mod manager;
pub mod queue;

#[cfg(test)]
mod tests;

pub use collision::{detect_collisions, CollisionPair};
pub use manager::{LaneStatus, TrafficManager};
pub use queue::LaneQueue;
