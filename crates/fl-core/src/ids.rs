//! Strongly typed identifier wrappers.
//!
//! `VertexId` is a plain `Copy` index into the graph's per-vertex `Vec`s.
//! `RobotId` is a string handle (`"R1"`, `"R2"`, …) because collaborators
//! address robots by name.

use std::fmt;
use std::sync::Arc;

// ── VertexId ──────────────────────────────────────────────────────────────────

/// Index of a navigation-graph vertex, assigned sequentially from 0 by the
/// graph builder.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VertexId(pub u32);

impl VertexId {
    /// Placeholder for slots not yet filled (CSR scratch, A* predecessors).
    pub const NONE: VertexId = VertexId(u32::MAX);

    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// ── RobotId ───────────────────────────────────────────────────────────────────

/// Unique robot handle, e.g. `"R3"`.
///
/// Backed by `Arc<str>` so the per-step clones made by movement workers and
/// observer callbacks never allocate.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RobotId(Arc<str>);

impl RobotId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The id handed out for the `n`-th spawn (`n` starts at 1).
    pub fn from_counter(n: u64) -> Self {
        Self::new(format!("R{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RobotId({})", self.0)
    }
}

impl From<&str> for RobotId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RobotId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RobotId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Ok(RobotId::new(s))
    }
}
