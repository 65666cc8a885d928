//! Flat row type written by every event-log backend.

use fl_fleet::FleetEvent;

/// One robot event, flattened to primitive columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub unix_ms: u64,
    pub robot:   String,
    pub action:  &'static str,
    pub status:  &'static str,
    /// Vertex index the event refers to, if any.
    pub vertex:  Option<u32>,
    pub detail:  String,
}

impl EventRow {
    /// Column names, in write order.
    pub const HEADER: [&'static str; 6] = ["unix_ms", "robot_id", "action", "status", "vertex", "detail"];
}

impl From<&FleetEvent> for EventRow {
    fn from(e: &FleetEvent) -> Self {
        Self {
            unix_ms: e.unix_ms,
            robot:   e.robot.to_string(),
            action:  e.action.as_str(),
            status:  e.status.as_str(),
            vertex:  e.vertex.map(|v| v.0),
            detail:  e.detail.clone(),
        }
    }
}
