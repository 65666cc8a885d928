//! Fleet observer trait: per-step status callbacks and the event stream.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use fl_core::{Point, RobotId, RobotStatus, VertexId};

/// What happened to a robot.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum EventAction {
    Spawned,
    DestinationSet,
    TaskQueued,
    Planned,
    Blocked,
    Waiting,
    Replanned,
    Reserved,
    Arrived,
    Cancelled,
    Fault,
    Reset,
}

impl EventAction {
    pub fn as_str(self) -> &'static str {
        match self {
            EventAction::Spawned        => "spawned",
            EventAction::DestinationSet => "destination_set",
            EventAction::TaskQueued     => "task_queued",
            EventAction::Planned        => "planned",
            EventAction::Blocked        => "blocked",
            EventAction::Waiting        => "waiting",
            EventAction::Replanned      => "replanned",
            EventAction::Reserved       => "reserved",
            EventAction::Arrived        => "arrived",
            EventAction::Cancelled      => "cancelled",
            EventAction::Fault          => "fault",
            EventAction::Reset          => "reset",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the append-only robot event log.
#[derive(Clone, Debug, PartialEq)]
pub struct FleetEvent {
    pub robot:   RobotId,
    pub action:  EventAction,
    pub status:  RobotStatus,
    pub vertex:  Option<VertexId>,
    pub detail:  String,
    /// Wall-clock time in milliseconds since the Unix epoch.
    pub unix_ms: u64,
}

impl FleetEvent {
    /// Build an event stamped with the current wall-clock time.
    pub fn now(
        robot:  RobotId,
        action: EventAction,
        status: RobotStatus,
        vertex: Option<VertexId>,
        detail: impl Into<String>,
    ) -> Self {
        let unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { robot, action, status, vertex, detail: detail.into(), unix_ms }
    }
}

/// Callbacks invoked by the controller and by movement workers.
///
/// Both methods default to no-ops.  Calls arrive concurrently from every
/// worker thread and never while a fleet or traffic lock is held, so an
/// implementation may call back into the controller.
///
/// # Example: position printer
///
/// ```rust,ignore
/// let printer = |robot: &RobotId, pos: Point, status: RobotStatus| {
///     println!("{robot} {status} at {pos}");
/// };
/// fleet.start_movement(Arc::new(printer))?;
/// ```
pub trait FleetObserver: Send + Sync {
    /// Called on every movement step and on every status-changing outcome
    /// (`Blocked`, `Waiting`, `Idle` on arrival, `Error` on a fault).
    fn on_status(&self, _robot: &RobotId, _position: Point, _status: RobotStatus) {}

    /// Called for every event-log entry.
    fn on_event(&self, _event: &FleetEvent) {}
}

impl<F> FleetObserver for F
where
    F: Fn(&RobotId, Point, RobotStatus) + Send + Sync,
{
    fn on_status(&self, robot: &RobotId, position: Point, status: RobotStatus) {
        self(robot, position, status)
    }
}

/// A [`FleetObserver`] that does nothing.
pub struct NoopObserver;

impl FleetObserver for NoopObserver {}

/// Forwards everything to the controller's event log and to the observer
/// passed to `start_movement`.
pub(crate) struct Fanout {
    pub(crate) log:      Arc<dyn FleetObserver>,
    pub(crate) callback: Arc<dyn FleetObserver>,
}

impl FleetObserver for Fanout {
    fn on_status(&self, robot: &RobotId, position: Point, status: RobotStatus) {
        self.log.on_status(robot, position, status);
        self.callback.on_status(robot, position, status);
    }

    fn on_event(&self, event: &FleetEvent) {
        self.log.on_event(event);
        self.callback.on_event(event);
    }
}
