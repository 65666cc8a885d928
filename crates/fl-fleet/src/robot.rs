//! Per-robot state.
//!
//! `Robot` is the mutable record a movement worker updates on every step.
//! It lives inside a [`RobotCell`] together with the two flags that
//! coordinate the worker with the controller:
//!
//! | Flag      | Set by                        | Cleared by                          |
//! |-----------|-------------------------------|-------------------------------------|
//! | `active`  | spawn, `reset_robot`          | `clear_all`, `reset_robot`, `load_graph` |
//! | `running` | `start_movement` (claim)      | the worker itself on exit           |
//!
//! Workers poll `active` cooperatively; they are never interrupted mid-sleep.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};

use fl_core::{Point, RobotId, RobotStatus, VertexId};

/// Mutable robot record.
#[derive(Clone, Debug)]
pub struct Robot {
    pub id:           RobotId,
    pub position:     Point,
    /// Most recent vertex the robot stood on.  Routing starts here.
    pub last_vertex:  VertexId,
    pub destination:  Option<VertexId>,
    pub status:       RobotStatus,
    /// Every vertex reached, in order, starting with the spawn vertex.
    pub path_history: Vec<VertexId>,
    pub priority:     f64,
    /// Destinations to pursue after the current one, FIFO.
    pub tasks:        VecDeque<VertexId>,
}

impl Robot {
    pub fn new(id: RobotId, vertex: VertexId, position: Point) -> Self {
        Self {
            id,
            position,
            last_vertex:  vertex,
            destination:  None,
            status:       RobotStatus::Idle,
            path_history: vec![vertex],
            priority:     0.0,
            tasks:        VecDeque::new(),
        }
    }
}

/// Read-only copy of a robot, as returned by status queries.
#[derive(Clone, Debug, PartialEq)]
pub struct RobotSnapshot {
    pub id:            RobotId,
    pub position:      Point,
    pub last_vertex:   VertexId,
    /// Name of `last_vertex`.
    pub vertex_name:   String,
    pub destination:   Option<VertexId>,
    pub status:        RobotStatus,
    pub path_history:  Vec<VertexId>,
    pub priority:      f64,
    pub pending_tasks: usize,
}

pub(crate) struct RobotCell {
    id:      RobotId,
    state:   Mutex<Robot>,
    active:  AtomicBool,
    running: AtomicBool,
}

impl RobotCell {
    pub(crate) fn new(robot: Robot) -> Self {
        Self {
            id:      robot.id.clone(),
            state:   Mutex::new(robot),
            active:  AtomicBool::new(true),
            running: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> &RobotId {
        &self.id
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Robot> {
        self.state.lock()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    /// Claim the right to run a worker.  Returns `false` if one is already
    /// running.
    pub(crate) fn claim(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub(crate) fn set_status(&self, status: RobotStatus) {
        self.state.lock().status = status;
    }

    pub(crate) fn snapshot(&self, vertex_name: String) -> RobotSnapshot {
        let r = self.state.lock();
        RobotSnapshot {
            id:            r.id.clone(),
            position:      r.position,
            last_vertex:   r.last_vertex,
            vertex_name,
            destination:   r.destination,
            status:        r.status,
            path_history:  r.path_history.clone(),
            priority:      r.priority,
            pending_tasks: r.tasks.len(),
        }
    }
}
