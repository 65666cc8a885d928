//! Robot movement-state labels shared by the controller and its observers.

/// Where a robot is in its movement state machine.
///
/// ```text
/// Idle → Planning → Reserving → Moving → Idle
///          ↑   ↓        ↑   ↓
///        Blocked       Waiting
/// any active state → Error (until reset)
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RobotStatus {
    /// Parked at a vertex with no pending destination (default state).
    #[default]
    Idle,
    /// Computing a route.
    Planning,
    /// Attempting to reserve the planned lanes.
    Reserving,
    /// Reservation refused; backing off before retrying.
    Waiting,
    /// No route exists right now; backing off before re-planning.
    Blocked,
    /// Advancing along a reserved path.
    Moving,
    /// Worker faulted.  Terminal until the robot is reset.
    Error,
}

impl RobotStatus {
    /// `true` for states that only occur while a movement worker is running.
    #[inline]
    pub fn is_active(self) -> bool {
        !matches!(self, RobotStatus::Idle | RobotStatus::Error)
    }

    /// Human-readable label, useful for CSV column values.
    pub fn as_str(self) -> &'static str {
        match self {
            RobotStatus::Idle      => "idle",
            RobotStatus::Planning  => "planning",
            RobotStatus::Reserving => "reserving",
            RobotStatus::Waiting   => "waiting",
            RobotStatus::Blocked   => "blocked",
            RobotStatus::Moving    => "moving",
            RobotStatus::Error     => "error",
        }
    }
}

impl std::fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
