use fl_core::{CoreError, RobotId, VertexId};
use fl_graph::GraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("invalid vertex index {0}")]
    InvalidVertexIndex(VertexId),

    #[error("robot {0} not found")]
    RobotNotFound(RobotId),

    #[error("cannot send {robot} to {vertex}: {reason}")]
    DestinationOccupiedOrUnreachable {
        robot:  RobotId,
        vertex: VertexId,
        reason: &'static str,
    },

    #[error("no unoccupied vertex reachable from {0}")]
    NoAvailableVertex(VertexId),

    #[error("no path from {from} to {to}")]
    NoPathFound { from: VertexId, to: VertexId },

    #[error("{robot} gave up reserving after {waited_ms} ms")]
    ReservationTimeout { robot: RobotId, waited_ms: u64 },

    #[error("movement fault for {robot}: {reason}")]
    MovementFault { robot: RobotId, reason: String },

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("configuration error: {0}")]
    Core(#[from] CoreError),

    #[error("failed to spawn worker thread: {0}")]
    Io(#[from] std::io::Error),
}

pub type FleetResult<T> = Result<T, FleetError>;
