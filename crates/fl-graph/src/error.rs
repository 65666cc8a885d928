//! Graph-subsystem error type.

use thiserror::Error;

use fl_core::VertexId;

/// Errors produced by `fl-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("vertex {0} not found in graph")]
    VertexNotFound(VertexId),

    #[error("lane from {0} to itself is not allowed")]
    SelfLoop(VertexId),

    #[error("no route from {from} to {to}")]
    NoRoute { from: VertexId, to: VertexId },
}

pub type GraphResult<T> = Result<T, GraphError>;
