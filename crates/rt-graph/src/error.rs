//! Graph-subsystem error type.

use thiserror::Error;

use rt_core::{EdgeId, NodeId};

/// Errors produced by `rt-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("edge {0} not found in snapshot")]
    EdgeNotFound(String),

    #[error("edge {id} is a {kind} edge, not a rail edge")]
    NotRailEdge { id: String, kind: &'static str },

    #[error("node {0} not found in snapshot")]
    NodeNotFound(String),

    #[error("vehicle {0} not found in snapshot")]
    VehicleNotFound(String),

    #[error("edge {edge} references missing node {node}")]
    DanglingEdge { edge: EdgeId, node: NodeId },
}

pub type GraphResult<T> = Result<T, GraphError>;
