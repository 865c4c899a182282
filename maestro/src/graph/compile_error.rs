//! Graph compilation error.
//!
//! Returned by `StateGraph::compile` when the node/edge declaration cannot run.

use thiserror::Error;

/// Error when compiling a state graph.
///
/// Validation ensures every id in edges (except START/END) exists, exactly one edge leaves
/// START, conditional targets are nodes or END, and a terminal is reachable from START.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// A node id in an edge was not registered via `add_node` (and is not START/END).
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// No edge has from_id == START, or more than one such edge.
    #[error("graph must have exactly one edge from START")]
    MissingStart,

    /// No node reachable from START leads to END or has no outgoing edge.
    #[error("no terminal node reachable from START")]
    NoTerminalReachable,

    /// A node has both an outgoing edge and conditional edges; it must have one kind.
    #[error("node has both edge and conditional edges: {0}")]
    NodeHasBothEdgeAndConditional(String),

    /// A declared conditional target is not a node id or END, or the target set is empty.
    #[error("conditional edge has invalid target: {0}")]
    InvalidConditionalTarget(String),

    /// A node has more than one static outgoing edge.
    #[error("duplicate outgoing edge from node: {0}")]
    DuplicateEdge(String),
}
