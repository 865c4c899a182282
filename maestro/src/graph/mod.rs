//! State graph API: build a graph of nodes and edges, compile it, invoke it.
//!
//! Nodes are `Arc<dyn Node<S>>`; edges are static (`add_edge`) or conditional
//! (`add_conditional_edges` with a declared target set). The compiled graph bounds every run
//! by a recursion limit and, with a checkpointer, snapshots state after each node.
//!
//! Generic building blocks: [`guard`] (skip on error), [`SubgraphNode`] (nested graph as one
//! node), [`ToolNode`] plus [`has_pending_tool_calls`] (tool-call loop).

mod compile_error;
mod compiled;
mod conditional;
mod guard;
pub mod logging;
mod node;
mod run_context;
mod state_graph;
mod subgraph;
mod tool_node;

pub use compile_error::CompilationError;
pub use compiled::{CompiledStateGraph, FaultObserverFn};
pub use conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
pub use guard::{guard, ErrorGuard};
pub use node::Node;
pub use run_context::RunContext;
pub use state_graph::{StateGraph, DEFAULT_RECURSION_LIMIT, END, START};
pub use subgraph::SubgraphNode;
pub use tool_node::{has_pending_tool_calls, ToolNode};
