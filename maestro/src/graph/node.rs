//! Graph node trait: one step in a StateGraph.
//!
//! Receives state `S`, returns the updated `S`. Routing is decided by the graph's edges, never
//! by the node.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::AgentError;

use super::RunContext;

/// One step in a graph: state in, state out.
///
/// Returning `Err` aborts the run; recoverable failures belong in the state's error slot
/// (see [`crate::state::FaultState`]) so the run can drain through its edges.
///
/// **Interaction**: Registered via `StateGraph::add_node`; run by `CompiledStateGraph::invoke`.
/// Wrapped by [`super::guard`], [`super::SubgraphNode`] and [`super::ToolNode`].
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"extractProductFeature"`). Must be unique within a graph.
    fn id(&self) -> &str;

    async fn run(&self, state: S) -> Result<S, AgentError>;

    /// Variant with run context (thread, namespace, step).
    ///
    /// Default implementation calls `run` and ignores the context.
    async fn run_with_context(&self, state: S, _ctx: &RunContext) -> Result<S, AgentError> {
        self.run(state).await
    }
}
