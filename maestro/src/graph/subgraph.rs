//! Subgraph node: a compiled graph embedded as one node of a parent graph.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::AgentError;

use super::{CompiledStateGraph, Node, RunContext};

/// Runs a nested `CompiledStateGraph` over the full shared state.
///
/// The parent sees one opaque step. The nested graph's ceiling is its own limit capped by the
/// parent's remaining step budget, so nesting cannot run more nodes than the parent has left.
/// Under a checkpointed run the nested graph uses the same thread id with the checkpoint
/// namespace extended by this node's id, so its snapshots form their own lineage and an
/// interrupted nested run resumes where it stopped.
pub struct SubgraphNode<S> {
    id: String,
    graph: CompiledStateGraph<S>,
}

impl<S> SubgraphNode<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(id: impl Into<String>, graph: CompiledStateGraph<S>) -> Self {
        Self {
            id: id.into(),
            graph,
        }
    }
}

#[async_trait]
impl<S> Node<S> for SubgraphNode<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, state: S) -> Result<S, AgentError> {
        self.graph.invoke(state, None).await
    }

    async fn run_with_context(&self, state: S, ctx: &RunContext) -> Result<S, AgentError> {
        let mut config = ctx.config.child(&self.id);
        config.recursion_limit = Some(ctx.remaining_steps().min(self.graph.recursion_limit()));
        self.graph.invoke(state, Some(config)).await
    }
}
