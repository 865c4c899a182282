//! Compiled state graph: immutable, supports invoke only.
//!
//! Built by `StateGraph::compile` or `compile_with_checkpointer`. Runs from the START node,
//! follows static and conditional edges, counts every node execution against the recursion
//! limit and, with a checkpointer and a thread id, snapshots state after each node.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::AgentError;
use crate::memory::{Checkpoint, Checkpointer, RunnableConfig};

use super::logging::{
    log_graph_complete, log_graph_error, log_graph_resume, log_graph_start, log_node_complete,
    log_node_start, log_state_fault,
};
use super::state_graph::END;
use super::{NextEntry, Node, RunContext};

/// Reads the error slot of a state for logging. See `StateGraph::with_fault_observer`.
pub type FaultObserverFn<S> = Arc<dyn Fn(&S) -> Option<String> + Send + Sync>;

/// Compiled graph: immutable structure, supports invoke only.
///
/// When a checkpointer is set and `invoke` gets a config with `thread_id`, a snapshot
/// (state, next node, step) is written after every node. A later `invoke` on the same thread
/// and namespace resumes from the latest snapshot whose next node is not `END`.
///
/// **Interaction**: Created by `StateGraph::compile()`; embedded in parent graphs by
/// `SubgraphNode`.
#[derive(Clone)]
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(super) first_node_id: String,
    /// Node id -> how to pick the next node. Absent ids are terminal.
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    pub(super) recursion_limit: usize,
    pub(super) fault_observer: Option<FaultObserverFn<S>>,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Runs the graph from START (or from the thread's latest unfinished checkpoint) until a
    /// terminal node completes.
    ///
    /// Errors: `RecursionLimit` when more than the limit of node executions would be needed,
    /// `InvalidRoute` when a router answers outside its declared targets, or the error a
    /// node returned. Checkpoint store failures are logged and never fail the run.
    pub async fn invoke(&self, state: S, config: Option<RunnableConfig>) -> Result<S, AgentError> {
        if self.nodes.is_empty() || !self.nodes.contains_key(&self.first_node_id) {
            return Err(AgentError::EmptyGraph);
        }
        let config = config.unwrap_or_default();
        let limit = config.recursion_limit.unwrap_or(self.recursion_limit);
        let (mut state, mut current_id, mut step) = self.resume_point(state, &config).await;

        log_graph_start(config.thread_id.as_deref(), &config.checkpoint_ns, &current_id);
        let mut fault_seen = false;

        loop {
            if step >= limit {
                let err = AgentError::RecursionLimit { limit };
                log_graph_error(&err);
                return Err(err);
            }
            let node = self.nodes.get(&current_id).cloned().ok_or_else(|| {
                AgentError::ExecutionFailed(format!("node not found: {}", current_id))
            })?;

            log_node_start(&current_id, step);
            let ctx = RunContext::new(config.clone(), step, limit);
            state = match node.run_with_context(state, &ctx).await {
                Ok(s) => s,
                Err(e) => {
                    log_graph_error(&e);
                    return Err(e);
                }
            };
            step += 1;

            if !fault_seen {
                if let Some(error) = self.fault_observer.as_ref().and_then(|f| f(&state)) {
                    log_state_fault(&current_id, &error);
                    fault_seen = true;
                }
            }

            let next_id = match self.next_map.get(&current_id) {
                None => END.to_string(),
                Some(NextEntry::Unconditional(to)) => to.clone(),
                Some(NextEntry::Conditional(router)) => {
                    match router.resolve_next(&current_id, &state) {
                        Ok(to) => to,
                        Err(e) => {
                            log_graph_error(&e);
                            return Err(e);
                        }
                    }
                }
            };
            log_node_complete(&current_id, &next_id);
            self.save_checkpoint(&config, &state, &next_id, step).await;

            if next_id == END {
                log_graph_complete(step);
                return Ok(state);
            }
            current_id = next_id;
        }
    }

    /// Where a run starts: the latest unfinished checkpoint of the thread, or START.
    async fn resume_point(&self, state: S, config: &RunnableConfig) -> (S, String, usize) {
        let fresh = |state| (state, self.first_node_id.clone(), 0);
        let (Some(cp), Some(thread_id)) = (&self.checkpointer, config.thread_id.as_deref())
        else {
            return fresh(state);
        };
        match cp.get_tuple(config).await {
            Ok(Some(saved)) if !saved.is_complete() => {
                if self.nodes.contains_key(&saved.next_node) {
                    log_graph_resume(thread_id, &saved.next_node, saved.step, saved.sequence);
                    (saved.state, saved.next_node, saved.step)
                } else {
                    tracing::warn!(
                        thread_id,
                        node_id = %saved.next_node,
                        "checkpoint names an unknown node; starting fresh"
                    );
                    fresh(state)
                }
            }
            Ok(_) => fresh(state),
            Err(e) => {
                tracing::warn!(thread_id, error = %e, "checkpoint load failed; starting fresh");
                fresh(state)
            }
        }
    }

    async fn save_checkpoint(&self, config: &RunnableConfig, state: &S, next: &str, step: usize) {
        let (Some(cp), Some(thread_id)) = (&self.checkpointer, config.thread_id.as_deref())
        else {
            return;
        };
        let checkpoint = Checkpoint::from_state(thread_id, state.clone(), next, step);
        match cp.put(config, &checkpoint).await {
            Ok(sequence) => tracing::debug!(thread_id, next, step, sequence, "checkpoint saved"),
            Err(e) => tracing::warn!(thread_id, next, error = %e, "checkpoint save failed"),
        }
    }

    /// Id of the node run first on a fresh start.
    pub fn first_node_id(&self) -> &str {
        &self.first_node_id
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }
}
