//! Invoke config: thread id, checkpoint namespace, recursion limit.
//!
//! Passed to `CompiledStateGraph::invoke` and to every `Checkpointer` call.

/// Config for a single invoke. Identifies the thread whose checkpoints the run reads and writes.
///
/// **Interaction**: Passed to `CompiledStateGraph::invoke(state, config)` and
/// `Checkpointer::put` / `get_tuple` / `list`. `SubgraphNode` derives a child config with a
/// longer `checkpoint_ns` so nested graphs keep their own lineage under the same thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnableConfig {
    /// Run identifier. Required when the graph has a checkpointer.
    pub thread_id: Option<String>,
    /// Namespace for nested graphs; empty for the top-level graph.
    pub checkpoint_ns: String,
    /// Overrides the graph's recursion limit for this run.
    pub recursion_limit: Option<usize>,
}

impl RunnableConfig {
    /// Config for a top-level run of `thread_id`.
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Self::default()
        }
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = Some(limit);
        self
    }

    /// Config for a graph nested under node `node_id`: same thread, namespace extended.
    pub fn child(&self, node_id: &str) -> Self {
        let checkpoint_ns = if self.checkpoint_ns.is_empty() {
            node_id.to_string()
        } else {
            format!("{}|{}", self.checkpoint_ns, node_id)
        };
        Self {
            thread_id: self.thread_id.clone(),
            checkpoint_ns,
            recursion_limit: self.recursion_limit,
        }
    }
}
