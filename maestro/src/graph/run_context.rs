//! Run context passed into nodes.

use crate::memory::RunnableConfig;

/// Per-node view of the current run.
///
/// **Interaction**: Built by `CompiledStateGraph` before each node; `SubgraphNode` derives the
/// nested graph's config from `config`.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Config of the run (thread id, checkpoint namespace).
    pub config: RunnableConfig,
    /// Nodes already executed in this lineage.
    pub step: usize,
    pub recursion_limit: usize,
}

impl RunContext {
    pub fn new(config: RunnableConfig, step: usize, recursion_limit: usize) -> Self {
        Self {
            config,
            step,
            recursion_limit,
        }
    }

    /// Executions left before the run fails with a recursion-limit error, counting this one.
    pub fn remaining_steps(&self) -> usize {
        self.recursion_limit.saturating_sub(self.step)
    }
}
