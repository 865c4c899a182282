//! Checkpointer trait and CheckpointError.
//!
//! Saves and loads full-state snapshots by `(thread_id, checkpoint_ns)`; the latest by
//! sequence wins.

use async_trait::async_trait;

use crate::memory::checkpoint::{Checkpoint, CheckpointListItem};
use crate::memory::config::RunnableConfig;

/// Error type for checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("thread_id required")]
    ThreadIdRequired,
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
}

/// Durable snapshot store for graph runs.
///
/// Each `put` is an independent full snapshot; nothing is merged. Implementations:
/// `MemorySaver` (in-memory, tests), `SqliteSaver` (survives restarts).
///
/// **Interaction**: Injected via `StateGraph::compile_with_checkpointer`; the compiled graph
/// writes after every node and reads once at the start of `invoke` to resume.
#[async_trait]
pub trait Checkpointer<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    /// Stores a snapshot and returns the sequence assigned to it.
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<u64, CheckpointError>;

    /// Latest snapshot for the thread and namespace, if any.
    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<Checkpoint<S>>, CheckpointError>;

    /// Snapshots for the thread and namespace, oldest first; `limit` keeps the newest `n`.
    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError>;

    /// Saves `state` for a top-level run, recording `node_name` as the node to resume at.
    async fn save(
        &self,
        thread_id: &str,
        state: S,
        node_name: &str,
    ) -> Result<u64, CheckpointError> {
        let config = RunnableConfig::for_thread(thread_id);
        let step = self
            .get_tuple(&config)
            .await?
            .map_or(0, |cp| cp.step + 1);
        let checkpoint = Checkpoint::from_state(thread_id, state, node_name, step);
        self.put(&config, &checkpoint).await
    }

    /// Latest `(state, node_name)` for a top-level run.
    async fn load(&self, thread_id: &str) -> Result<Option<(S, String)>, CheckpointError> {
        let config = RunnableConfig::for_thread(thread_id);
        Ok(self
            .get_tuple(&config)
            .await?
            .map(|cp| (cp.state, cp.next_node)))
    }
}

pub(crate) fn thread_id_required(config: &RunnableConfig) -> Result<&str, CheckpointError> {
    config
        .thread_id
        .as_deref()
        .ok_or(CheckpointError::ThreadIdRequired)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display of each CheckpointError variant contains expected keywords.
    #[test]
    fn checkpoint_error_display_all_variants() {
        assert!(CheckpointError::ThreadIdRequired
            .to_string()
            .contains("thread"));
        assert!(CheckpointError::Serialization("err".into())
            .to_string()
            .contains("serialization"));
        assert!(CheckpointError::Storage("io".into())
            .to_string()
            .contains("storage"));
    }

    /// **Scenario**: A config without thread_id is rejected.
    #[test]
    fn thread_id_required_rejects_missing() {
        assert!(matches!(
            thread_id_required(&RunnableConfig::default()),
            Err(CheckpointError::ThreadIdRequired)
        ));
        assert_eq!(
            thread_id_required(&RunnableConfig::for_thread("t")).unwrap(),
            "t"
        );
    }
}
