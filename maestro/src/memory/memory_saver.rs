//! In-memory checkpointer (MemorySaver). Not persistent; for dev and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::memory::checkpoint::{Checkpoint, CheckpointListItem};
use crate::memory::checkpointer::{thread_id_required, CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;

/// In-memory checkpointer. Key: `(thread_id, checkpoint_ns)`; each key keeps its snapshots
/// in sequence order, newest last. With a ttl, expired snapshots are hidden from reads and
/// dropped on the next `put`.
///
/// **Interaction**: Used as `Arc<dyn Checkpointer<S>>` in `StateGraph::compile_with_checkpointer`.
pub struct MemorySaver<S> {
    inner: Arc<RwLock<HashMap<(String, String), Vec<Checkpoint<S>>>>>,
    ttl: Option<Duration>,
}

impl<S> MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl: None,
        }
    }

    /// Expires snapshots `ttl` after they were taken.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn live(&self, cp: &Checkpoint<S>) -> bool {
        self.ttl.map_or(true, |ttl| !cp.is_expired_at(ttl, Utc::now()))
    }

    fn key(config: &RunnableConfig) -> Result<(String, String), CheckpointError> {
        let thread_id = thread_id_required(config)?;
        Ok((thread_id.to_string(), config.checkpoint_ns.clone()))
    }
}

impl<S> Default for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> Checkpointer<S> for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<u64, CheckpointError> {
        let key = Self::key(config)?;
        let mut guard = self.inner.write().await;
        if self.ttl.is_some() {
            for list in guard.values_mut() {
                list.retain(|cp| self.live(cp));
            }
            guard.retain(|_, list| !list.is_empty());
        }
        let mut cp = checkpoint.clone();
        cp.checkpoint_ns = key.1.clone();
        let list = guard.entry(key).or_default();
        let sequence = list.last().map_or(1, |c| c.sequence + 1);
        cp.sequence = sequence;
        list.push(cp);
        Ok(sequence)
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        let key = Self::key(config)?;
        let guard = self.inner.read().await;
        Ok(guard
            .get(&key)
            .and_then(|l| l.last())
            .filter(|cp| self.live(cp))
            .cloned())
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let key = Self::key(config)?;
        let guard = self.inner.read().await;
        let Some(list) = guard.get(&key) else {
            return Ok(Vec::new());
        };
        let live: Vec<&Checkpoint<S>> = list.iter().filter(|cp| self.live(cp)).collect();
        let skip = limit.map_or(0, |n| live.len().saturating_sub(n));
        Ok(live.into_iter().skip(skip).map(CheckpointListItem::from).collect())
    }
}
