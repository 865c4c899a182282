//! Checkpoint record: one full-state snapshot plus the node to run next.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Oldest `created_at` still live under `ttl` at `now`. `None` when the ttl reaches past the
/// calendar, in which case nothing expires.
pub(crate) fn ttl_cutoff(ttl: Duration, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_sub_signed(d))
}

/// A full snapshot of run state, keyed by `(thread_id, checkpoint_ns)` and ordered by `sequence`.
///
/// `next_node` is the node the run reached after the node that produced this snapshot; it is
/// `END` once the run has completed. Savers assign `sequence` on `put`.
///
/// **Interaction**: Produced by `CompiledStateGraph` after every node; consumed by
/// `Checkpointer::put`, returned by `get_tuple`.
#[derive(Debug, Clone)]
pub struct Checkpoint<S> {
    pub id: String,
    pub thread_id: String,
    /// Empty for a top-level graph; set by the saver from the config on `put`.
    pub checkpoint_ns: String,
    pub state: S,
    pub next_node: String,
    /// Nodes executed in this lineage when the snapshot was taken.
    pub step: usize,
    /// Monotonic per `(thread_id, checkpoint_ns)`; 0 until stored.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl<S> Checkpoint<S> {
    pub fn from_state(
        thread_id: impl Into<String>,
        state: S,
        next_node: impl Into<String>,
        step: usize,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            checkpoint_ns: String::new(),
            state,
            next_node: next_node.into(),
            step,
            sequence: 0,
            created_at: Utc::now(),
        }
    }

    /// True when the snapshot was taken after the run reached a terminal node.
    pub fn is_complete(&self) -> bool {
        self.next_node == crate::graph::END
    }

    /// True once `ttl` has passed since the snapshot was taken.
    pub fn is_expired_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        ttl_cutoff(ttl, now).is_some_and(|cutoff| self.created_at <= cutoff)
    }
}

/// Item returned by `Checkpointer::list` for inspection.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointListItem {
    pub checkpoint_id: String,
    pub sequence: u64,
    pub step: usize,
    pub next_node: String,
    pub created_at: DateTime<Utc>,
}

impl<S> From<&Checkpoint<S>> for CheckpointListItem {
    fn from(cp: &Checkpoint<S>) -> Self {
        Self {
            checkpoint_id: cp.id.clone(),
            sequence: cp.sequence,
            step: cp.step,
            next_node: cp.next_node.clone(),
            created_at: cp.created_at,
        }
    }
}
