//! Scoped cache store: memoizes expensive step results, looked up by free-text prompt match
//! plus exact tag match over a [`CacheScope`], with TTL expiry.
//!
//! # Main types
//!
//! - [`ScopedCache`]: the store contract (`get` / `set` / `clear`).
//! - [`InMemoryScopedCache`]: process-local store for tests and single runs.
//! - [`SqliteScopedCache`]: durable store with a tag index table.
//! - [`StepCache`]: what steps use; turns store failures into logged misses.
//!
//! `set` always creates a new entry. `get` returns the first live match in insertion order;
//! callers must not assume it is the most recent.

mod entry;
mod error;
mod in_memory;
pub mod matching;
mod scope;
mod sqlite;
mod step_cache;

use std::time::Duration;

use async_trait::async_trait;

pub use entry::CacheEntry;
pub use error::CacheError;
pub use in_memory::InMemoryScopedCache;
pub use scope::{CacheScope, ListMatch, ScopeField};
pub use sqlite::SqliteScopedCache;
pub use step_cache::StepCache;

/// Scoped memoization store.
///
/// **Interaction**: Shared as `Arc<dyn ScopedCache>` by every run of the process; wrapped in
/// [`StepCache`] for steps. No atomicity across a `get` + `set` pair: concurrent identical
/// misses both compute and both write.
#[async_trait]
pub trait ScopedCache: Send + Sync {
    /// First live entry whose prompt contains `prompt` and whose scope satisfies every
    /// dimension present in `scope`. Empty prompt or scope is `CacheError::InvalidQuery`.
    async fn get(&self, prompt: &str, scope: &CacheScope)
        -> Result<Option<CacheEntry>, CacheError>;

    /// Stores a new entry and returns its id. `scope.node_name` is required.
    async fn set(
        &self,
        prompt: &str,
        response: serde_json::Value,
        scope: &CacheScope,
    ) -> Result<String, CacheError>;

    /// Removes every entry and the supporting index; the index is recreated on next use.
    async fn clear(&self) -> Result<(), CacheError>;
}

/// Store-wide options shared by both backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    pub ttl: Duration,
    /// Full id prefix, e.g. `maestro:agentCache:`.
    pub key_prefix: String,
    pub list_match: ListMatch,
}

impl CacheOptions {
    pub fn from_settings(settings: &env_config::Settings) -> Self {
        Self {
            ttl: settings.cache_ttl,
            key_prefix: settings.cache_key_prefix(),
            list_match: settings.cache_list_match.into(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_list_match(mut self, list_match: ListMatch) -> Self {
        self.list_match = list_match;
        self
    }

    fn new_entry_id(&self, node_name: &str) -> String {
        format!(
            "{}{}:{}",
            self.key_prefix,
            node_name,
            uuid::Uuid::new_v4().simple()
        )
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::from_settings(&env_config::Settings::default())
    }
}

/// Validates a lookup and returns the normalized query scope.
fn query_scope(prompt: &str, scope: &CacheScope) -> Result<CacheScope, CacheError> {
    if prompt.trim().is_empty() {
        return Err(CacheError::InvalidQuery("prompt is empty".into()));
    }
    let scope = scope.normalized();
    if scope.is_empty() {
        return Err(CacheError::InvalidQuery("scope is empty".into()));
    }
    Ok(scope)
}

/// Validates a write and returns the normalized scope plus its node name.
fn write_scope(scope: &CacheScope) -> Result<(CacheScope, String), CacheError> {
    let scope = scope.normalized();
    let node_name = scope
        .node_name
        .clone()
        .ok_or_else(|| CacheError::InvalidQuery("scope.nodeName is required".into()))?;
    Ok((scope, node_name))
}
