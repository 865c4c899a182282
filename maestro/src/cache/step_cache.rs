//! Cache helper used by pipeline steps.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{CacheScope, ScopedCache};

/// Step-facing wrapper over a [`ScopedCache`]. Store failures are logged with `warn!` and
/// reported as misses, so a broken cache only costs recomputation.
///
/// **Interaction**: Held by `pipeline::StepContext`; cloned freely (shares the store).
#[derive(Clone, Default)]
pub struct StepCache {
    store: Option<Arc<dyn ScopedCache>>,
}

impl StepCache {
    pub fn new(store: Arc<dyn ScopedCache>) -> Self {
        Self { store: Some(store) }
    }

    /// Cache that never hits and never stores.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    /// `new(store)` when `enabled`, else `disabled()`.
    pub fn with_enabled(store: Arc<dyn ScopedCache>, enabled: bool) -> Self {
        if enabled {
            Self::new(store)
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Cached response for `(prompt, scope)` decoded as `T`; `None` on miss, store error or a
    /// response that does not decode.
    pub async fn lookup<T: DeserializeOwned>(&self, prompt: &str, scope: &CacheScope) -> Option<T> {
        let store = self.store.as_ref()?;
        match store.get(prompt, scope).await {
            Ok(Some(entry)) => match serde_json::from_value(entry.response) {
                Ok(value) => {
                    tracing::debug!(id = %entry.id, %scope, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!(id = %entry.id, error = %e, "cached response does not decode; treating as miss");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(prompt, %scope, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(prompt, %scope, error = %e, "cache lookup failed; treating as miss");
                None
            }
        }
    }

    /// Stores `value`; returns the new entry id, or `None` when disabled or on failure.
    pub async fn store<T: Serialize>(
        &self,
        prompt: &str,
        value: &T,
        scope: &CacheScope,
    ) -> Option<String> {
        let store = self.store.as_ref()?;
        let response = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(prompt, error = %e, "cache value does not serialize; not stored");
                return None;
            }
        };
        match store.set(prompt, response, scope).await {
            Ok(id) => {
                tracing::debug!(%id, %scope, "cache stored");
                Some(id)
            }
            Err(e) => {
                tracing::warn!(prompt, %scope, error = %e, "cache write failed");
                None
            }
        }
    }
}
