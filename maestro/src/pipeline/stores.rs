//! Durable stores opened once at process start and passed to the workflow.

use std::sync::Arc;

use thiserror::Error;

use crate::cache::{CacheError, SqliteScopedCache, StepCache};
use crate::memory::{CheckpointError, JsonSerializer, SqliteSaver};
use crate::state::PipelineState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store: {0}")]
    Cache(#[from] CacheError),
    #[error("checkpoint store: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// SQLite cache and checkpoint stores at the paths named by `Settings`.
#[derive(Clone)]
pub struct Stores {
    pub cache: Arc<SqliteScopedCache>,
    pub checkpoints: Arc<SqliteSaver<PipelineState>>,
    cache_enabled: bool,
}

impl Stores {
    pub fn open(settings: &env_config::Settings) -> Result<Self, StoreError> {
        let cache = SqliteScopedCache::from_settings(settings)?;
        let mut checkpoints =
            SqliteSaver::new(&settings.checkpoint_db, Arc::new(JsonSerializer))?;
        if let Some(ttl) = settings.checkpoint_ttl {
            checkpoints = checkpoints.with_ttl(ttl);
        }
        tracing::info!(
            cache_db = %settings.cache_db,
            checkpoint_db = %settings.checkpoint_db,
            "stores opened"
        );
        Ok(Self {
            cache: Arc::new(cache),
            checkpoints: Arc::new(checkpoints),
            cache_enabled: settings.cache_enabled,
        })
    }

    /// Step cache over the durable store, disabled when the settings say so.
    pub fn step_cache(&self) -> StepCache {
        StepCache::with_enabled(self.cache.clone(), self.cache_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &std::path::Path, cache_enabled: bool) -> env_config::Settings {
        let cache_db = dir.join("cache.db").to_string_lossy().into_owned();
        let checkpoint_db = dir.join("checkpoints.db").to_string_lossy().into_owned();
        let enabled = if cache_enabled { "true" } else { "false" };
        env_config::Settings::from_lookup(|key| match key {
            env_config::ENV_CACHE_DB => Some(cache_db.clone()),
            env_config::ENV_CHECKPOINT_DB => Some(checkpoint_db.clone()),
            env_config::ENV_CACHE_ENABLED => Some(enabled.to_string()),
            _ => None,
        })
        .unwrap()
    }

    /// **Scenario**: Both databases are created at the configured paths; the cache switch is honoured.
    #[test]
    fn opens_both_stores() {
        let dir = tempfile::tempdir().unwrap();
        let stores = Stores::open(&settings(dir.path(), true)).unwrap();
        assert!(dir.path().join("cache.db").exists());
        assert!(dir.path().join("checkpoints.db").exists());
        assert!(stores.step_cache().is_enabled());

        let stores = Stores::open(&settings(dir.path(), false)).unwrap();
        assert!(!stores.step_cache().is_enabled());
    }
}
