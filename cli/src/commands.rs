//! Cache and checkpoint inspection commands.

use maestro::{CacheScope, Checkpointer, RunnableConfig, ScopedCache, Stores};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Cache(#[from] maestro::CacheError),
    #[error(transparent)]
    Checkpoint(#[from] maestro::CheckpointError),
    #[error("no checkpoint for thread {thread_id} (namespace {checkpoint_ns:?})")]
    NoCheckpoint {
        thread_id: String,
        checkpoint_ns: String,
    },
    #[error("state does not serialize: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Lookup arguments for `cache get`.
#[derive(Debug, Clone, Default)]
pub struct CacheQuery {
    pub prompt: String,
    pub node_name: Option<String>,
    pub feature: Option<String>,
    pub competitors: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl CacheQuery {
    fn scope(&self) -> CacheScope {
        CacheScope {
            node_name: self.node_name.clone(),
            feature: self.feature.clone(),
            competitors_list_str: self.competitors.clone(),
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
        }
    }
}

/// `cache get`: the first live entry matching the query, or `null`.
pub async fn cache_get(stores: &Stores, query: &CacheQuery) -> Result<Value, CommandError> {
    let entry = stores.cache.get(&query.prompt, &query.scope()).await?;
    Ok(match entry {
        Some(e) => json!({
            "id": e.id,
            "prompt": e.prompt,
            "scope": e.scope,
            "response": e.response,
            "ttlSecs": e.ttl.as_secs(),
            "createdAt": e.created_at.to_rfc3339(),
            "expiresAt": e.expires_at().map(|t| t.to_rfc3339()),
        }),
        None => Value::Null,
    })
}

/// `cache clear`: drops every entry and the tag index.
pub async fn cache_clear(stores: &Stores) -> Result<Value, CommandError> {
    stores.cache.clear().await?;
    tracing::info!(path = %stores.cache.db_path().display(), "cache cleared");
    Ok(json!({ "cleared": true }))
}

fn run_config(thread_id: &str, checkpoint_ns: Option<&str>) -> RunnableConfig {
    let mut config = RunnableConfig::for_thread(thread_id);
    if let Some(ns) = checkpoint_ns {
        config.checkpoint_ns = ns.to_string();
    }
    config
}

/// `checkpoint list`: snapshots of a thread, oldest first.
pub async fn checkpoint_list(
    stores: &Stores,
    thread_id: &str,
    checkpoint_ns: Option<&str>,
    limit: Option<usize>,
) -> Result<Value, CommandError> {
    let items = stores
        .checkpoints
        .list(&run_config(thread_id, checkpoint_ns), limit)
        .await?;
    Ok(serde_json::to_value(items)?)
}

/// `checkpoint show`: the latest snapshot of a thread with its full state.
pub async fn checkpoint_show(
    stores: &Stores,
    thread_id: &str,
    checkpoint_ns: Option<&str>,
) -> Result<Value, CommandError> {
    let config = run_config(thread_id, checkpoint_ns);
    let cp = stores
        .checkpoints
        .get_tuple(&config)
        .await?
        .ok_or_else(|| CommandError::NoCheckpoint {
            thread_id: thread_id.to_string(),
            checkpoint_ns: config.checkpoint_ns.clone(),
        })?;
    Ok(json!({
        "checkpointId": cp.id,
        "threadId": cp.thread_id,
        "checkpointNs": cp.checkpoint_ns,
        "sequence": cp.sequence,
        "step": cp.step,
        "nextNode": cp.next_node,
        "complete": cp.is_complete(),
        "createdAt": cp.created_at.to_rfc3339(),
        "state": serde_json::to_value(&cp.state)?,
    }))
}

/// `settings`: the effective settings after `.env` / XDG loading.
pub fn settings_summary(settings: &env_config::Settings) -> Value {
    json!({
        "cacheTtlSecs": settings.cache_ttl.as_secs(),
        "cacheKeyPrefix": settings.cache_key_prefix(),
        "cacheDb": settings.cache_db,
        "checkpointDb": settings.checkpoint_db,
        "checkpointTtlSecs": settings.checkpoint_ttl.map(|t| t.as_secs()),
        "recursionLimit": settings.recursion_limit,
        "cacheListMatch": format!("{:?}", settings.cache_list_match).to_lowercase(),
        "cacheEnabled": settings.cache_enabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro::{Checkpoint, PipelineState, END};

    fn stores(dir: &std::path::Path) -> Stores {
        let cache_db = dir.join("cache.db").to_string_lossy().into_owned();
        let checkpoint_db = dir.join("cp.db").to_string_lossy().into_owned();
        let settings = env_config::Settings {
            cache_db,
            checkpoint_db,
            ..env_config::Settings::default()
        };
        Stores::open(&settings).unwrap()
    }

    #[tokio::test]
    async fn cache_get_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(dir.path());
        stores
            .cache
            .set(
                "a markdown editor",
                json!("markdown editing"),
                &CacheScope::node("extractFeature"),
            )
            .await
            .unwrap();
        let query = CacheQuery {
            prompt: "markdown editor".into(),
            node_name: Some("extractFeature".into()),
            ..CacheQuery::default()
        };
        let hit = cache_get(&stores, &query).await.unwrap();
        assert_eq!(hit["response"], "markdown editing");
        assert_eq!(hit["scope"]["nodeName"], "extractFeature");

        cache_clear(&stores).await.unwrap();
        assert!(cache_get(&stores, &query).await.unwrap().is_null());
    }

    #[tokio::test]
    async fn checkpoint_show_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(dir.path());
        let config = RunnableConfig::for_thread("t");
        let state = PipelineState::from_input("a markdown editor");
        stores
            .checkpoints
            .put(&config, &Checkpoint::from_state("t", state.clone(), "competitorSubgraph", 1))
            .await
            .unwrap();
        stores
            .checkpoints
            .put(&config, &Checkpoint::from_state("t", state, END, 2))
            .await
            .unwrap();

        let shown = checkpoint_show(&stores, "t", None).await.unwrap();
        assert_eq!(shown["nextNode"], END);
        assert_eq!(shown["complete"], true);
        assert_eq!(shown["state"]["input_text"], "a markdown editor");

        let listed = checkpoint_list(&stores, "t", None, Some(1)).await.unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["step"], 2);

        assert!(matches!(
            checkpoint_show(&stores, "missing", None).await,
            Err(CommandError::NoCheckpoint { .. })
        ));
    }

    #[test]
    fn settings_summary_reports_prefix() {
        let s = settings_summary(&env_config::Settings::default());
        assert_eq!(s["cacheKeyPrefix"], "maestro:agentCache:");
        assert_eq!(s["cacheListMatch"], "any");
    }
}
