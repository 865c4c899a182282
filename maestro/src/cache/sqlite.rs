//! SQLite-backed scoped cache.
//!
//! `cache_entries` holds the documents; `cache_tags(entry_id, field, value)` is the secondary
//! index for tag filters (one row per list element for list fields). The prompt free-text
//! match runs over the tag-filtered candidates.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value, Connection};

use super::matching::{index_values, prompt_matches, scope_matches};
use super::{
    query_scope, write_scope, CacheEntry, CacheError, CacheOptions, CacheScope, ScopedCache,
};

const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    id TEXT PRIMARY KEY,
    prompt TEXT NOT NULL,
    scope TEXT NOT NULL,
    response TEXT NOT NULL,
    ttl_ms INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    expires_at INTEGER
);
CREATE TABLE IF NOT EXISTS cache_tags (
    entry_id TEXT NOT NULL,
    field TEXT NOT NULL,
    value TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cache_tags_field_value ON cache_tags (field, value);
"#;

const DROP_SCHEMA: &str = r#"
DROP INDEX IF EXISTS idx_cache_tags_field_value;
DROP TABLE IF EXISTS cache_tags;
DROP TABLE IF EXISTS cache_entries;
"#;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

type Row = (String, String, String, String, i64, String);

fn row_to_entry(row: Row) -> Result<CacheEntry, CacheError> {
    let (id, prompt, scope, response, ttl_ms, created_at) = row;
    Ok(CacheEntry {
        id,
        prompt,
        scope: serde_json::from_str(&scope)?,
        response: serde_json::from_str(&response)?,
        ttl: Duration::from_millis(ttl_ms.max(0) as u64),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| CacheError::Serialization(e.to_string()))?
            .with_timezone(&Utc),
    })
}

/// Builds the tag-filter SELECT for `scope`: one EXISTS clause per queried field. List fields
/// narrow by any shared element; all-elements mode is settled by `scope_matches` afterwards.
fn select_candidates(scope: &CacheScope) -> (String, Vec<Value>) {
    let mut sql = String::from(
        "SELECT e.id, e.prompt, e.scope, e.response, e.ttl_ms, e.created_at
         FROM cache_entries e
         WHERE (e.expires_at IS NULL OR e.expires_at > ?)",
    );
    let mut args = vec![Value::Integer(now_ms())];
    for (field, value) in scope.fields() {
        let values = index_values(field, value);
        if values.is_empty() {
            continue;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        let exists = format!(
            " AND EXISTS (SELECT 1 FROM cache_tags t WHERE t.entry_id = e.id AND t.field = ? AND t.value IN ({placeholders}))"
        );
        sql.push_str(&exists);
        args.push(Value::Text(field.as_str().to_string()));
        args.extend(values.into_iter().map(Value::Text));
    }
    sql.push_str(" ORDER BY e.rowid");
    (sql, args)
}

/// Durable scoped cache on SQLite. Opens a connection per operation inside `spawn_blocking`.
///
/// **Interaction**: Used as `Arc<dyn ScopedCache>` by [`super::StepCache`]; opened by the CLI
/// and by `pipeline::Stores::open` from `MAESTRO_CACHE_DB`.
pub struct SqliteScopedCache {
    db_path: PathBuf,
    options: CacheOptions,
}

impl SqliteScopedCache {
    /// Opens (or creates) the store at `path` and ensures tables and index exist.
    pub fn new(path: impl AsRef<Path>, options: CacheOptions) -> Result<Self, CacheError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path)?;
        conn.execute_batch(CREATE_SCHEMA)?;
        Ok(Self { db_path, options })
    }

    pub fn from_settings(settings: &env_config::Settings) -> Result<Self, CacheError> {
        Self::new(&settings.cache_db, CacheOptions::from_settings(settings))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Runs `f` on a fresh connection off the async runtime. The schema is created if absent on
    /// every connection, so tables dropped by a `clear` from any handle or process come back
    /// on next use.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, CacheError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = Connection::open(&db_path)?;
            conn.execute_batch(CREATE_SCHEMA)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| CacheError::Storage(e.to_string()))?
    }
}

#[async_trait]
impl ScopedCache for SqliteScopedCache {
    async fn get(
        &self,
        prompt: &str,
        scope: &CacheScope,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let scope = query_scope(prompt, scope)?;
        let (sql, args) = select_candidates(&scope);
        let rows: Vec<Row> = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(args), |r| {
                    Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?))
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;

        for row in rows {
            let entry = row_to_entry(row)?;
            if scope_matches(&entry.scope, &scope, self.options.list_match)
                && prompt_matches(&entry.prompt, prompt)
            {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    async fn set(
        &self,
        prompt: &str,
        response: serde_json::Value,
        scope: &CacheScope,
    ) -> Result<String, CacheError> {
        let (scope, node_name) = write_scope(scope)?;
        let entry = CacheEntry {
            id: self.options.new_entry_id(&node_name),
            prompt: prompt.to_string(),
            scope,
            response,
            ttl: self.options.ttl,
            created_at: Utc::now(),
        };
        let scope_json = serde_json::to_string(&entry.scope)?;
        let response_json = serde_json::to_string(&entry.response)?;
        let tags: Vec<(&'static str, String)> = entry
            .scope
            .fields()
            .flat_map(|(field, value)| {
                index_values(field, value)
                    .into_iter()
                    .map(move |v| (field.as_str(), v))
            })
            .collect();
        let expires_at = entry.expires_at().map(|t| t.timestamp_millis());
        let ttl_ms = i64::try_from(entry.ttl.as_millis()).unwrap_or(i64::MAX);
        let id = entry.id.clone();
        let created_at = entry.created_at.to_rfc3339();
        let prompt = entry.prompt;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let now = now_ms();
            tx.execute(
                "DELETE FROM cache_tags WHERE entry_id IN
                 (SELECT id FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1)",
                params![now],
            )?;
            tx.execute(
                "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![now],
            )?;
            tx.execute(
                "INSERT INTO cache_entries (id, prompt, scope, response, ttl_ms, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, prompt, scope_json, response_json, ttl_ms, created_at, expires_at],
            )?;
            for (field, value) in &tags {
                tx.execute(
                    "INSERT INTO cache_tags (entry_id, field, value) VALUES (?1, ?2, ?3)",
                    params![id, field, value],
                )?;
            }
            tx.commit()?;
            Ok(id)
        })
        .await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.with_conn(|conn| {
            conn.execute_batch(DROP_SCHEMA)?;
            Ok(())
        })
        .await?;
        tracing::debug!(path = %self.db_path.display(), "cache cleared");
        Ok(())
    }
}
