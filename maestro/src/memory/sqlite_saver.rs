//! SQLite-backed checkpointer (SqliteSaver). Persistent across process restarts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::memory::checkpoint::{ttl_cutoff, Checkpoint, CheckpointListItem};
use crate::memory::checkpointer::{thread_id_required, CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;
use crate::memory::serializer::Serializer;

fn storage(e: impl std::fmt::Display) -> CheckpointError {
    CheckpointError::Storage(e.to_string())
}

fn parse_created_at(s: &str) -> Result<DateTime<Utc>, CheckpointError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(storage)
}

/// SQLite-backed checkpointer. Key: `(thread_id, checkpoint_ns, sequence)`.
///
/// Opens a connection per operation inside `spawn_blocking`. `put` assigns the next sequence
/// in the same transaction as the insert, so concurrent writers never reuse one. With a ttl,
/// reads skip expired rows and every `put` deletes them.
///
/// **Interaction**: Used as `Arc<dyn Checkpointer<S>>` in `StateGraph::compile_with_checkpointer`.
pub struct SqliteSaver<S> {
    db_path: PathBuf,
    serializer: Arc<dyn Serializer<S>>,
    ttl: Option<Duration>,
}

impl<S> SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Creates a new SQLite checkpointer and ensures the table exists.
    pub fn new(
        path: impl AsRef<Path>,
        serializer: Arc<dyn Serializer<S>>,
    ) -> Result<Self, CheckpointError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT NOT NULL,
                checkpoint_ns TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                checkpoint_id TEXT NOT NULL,
                next_node TEXT NOT NULL,
                step INTEGER NOT NULL,
                payload BLOB NOT NULL,
                created_at TEXT NOT NULL,
                created_ms INTEGER NOT NULL,
                PRIMARY KEY (thread_id, checkpoint_ns, sequence)
            );
            CREATE INDEX IF NOT EXISTS idx_checkpoints_created_ms ON checkpoints (created_ms);
            "#,
        )
        .map_err(storage)?;
        Ok(Self {
            db_path,
            serializer,
            ttl: None,
        })
    }

    /// Expires snapshots `ttl` after they were taken.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Rows with `created_ms` at or below this are expired; `i64::MIN` when nothing expires.
    fn cutoff_ms(&self) -> i64 {
        self.ttl
            .and_then(|ttl| ttl_cutoff(ttl, Utc::now()))
            .map_or(i64::MIN, |t| t.timestamp_millis())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

type Row = (u64, String, String, i64, Vec<u8>, String);

#[async_trait]
impl<S> Checkpointer<S> for SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<u64, CheckpointError> {
        let thread_id = thread_id_required(config)?.to_string();
        let checkpoint_ns = config.checkpoint_ns.clone();
        let payload = self.serializer.serialize(&checkpoint.state)?;
        let id = checkpoint.id.clone();
        let next_node = checkpoint.next_node.clone();
        let step = checkpoint.step as i64;
        let created_at = checkpoint.created_at.to_rfc3339();
        let created_ms = checkpoint.created_at.timestamp_millis();
        let cutoff = self.cutoff_ms();
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
            let tx = conn.transaction().map_err(storage)?;
            let purged = tx
                .execute("DELETE FROM checkpoints WHERE created_ms <= ?1", params![cutoff])
                .map_err(storage)?;
            if purged > 0 {
                tracing::debug!(purged, "expired checkpoints deleted");
            }
            let sequence: i64 = tx
                .query_row(
                    "SELECT COALESCE(MAX(sequence), 0) + 1 FROM checkpoints
                     WHERE thread_id = ?1 AND checkpoint_ns = ?2",
                    params![thread_id, checkpoint_ns],
                    |r| r.get(0),
                )
                .map_err(storage)?;
            tx.execute(
                r#"
                INSERT INTO checkpoints
                (thread_id, checkpoint_ns, sequence, checkpoint_id, next_node, step, payload,
                 created_at, created_ms)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    thread_id,
                    checkpoint_ns,
                    sequence,
                    id,
                    next_node,
                    step,
                    payload,
                    created_at,
                    created_ms
                ],
            )
            .map_err(storage)?;
            tx.commit().map_err(storage)?;
            Ok::<u64, CheckpointError>(sequence as u64)
        })
        .await
        .map_err(storage)?
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        let thread_id = thread_id_required(config)?.to_string();
        let checkpoint_ns = config.checkpoint_ns.clone();
        let db_path = self.db_path.clone();
        let tid = thread_id.clone();
        let ns = checkpoint_ns.clone();
        let cutoff = self.cutoff_ms();

        let row: Option<Row> = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
            conn.query_row(
                "SELECT sequence, checkpoint_id, next_node, step, payload, created_at
                 FROM checkpoints
                 WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND created_ms > ?3
                 ORDER BY sequence DESC LIMIT 1",
                params![tid, ns, cutoff],
                |r| {
                    Ok((
                        r.get::<_, i64>(0)? as u64,
                        r.get(1)?,
                        r.get(2)?,
                        r.get(3)?,
                        r.get(4)?,
                        r.get(5)?,
                    ))
                },
            )
            .optional()
            .map_err(storage)
        })
        .await
        .map_err(storage)??;

        let Some((sequence, id, next_node, step, payload, created_at)) = row else {
            return Ok(None);
        };
        Ok(Some(Checkpoint {
            id,
            thread_id,
            checkpoint_ns,
            state: self.serializer.deserialize(&payload)?,
            next_node,
            step: step as usize,
            sequence,
            created_at: parse_created_at(&created_at)?,
        }))
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let thread_id = thread_id_required(config)?.to_string();
        let checkpoint_ns = config.checkpoint_ns.clone();
        let db_path = self.db_path.clone();
        let limit = limit.map_or(-1, |n| n as i64);
        let cutoff = self.cutoff_ms();

        let rows: Vec<(u64, String, String, i64, String)> =
            tokio::task::spawn_blocking(move || {
                let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
                let mut stmt = conn
                    .prepare(
                        "SELECT sequence, checkpoint_id, next_node, step, created_at
                         FROM checkpoints
                         WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND created_ms > ?4
                         ORDER BY sequence DESC LIMIT ?3",
                    )
                    .map_err(storage)?;
                let rows = stmt
                    .query_map(params![thread_id, checkpoint_ns, limit, cutoff], |r| {
                        Ok((
                            r.get::<_, i64>(0)? as u64,
                            r.get(1)?,
                            r.get(2)?,
                            r.get(3)?,
                            r.get(4)?,
                        ))
                    })
                    .map_err(storage)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(storage)
            })
            .await
            .map_err(storage)??;

        let mut items = rows
            .into_iter()
            .map(|(sequence, checkpoint_id, next_node, step, created_at)| {
                Ok(CheckpointListItem {
                    checkpoint_id,
                    sequence,
                    step: step as usize,
                    next_node,
                    created_at: parse_created_at(&created_at)?,
                })
            })
            .collect::<Result<Vec<_>, CheckpointError>>()?;
        items.reverse();
        Ok(items)
    }
}
