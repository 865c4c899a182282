use thiserror::Error;

/// Errors from a scoped cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Lookup or write rejected before touching the store (empty prompt, empty scope,
    /// missing `nodeName` on write).
    #[error("invalid cache query: {0}")]
    InvalidQuery(String),
    #[error("cache serialization error: {0}")]
    Serialization(String),
    #[error("cache storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        CacheError::Storage(e.to_string())
    }
}
