//! In-memory scoped cache.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::matching::{index_values, prompt_matches, scope_matches};
use super::{
    query_scope, write_scope, CacheEntry, CacheError, CacheOptions, CacheScope, ScopeField,
    ScopedCache,
};

type TagIndex = HashMap<(ScopeField, String), BTreeSet<usize>>;

#[derive(Default)]
struct Inner {
    entries: Vec<CacheEntry>,
    /// Built on first lookup; dropped whenever positions shift.
    index: Option<TagIndex>,
}

fn index_entry(index: &mut TagIndex, pos: usize, entry: &CacheEntry) {
    for (field, value) in entry.scope.fields() {
        for key in index_values(field, value) {
            index.entry((field, key)).or_default().insert(pos);
        }
    }
}

fn build_index(entries: &[CacheEntry]) -> TagIndex {
    let mut index = TagIndex::new();
    for (pos, entry) in entries.iter().enumerate() {
        index_entry(&mut index, pos, entry);
    }
    index
}

/// Positions that may match `scope`, ascending. Every queried field narrows the set; list
/// fields contribute the union of their elements' postings.
fn candidates(index: &TagIndex, scope: &CacheScope) -> BTreeSet<usize> {
    let mut out: Option<BTreeSet<usize>> = None;
    for (field, value) in scope.fields() {
        let mut postings = BTreeSet::new();
        for key in index_values(field, value) {
            if let Some(p) = index.get(&(field, key)) {
                postings.extend(p.iter().copied());
            }
        }
        out = Some(match out {
            None => postings,
            Some(acc) => acc.intersection(&postings).copied().collect(),
        });
    }
    out.unwrap_or_default()
}

/// In-memory scoped cache. Entries keep insertion order; expired entries are skipped on read
/// and purged on the next write.
///
/// **Interaction**: Used as `Arc<dyn ScopedCache>` by [`super::StepCache`]; the default store in
/// tests and pipeline scenarios.
pub struct InMemoryScopedCache {
    inner: Arc<RwLock<Inner>>,
    options: CacheOptions,
}

impl InMemoryScopedCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            options,
        }
    }

    /// Stored entries, live or not yet purged.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn find(
        &self,
        inner: &Inner,
        index: &TagIndex,
        prompt: &str,
        scope: &CacheScope,
    ) -> Option<CacheEntry> {
        let now = Utc::now();
        candidates(index, scope)
            .into_iter()
            .filter_map(|pos| inner.entries.get(pos))
            .find(|e| {
                !e.is_expired_at(now)
                    && scope_matches(&e.scope, scope, self.options.list_match)
                    && prompt_matches(&e.prompt, prompt)
            })
            .cloned()
    }
}

impl Default for InMemoryScopedCache {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

#[async_trait]
impl ScopedCache for InMemoryScopedCache {
    async fn get(
        &self,
        prompt: &str,
        scope: &CacheScope,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let scope = query_scope(prompt, scope)?;
        {
            let guard = self.inner.read().await;
            if let Some(index) = guard.index.as_ref() {
                return Ok(self.find(&guard, index, prompt, &scope));
            }
        }
        let mut guard = self.inner.write().await;
        let index = match guard.index.take() {
            Some(index) => index,
            None => build_index(&guard.entries),
        };
        let found = self.find(&guard, &index, prompt, &scope);
        guard.index = Some(index);
        Ok(found)
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
        let id = entry.id.clone();

        let mut guard = self.inner.write().await;
        let now = entry.created_at;
        let before = guard.entries.len();
        guard.entries.retain(|e| !e.is_expired_at(now));
        if guard.entries.len() != before {
            guard.index = None;
        }
        let pos = guard.entries.len();
        if let Some(index) = guard.index.as_mut() {
            index_entry(index, pos, &entry);
        }
        guard.entries.push(entry);
        Ok(id)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut guard = self.inner.write().await;
        guard.entries.clear();
        guard.index = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// **Scenario**: An entry written after the index was built is found through the index.
    #[tokio::test]
    async fn index_tracks_writes_after_build() {
        let cache = InMemoryScopedCache::default();
        let scope = CacheScope::node("n").with_feature("f");
        assert!(cache.get("p", &scope).await.unwrap().is_none());
        let id = cache
            .set("p", serde_json::json!(1), &scope)
            .await
            .unwrap();
        let hit = cache.get("p", &scope).await.unwrap().unwrap();
        assert_eq!(hit.id, id);
    }

    /// **Scenario**: Purging expired entries on write shifts positions; lookups stay correct.
    #[tokio::test]
    async fn purge_on_write_rebuilds_index() {
        let cache = InMemoryScopedCache::new(
            CacheOptions::default().with_ttl(Duration::from_millis(100)),
        );
        let scope = CacheScope::node("n");
        cache.set("old", serde_json::json!(1), &scope).await.unwrap();
        assert!(cache.get("old", &scope).await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(150)).await;
        cache.set("new", serde_json::json!(2), &scope).await.unwrap();
        assert_eq!(cache.len().await, 1);
        let hit = cache.get("new", &scope).await.unwrap().unwrap();
        assert_eq!(hit.response, serde_json::json!(2));
    }
}
