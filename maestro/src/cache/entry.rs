use std::time::Duration;

use chrono::{DateTime, Utc};

use super::scope::CacheScope;

/// A memoized step result. Never updated in place; expires `ttl` after `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// `<key prefix><nodeName>:<uuid>`.
    pub id: String,
    pub prompt: String,
    pub scope: CacheScope,
    pub response: serde_json::Value,
    pub ttl: Duration,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// `None` when the ttl does not fit the calendar; such entries never expire.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|d| self.created_at.checked_add_signed(d))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|t| t <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ttl: Duration) -> CacheEntry {
        CacheEntry {
            id: "maestro:agentCache:n:1".into(),
            prompt: "p".into(),
            scope: CacheScope::node("n"),
            response: serde_json::Value::Null,
            ttl,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn expiry_is_created_at_plus_ttl() {
        let e = entry(Duration::from_secs(60));
        assert!(!e.is_expired_at(e.created_at));
        assert!(e.is_expired_at(e.created_at + chrono::Duration::seconds(60)));
    }

    /// **Scenario**: A ttl too large for the calendar never expires instead of panicking.
    #[test]
    fn huge_ttl_never_expires() {
        let e = entry(Duration::from_secs(u64::MAX));
        assert!(e.expires_at().is_none());
        assert!(!e.is_expired_at(Utc::now()));
    }
}
