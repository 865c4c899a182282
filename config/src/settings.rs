//! Typed view over the process environment after `load_and_apply`.

use std::time::Duration;

use thiserror::Error;

pub const ENV_CACHE_TTL_SECS: &str = "MAESTRO_CACHE_TTL_SECS";
pub const ENV_KEY_PREFIX: &str = "MAESTRO_KEY_PREFIX";
pub const ENV_CACHE_DB: &str = "MAESTRO_CACHE_DB";
pub const ENV_CHECKPOINT_DB: &str = "MAESTRO_CHECKPOINT_DB";
pub const ENV_CHECKPOINT_TTL_SECS: &str = "MAESTRO_CHECKPOINT_TTL_SECS";
pub const ENV_RECURSION_LIMIT: &str = "MAESTRO_RECURSION_LIMIT";
pub const ENV_CACHE_LIST_MATCH: &str = "MAESTRO_CACHE_LIST_MATCH";
pub const ENV_CACHE_ENABLED: &str = "MAESTRO_CACHE_ENABLED";

/// Key segment appended to the root prefix for cache entry ids.
pub const CACHE_KEY_SEGMENT: &str = "agentCache:";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

/// How list-valued cache scope values (comma-separated) are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMatchSetting {
    /// Match when the stored list shares any element with the query list.
    #[default]
    Any,
    /// Match only when both lists hold the same set of elements.
    All,
}

/// Runtime settings for the cache, checkpoint store and graph runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub cache_ttl: Duration,
    /// Root prefix for every persisted key (e.g. `maestro:`).
    pub key_prefix: String,
    pub cache_db: String,
    pub checkpoint_db: String,
    /// Snapshots older than this are dropped; `None` (set with `0`) keeps them forever.
    pub checkpoint_ttl: Option<Duration>,
    pub recursion_limit: usize,
    pub cache_list_match: ListMatchSetting,
    pub cache_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(86_400),
            key_prefix: "maestro:".to_string(),
            cache_db: "maestro-cache.db".to_string(),
            checkpoint_db: "maestro-checkpoints.db".to_string(),
            checkpoint_ttl: Some(Duration::from_secs(86_400)),
            recursion_limit: 100,
            cache_list_match: ListMatchSetting::Any,
            cache_enabled: true,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; used by `from_env` and by tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Self::default();
        if let Some(v) = lookup(ENV_CACHE_TTL_SECS) {
            s.cache_ttl = Duration::from_secs(parse_num(ENV_CACHE_TTL_SECS, &v)?);
        }
        if let Some(v) = lookup(ENV_KEY_PREFIX) {
            s.key_prefix = v;
        }
        if let Some(v) = lookup(ENV_CACHE_DB) {
            s.cache_db = v;
        }
        if let Some(v) = lookup(ENV_CHECKPOINT_DB) {
            s.checkpoint_db = v;
        }
        if let Some(v) = lookup(ENV_CHECKPOINT_TTL_SECS) {
            let secs = parse_num(ENV_CHECKPOINT_TTL_SECS, &v)?;
            s.checkpoint_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(v) = lookup(ENV_RECURSION_LIMIT) {
            let limit = parse_num(ENV_RECURSION_LIMIT, &v)?;
            if limit == 0 {
                return Err(invalid(ENV_RECURSION_LIMIT, &v));
            }
            s.recursion_limit = limit as usize;
        }
        if let Some(v) = lookup(ENV_CACHE_LIST_MATCH) {
            s.cache_list_match = match v.trim().to_lowercase().as_str() {
                "any" => ListMatchSetting::Any,
                "all" => ListMatchSetting::All,
                _ => return Err(invalid(ENV_CACHE_LIST_MATCH, &v)),
            };
        }
        if let Some(v) = lookup(ENV_CACHE_ENABLED) {
            s.cache_enabled = match v.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(invalid(ENV_CACHE_ENABLED, &v)),
            };
        }
        Ok(s)
    }

    /// Prefix for cache entry ids: `<key_prefix>agentCache:`.
    pub fn cache_key_prefix(&self) -> String {
        format!("{}{}", self.key_prefix, CACHE_KEY_SEGMENT)
    }
}

fn parse_num(key: &str, value: &str) -> Result<u64, SettingsError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> SettingsError {
    SettingsError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let s = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.cache_key_prefix(), "maestro:agentCache:");
    }

    #[test]
    fn reads_all_keys() {
        let s = Settings::from_lookup(lookup_from(&[
            (ENV_CACHE_TTL_SECS, "30"),
            (ENV_KEY_PREFIX, "pm:"),
            (ENV_CACHE_DB, "/tmp/c.db"),
            (ENV_CHECKPOINT_DB, "/tmp/k.db"),
            (ENV_CHECKPOINT_TTL_SECS, "600"),
            (ENV_RECURSION_LIMIT, "12"),
            (ENV_CACHE_LIST_MATCH, "ALL"),
            (ENV_CACHE_ENABLED, "no"),
        ]))
        .unwrap();
        assert_eq!(s.cache_ttl, Duration::from_secs(30));
        assert_eq!(s.cache_key_prefix(), "pm:agentCache:");
        assert_eq!(s.cache_db, "/tmp/c.db");
        assert_eq!(s.checkpoint_db, "/tmp/k.db");
        assert_eq!(s.checkpoint_ttl, Some(Duration::from_secs(600)));
        assert_eq!(s.recursion_limit, 12);
        assert_eq!(s.cache_list_match, ListMatchSetting::All);
        assert!(!s.cache_enabled);
    }

    #[test]
    fn rejects_bad_numbers_and_zero_limit() {
        let err = Settings::from_lookup(lookup_from(&[(ENV_CACHE_TTL_SECS, "soon")])).unwrap_err();
        assert!(err.to_string().contains(ENV_CACHE_TTL_SECS));
        assert!(Settings::from_lookup(lookup_from(&[(ENV_RECURSION_LIMIT, "0")])).is_err());
        assert!(Settings::from_lookup(lookup_from(&[(ENV_CACHE_LIST_MATCH, "some")])).is_err());
    }

    /// **Scenario**: A zero checkpoint TTL keeps snapshots forever.
    #[test]
    fn zero_checkpoint_ttl_disables_expiry() {
        let s = Settings::from_lookup(lookup_from(&[(ENV_CHECKPOINT_TTL_SECS, "0")])).unwrap();
        assert_eq!(s.checkpoint_ttl, None);
        assert_eq!(Settings::default().checkpoint_ttl, Some(Duration::from_secs(86_400)));
    }
}
