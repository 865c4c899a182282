//! Raw key/value sources: project `.env` and `$XDG_CONFIG_HOME/<app>/config.toml`.
//!
//! Neither source touches the process environment; `load_and_apply` merges them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::LoadError;

/// `.env` in `override_dir`, or in the current directory when not given.
fn dotenv_path(override_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = match override_dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

/// Reads `.env` into a map. A missing file is an empty map.
pub(crate) fn dotenv_map(override_dir: Option<&Path>) -> Result<HashMap<String, String>, LoadError> {
    let Some(path) = dotenv_path(override_dir) else {
        return Ok(HashMap::new());
    };
    let iter = dotenv::from_path_iter(&path).map_err(|e| LoadError::Dotenv(e.to_string()))?;
    let mut out = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| LoadError::Dotenv(e.to_string()))?;
        out.insert(key, value);
    }
    Ok(out)
}

#[derive(serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    env: HashMap<String, String>,
}

fn xdg_config_path(app_name: &str) -> Option<PathBuf> {
    let path = dirs::config_dir()?.join(app_name).join("config.toml");
    path.exists().then_some(path)
}

/// Reads the `[env]` table of the XDG config file. A missing file is an empty map.
pub(crate) fn xdg_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    let Some(path) = xdg_config_path(app_name) else {
        return Ok(HashMap::new());
    };
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    let file: ConfigFile = toml::from_str(&content)?;
    Ok(file.env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let map = dotenv_map(Some(dir.path())).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn dotenv_reads_pairs_and_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "# ttl for cached generations\nMAESTRO_CACHE_TTL_SECS=60\nMAESTRO_KEY_PREFIX=\"pm:\"\n",
        )
        .unwrap();
        let map = dotenv_map(Some(dir.path())).unwrap();
        assert_eq!(map.get("MAESTRO_CACHE_TTL_SECS").map(String::as_str), Some("60"));
        assert_eq!(map.get("MAESTRO_KEY_PREFIX").map(String::as_str), Some("pm:"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn xdg_missing_app_is_empty() {
        let map = xdg_map("maestro-config-test-nonexistent-app").unwrap();
        assert!(map.is_empty());
    }
}
