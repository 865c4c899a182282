//! Load configuration from XDG `config.toml` and project `.env`, then apply to the process
//! environment with priority: **existing env > .env > XDG**. [`Settings`] is the typed view
//! the library and CLI read afterwards.

mod settings;
mod sources;

use std::path::Path;
use thiserror::Error;

pub use settings::{
    ListMatchSetting, Settings, SettingsError, CACHE_KEY_SEGMENT, ENV_CACHE_DB,
    ENV_CACHE_ENABLED, ENV_CACHE_LIST_MATCH, ENV_CACHE_TTL_SECS, ENV_CHECKPOINT_DB,
    ENV_CHECKPOINT_TTL_SECS, ENV_KEY_PREFIX, ENV_RECURSION_LIMIT,
};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    Dotenv(String),
}

/// Loads `.env` and the XDG `[env]` table, setting only keys absent from the environment.
///
/// * `app_name`: XDG directory name, e.g. `"maestro"` for `~/.config/maestro/config.toml`.
/// * `override_dir`: directory holding `.env`; the current directory when `None`.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    let xdg = sources::xdg_map(app_name)?;
    let dotenv = sources::dotenv_map(override_dir)?;

    let mut keys: std::collections::HashSet<&String> = xdg.keys().collect();
    keys.extend(dotenv.keys());

    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(v) = dotenv.get(key).or_else(|| xdg.get(key)) {
            std::env::set_var(key, v);
        }
    }
    Ok(())
}
