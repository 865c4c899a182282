//! Maestro CLI library: store maintenance commands behind the `maestro` binary.
//!
//! Each command takes opened [`maestro::Stores`] and returns JSON for the binary to print, so
//! tests can drive commands without spawning the process.

mod commands;

pub use commands::{
    cache_clear, cache_get, checkpoint_list, checkpoint_show, settings_summary, CacheQuery,
    CommandError,
};
