//! Configuration loading
//!
//! Settings come from `STOCKBRIDGE_*` environment variables, a JSON or TOML
//! file, and the defaults, in that order of precedence.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from, load_from_env, load_from_file, probe_config_paths, validate};
