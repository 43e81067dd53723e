//! # Stockbridge App
//!
//! Application layer: dependency wiring, the grid-facing command surface and
//! the `stockbridge` binary.
//!
//! ## Architecture
//! - Depends on `domain`, `core` and `infra`
//! - [`AppContext`] owns the process-wide client, repository and coordinator
//! - `commands` are thin, logged wrappers the CLI dispatches to

pub mod commands;
pub mod context;
pub mod utils;

pub use context::{AppContext, GridFilter, SelectedSync};
