//! # Stockbridge Domain
//!
//! Business domain types for the MDM to catalog inventory bridge.
//!
//! This crate contains:
//! - Inventory rows, source mappings and catalog source items
//! - Sync job outcomes, progress events and batch results
//! - Domain error types and Result definitions
//! - Runtime settings and their defaults
//!
//! ## Architecture
//! - No dependencies on other Stockbridge crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
