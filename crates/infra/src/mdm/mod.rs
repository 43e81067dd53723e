//! MDM gateway wire handling

pub mod wire;

pub use wire::{normalize_row, parse_page};
