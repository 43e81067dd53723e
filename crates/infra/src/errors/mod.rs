//! Infrastructure error conversions

mod conversions;

pub use conversions::{map_status_error, render_catalog_message, InfraError};
