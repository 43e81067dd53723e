//! Inventory push: ports, batch preparation and the sub-batch pipeline

pub mod batching;
pub mod pipeline;
pub mod ports;
