//! Sync coordination: intent resolution, job lifecycle and progress events

pub mod coordinator;
pub mod selection;
