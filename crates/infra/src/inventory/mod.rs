//! Inventory repository over the MDM gateway and the catalog

pub mod repository;

pub use repository::HttpInventoryRepository;
