//! Shared component configuration

pub mod region_store;
pub mod traits;

pub use region_store::{ConfigStorageHeader, SharedConfigRegion};
pub use traits::{ComponentConfig, SharedConfigStore};
