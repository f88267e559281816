//! Shared memory region management and operations

pub mod config;
pub mod regions;
pub mod view;

pub use config::{validate_region_name, BackingType, RegionConfig, DEFAULT_REGION_DIRECTORY};
pub use regions::{RegionInfo, SharedMemoryRegion, SHM_INITIALIZATION_WAIT};
pub use view::RegionView;

pub(crate) use regions::wait_until;
