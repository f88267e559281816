//! Binary layout of mapped regions
//!
//! Every region starts with a [`RegionHeader`] followed by a typed payload:
//!
//! ```text
//! ┌──────────────────────────────┐ offset 0
//! │ RegionHeader (32 bytes)      │ magic, region id, size, creator pid
//! ├──────────────────────────────┤
//! │ payload: T                   │ e.g. GlobalMemoryRegion
//! ├──────────────────────────────┤
//! │ trailing bytes               │ up to the region size
//! └──────────────────────────────┘
//! ```

pub mod constants;
pub mod global;
pub mod headers;

pub use constants::*;
pub use global::GlobalMemoryRegion;
pub use headers::{MemoryRegion, RegionHeader, RegionId, RegionPayload};
