//! Header structures stored at the start of every mapped region

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::constants::REGION_MAGIC;

/// Identifier assigned to a region the first time it is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct RegionId(pub u64);

impl RegionId {
    /// Sentinel stored by the creator until the coordinator assigns an id
    pub const UNASSIGNED: RegionId = RegionId(0);

    /// Whether an id has been assigned
    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Header at offset 0 of every region.
///
/// The creator writes `region_size` and `creator_pid` first and publishes
/// `magic` with release ordering; openers must observe the magic before
/// trusting the remaining fields.
#[repr(C)]
pub struct RegionHeader {
    magic: AtomicU64,
    region_id: AtomicU64,
    region_size: u64,
    creator_pid: u32,
    _reserved: u32,
}

impl RegionHeader {
    /// Size of the header in bytes
    pub const SIZE: usize = std::mem::size_of::<RegionHeader>();

    /// Initialize a freshly created (zeroed) header
    pub(crate) fn initialize(&mut self, region_size: u64) {
        self.region_size = region_size;
        self.creator_pid = std::process::id();
        self.region_id.store(RegionId::UNASSIGNED.0, Ordering::Relaxed);
        self.magic.store(REGION_MAGIC, Ordering::Release);
    }

    /// Whether the creator has finished initializing the header
    pub fn is_initialized(&self) -> bool {
        self.magic.load(Ordering::Acquire) == REGION_MAGIC
    }

    /// Identifier of the region, `RegionId::UNASSIGNED` until assigned
    pub fn region_id(&self) -> RegionId {
        RegionId(self.region_id.load(Ordering::Acquire))
    }

    /// Record the identifier handed out by the global counter
    pub fn assign_region_id(&self, id: RegionId) {
        self.region_id.store(id.0, Ordering::Release);
    }

    /// Size of the mapping as recorded by the creator
    pub fn region_size(&self) -> u64 {
        self.region_size
    }

    /// Process id of the creator
    pub fn creator_pid(&self) -> u32 {
        self.creator_pid
    }
}

impl fmt::Debug for RegionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionHeader")
            .field("initialized", &self.is_initialized())
            .field("region_id", &self.region_id())
            .field("region_size", &self.region_size)
            .field("creator_pid", &self.creator_pid)
            .finish()
    }
}

/// Marker for types that may live inside a mapped region.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` (or a primitive/array), contain no
/// pointers or references, and be valid when every byte is zero, since a
/// freshly created region is zero-filled and may be mapped by several
/// processes at different addresses. Fields mutated by more than one process
/// must be atomics.
pub unsafe trait RegionPayload: Sized + Send + Sync {}

unsafe impl RegionPayload for () {}
unsafe impl<const N: usize> RegionPayload for [u8; N] {}
unsafe impl<const N: usize> RegionPayload for [u64; N] {}
unsafe impl RegionPayload for AtomicU64 {}

/// A region header followed by a typed payload
#[repr(C)]
#[derive(Debug)]
pub struct MemoryRegion<T> {
    pub header: RegionHeader,
    pub payload: T,
}

impl<T> MemoryRegion<T> {
    /// Bytes occupied by header and payload
    pub const SIZE: usize = std::mem::size_of::<MemoryRegion<T>>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        assert_eq!(RegionHeader::SIZE, 32);
        assert_eq!(std::mem::align_of::<RegionHeader>(), 8);
        assert_eq!(MemoryRegion::<()>::SIZE, 32);
        assert_eq!(MemoryRegion::<AtomicU64>::SIZE, 40);
    }

    #[test]
    fn test_header_initialize() {
        let mut header: RegionHeader = unsafe { std::mem::zeroed() };
        assert!(!header.is_initialized());
        assert!(!header.region_id().is_assigned());

        header.initialize(4096);
        assert!(header.is_initialized());
        assert_eq!(header.region_size(), 4096);
        assert_eq!(header.creator_pid(), std::process::id());
        assert_eq!(header.region_id(), RegionId::UNASSIGNED);

        header.assign_region_id(RegionId(7));
        assert_eq!(header.region_id(), RegionId(7));
        assert_eq!(header.region_id().to_string(), "7");
    }
}
