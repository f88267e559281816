//! Payload of the global memory region

use std::sync::atomic::{AtomicU64, Ordering};

use super::headers::{RegionId, RegionPayload};

/// Payload of the well-known global region shared by all processes.
///
/// `total_memory_region_count` is the only source of region ids. It is only
/// ever advanced with `fetch_add`, so concurrent creators in different
/// processes never observe the same value.
#[repr(C)]
#[derive(Debug)]
pub struct GlobalMemoryRegion {
    total_memory_region_count: AtomicU64,
}

impl GlobalMemoryRegion {
    /// Number of ids handed out so far
    pub fn total_memory_region_count(&self) -> u64 {
        self.total_memory_region_count.load(Ordering::Acquire)
    }

    /// Reserve the next region id (the post-increment counter value)
    pub fn allocate_region_id(&self) -> RegionId {
        RegionId(self.total_memory_region_count.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

unsafe impl RegionPayload for GlobalMemoryRegion {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_allocate_region_id() {
        let global: GlobalMemoryRegion = unsafe { std::mem::zeroed() };
        assert_eq!(global.total_memory_region_count(), 0);
        assert_eq!(global.allocate_region_id(), RegionId(1));
        assert_eq!(global.allocate_region_id(), RegionId(2));
        assert_eq!(global.total_memory_region_count(), 2);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let global: Arc<GlobalMemoryRegion> = Arc::new(unsafe { std::mem::zeroed() });
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let global = Arc::clone(&global);
                std::thread::spawn(move || {
                    (0..100).map(|_| global.allocate_region_id()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<RegionId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 800);
        assert_eq!(ids.first(), Some(&RegionId(1)));
        assert_eq!(ids.last(), Some(&RegionId(800)));
    }
}
