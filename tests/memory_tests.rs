//! Integration tests for named region lifecycle

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Barrier,
    },
    thread,
};

use shmlink::{
    error::ShmLinkError,
    layout::{MemoryRegion, RegionHeader, RegionId},
    memory::{BackingType, RegionConfig, RegionView, SharedMemoryRegion},
};
use tempfile::TempDir;

#[cfg(test)]
mod memory_tests {
    use super::*;

    fn config(temp_dir: &TempDir, name: &str, size: usize) -> RegionConfig {
        RegionConfig::new(name, size)
            .with_backing_type(BackingType::FileBacked)
            .with_directory(temp_dir.path())
    }

    #[test]
    fn test_create_then_open_same_region() {
        let temp_dir = TempDir::new().unwrap();

        let (created, first) = RegionView::<AtomicU64>::create_or_open(config(&temp_dir, "counter", 4096)).unwrap();
        assert!(created);
        assert!(first.header().is_initialized());
        assert_eq!(first.header().region_size(), 4096);
        assert_eq!(first.header().creator_pid(), std::process::id());
        assert_eq!(first.region_id(), RegionId::UNASSIGNED);

        first.header().assign_region_id(RegionId(5));
        first.payload().store(17, Ordering::Release);

        let (created, second) = RegionView::<AtomicU64>::create_or_open(config(&temp_dir, "counter", 4096)).unwrap();
        assert!(!created);
        assert_eq!(second.region_id(), RegionId(5));
        assert_eq!(second.payload().load(Ordering::Acquire), 17);

        second.payload().fetch_add(1, Ordering::AcqRel);
        assert_eq!(first.payload().load(Ordering::Acquire), 18);
    }

    #[test]
    fn test_open_with_different_size_fails() {
        let temp_dir = TempDir::new().unwrap();

        let (_, _region) = RegionView::<()>::create_or_open(config(&temp_dir, "sized", 4096)).unwrap();
        let err = RegionView::<()>::create_or_open(config(&temp_dir, "sized", 8192)).unwrap_err();
        assert!(matches!(err, ShmLinkError::ResourceUnavailable { .. }));
    }

    #[test]
    fn test_invalid_sizes_are_rejected() {
        let temp_dir = TempDir::new().unwrap();

        let err = RegionView::<()>::create_or_open(config(&temp_dir, "empty", 0)).unwrap_err();
        assert!(matches!(err, ShmLinkError::InvalidArgument { .. }));

        let err = RegionView::<()>::create_or_open(config(&temp_dir, "tiny", RegionHeader::SIZE - 1)).unwrap_err();
        assert!(matches!(err, ShmLinkError::InvalidArgument { .. }));

        let too_small = MemoryRegion::<[u64; 8]>::SIZE - 8;
        let err = RegionView::<[u64; 8]>::create_or_open(config(&temp_dir, "payload", too_small)).unwrap_err();
        assert!(matches!(err, ShmLinkError::InvalidArgument { .. }));

        // Nothing was created for rejected requests
        assert!(!temp_dir.path().join("empty").exists());
        assert!(!temp_dir.path().join("payload").exists());
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let temp_dir = TempDir::new().unwrap();

        for name in ["", "a/b", "..", "nul\0"] {
            let err = RegionView::<()>::create_or_open(config(&temp_dir, name, 4096)).unwrap_err();
            assert!(matches!(err, ShmLinkError::InvalidArgument { .. }), "name {:?}", name);
        }
    }

    #[test]
    fn test_missing_directory_is_resource_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let config = RegionConfig::new("orphan", 4096).with_directory(temp_dir.path().join("missing"));

        let err = SharedMemoryRegion::create_or_open(config).unwrap_err();
        assert!(matches!(err, ShmLinkError::ResourceUnavailable { source: Some(_), .. }));
    }

    #[test]
    fn test_uninitialized_segment_is_not_opened() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("foreign");
        std::fs::write(&path, vec![0u8; 4096]).unwrap();

        let err = SharedMemoryRegion::create_or_open(config(&temp_dir, "foreign", 4096)).unwrap_err();
        assert!(matches!(err, ShmLinkError::ResourceUnavailable { .. }));
        // The opener never removes a segment it did not create
        assert!(path.exists());
    }

    #[test]
    fn test_trailing_bytes() {
        let temp_dir = TempDir::new().unwrap();

        let (_, mut region) = RegionView::<[u64; 2]>::create_or_open(config(&temp_dir, "tail", 1024)).unwrap();
        assert_eq!(region.trailing_bytes().len(), 1024 - MemoryRegion::<[u64; 2]>::SIZE);
        assert!(region.trailing_bytes().iter().all(|&b| b == 0));

        region.trailing_bytes_mut()[..4].copy_from_slice(b"data");
        region.payload_mut()[1] = 99;

        let (_, reopened) = RegionView::<[u64; 2]>::create_or_open(config(&temp_dir, "tail", 1024)).unwrap();
        assert_eq!(&reopened.trailing_bytes()[..4], b"data");
        assert_eq!(reopened.payload()[1], 99);
    }

    #[test]
    fn test_drop_keeps_segment_and_unlink_removes_it() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lifecycle");

        {
            let (_, region) = RegionView::<AtomicU64>::create_or_open(config(&temp_dir, "lifecycle", 4096)).unwrap();
            region.payload().store(3, Ordering::Release);
        }
        assert!(path.exists());

        let (created, region) = RegionView::<AtomicU64>::create_or_open(config(&temp_dir, "lifecycle", 4096)).unwrap();
        assert!(!created);
        assert_eq!(region.payload().load(Ordering::Acquire), 3);

        region.unlink().unwrap();
        assert!(!path.exists());

        let (created, region) = RegionView::<AtomicU64>::create_or_open(config(&temp_dir, "lifecycle", 4096)).unwrap();
        assert!(created);
        assert_eq!(region.payload().load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_region_info() {
        let temp_dir = TempDir::new().unwrap();

        let region = SharedMemoryRegion::create_or_open(config(&temp_dir, "info", 2048)).unwrap();
        region.header().assign_region_id(RegionId(11));

        let info = region.info();
        assert_eq!(info.name, "info");
        assert_eq!(info.size, 2048);
        assert_eq!(info.backing_type, BackingType::FileBacked);
        assert_eq!(info.region_id, RegionId(11));
        assert!(info.created);
    }

    /// Every racer on one name either creates the region or opens the
    /// initialized one, without retrying
    fn race_create_or_open(config: &RegionConfig, racers: usize) -> Vec<RegionView<()>> {
        let barrier = Arc::new(Barrier::new(racers));
        let handles: Vec<_> = (0..racers)
            .map(|_| {
                let config = config.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    RegionView::<()>::create_or_open(config).unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|(created, _)| *created).count(), 1);
        results
            .into_iter()
            .map(|(_, view)| {
                assert!(view.header().is_initialized());
                assert_eq!(view.header().region_size(), config.size as u64);
                view
            })
            .collect()
    }

    #[test]
    fn test_concurrent_create_or_open_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir, "contended", 1024 * 1024);

        for _ in 0..50 {
            let views = race_create_or_open(&config, 8);
            drop(views);
            SharedMemoryRegion::unlink(&config).unwrap();
        }

        // Staging files never outlive a round
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_concurrent_create_or_open_shm() {
        let name = format!("shmlink-race-{}", std::process::id());
        let config = RegionConfig::new(&name, 1024 * 1024).with_backing_type(BackingType::PosixShm);

        for _ in 0..20 {
            let views = race_create_or_open(&config, 8);
            drop(views);
            SharedMemoryRegion::unlink(&config).unwrap();
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_posix_shm_backing() {
        let name = format!("shmlink-test-{}", std::process::id());
        let config = RegionConfig::new(&name, 4096).with_backing_type(BackingType::PosixShm);

        let (created, first) = RegionView::<AtomicU64>::create_or_open(config.clone()).unwrap();
        assert!(created);
        first.payload().store(7, Ordering::Release);

        let (created, second) = RegionView::<AtomicU64>::create_or_open(config.clone()).unwrap();
        assert!(!created);
        assert_eq!(second.payload().load(Ordering::Acquire), 7);

        drop(first);
        second.unlink().unwrap();
        assert!(SharedMemoryRegion::unlink(&config).is_err());
    }
}
