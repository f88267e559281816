//! Concurrent region creation and id allocation

use std::{
    collections::HashSet,
    sync::{Arc, Barrier},
    thread,
};

use shmlink::{
    channels::QueueChannels,
    context::{Context, ContextConfig},
    layout::{GlobalMemoryRegion, RegionId},
    memory::RegionView,
};
use tempfile::TempDir;

#[cfg(test)]
mod concurrent_ids_tests {
    use super::*;

    const THREADS: usize = 8;
    const REGIONS_PER_THREAD: usize = 16;

    #[test]
    fn test_concurrent_creators_get_unique_ids() {
        let temp_dir = TempDir::new().unwrap();
        let config = ContextConfig::new().with_directory(temp_dir.path());
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|thread_id| {
                let config = config.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let channels = QueueChannels::default();
                    // Several contexts race on the global and config regions
                    let context = Context::open(config, channels.channel_set()).unwrap();

                    (0..REGIONS_PER_THREAD)
                        .map(|index| {
                            let name = format!("worker-{}-{}", thread_id, index);
                            context.create_memory_region::<()>(&name, 4096).unwrap().region_id()
                        })
                        .collect::<Vec<RegionId>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(id.is_assigned());
                assert!(ids.insert(id), "duplicate id {}", id);
            }
        }

        let (_, global) =
            RegionView::<GlobalMemoryRegion>::create_or_open(config.global_region_config()).unwrap();
        // One id for the config region plus one per worker region
        assert_eq!(ids.len(), THREADS * REGIONS_PER_THREAD);
        assert_eq!(
            global.payload().total_memory_region_count(),
            (THREADS * REGIONS_PER_THREAD + 1) as u64
        );
    }

    #[test]
    fn test_concurrent_open_of_one_region() {
        let temp_dir = TempDir::new().unwrap();
        let config = ContextConfig::new().with_directory(temp_dir.path());
        {
            // Settle the global and config regions up front
            Context::open(config.clone(), QueueChannels::default().channel_set()).unwrap();
        }

        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let config = config.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let channels = QueueChannels::default();
                    let context = Context::open(config, channels.channel_set()).unwrap();
                    barrier.wait();

                    context.create_memory_region::<()>("contended", 8192).unwrap()
                })
            })
            .collect();

        let views: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(views.iter().filter(|view| view.created()).count(), 1);
        let id = views[0].region_id();
        assert_eq!(id, RegionId(2));
        assert!(views.iter().all(|view| view.region_id() == id));
    }
}
