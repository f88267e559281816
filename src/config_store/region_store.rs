//! Configuration store kept inside a shared memory region

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Mutex,
    },
};

use log::debug;

use crate::{
    error::{Result, ShmLinkError},
    layout::{RegionId, RegionPayload},
    memory::{RegionConfig, RegionView},
};

use super::traits::{ComponentConfig, SharedConfigStore};

/// Attempts made to take the cross-process lock before giving up
const LOCK_SPIN_LIMIT: u32 = 1 << 20;

type Registry = BTreeMap<String, Vec<u8>>;

/// Payload of the configuration region.
///
/// The bincode-encoded registry occupies the first `used_bytes` of the
/// region's trailing area. `lock` holds the pid of the process currently
/// rewriting the registry, or 0.
#[repr(C)]
#[derive(Debug)]
pub struct ConfigStorageHeader {
    lock: AtomicU32,
    _reserved: u32,
    used_bytes: AtomicU64,
    entry_count: AtomicU64,
    generation: AtomicU64,
}

unsafe impl RegionPayload for ConfigStorageHeader {}

impl ConfigStorageHeader {
    pub fn entry_count(&self) -> u64 {
        self.entry_count.load(Ordering::Acquire)
    }

    /// Incremented on every registry rewrite
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Result<()> {
        let owner = std::process::id().max(1);
        for attempt in 0..LOCK_SPIN_LIMIT {
            if self
                .lock
                .compare_exchange_weak(0, owner, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(());
            }
            if attempt % 64 == 63 {
                std::thread::yield_now();
            } else {
                std::hint::spin_loop();
            }
        }

        Err(ShmLinkError::store_failure(format!(
            "configuration store is locked by process {}",
            self.lock.load(Ordering::Relaxed)
        )))
    }

    fn release(&self) {
        self.lock.store(0, Ordering::Release);
    }
}

/// [`SharedConfigStore`] backed by a region every process can map.
#[derive(Debug)]
pub struct SharedConfigRegion {
    view: Mutex<RegionView<ConfigStorageHeader>>,
}

impl SharedConfigRegion {
    /// Wrap an already created or opened region
    pub fn new(view: RegionView<ConfigStorageHeader>) -> Self {
        Self {
            view: Mutex::new(view),
        }
    }

    /// Create or open a standalone configuration region
    pub fn create_or_open(config: RegionConfig) -> Result<Self> {
        let (_, view) = RegionView::create_or_open(config)?;
        Ok(Self::new(view))
    }

    /// Number of stored configurations
    pub fn len(&self) -> Result<usize> {
        self.with_view(|view| view.payload().entry_count() as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn region_id(&self) -> Result<RegionId> {
        self.with_view(|view| view.region_id())
    }

    /// Whether a configuration with this identity is stored
    pub fn contains(&self, config_key: &str) -> Result<bool> {
        self.with_registry(|registry| Ok((registry.contains_key(config_key), false)))
    }

    /// Identities of all stored configurations, sorted
    pub fn keys(&self) -> Result<Vec<String>> {
        self.with_registry(|registry| Ok((registry.keys().cloned().collect(), false)))
    }

    /// Read the shared configuration of one instance
    pub fn load<T: ComponentConfig>(&self, instance_key: &str) -> Result<Option<T>> {
        let key = format!("{}/{}", T::COMPONENT_TYPE, instance_key);
        let bytes = self.with_registry(|registry| Ok((registry.get(&key).cloned(), false)))?;

        bytes
            .map(|bytes| decode_config(&key, &bytes))
            .transpose()
    }

    /// Overwrite the shared entry with `config`
    pub fn update<T: ComponentConfig>(&self, config: &T) -> Result<()> {
        let key = config.config_key();
        let encoded = encode_config(&key, config)?;
        self.with_registry(|registry| {
            registry.insert(key.clone(), encoded);
            Ok(((), true))
        })?;
        debug!("Updated shared configuration {}", key);
        Ok(())
    }

    fn with_view<R>(&self, f: impl FnOnce(&RegionView<ConfigStorageHeader>) -> R) -> Result<R> {
        let view = self
            .view
            .lock()
            .map_err(|_| ShmLinkError::store_failure("configuration store lock poisoned"))?;
        Ok(f(&view))
    }

    /// Run `f` against the registry under the cross-process lock; `f` returns
    /// its result and whether the registry must be written back
    fn with_registry<R>(&self, f: impl FnOnce(&mut Registry) -> Result<(R, bool)>) -> Result<R> {
        let mut view = self
            .view
            .lock()
            .map_err(|_| ShmLinkError::store_failure("configuration store lock poisoned"))?;

        view.payload().acquire()?;
        let result = Self::update_locked(&mut view, f);
        view.payload().release();
        result
    }

    fn update_locked<R>(
        view: &mut RegionView<ConfigStorageHeader>,
        f: impl FnOnce(&mut Registry) -> Result<(R, bool)>,
    ) -> Result<R> {
        let mut registry = Self::load_registry(view)?;
        let (result, dirty) = f(&mut registry)?;
        if dirty {
            Self::save_registry(view, &registry)?;
        }
        Ok(result)
    }

    fn load_registry(view: &RegionView<ConfigStorageHeader>) -> Result<Registry> {
        let used = view.payload().used_bytes.load(Ordering::Acquire) as usize;
        if used == 0 {
            return Ok(Registry::new());
        }

        let area = view.trailing_bytes();
        if used > area.len() {
            return Err(ShmLinkError::store_failure(format!(
                "registry claims {} bytes, region holds {}",
                used,
                area.len()
            )));
        }

        bincode::deserialize(&area[..used])
            .map_err(|e| ShmLinkError::store_failure(format!("Failed to load registry: {}", e)))
    }

    fn save_registry(view: &mut RegionView<ConfigStorageHeader>, registry: &Registry) -> Result<()> {
        let serialized = bincode::serialize(registry)
            .map_err(|e| ShmLinkError::store_failure(format!("Failed to serialize registry: {}", e)))?;

        let area = view.trailing_bytes_mut();
        if serialized.len() > area.len() {
            return Err(ShmLinkError::store_failure(format!(
                "registry needs {} bytes, {} available",
                serialized.len(),
                area.len()
            )));
        }
        area[..serialized.len()].copy_from_slice(&serialized);

        let header = view.payload();
        header.used_bytes.store(serialized.len() as u64, Ordering::Release);
        header.entry_count.store(registry.len() as u64, Ordering::Release);
        header.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl SharedConfigStore for SharedConfigRegion {
    fn create_or_update_from<T: ComponentConfig>(&self, config: &mut T) -> Result<()> {
        let key = config.config_key();
        let local = encode_config(&key, config)?;

        let shared = self.with_registry(|registry| match registry.get(&key) {
            Some(bytes) => Ok((Some(bytes.clone()), false)),
            None => {
                registry.insert(key.clone(), local);
                Ok((None, true))
            }
        })?;

        match shared {
            Some(bytes) => {
                *config = decode_config(&key, &bytes)?;
                debug!("Refreshed {} from shared configuration", key);
            }
            None => debug!("Stored shared configuration {}", key),
        }

        Ok(())
    }
}

fn encode_config<T: ComponentConfig>(key: &str, config: &T) -> Result<Vec<u8>> {
    bincode::serialize(config)
        .map_err(|e| ShmLinkError::store_failure(format!("Failed to encode {}: {}", key, e)))
}

fn decode_config<T: ComponentConfig>(key: &str, bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes)
        .map_err(|e| ShmLinkError::store_failure(format!("Failed to decode {}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use crate::layout::MemoryRegion;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct PipelineConfig {
        stage: String,
        batch_size: u32,
    }

    impl ComponentConfig for PipelineConfig {
        const COMPONENT_TYPE: &'static str = "pipeline";

        fn instance_key(&self) -> String {
            self.stage.clone()
        }
    }

    fn store(temp_dir: &TempDir, size: usize) -> SharedConfigRegion {
        SharedConfigRegion::create_or_open(
            RegionConfig::new("config-store", size).with_directory(temp_dir.path()),
        )
        .unwrap()
    }

    fn pipeline(stage: &str, batch_size: u32) -> PipelineConfig {
        PipelineConfig {
            stage: stage.to_string(),
            batch_size,
        }
    }

    #[test]
    fn test_create_then_refresh() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, 4096);
        assert!(store.is_empty().unwrap());

        let mut first = pipeline("decode", 32);
        store.create_or_update_from(&mut first).unwrap();
        assert_eq!(first.batch_size, 32);
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.contains("pipeline/decode").unwrap());

        let mut second = pipeline("decode", 8);
        store.create_or_update_from(&mut second).unwrap();
        assert_eq!(second.batch_size, 32);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_registry_overflow() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, MemoryRegion::<ConfigStorageHeader>::SIZE + 64);

        let mut config = pipeline(&"x".repeat(128), 1);
        let err = store.create_or_update_from(&mut config).unwrap_err();
        assert!(matches!(err, ShmLinkError::StoreFailure { .. }));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_poisoned_store_reports_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(store(&temp_dir, 4096));

        let holder = store.clone();
        let _ = std::thread::spawn(move || {
            let _view = holder.view.lock().unwrap();
            panic!("panic while holding the store lock");
        })
        .join();

        assert!(matches!(store.len(), Err(ShmLinkError::StoreFailure { .. })));
        assert!(store.is_empty().is_err());
    }
}
