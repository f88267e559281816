//! Typed views over shared memory regions

use std::marker::PhantomData;

use crate::{
    error::{Result, ShmLinkError},
    layout::{MemoryRegion, RegionHeader, RegionId, RegionPayload, MAX_PAYLOAD_ALIGNMENT},
};

use super::{config::RegionConfig, regions::SharedMemoryRegion};

/// A [`SharedMemoryRegion`] interpreted as a [`MemoryRegion<T>`].
///
/// The view provides no synchronization. Fields shared with other processes
/// are atomics inside `T`; everything else is the owner's to coordinate.
#[derive(Debug)]
pub struct RegionView<T: RegionPayload> {
    region: SharedMemoryRegion,
    _payload: PhantomData<T>,
}

impl<T: RegionPayload> RegionView<T> {
    /// Create or open the named region and bind it to `T`.
    ///
    /// Returns `true` alongside the view when this call created the segment.
    /// Only the creator initializes the header; a fresh payload is all zeroes.
    pub fn create_or_open(config: RegionConfig) -> Result<(bool, Self)> {
        if std::mem::align_of::<MemoryRegion<T>>() > MAX_PAYLOAD_ALIGNMENT {
            return Err(ShmLinkError::invalid_argument(
                "payload",
                "Payload alignment exceeds the mapping alignment",
            ));
        }

        if config.size != 0 && config.size < MemoryRegion::<T>::SIZE {
            return Err(ShmLinkError::invalid_argument(
                "size",
                format!(
                    "Region size {} cannot hold a {}-byte typed region",
                    config.size,
                    MemoryRegion::<T>::SIZE
                ),
            ));
        }

        let region = SharedMemoryRegion::create_or_open(config)?;
        let created = region.created();

        Ok((
            created,
            Self {
                region,
                _payload: PhantomData,
            },
        ))
    }

    /// The mapped typed region
    pub fn memory_region(&self) -> &MemoryRegion<T> {
        unsafe { &*self.region.as_ptr::<MemoryRegion<T>>() }
    }

    /// The mapped typed region, for direct writes by the owning process
    pub fn memory_region_mut(&mut self) -> &mut MemoryRegion<T> {
        unsafe { &mut *self.region.as_mut_ptr::<MemoryRegion<T>>() }
    }

    /// Header of the region
    pub fn header(&self) -> &RegionHeader {
        &self.memory_region().header
    }

    /// Typed payload following the header
    pub fn payload(&self) -> &T {
        &self.memory_region().payload
    }

    /// Typed payload following the header (mutable)
    pub fn payload_mut(&mut self) -> &mut T {
        &mut self.memory_region_mut().payload
    }

    /// Bytes after the typed region up to the end of the mapping
    pub fn trailing_bytes(&self) -> &[u8] {
        &self.region.as_slice()[MemoryRegion::<T>::SIZE..]
    }

    /// Bytes after the typed region up to the end of the mapping (mutable)
    pub fn trailing_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.region.as_mut_slice()[MemoryRegion::<T>::SIZE..]
    }

    pub fn region_id(&self) -> RegionId {
        self.header().region_id()
    }

    pub fn name(&self) -> &str {
        self.region.name()
    }

    pub fn size(&self) -> usize {
        self.region.size()
    }

    /// Whether this view created the segment
    pub fn created(&self) -> bool {
        self.region.created()
    }

    /// Underlying untyped region
    pub fn region(&self) -> &SharedMemoryRegion {
        &self.region
    }

    pub fn flush(&self) -> Result<()> {
        self.region.flush()
    }

    /// Unmap the view and remove the segment from its namespace
    pub fn unlink(self) -> Result<()> {
        let config = self.region.config().clone();
        drop(self);
        SharedMemoryRegion::unlink(&config)
    }
}
