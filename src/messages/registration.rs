//! Registration request announcing a region to the agent

use crate::{
    error::Result,
    flat::{
        checked_range, read_str, read_u64_at, serialize_variable_data, variable_data_size,
        write_u64_at, FlatMessage, VARIABLE_FIELD_SIZE,
    },
    layout::RegionId,
};

/// Type id of [`RegisterMemoryRegionRequest`] frames
pub const REGISTER_MEMORY_REGION_REQUEST_TYPE_ID: u32 = 0x0001_0001;

const NAME_OFFSET: usize = 0;
const REGION_SIZE_OFFSET: usize = NAME_OFFSET + VARIABLE_FIELD_SIZE;
const REGION_ID_OFFSET: usize = REGION_SIZE_OFFSET + 8;

/// Sent on the control channel whenever a process creates or opens a region.
///
/// Wire layout of the 32-byte head:
///
/// | offset | field           | encoding                   |
/// |--------|-----------------|----------------------------|
/// | 0      | name            | relative offset + length   |
/// | 16     | region_size     | u64                        |
/// | 24     | region_id       | u64                        |
///
/// The name bytes follow the head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterMemoryRegionRequest {
    pub name: String,
    pub region_size: u64,
    pub region_id: RegionId,
}

impl FlatMessage for RegisterMemoryRegionRequest {
    const TYPE_ID: u32 = REGISTER_MEMORY_REGION_REQUEST_TYPE_ID;
    const HEAD_SIZE: usize = REGION_ID_OFFSET + 8;

    fn variable_data_size(&self) -> usize {
        variable_data_size(self.name.as_str())
    }

    fn serialize(&self, buffer: &mut [u8], object_offset: usize, data_offset: usize) -> Result<usize> {
        checked_range(buffer.len(), object_offset, Self::HEAD_SIZE)?;
        checked_range(buffer.len(), data_offset, self.variable_data_size())?;

        write_u64_at(buffer, object_offset + REGION_SIZE_OFFSET, self.region_size)?;
        write_u64_at(buffer, object_offset + REGION_ID_OFFSET, self.region_id.0)?;
        serialize_variable_data(buffer, object_offset + NAME_OFFSET, data_offset, self.name.as_str())
    }

    fn deserialize(buffer: &[u8], object_offset: usize) -> Result<Self> {
        checked_range(buffer.len(), object_offset, Self::HEAD_SIZE)?;

        Ok(Self {
            name: read_str(buffer, object_offset + NAME_OFFSET)?.to_string(),
            region_size: read_u64_at(buffer, object_offset + REGION_SIZE_OFFSET)?,
            region_id: RegionId(read_u64_at(buffer, object_offset + REGION_ID_OFFSET)?),
        })
    }
}
