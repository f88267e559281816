//! Readers for variable-length fields

use crate::error::{Result, ShmLinkError};

use super::buffer::{checked_range, read_i64_at, read_u64_at};
use super::variable::VARIABLE_FIELD_SIZE;

/// Resolve the field at `object_offset` to the bytes it refers to
pub fn read_variable_data(buffer: &[u8], object_offset: usize) -> Result<&[u8]> {
    checked_range(buffer.len(), object_offset, VARIABLE_FIELD_SIZE)?;
    let relative = read_i64_at(buffer, object_offset)?;
    let length = read_u64_at(buffer, object_offset + 8)?;

    let length = usize::try_from(length)
        .map_err(|_| ShmLinkError::out_of_bounds(object_offset, usize::MAX, buffer.len()))?;

    let start = (object_offset as i64)
        .checked_add(relative)
        .and_then(|start| usize::try_from(start).ok())
        .ok_or_else(|| ShmLinkError::out_of_bounds(object_offset, length, buffer.len()))?;

    let range = checked_range(buffer.len(), start, length)?;
    Ok(&buffer[range])
}

/// Read a UTF-8 string field
pub fn read_str(buffer: &[u8], object_offset: usize) -> Result<&str> {
    let bytes = read_variable_data(buffer, object_offset)?;
    std::str::from_utf8(bytes).map_err(|e| {
        ShmLinkError::serialization(format!("Field at {} is not UTF-8: {}", object_offset, e))
    })
}

/// Read a UTF-16 string field
pub fn read_wide_string(buffer: &[u8], object_offset: usize) -> Result<String> {
    let bytes = read_variable_data(buffer, object_offset)?;
    if bytes.len() % 2 != 0 {
        return Err(ShmLinkError::serialization(format!(
            "Wide string field at {} has odd length {}",
            object_offset,
            bytes.len()
        )));
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units).map_err(|e| {
        ShmLinkError::serialization(format!("Field at {} is not UTF-16: {}", object_offset, e))
    })
}

/// Read `N` consecutive UTF-8 string fields starting at `object_offset`
pub fn read_str_array<const N: usize>(buffer: &[u8], object_offset: usize) -> Result<[&str; N]> {
    let mut values = [""; N];
    for (index, value) in values.iter_mut().enumerate() {
        *value = read_str(buffer, object_offset + index * VARIABLE_FIELD_SIZE)?;
    }
    Ok(values)
}
