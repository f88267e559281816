//! Bounds-checked offset accessors over byte buffers
//!
//! Positions inside an encoded message are plain offsets. Every access goes
//! through [`checked_range`] so a bad offset surfaces as `OutOfBounds` rather
//! than a panic or a write past the buffer.

use std::ops::Range;

use crate::error::{Result, ShmLinkError};

/// Validate `offset..offset + length` against a buffer of `capacity` bytes
pub fn checked_range(capacity: usize, offset: usize, length: usize) -> Result<Range<usize>> {
    match offset.checked_add(length) {
        Some(end) if end <= capacity => Ok(offset..end),
        _ => Err(ShmLinkError::out_of_bounds(offset, length, capacity)),
    }
}

fn read_array<const N: usize>(buffer: &[u8], offset: usize) -> Result<[u8; N]> {
    let range = checked_range(buffer.len(), offset, N)?;
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&buffer[range]);
    Ok(bytes)
}

fn write_array<const N: usize>(buffer: &mut [u8], offset: usize, bytes: [u8; N]) -> Result<()> {
    let range = checked_range(buffer.len(), offset, N)?;
    buffer[range].copy_from_slice(&bytes);
    Ok(())
}

pub fn read_u32_at(buffer: &[u8], offset: usize) -> Result<u32> {
    read_array(buffer, offset).map(u32::from_le_bytes)
}

pub fn write_u32_at(buffer: &mut [u8], offset: usize, value: u32) -> Result<()> {
    write_array(buffer, offset, value.to_le_bytes())
}

pub fn read_u64_at(buffer: &[u8], offset: usize) -> Result<u64> {
    read_array(buffer, offset).map(u64::from_le_bytes)
}

pub fn write_u64_at(buffer: &mut [u8], offset: usize, value: u64) -> Result<()> {
    write_array(buffer, offset, value.to_le_bytes())
}

pub fn read_i64_at(buffer: &[u8], offset: usize) -> Result<i64> {
    read_array(buffer, offset).map(i64::from_le_bytes)
}

pub fn write_i64_at(buffer: &mut [u8], offset: usize, value: i64) -> Result<()> {
    write_array(buffer, offset, value.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_range() {
        assert_eq!(checked_range(16, 8, 8).unwrap(), 8..16);
        assert_eq!(checked_range(16, 16, 0).unwrap(), 16..16);
        assert!(checked_range(16, 9, 8).is_err());
        assert!(checked_range(16, usize::MAX, 2).is_err());
    }

    #[test]
    fn test_scalar_accessors() {
        let mut buffer = [0u8; 20];
        write_u64_at(&mut buffer, 4, 0xDEAD_BEEF_0102_0304).unwrap();
        write_u32_at(&mut buffer, 12, 42).unwrap();
        assert!(write_i64_at(&mut buffer, 13, -3).is_err());

        assert_eq!(read_u64_at(&buffer, 4).unwrap(), 0xDEAD_BEEF_0102_0304);
        assert_eq!(read_u32_at(&buffer, 12).unwrap(), 42);
        assert_eq!(buffer[4], 0x04);

        assert!(matches!(
            read_u64_at(&buffer, 13),
            Err(ShmLinkError::OutOfBounds { offset: 13, length: 8, capacity: 20 })
        ));
    }
}
