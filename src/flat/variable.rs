//! Variable-length field encoding
//!
//! A variable-length field occupies [`VARIABLE_FIELD_SIZE`] bytes in the
//! fixed head of a message: an `i64` distance from the field itself to its
//! data, then the `u64` byte length of the data. The data lives in the tail.
//! Because the distance is relative to the field, the encoding survives the
//! buffer being mapped or copied to any other address.

use crate::error::Result;

use super::buffer::checked_range;

/// Head bytes taken by one variable-length field (offset + length)
pub const VARIABLE_FIELD_SIZE: usize = 16;

/// String-like values whose characters are copied verbatim into the tail
pub trait FlatString {
    /// Bytes per character
    const CHAR_WIDTH: usize;

    fn char_count(&self) -> usize;

    fn byte_len(&self) -> usize {
        self.char_count() * Self::CHAR_WIDTH
    }

    /// Write the raw characters; `dest.len()` equals `byte_len()`
    fn write_bytes(&self, dest: &mut [u8]);
}

impl FlatString for str {
    const CHAR_WIDTH: usize = 1;

    fn char_count(&self) -> usize {
        self.len()
    }

    fn write_bytes(&self, dest: &mut [u8]) {
        dest.copy_from_slice(self.as_bytes());
    }
}

impl FlatString for String {
    const CHAR_WIDTH: usize = 1;

    fn char_count(&self) -> usize {
        self.len()
    }

    fn write_bytes(&self, dest: &mut [u8]) {
        dest.copy_from_slice(self.as_bytes());
    }
}

impl<S: FlatString + ?Sized> FlatString for &S {
    const CHAR_WIDTH: usize = S::CHAR_WIDTH;

    fn char_count(&self) -> usize {
        (**self).char_count()
    }

    fn write_bytes(&self, dest: &mut [u8]) {
        (**self).write_bytes(dest)
    }
}

/// A borrowed UTF-16 string, encoded two bytes per code unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WideStr<'a>(pub &'a [u16]);

impl<'a> WideStr<'a> {
    pub fn new(units: &'a [u16]) -> Self {
        Self(units)
    }

    pub fn units(&self) -> &'a [u16] {
        self.0
    }
}

impl FlatString for WideStr<'_> {
    const CHAR_WIDTH: usize = 2;

    fn char_count(&self) -> usize {
        self.0.len()
    }

    fn write_bytes(&self, dest: &mut [u8]) {
        for (chunk, unit) in dest.chunks_exact_mut(2).zip(self.0) {
            chunk.copy_from_slice(&unit.to_le_bytes());
        }
    }
}

/// Values that can be encoded as one or more variable-length fields
pub trait VariableData {
    /// Tail bytes needed by the value
    fn variable_data_size(&self) -> usize;

    /// Head bytes occupied by the value's field(s)
    fn head_size(&self) -> usize;

    /// Write the field head(s) at `object_offset` and the data at
    /// `data_offset`; returns the tail bytes written
    fn serialize_variable_data(
        &self,
        buffer: &mut [u8],
        object_offset: usize,
        data_offset: usize,
    ) -> Result<usize>;
}

fn serialize_string<S: FlatString + ?Sized>(
    buffer: &mut [u8],
    object_offset: usize,
    data_offset: usize,
    value: &S,
) -> Result<usize> {
    let length = value.byte_len();
    let head = checked_range(buffer.len(), object_offset, VARIABLE_FIELD_SIZE)?;
    let data = checked_range(buffer.len(), data_offset, length)?;

    value.write_bytes(&mut buffer[data]);

    let relative = (data_offset as i64).wrapping_sub(object_offset as i64);
    let head = &mut buffer[head];
    head[..8].copy_from_slice(&relative.to_le_bytes());
    head[8..].copy_from_slice(&(length as u64).to_le_bytes());

    Ok(length)
}

macro_rules! impl_variable_data_for_string {
    ($($ty:ty),*) => {
        $(
            impl VariableData for $ty {
                fn variable_data_size(&self) -> usize {
                    self.byte_len()
                }

                fn head_size(&self) -> usize {
                    VARIABLE_FIELD_SIZE
                }

                fn serialize_variable_data(
                    &self,
                    buffer: &mut [u8],
                    object_offset: usize,
                    data_offset: usize,
                ) -> Result<usize> {
                    serialize_string(buffer, object_offset, data_offset, self)
                }
            }
        )*
    };
}

impl_variable_data_for_string!(str, String, WideStr<'_>);

impl<S: FlatString, const N: usize> VariableData for [S; N] {
    fn variable_data_size(&self) -> usize {
        self.iter().map(FlatString::byte_len).sum()
    }

    fn head_size(&self) -> usize {
        N * VARIABLE_FIELD_SIZE
    }

    fn serialize_variable_data(
        &self,
        buffer: &mut [u8],
        object_offset: usize,
        data_offset: usize,
    ) -> Result<usize> {
        let total = self.variable_data_size();
        checked_range(buffer.len(), object_offset, self.head_size())?;
        checked_range(buffer.len(), data_offset, total)?;

        let mut object_offset = object_offset;
        let mut data_offset = data_offset;
        for element in self {
            let written = serialize_string(buffer, object_offset, data_offset, element)?;
            object_offset += VARIABLE_FIELD_SIZE;
            data_offset += written;
        }

        Ok(total)
    }
}

/// Tail bytes required to encode `value`
pub fn variable_data_size<V: VariableData + ?Sized>(value: &V) -> usize {
    value.variable_data_size()
}

/// Encode `value` with its field head at `object_offset` and data at
/// `data_offset`.
///
/// All ranges are checked before anything is written, so a failing call
/// leaves `buffer` untouched.
pub fn serialize_variable_data<V: VariableData + ?Sized>(
    buffer: &mut [u8],
    object_offset: usize,
    data_offset: usize,
    value: &V,
) -> Result<usize> {
    value.serialize_variable_data(buffer, object_offset, data_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_data_size() {
        assert_eq!(variable_data_size("hello"), 5);
        assert_eq!(variable_data_size(&String::new()), 0);
        assert_eq!(variable_data_size(&WideStr(&[0x68, 0x69, 0x21])), 6);
        assert_eq!(variable_data_size(&["ab", "", "cde"]), 5);
    }

    #[test]
    fn test_field_head_layout() {
        let mut buffer = [0u8; 40];
        let written = serialize_variable_data(&mut buffer, 8, 32, "abc").unwrap();
        assert_eq!(written, 3);
        assert_eq!(i64::from_le_bytes(buffer[8..16].try_into().unwrap()), 24);
        assert_eq!(u64::from_le_bytes(buffer[16..24].try_into().unwrap()), 3);
        assert_eq!(&buffer[32..35], b"abc");
    }

    #[test]
    fn test_wide_string_is_little_endian() {
        let mut buffer = [0u8; 20];
        serialize_variable_data(&mut buffer, 0, 16, &WideStr(&[0x0102, 0x0304])).unwrap();
        assert_eq!(&buffer[16..20], &[0x02, 0x01, 0x04, 0x03]);
    }
}
