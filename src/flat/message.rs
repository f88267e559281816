//! Messages made of a fixed head and a variable tail

use crate::error::Result;

use super::buffer::checked_range;

/// A message type with a fixed-size head followed by its variable-length data.
///
/// Implementations place scalar fields and variable field heads in the first
/// `HEAD_SIZE` bytes and the variable data, in declaration order, right after.
pub trait FlatMessage: Sized {
    /// Identifier written into the frame header so receivers can dispatch
    const TYPE_ID: u32;

    /// Size of the fixed head
    const HEAD_SIZE: usize;

    /// Bytes needed by all variable-length fields
    fn variable_data_size(&self) -> usize;

    /// Write the head at `object_offset` and the tail at `data_offset`;
    /// returns the tail bytes written
    fn serialize(&self, buffer: &mut [u8], object_offset: usize, data_offset: usize) -> Result<usize>;

    /// Read a message whose head starts at `object_offset`
    fn deserialize(buffer: &[u8], object_offset: usize) -> Result<Self>;

    /// Head plus tail
    fn encoded_len(&self) -> usize {
        Self::HEAD_SIZE + self.variable_data_size()
    }

    /// Encode at the start of `buffer` with the tail right after the head.
    ///
    /// The buffer may be a slice of a mapped region; nothing is allocated.
    fn encode_into(&self, buffer: &mut [u8]) -> Result<usize> {
        let length = self.encoded_len();
        checked_range(buffer.len(), 0, length)?;
        self.serialize(buffer, 0, Self::HEAD_SIZE)?;
        Ok(length)
    }
}
