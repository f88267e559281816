//! Framing for encoded messages handed to channels

use crate::{
    error::{Result, ShmLinkError},
    flat::{checked_range, read_u32_at, write_u32_at, FlatMessage},
};

/// Header prepended to every encoded message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Message type identifier ([`FlatMessage::TYPE_ID`])
    pub type_id: u32,
    /// Payload length in bytes
    pub payload_length: u32,
    /// CRC32 checksum of the payload
    pub checksum: u32,
}

impl FrameHeader {
    /// Encoded size: type id, length, checksum and a reserved word
    pub const SIZE: usize = 16;

    /// Build the header describing `payload`
    pub fn new(type_id: u32, payload: &[u8]) -> Result<Self> {
        let payload_length = u32::try_from(payload.len()).map_err(|_| {
            ShmLinkError::invalid_argument(
                "payload",
                format!("Payload of {} bytes does not fit a frame", payload.len()),
            )
        })?;

        Ok(Self {
            type_id,
            payload_length,
            checksum: crc32fast::hash(payload),
        })
    }

    pub fn write_to(&self, buffer: &mut [u8]) -> Result<()> {
        checked_range(buffer.len(), 0, Self::SIZE)?;
        write_u32_at(buffer, 0, self.type_id)?;
        write_u32_at(buffer, 4, self.payload_length)?;
        write_u32_at(buffer, 8, self.checksum)?;
        write_u32_at(buffer, 12, 0)
    }

    pub fn read_from(buffer: &[u8]) -> Result<Self> {
        Ok(Self {
            type_id: read_u32_at(buffer, 0)?,
            payload_length: read_u32_at(buffer, 4)?,
            checksum: read_u32_at(buffer, 8)?,
        })
    }

    /// Verify the checksum matches the payload
    pub fn verify_checksum(&self, payload: &[u8]) -> bool {
        self.checksum == crc32fast::hash(payload)
    }
}

/// A fully serialized message: frame header followed by the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMessage {
    header: FrameHeader,
    bytes: Vec<u8>,
}

impl EncodedMessage {
    /// Serialize a flat message into a new frame
    pub fn encode<M: FlatMessage>(message: &M) -> Result<Self> {
        let mut bytes = vec![0u8; FrameHeader::SIZE + message.encoded_len()];
        message.encode_into(&mut bytes[FrameHeader::SIZE..])?;

        let header = FrameHeader::new(M::TYPE_ID, &bytes[FrameHeader::SIZE..])?;
        header.write_to(&mut bytes)?;

        Ok(Self { header, bytes })
    }

    /// Frame an already serialized payload
    pub fn from_payload(type_id: u32, payload: &[u8]) -> Result<Self> {
        let header = FrameHeader::new(type_id, payload)?;
        let mut bytes = vec![0u8; FrameHeader::SIZE + payload.len()];
        header.write_to(&mut bytes)?;
        bytes[FrameHeader::SIZE..].copy_from_slice(payload);

        Ok(Self { header, bytes })
    }

    /// Parse a received frame, validating its length and checksum
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let header = FrameHeader::read_from(&bytes)?;
        let expected = FrameHeader::SIZE + header.payload_length as usize;
        if bytes.len() != expected {
            return Err(ShmLinkError::serialization(format!(
                "Frame is {} bytes, header announces {}",
                bytes.len(),
                expected
            )));
        }

        if !header.verify_checksum(&bytes[FrameHeader::SIZE..]) {
            return Err(ShmLinkError::serialization("Frame checksum validation failed"));
        }

        Ok(Self { header, bytes })
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn type_id(&self) -> u32 {
        self.header.type_id
    }

    /// The encoded message without its frame header
    pub fn payload(&self) -> &[u8] {
        &self.bytes[FrameHeader::SIZE..]
    }

    /// The complete frame
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode the payload as `M`, checking the type id first
    pub fn decode<M: FlatMessage>(&self) -> Result<M> {
        if self.header.type_id != M::TYPE_ID {
            return Err(ShmLinkError::serialization(format!(
                "Frame carries type {:#x}, expected {:#x}",
                self.header.type_id,
                M::TYPE_ID
            )));
        }
        M::deserialize(self.payload(), 0)
    }
}
