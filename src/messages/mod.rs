//! Encoded messages exchanged with the agent

pub mod frame;
pub mod registration;

pub use frame::{EncodedMessage, FrameHeader};
pub use registration::{RegisterMemoryRegionRequest, REGISTER_MEMORY_REGION_REQUEST_TYPE_ID};
