//! # shmlink - Shared Memory Region Registry and Flat Message Encoding
//!
//! shmlink lets component processes share named memory regions with a
//! long-running agent and talk to it through flat, relocatable messages.
//!
//! ## Features
//!
//! - **Named shared memory regions**: File-backed and POSIX shm support, with
//!   exclusive create-or-open semantics
//! - **Global region registry**: A well-known region holding the process-wide
//!   region id counter
//! - **Flat encoding**: Variable-length fields stored as relative offsets, so
//!   an encoded message is valid at any address
//! - **Registration protocol**: Every region a component creates or opens is
//!   announced to the agent on the control channel
//! - **Shared configuration**: Component configs published once and refreshed
//!   by later instances
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   Context                       │
//! ├─────────────────────────────────────────────────┤
//! │  Global Region        │  Named Regions          │
//! │  - Region id counter  │  - Header (magic, id)   │
//! │                       │  - Typed payload        │
//! └─────────────────────────────────────────────────┘
//!           │                         │
//!           ▼                         ▼
//! ┌─────────────────┐    ┌─────────────────────────┐
//! │ Control channel │    │  Shared config store    │
//! │ (flat messages) │    │  (config region)        │
//! └─────────────────┘    └─────────────────────────┘
//! ```

// Core modules
pub mod error;
pub mod layout;
pub mod memory;

// Encoding and protocol
pub mod flat;
pub mod messages;

// Coordination
pub mod channels;
pub mod config_store;
pub mod context;

// Main API re-exports
pub use channels::{ChannelKind, ChannelSender, ChannelSet, MessageChannel, QueueChannel, QueueChannels};
pub use config_store::{ComponentConfig, SharedConfigRegion, SharedConfigStore};
pub use context::{Context, ContextConfig};
pub use error::{Result, ShmLinkError};
pub use flat::{serialize_variable_data, variable_data_size, FlatMessage, FlatString, VariableData, WideStr};
pub use layout::{GlobalMemoryRegion, MemoryRegion, RegionHeader, RegionId, RegionPayload};
pub use memory::{BackingType, RegionConfig, RegionInfo, RegionView, SharedMemoryRegion};
pub use messages::{EncodedMessage, RegisterMemoryRegionRequest};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 3;
pub const VERSION_PATCH: u32 = 0;
