//! Constants shared by every mapped region

/// Magic number published by the creator once a region header is initialized
pub const REGION_MAGIC: u64 = 0x53484D4C494E4B31; // "SHMLINK1"

/// Maximum region name length in bytes
pub const MAX_REGION_NAME_LEN: usize = 255;

/// Largest payload alignment a mapping can honour (mappings are page aligned)
pub const MAX_PAYLOAD_ALIGNMENT: usize = 4096;

/// Reserved name of the global memory region
pub const DEFAULT_GLOBAL_REGION_NAME: &str = "shmlink.global";

/// Default size of the global memory region
pub const DEFAULT_GLOBAL_REGION_SIZE: usize = 4096;

/// Default name of the shared configuration region
pub const DEFAULT_CONFIG_REGION_NAME: &str = "shmlink.config";

/// Default size of the shared configuration region (64KB)
pub const DEFAULT_CONFIG_REGION_SIZE: usize = 64 * 1024;
