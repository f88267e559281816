//! Configuration of a process's shared memory context

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    config_store::ConfigStorageHeader,
    error::{Result, ShmLinkError},
    layout::{
        GlobalMemoryRegion, MemoryRegion, DEFAULT_CONFIG_REGION_NAME, DEFAULT_CONFIG_REGION_SIZE,
        DEFAULT_GLOBAL_REGION_NAME, DEFAULT_GLOBAL_REGION_SIZE,
    },
    memory::{validate_region_name, BackingType, RegionConfig},
};

/// Environment variable overriding the region directory
pub const ENV_DIRECTORY: &str = "SHMLINK_DIR";
/// Environment variable overriding the global region name
pub const ENV_GLOBAL_REGION: &str = "SHMLINK_GLOBAL_REGION";
/// Environment variable overriding the configuration region name
pub const ENV_CONFIG_REGION: &str = "SHMLINK_CONFIG_REGION";
/// Environment variable selecting the backing type (`file-backed` or `posix-shm`)
pub const ENV_BACKING: &str = "SHMLINK_BACKING";

/// Settings every participating process must agree on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Reserved name of the global memory region
    pub global_region_name: String,
    /// Size of the global memory region
    pub global_region_size: usize,
    /// Name of the shared configuration region
    pub config_region_name: String,
    /// Size of the shared configuration region
    pub config_region_size: usize,
    /// Backing used for every region of the context
    pub backing_type: BackingType,
    /// Directory for file-backed regions
    pub directory: Option<PathBuf>,
    /// Permissions for newly created segments
    pub permissions: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            global_region_name: DEFAULT_GLOBAL_REGION_NAME.to_string(),
            global_region_size: DEFAULT_GLOBAL_REGION_SIZE,
            config_region_name: DEFAULT_CONFIG_REGION_NAME.to_string(),
            config_region_size: DEFAULT_CONFIG_REGION_SIZE,
            backing_type: BackingType::default(),
            directory: None,
            permissions: 0o600,
        }
    }
}

impl ContextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `SHMLINK_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(directory) = std::env::var(ENV_DIRECTORY) {
            config.directory = Some(PathBuf::from(directory));
        }
        if let Ok(name) = std::env::var(ENV_GLOBAL_REGION) {
            config.global_region_name = name;
        }
        if let Ok(name) = std::env::var(ENV_CONFIG_REGION) {
            config.config_region_name = name;
        }
        if let Ok(backing) = std::env::var(ENV_BACKING) {
            config.backing_type = BackingType::from_name(&backing).ok_or_else(|| {
                ShmLinkError::invalid_argument(ENV_BACKING, format!("Unknown backing type {:?}", backing))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_backing_type(mut self, backing_type: BackingType) -> Self {
        self.backing_type = backing_type;
        self
    }

    pub fn with_global_region(mut self, name: impl Into<String>, size: usize) -> Self {
        self.global_region_name = name.into();
        self.global_region_size = size;
        self
    }

    pub fn with_config_region(mut self, name: impl Into<String>, size: usize) -> Self {
        self.config_region_name = name.into();
        self.config_region_size = size;
        self
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_region_name(&self.global_region_name)?;
        validate_region_name(&self.config_region_name)?;

        if self.global_region_name == self.config_region_name {
            return Err(ShmLinkError::invalid_argument(
                "config_region_name",
                "Configuration region cannot share the global region's name",
            ));
        }

        if self.global_region_size < MemoryRegion::<GlobalMemoryRegion>::SIZE {
            return Err(ShmLinkError::invalid_argument(
                "global_region_size",
                format!(
                    "Global region needs at least {} bytes",
                    MemoryRegion::<GlobalMemoryRegion>::SIZE
                ),
            ));
        }

        if self.config_region_size <= MemoryRegion::<ConfigStorageHeader>::SIZE {
            return Err(ShmLinkError::invalid_argument(
                "config_region_size",
                format!(
                    "Configuration region needs more than {} bytes",
                    MemoryRegion::<ConfigStorageHeader>::SIZE
                ),
            ));
        }

        Ok(())
    }

    /// Region configuration for `name` using this context's backing
    pub fn region_config(&self, name: &str, size: usize) -> RegionConfig {
        let config = RegionConfig::new(name, size)
            .with_backing_type(self.backing_type)
            .with_permissions(self.permissions);

        match &self.directory {
            Some(directory) => config.with_directory(directory),
            None => config,
        }
    }

    pub fn global_region_config(&self) -> RegionConfig {
        self.region_config(&self.global_region_name, self.global_region_size)
    }

    pub fn config_region_config(&self) -> RegionConfig {
        self.region_config(&self.config_region_name, self.config_region_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ContextConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.global_region_name, DEFAULT_GLOBAL_REGION_NAME);
        assert_eq!(config.backing_type, BackingType::FileBacked);
    }

    #[test]
    fn test_validation() {
        let config = ContextConfig::new().with_config_region(DEFAULT_GLOBAL_REGION_NAME, 4096);
        assert!(config.validate().is_err());

        let config = ContextConfig::new().with_global_region("global", 8);
        assert!(config.validate().is_err());

        let config = ContextConfig::new().with_config_region("cfg", 64);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_region_config_inherits_backing() {
        let config = ContextConfig::new()
            .with_directory("/tmp/shmlink-test")
            .with_permissions(0o640);
        let region = config.region_config("cfg-region", 4096);
        assert_eq!(region.name, "cfg-region");
        assert_eq!(region.size, 4096);
        assert_eq!(region.permissions, 0o640);
        assert_eq!(region.file_path(), PathBuf::from("/tmp/shmlink-test/cfg-region"));
    }
}
