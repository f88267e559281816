//! Configuration types for shared memory regions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::layout::{RegionHeader, MAX_REGION_NAME_LEN};

/// Default directory for file-backed regions
pub const DEFAULT_REGION_DIRECTORY: &str = "/dev/shm";

/// Types of shared memory backing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackingType {
    /// A regular file under the configured directory
    FileBacked,
    /// A POSIX shared memory object (`shm_open`)
    PosixShm,
}

impl Default for BackingType {
    fn default() -> Self {
        Self::FileBacked
    }
}

impl BackingType {
    /// Get a human-readable name for the backing type
    pub fn name(&self) -> &'static str {
        match self {
            BackingType::FileBacked => "file-backed",
            BackingType::PosixShm => "posix-shm",
        }
    }

    /// Parse the names produced by [`BackingType::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "file-backed" | "file" => Some(BackingType::FileBacked),
            "posix-shm" | "shm" => Some(BackingType::PosixShm),
            _ => None,
        }
    }
}

/// Configuration for creating or opening a shared memory region
#[derive(Debug, Clone)]
pub struct RegionConfig {
    /// Name of the region, unique within the backing namespace
    pub name: String,
    /// Total size of the region in bytes, header included
    pub size: usize,
    /// Backing type for the shared memory
    pub backing_type: BackingType,
    /// Directory for file-backed regions
    pub directory: Option<PathBuf>,
    /// Permissions used when creating the segment (Unix permissions)
    pub permissions: u32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: 0,
            backing_type: BackingType::default(),
            directory: None,
            permissions: 0o600,
        }
    }
}

impl RegionConfig {
    /// Create a new region configuration
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
            ..Default::default()
        }
    }

    /// Set the backing type
    pub fn with_backing_type(mut self, backing_type: BackingType) -> Self {
        self.backing_type = backing_type;
        self
    }

    /// Set the directory for file-backed regions
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Set the permissions for the region
    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        use crate::error::ShmLinkError;

        validate_region_name(&self.name)?;

        if self.size == 0 {
            return Err(ShmLinkError::invalid_argument(
                "size",
                "Region size must be greater than 0",
            ));
        }

        if self.size < RegionHeader::SIZE {
            return Err(ShmLinkError::invalid_argument(
                "size",
                format!(
                    "Region size {} is smaller than the {}-byte region header",
                    self.size,
                    RegionHeader::SIZE
                ),
            ));
        }

        Ok(())
    }

    /// Path of the backing file for file-backed regions
    pub fn file_path(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REGION_DIRECTORY))
            .join(&self.name)
    }

    /// Name of the POSIX shared memory object
    pub fn shm_name(&self) -> String {
        format!("/{}", self.name)
    }
}

/// Check that a region name is usable in both backing namespaces
pub fn validate_region_name(name: &str) -> crate::Result<()> {
    use crate::error::ShmLinkError;

    if name.is_empty() {
        return Err(ShmLinkError::invalid_argument(
            "name",
            "Region name cannot be empty",
        ));
    }

    if name.len() > MAX_REGION_NAME_LEN {
        return Err(ShmLinkError::invalid_argument(
            "name",
            format!("Region name exceeds {} bytes", MAX_REGION_NAME_LEN),
        ));
    }

    if name.contains('/') || name.contains('\0') || name == "." || name == ".." {
        return Err(ShmLinkError::invalid_argument(
            "name",
            format!("Region name {:?} is not a valid segment name", name),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backing_type_names() {
        assert_eq!(BackingType::default(), BackingType::FileBacked);
        assert_eq!(BackingType::from_name("posix-shm"), Some(BackingType::PosixShm));
        assert_eq!(BackingType::from_name("file"), Some(BackingType::FileBacked));
        assert_eq!(BackingType::from_name("memfd"), None);
    }

    #[test]
    fn test_paths() {
        let config = RegionConfig::new("cfg-region", 4096).with_directory("/tmp/shmlink");
        assert_eq!(config.file_path(), PathBuf::from("/tmp/shmlink/cfg-region"));
        assert_eq!(config.shm_name(), "/cfg-region");

        let config = RegionConfig::new("cfg-region", 4096);
        assert_eq!(config.file_path(), PathBuf::from("/dev/shm/cfg-region"));
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_region_name("telemetry.v1").is_ok());
        assert!(validate_region_name("").is_err());
        assert!(validate_region_name("a/b").is_err());
        assert!(validate_region_name("..").is_err());
        assert!(validate_region_name("nul\0byte").is_err());
        assert!(validate_region_name(&"x".repeat(256)).is_err());
    }
}
