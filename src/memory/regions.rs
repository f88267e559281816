//! Shared memory region implementation

use std::{
    fs::{self, File, OpenOptions, Permissions},
    io::ErrorKind,
    os::unix::fs::PermissionsExt,
    path::Path,
    thread,
    time::{Duration, Instant},
};

use log::{debug, warn};
use memmap2::{MmapMut, MmapOptions};
use nix::{
    errno::Errno,
    fcntl::OFlag,
    sys::{
        mman::{shm_open, shm_unlink},
        stat::Mode,
    },
};

use crate::{
    error::{Result, ShmLinkError},
    layout::{RegionHeader, RegionId},
};

use super::config::{validate_region_name, BackingType, RegionConfig};

/// How long an opener waits for a concurrent creator to size and initialize
/// a POSIX shared memory object
pub const SHM_INITIALIZATION_WAIT: Duration = Duration::from_secs(1);

const POLL_INTERVAL: Duration = Duration::from_micros(50);

/// Prefix of the staging files file-backed regions are built in
const STAGING_PREFIX: &str = ".shmlink-";

/// Poll `ready` until it returns `true` or `timeout` elapses
pub(crate) fn wait_until(timeout: Duration, mut ready: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if ready() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// A mapped named segment whose first bytes hold a [`RegionHeader`].
///
/// Dropping the region only unmaps it and closes the local descriptor. The
/// segment itself outlives every handle until [`SharedMemoryRegion::unlink`]
/// is called by whichever process owns its destruction.
#[derive(Debug)]
pub struct SharedMemoryRegion {
    config: RegionConfig,
    mmap: MmapMut,
    _file: File,
    created: bool,
}

impl SharedMemoryRegion {
    /// Create the named segment, or open it if it already exists.
    ///
    /// Creation is exclusive at the OS level, so among any number of
    /// concurrent callers exactly one observes `created() == true`. Every
    /// other caller gets a view of the segment after its header has been
    /// initialized.
    pub fn create_or_open(config: RegionConfig) -> Result<Self> {
        config.validate()?;

        let (file, mmap, created) = match config.backing_type {
            BackingType::FileBacked => Self::create_or_open_file(&config)?,
            BackingType::PosixShm => Self::create_or_open_shm(&config)?,
        };

        debug!(
            "{} region {} ({} bytes, {})",
            if created { "Created" } else { "Opened" },
            config.name,
            config.size,
            config.backing_type.name()
        );

        Ok(Self {
            config,
            mmap,
            _file: file,
            created,
        })
    }

    /// Publish a fully initialized file under the region name, or open the
    /// file another process already published.
    ///
    /// The segment is built in a staging file in the same directory and
    /// linked into place without replacing an existing entry, so the region
    /// name never refers to an unsized or uninitialized segment.
    fn create_or_open_file(config: &RegionConfig) -> Result<(File, MmapMut, bool)> {
        let path = config.file_path();
        if let Some(opened) = Self::open_file(config, &path)? {
            return Ok(opened);
        }

        let directory = path.parent().unwrap_or_else(|| Path::new("."));
        let staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".staging")
            .tempfile_in(directory)
            .map_err(|e| ShmLinkError::from_io(&config.name, e, "Failed to create region file"))?;
        staged
            .as_file()
            .set_permissions(Permissions::from_mode(config.permissions))
            .map_err(|e| ShmLinkError::from_io(&config.name, e, "Failed to set region permissions"))?;

        let mmap = Self::initialize(config, staged.as_file())?;

        match staged.persist_noclobber(&path) {
            Ok(file) => Ok((file, mmap, true)),
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                // Another creator won; dropping the staging file removes it
                drop(mmap);
                drop(err.file);
                Self::open_file(config, &path)?.ok_or_else(|| {
                    ShmLinkError::resource_unavailable(
                        &config.name,
                        "region was removed while it was being opened",
                    )
                })
            }
            Err(err) => Err(ShmLinkError::from_io(
                &config.name,
                err.error,
                "Failed to publish region file",
            )),
        }
    }

    /// Open a published region file; `None` when no file has the name
    fn open_file(config: &RegionConfig, path: &Path) -> Result<Option<(File, MmapMut, bool)>> {
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ShmLinkError::from_io(
                    &config.name,
                    e,
                    "Failed to open existing region file",
                ))
            }
        };

        let mmap = Self::map_existing(config, &file, Duration::ZERO)?;
        Ok(Some((file, mmap, false)))
    }

    /// Create or open a POSIX shared memory object.
    ///
    /// The object becomes visible as soon as `shm_open` succeeds, so an
    /// opener waits up to [`SHM_INITIALIZATION_WAIT`] for the creator to
    /// size and initialize it.
    fn create_or_open_shm(config: &RegionConfig) -> Result<(File, MmapMut, bool)> {
        let shm_name = config.shm_name();
        let mode = Mode::from_bits_truncate(config.permissions as nix::libc::mode_t);

        match shm_open(
            shm_name.as_str(),
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            mode,
        ) {
            Ok(fd) => {
                let file = File::from(fd);
                match Self::initialize(config, &file) {
                    Ok(mmap) => Ok((file, mmap, true)),
                    Err(err) => {
                        // Leaving a half-built object behind would fail every later open
                        if let Err(cleanup) = shm_unlink(shm_name.as_str()) {
                            warn!("Failed to remove partially created region {}: {}", config.name, cleanup);
                        }
                        Err(err)
                    }
                }
            }
            Err(Errno::EEXIST) => {
                let fd = shm_open(shm_name.as_str(), OFlag::O_RDWR, Mode::empty()).map_err(|e| {
                    ShmLinkError::from_io(&config.name, e.into(), "Failed to open shared memory object")
                })?;
                let file = File::from(fd);
                let mmap = Self::map_existing(config, &file, SHM_INITIALIZATION_WAIT)?;
                Ok((file, mmap, false))
            }
            Err(e) => Err(ShmLinkError::from_io(
                &config.name,
                e.into(),
                "Failed to create shared memory object",
            )),
        }
    }

    /// Size a freshly created segment, map it and initialize the header
    fn initialize(config: &RegionConfig, file: &File) -> Result<MmapMut> {
        file.set_len(config.size as u64)
            .map_err(|e| ShmLinkError::from_io(&config.name, e, "Failed to set region size"))?;

        let mut mmap = Self::map(config, file)?;
        let header = unsafe { &mut *(mmap.as_mut_ptr() as *mut RegionHeader) };
        header.initialize(config.size as u64);
        Ok(mmap)
    }

    /// Map an existing segment once its creator has sized and initialized it,
    /// waiting up to `wait` for that to happen
    fn map_existing(config: &RegionConfig, file: &File, wait: Duration) -> Result<MmapMut> {
        let expected = config.size as u64;

        wait_until(wait, || file.metadata().map(|m| m.len() != 0).unwrap_or(true));
        let actual = file
            .metadata()
            .map_err(|e| ShmLinkError::from_io(&config.name, e, "Failed to stat region"))?
            .len();
        if actual != expected {
            return Err(ShmLinkError::resource_unavailable(
                &config.name,
                format!("existing segment is {} bytes, requested {}", actual, expected),
            ));
        }

        let mmap = Self::map(config, file)?;
        let header = unsafe { &*(mmap.as_ptr() as *const RegionHeader) };
        if !wait_until(wait, || header.is_initialized()) {
            return Err(ShmLinkError::resource_unavailable(
                &config.name,
                "region header has not been initialized by its creator",
            ));
        }
        if header.region_size() != expected {
            return Err(ShmLinkError::resource_unavailable(
                &config.name,
                format!(
                    "region header records {} bytes, requested {}",
                    header.region_size(),
                    expected
                ),
            ));
        }

        Ok(mmap)
    }

    fn map(config: &RegionConfig, file: &File) -> Result<MmapMut> {
        unsafe {
            MmapOptions::new()
                .len(config.size)
                .map_mut(file)
                .map_err(|e| ShmLinkError::from_io(&config.name, e, "Failed to create memory mapping"))
        }
    }

    /// Remove the named segment from its namespace.
    ///
    /// Processes that still map it keep their mapping; later
    /// `create_or_open` calls create a fresh segment.
    pub fn unlink(config: &RegionConfig) -> Result<()> {
        validate_region_name(&config.name)?;

        match config.backing_type {
            BackingType::FileBacked => fs::remove_file(config.file_path())
                .map_err(|e| ShmLinkError::from_io(&config.name, e, "Failed to remove region file")),
            BackingType::PosixShm => shm_unlink(config.shm_name().as_str()).map_err(|e| {
                ShmLinkError::from_io(&config.name, e.into(), "Failed to unlink shared memory object")
            }),
        }
    }

    /// Whether this handle created the segment
    pub fn created(&self) -> bool {
        self.created
    }

    /// Configuration the region was opened with
    pub fn config(&self) -> &RegionConfig {
        &self.config
    }

    /// Get the name of the region
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get the size of the region
    pub fn size(&self) -> usize {
        self.config.size
    }

    /// The header at the start of the mapping
    pub fn header(&self) -> &RegionHeader {
        unsafe { &*(self.mmap.as_ptr() as *const RegionHeader) }
    }

    /// Get the raw memory slice (read-only)
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// Get the raw memory slice (mutable)
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    /// Get a typed pointer to the start of the region
    pub fn as_ptr<T>(&self) -> *const T {
        self.mmap.as_ptr() as *const T
    }

    /// Get a mutable typed pointer to the start of the region
    pub fn as_mut_ptr<T>(&mut self) -> *mut T {
        self.mmap.as_mut_ptr() as *mut T
    }

    /// Flush changes to the backing storage
    pub fn flush(&self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| ShmLinkError::from_io(&self.config.name, e, "Failed to flush memory mapping"))
    }

    /// Snapshot of the region's identity for diagnostics
    pub fn info(&self) -> RegionInfo {
        let header = self.header();
        RegionInfo {
            name: self.name().to_string(),
            size: self.size(),
            backing_type: self.config.backing_type,
            region_id: header.region_id(),
            creator_pid: header.creator_pid(),
            created: self.created,
        }
    }
}

/// Identity of a mapped region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionInfo {
    pub name: String,
    pub size: usize,
    pub backing_type: BackingType,
    pub region_id: RegionId,
    pub creator_pid: u32,
    pub created: bool,
}
