//! The jail: an open root directory that every lookup is confined to
//!
//! # Module Organization
//!
//! - `mod.rs` - `Jail` lifecycle, the confined opener and the read/write/list/stat helpers
//! - `mutate` - Operations without a native confined form (remove, symlink, mkdir, mkdir_all)
//! - `resolve` - Turning a confined lookup back into an absolute host path
//! - `types` - `DirEntry`, `FileKind` and `Metadata`

mod mutate;
mod resolve;
mod types;

pub use types::{DirEntry, FileKind, Metadata};

use crate::error::{JailError, Result};
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use securefs_at::DirectoryFd;
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::path::Path;
use tracing::{debug, trace};

/// A directory subtree that path resolution cannot leave
///
/// `Jail` owns an `O_PATH` descriptor for its root directory. Every
/// operation takes a path relative to that root and resolves it with
/// `openat2(2)` and `RESOLVE_IN_ROOT`: symlinks (intermediate and final) are
/// followed, but absolute targets and `..` are interpreted relative to the
/// root, so nothing ever resolves above it. A leading `/` in a path means
/// the jail root, not the host root.
///
/// Attempts to escape fail with [`ErrorKind::NotFound`](crate::ErrorKind::NotFound),
/// indistinguishable from a path that does not exist.
///
/// The root path passed to [`Jail::new`] is only kept for diagnostics. The
/// descriptor keeps denoting the same directory even if the root or one of
/// its ancestors is renamed later.
///
/// # Thread Safety
///
/// `Jail` is `Send + Sync`; all operations take `&self` and can run
/// concurrently. [`Jail::close`] consumes the jail, so it can only run once
/// every borrow (or every `Arc` clone) is gone:
///
/// ```compile_fail
/// # fn main() -> securefs::Result<()> {
/// let jail = securefs::Jail::new("/tmp")?;
/// jail.close()?;
/// jail.read("file")?; // the jail was moved into close()
/// # Ok(())
/// # }
/// ```
///
/// # Example
///
/// ```rust,no_run
/// use securefs::{Jail, Mode};
///
/// # fn example() -> securefs::Result<()> {
/// let jail = Jail::new("/srv/tenants/42")?;
/// jail.mkdir_all("uploads/2024", Mode::from_bits_truncate(0o755))?;
/// jail.write("uploads/2024/report.txt", b"hello", Mode::from_bits_truncate(0o644))?;
///
/// // The symlink is stored as-is, but resolves to /srv/tenants/42/etc/passwd
/// jail.symlink("/etc/passwd", "uploads/passwd")?;
/// assert!(jail.read("uploads/passwd").unwrap_err().is_not_found());
/// jail.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Jail {
    root: DirectoryFd,
}

impl Jail {
    /// Open `root` as a new jail
    ///
    /// The root is opened `O_DIRECTORY | O_PATH | O_CLOEXEC`.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - `root` does not exist ([`ErrorKind::NotFound`](crate::ErrorKind::NotFound))
    /// - `root` is not a directory ([`ErrorKind::NotADirectory`](crate::ErrorKind::NotADirectory))
    /// - Any other `open(2)` failure, with its errno
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let dir = DirectoryFd::open(root).map_err(|e| JailError::os("open root", root, e))?;

        debug!("Opened jail at {}", root.display());
        Ok(Self { root: dir })
    }

    /// The root path this jail was opened with (diagnostic only)
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Release the root descriptor
    ///
    /// Descriptors already handed out by this jail stay valid.
    ///
    /// # Errors
    ///
    /// Returns the errno from `close(2)`. The descriptor is released either way.
    pub fn close(self) -> Result<()> {
        let root = self.root().to_path_buf();
        self.root
            .close()
            .map_err(|e| JailError::os("close", &root, e))?;

        debug!("Closed jail at {}", root.display());
        Ok(())
    }

    fn open_fd(&self, op: &'static str, path: &Path, flags: OFlag, mode: Mode) -> Result<OwnedFd> {
        trace!("Confined {op} of {} ({flags:?})", path.display());
        self.root
            .open_in_root(path, flags, mode)
            .map_err(|e| JailError::os(op, path, e))
    }

    /// Open `path` with arbitrary `open(2)` flags
    ///
    /// `O_CLOEXEC` is always added. `mode` only matters when `flags` include
    /// `O_CREAT` or `O_TMPFILE`. Interrupted and racing lookups are retried
    /// internally; the returned file is owned by the caller.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::NotFound`](crate::ErrorKind::NotFound) if the
    /// path is missing or would resolve outside the jail; every other errno
    /// (`EACCES`, `ELOOP`, `ENOTDIR`, ...) is returned unchanged.
    pub fn open_file(&self, path: impl AsRef<Path>, flags: OFlag, mode: Mode) -> Result<File> {
        self.open_fd("open", path.as_ref(), flags, mode)
            .map(File::from)
    }

    /// Open `path` read-only
    ///
    /// # Errors
    ///
    /// See [`Jail::open_file`].
    pub fn open(&self, path: impl AsRef<Path>) -> Result<File> {
        self.open_file(path, OFlag::O_RDONLY, Mode::empty())
    }

    /// Open `path` read-write, creating it (mode `0o666` before umask) or truncating it
    ///
    /// # Errors
    ///
    /// See [`Jail::open_file`].
    pub fn create(&self, path: impl AsRef<Path>) -> Result<File> {
        self.open_file(
            path,
            OFlag::O_RDWR | OFlag::O_CREAT | OFlag::O_TRUNC,
            Mode::from_bits_truncate(0o666),
        )
    }

    /// Read the whole file at `path`
    ///
    /// # Errors
    ///
    /// Fails if the confined open fails (see [`Jail::open_file`]) or reading does.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let mut file = self.open(path)?;

        let mut content = Vec::new();
        file.read_to_end(&mut content).map_err(|e| JailError::io("read", path, e))?;
        Ok(content)
    }

    /// Read the whole file at `path` as UTF-8
    ///
    /// # Errors
    ///
    /// As [`Jail::read`]; invalid UTF-8 is reported as an `Io` error.
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let mut file = self.open(path)?;

        let mut content = String::new();
        file.read_to_string(&mut content).map_err(|e| JailError::io("read", path, e))?;
        Ok(content)
    }

    /// Write `data` to `path`, creating it with `mode` or truncating it
    ///
    /// # Errors
    ///
    /// Fails if the confined open fails (see [`Jail::open_file`]) or writing does.
    pub fn write(&self, path: impl AsRef<Path>, data: impl AsRef<[u8]>, mode: Mode) -> Result<()> {
        let path = path.as_ref();
        let mut file =
            self.open_file(path, OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC, mode)?;

        file.write_all(data.as_ref()).map_err(|e| JailError::io("write", path, e))
    }

    /// List the immediate entries of the directory at `path`, sorted by name
    ///
    /// `.` and `..` are not included.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::NotADirectory`](crate::ErrorKind::NotADirectory)
    /// if `path` is not a directory, or as [`Jail::open_file`].
    pub fn read_dir(&self, path: impl AsRef<Path>) -> Result<Vec<DirEntry>> {
        let path = path.as_ref();
        let fd = self.open_fd(
            "readdir",
            path,
            OFlag::O_DIRECTORY | OFlag::O_RDONLY,
            Mode::empty(),
        )?;

        let entries = securefs_at::read_entries(fd).map_err(|e| JailError::os("readdir", path, e))?;
        Ok(entries.into_iter().map(DirEntry::from).collect())
    }

    /// Query metadata for `path`, following symlinks inside the jail
    ///
    /// # Errors
    ///
    /// See [`Jail::open_file`].
    pub fn metadata(&self, path: impl AsRef<Path>) -> Result<Metadata> {
        let path = path.as_ref();
        let file = File::from(self.open_fd("stat", path, OFlag::O_PATH, Mode::empty())?);

        let metadata = file
            .metadata()
            .map_err(|e| JailError::io("stat", path, e))?;
        Ok(Metadata::from(&metadata))
    }

    /// Whether `path` resolves to something inside the jail
    ///
    /// # Errors
    ///
    /// Returns errors other than [`ErrorKind::NotFound`](crate::ErrorKind::NotFound),
    /// such as permission failures along the path.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool> {
        match self.metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl AsFd for Jail {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.root.as_fd()
    }
}
