//! Directory file descriptor for confined directory-based operations

use crate::openat2::openat2_in_root;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::unistd::UnlinkatFlags;
use nix::NixPath;
use std::ffi::OsStr;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};

/// An owned `O_PATH` directory file descriptor
///
/// `DirectoryFd` is the anchor for every confined operation. Lookups go
/// through [`DirectoryFd::open_in_root`], which never leaves the subtree
/// below the descriptor. The leaf-level helpers (`create_directory`,
/// `unlink`, `remove_dir`, `symlinkat`) take a single path component and
/// operate directly on this directory, so they are only as confined as the
/// way the `DirectoryFd` itself was obtained.
///
/// The recorded path is what the caller passed in. It is kept for error
/// messages and debugging and is never used to resolve anything: the
/// descriptor keeps pointing at the same directory even if it or one of its
/// ancestors is renamed afterwards.
///
/// # Example
///
/// ```rust,no_run
/// use securefs_at::DirectoryFd;
/// use std::path::Path;
///
/// # fn example() -> nix::Result<()> {
/// let root = DirectoryFd::open(Path::new("/srv/tenant"))?;
/// let uploads = root.open_dir_in_root(Path::new("uploads"))?;
/// uploads.create_directory("incoming".as_ref(), nix::sys::stat::Mode::from_bits_truncate(0o755))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DirectoryFd {
    /// The underlying `O_DIRECTORY | O_PATH` descriptor
    fd: OwnedFd,
    /// The path this directory was opened from (for debugging/error messages)
    path: PathBuf,
}

impl DirectoryFd {
    /// Open a directory by host path and return a `DirectoryFd`
    ///
    /// The descriptor is opened `O_DIRECTORY | O_PATH | O_CLOEXEC`, so it
    /// only grants lookup rights and is not inherited across `exec`.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The path doesn't exist (`ENOENT`)
    /// - The path is not a directory (`ENOTDIR`)
    /// - Search permission is denied on a path component (`EACCES`)
    pub fn open(path: &Path) -> nix::Result<Self> {
        let fd = nix::fcntl::open(
            path,
            OFlag::O_DIRECTORY | OFlag::O_PATH | OFlag::O_CLOEXEC,
            Mode::empty(),
        )?;

        // SAFETY: open(2) just returned this descriptor and nothing else owns it.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(Self {
            fd,
            path: path.to_path_buf(),
        })
    }

    /// Get the path this directory was opened from
    ///
    /// This is primarily used for error messages and debugging.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open `path` confined to this directory
    ///
    /// See [`openat2_in_root`] for the resolution rules.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by `openat2(2)`; transient `EINTR`/`EAGAIN`
    /// are retried internally.
    pub fn open_in_root<P: ?Sized + NixPath>(
        &self,
        path: &P,
        flags: OFlag,
        mode: Mode,
    ) -> nix::Result<OwnedFd> {
        openat2_in_root(self.fd.as_fd(), path, flags, mode)
    }

    /// Open a subdirectory confined to this directory as a new `DirectoryFd`
    ///
    /// # Errors
    ///
    /// Fails with `ENOTDIR` if `path` resolves to something other than a
    /// directory, and otherwise as [`DirectoryFd::open_in_root`].
    pub fn open_dir_in_root(&self, path: &Path) -> nix::Result<Self> {
        let fd = self.open_in_root(path, OFlag::O_DIRECTORY | OFlag::O_PATH, Mode::empty())?;
        Ok(Self {
            fd,
            path: self.path.join(path),
        })
    }

    /// Create a directory named `name` inside this directory
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The entry already exists (`EEXIST`)
    /// - Permission is denied (`EACCES`)
    /// - `name` is empty (`ENOENT`)
    pub fn create_directory(&self, name: &OsStr, mode: Mode) -> nix::Result<()> {
        nix::sys::stat::mkdirat(Some(self.fd.as_raw_fd()), name, mode)
    }

    /// Unlink the non-directory entry `name` inside this directory
    ///
    /// # Errors
    ///
    /// Fails with `EISDIR` if `name` is a directory, `ENOENT` if it is missing.
    pub fn unlink(&self, name: &OsStr) -> nix::Result<()> {
        nix::unistd::unlinkat(
            Some(self.fd.as_raw_fd()),
            name,
            UnlinkatFlags::NoRemoveDir,
        )
    }

    /// Remove the empty directory `name` inside this directory
    ///
    /// # Errors
    ///
    /// Fails with `ENOTEMPTY` if the directory has entries, `ENOTDIR` if
    /// `name` is not a directory.
    pub fn remove_dir(&self, name: &OsStr) -> nix::Result<()> {
        nix::unistd::unlinkat(Some(self.fd.as_raw_fd()), name, UnlinkatFlags::RemoveDir)
    }

    /// Create a symbolic link `link_name` inside this directory pointing at `target`
    ///
    /// `target` is stored verbatim. It is not resolved or validated; a later
    /// confined lookup through the link is what keeps it inside the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the link already exists (`EEXIST`) or permission is denied.
    pub fn symlinkat(&self, target: &OsStr, link_name: &OsStr) -> nix::Result<()> {
        nix::unistd::symlinkat(target, Some(self.fd.as_raw_fd()), link_name)
    }

    /// Close the descriptor and report the result of `close(2)`
    ///
    /// # Errors
    ///
    /// Returns the errno from `close(2)` (for example `EIO`). The descriptor is
    /// released either way.
    pub fn close(self) -> nix::Result<()> {
        nix::unistd::close(self.fd.into_raw_fd())
    }
}

impl AsFd for DirectoryFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for DirectoryFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
