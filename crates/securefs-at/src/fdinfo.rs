//! Descriptor introspection
//!
//! Linux exposes every open descriptor as a magic link under
//! `/proc/self/fd`. Reading the link yields the path the kernel currently
//! associates with the open file, which is how a confined lookup is turned
//! back into a canonical absolute path without trusting the caller's text.

use nix::fcntl::{FcntlArg, FdFlag};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

/// Absolute path the kernel associates with `fd`
///
/// Works for `O_PATH` descriptors. For an unlinked file the kernel appends
/// ` (deleted)` to the returned path.
///
/// # Errors
///
/// Returns `ENOENT` if `/proc` is not mounted, or the errno from
/// `readlink(2)`.
pub fn fd_path<Fd: AsRawFd>(fd: &Fd) -> nix::Result<PathBuf> {
    let link = format!("/proc/self/fd/{}", fd.as_raw_fd());
    nix::fcntl::readlink(Path::new(&link)).map(PathBuf::from)
}

/// Whether `FD_CLOEXEC` is set on `fd`
///
/// # Errors
///
/// Returns `EBADF` if `fd` is not an open descriptor.
pub fn is_cloexec<Fd: AsRawFd>(fd: &Fd) -> nix::Result<bool> {
    let flags = nix::fcntl::fcntl(fd.as_raw_fd(), FcntlArg::F_GETFD)?;
    Ok(FdFlag::from_bits_truncate(flags).contains(FdFlag::FD_CLOEXEC))
}
