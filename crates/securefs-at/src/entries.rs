//! Directory entry enumeration from an open descriptor
//!
//! `std::fs::read_dir` only takes a path, which would re-resolve outside of
//! any confinement. These helpers read entries straight from a descriptor
//! that was already opened confined.

use nix::dir::{Dir, Type};
use nix::errno::Errno;
use nix::fcntl::{AtFlags, FcntlArg, OFlag};
use std::ffi::{CStr, OsStr, OsString};
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;

/// One immediate child of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry name (a single path component)
    pub name: OsString,
    /// File type from `d_type` (or `fstatat` when that is `DT_UNKNOWN`);
    /// `None` only if neither could tell
    pub file_type: Option<Type>,
    /// Inode number
    pub ino: u64,
}

/// Type of `name` inside `dirfd` from `fstatat(2)`, without following symlinks
///
/// Used when `d_type` is `DT_UNKNOWN`. The lookup is a single component on
/// the already confined directory.
fn stat_type(dirfd: RawFd, name: &CStr) -> Option<Type> {
    let stat = nix::sys::stat::fstatat(Some(dirfd), name, AtFlags::AT_SYMLINK_NOFOLLOW).ok()?;
    match stat.st_mode & libc::S_IFMT {
        libc::S_IFREG => Some(Type::File),
        libc::S_IFDIR => Some(Type::Directory),
        libc::S_IFLNK => Some(Type::Symlink),
        libc::S_IFIFO => Some(Type::Fifo),
        libc::S_IFSOCK => Some(Type::Socket),
        libc::S_IFCHR => Some(Type::CharacterDevice),
        libc::S_IFBLK => Some(Type::BlockDevice),
        _ => None,
    }
}

/// Read every entry of the directory behind `fd`, excluding `.` and `..`
///
/// The descriptor must have been opened with `O_DIRECTORY | O_RDONLY`; an
/// `O_PATH` descriptor is rejected with `EBADF`. It is consumed and closed.
/// Entries are returned sorted by name; the walk is not recursive. When the
/// filesystem does not fill in `d_type`, the type comes from `fstatat(2)`
/// on the same descriptor.
///
/// # Errors
///
/// Returns an error if the descriptor is `O_PATH` (`EBADF`), `fdopendir(3)`
/// rejects it (`EBADF`, `ENOTDIR`) or `readdir(3)` fails part way through.
pub fn read_entries(fd: OwnedFd) -> nix::Result<Vec<Entry>> {
    let status = OFlag::from_bits_truncate(nix::fcntl::fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)?);
    if status.contains(OFlag::O_PATH) {
        return Err(Errno::EBADF);
    }

    let mut dir = Dir::from_fd(fd.into_raw_fd())?;
    let dirfd = dir.as_raw_fd();

    let mut entries = Vec::new();
    for entry in dir.iter() {
        let entry = entry?;
        let name = entry.file_name().to_bytes();
        if name == b"." || name == b".." {
            continue;
        }

        entries.push(Entry {
            name: OsStr::from_bytes(name).to_os_string(),
            file_type: entry
                .file_type()
                .or_else(|| stat_type(dirfd, entry.file_name())),
            ino: entry.ino(),
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
