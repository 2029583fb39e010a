//! Entry and metadata types returned by jail operations

use nix::dir::Type;
use std::ffi::OsString;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Kind of filesystem object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Named pipe
    Fifo,
    /// Unix domain socket
    Socket,
    /// Character device
    CharDevice,
    /// Block device
    BlockDevice,
    /// The filesystem did not report a type
    Unknown,
}

impl FileKind {
    pub(crate) fn from_dirent(file_type: Option<Type>) -> Self {
        match file_type {
            Some(Type::File) => Self::File,
            Some(Type::Directory) => Self::Directory,
            Some(Type::Symlink) => Self::Symlink,
            Some(Type::Fifo) => Self::Fifo,
            Some(Type::Socket) => Self::Socket,
            Some(Type::CharacterDevice) => Self::CharDevice,
            Some(Type::BlockDevice) => Self::BlockDevice,
            None => Self::Unknown,
        }
    }

    fn from_std(file_type: std::fs::FileType) -> Self {
        if file_type.is_file() {
            Self::File
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_fifo() {
            Self::Fifo
        } else if file_type.is_socket() {
            Self::Socket
        } else if file_type.is_char_device() {
            Self::CharDevice
        } else if file_type.is_block_device() {
            Self::BlockDevice
        } else {
            Self::Unknown
        }
    }
}

/// An immediate child of a directory listed with [`Jail::read_dir`](crate::Jail::read_dir)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (a single path component)
    pub name: OsString,
    /// Kind reported by the directory itself, without following symlinks
    pub kind: FileKind,
    /// Inode number
    pub ino: u64,
}

impl From<securefs_at::Entry> for DirEntry {
    fn from(entry: securefs_at::Entry) -> Self {
        Self {
            name: entry.name,
            kind: FileKind::from_dirent(entry.file_type),
            ino: entry.ino,
        }
    }
}

/// File metadata queried through a confined descriptor
///
/// Timestamps carry nanosecond precision. `created` is only populated when
/// the filesystem records a birth time.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// File size in bytes
    pub size: u64,
    /// File mode (type + permissions)
    pub mode: u32,
    /// Kind of object, after following symlinks
    pub kind: FileKind,
    /// User ID of owner
    pub uid: u32,
    /// Group ID of owner
    pub gid: u32,
    /// Number of hard links
    pub nlink: u64,
    /// Inode number
    pub ino: u64,
    /// Device ID
    pub dev: u64,
    /// Last access time
    pub accessed: SystemTime,
    /// Last modification time
    pub modified: SystemTime,
    /// Last status change time
    pub changed: SystemTime,
    /// Creation time (birth time) if available
    pub created: Option<SystemTime>,
}

impl Metadata {
    /// Permission bits, including setuid/setgid/sticky
    #[must_use]
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    /// Whether this is a directory
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Whether this is a regular file
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

#[allow(clippy::cast_sign_loss)] // pre-epoch timestamps are clamped below
fn timestamp(secs: i64, nsecs: i64) -> SystemTime {
    if secs < 0 {
        return UNIX_EPOCH;
    }
    UNIX_EPOCH + Duration::new(secs as u64, nsecs.clamp(0, 999_999_999) as u32)
}

impl From<&std::fs::Metadata> for Metadata {
    fn from(metadata: &std::fs::Metadata) -> Self {
        Self {
            size: metadata.len(),
            mode: metadata.mode(),
            kind: FileKind::from_std(metadata.file_type()),
            uid: metadata.uid(),
            gid: metadata.gid(),
            nlink: metadata.nlink(),
            ino: metadata.ino(),
            dev: metadata.dev(),
            accessed: timestamp(metadata.atime(), metadata.atime_nsec()),
            modified: timestamp(metadata.mtime(), metadata.mtime_nsec()),
            changed: timestamp(metadata.ctime(), metadata.ctime_nsec()),
            created: metadata.created().ok(),
        }
    }
}
