//! Error types for confined filesystem operations

use nix::errno::Errno;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error returned by every [`Jail`](crate::Jail) operation
///
/// A lookup that would have left the jail is reported exactly like a path
/// that does not exist ([`ErrorKind::NotFound`]), so callers learn nothing
/// about what lies outside the root.
#[derive(Debug, Error)]
pub enum JailError {
    /// A syscall on the confined path failed
    #[error("{op} {}: {source}", .path.display())]
    Os {
        /// Operation that failed (`open`, `mkdir`, ...)
        op: &'static str,
        /// Path as supplied by the caller, relative to the jail root
        path: PathBuf,
        /// Errno reported by the kernel
        #[source]
        source: Errno,
    },

    /// Reading or writing an already opened file failed
    #[error("{op} {}: {source}", .path.display())]
    Io {
        /// Operation that failed (`read`, `write`)
        op: &'static str,
        /// Path as supplied by the caller, relative to the jail root
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Coarse classification of a [`JailError`], mirroring errno categories
///
/// Interrupted calls never surface: they are retried inside the confined
/// opener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// `ENOENT`, including every attempt to resolve outside the jail
    NotFound,
    /// `ENOTDIR`
    NotADirectory,
    /// `EEXIST`
    AlreadyExists,
    /// `EACCES` or `EPERM`
    PermissionDenied,
    /// `ELOOP`
    TooManySymlinks,
    /// `EXDEV`
    CrossDevice,
    /// `EAGAIN` from a non-resolution step (e.g. `O_NONBLOCK` opens)
    WouldBlock,
    /// `EISDIR`
    IsADirectory,
    /// `ENOTEMPTY`
    DirectoryNotEmpty,
    /// `ENOSYS`: the kernel has no `openat2(2)`
    Unsupported,
    /// Any other OS failure
    Other,
}

impl ErrorKind {
    fn from_errno(errno: Errno) -> Self {
        match errno {
            Errno::ENOENT => Self::NotFound,
            Errno::ENOTDIR => Self::NotADirectory,
            Errno::EEXIST => Self::AlreadyExists,
            Errno::EACCES | Errno::EPERM => Self::PermissionDenied,
            Errno::ELOOP => Self::TooManySymlinks,
            Errno::EXDEV => Self::CrossDevice,
            Errno::EAGAIN => Self::WouldBlock,
            Errno::EISDIR => Self::IsADirectory,
            Errno::ENOTEMPTY => Self::DirectoryNotEmpty,
            Errno::ENOSYS => Self::Unsupported,
            _ => Self::Other,
        }
    }
}

impl JailError {
    pub(crate) fn os(op: &'static str, path: impl Into<PathBuf>, source: Errno) -> Self {
        Self::Os {
            op,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// The raw errno behind this error, if there is one
    #[must_use]
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::Os { source, .. } => Some(*source),
            Self::Io { source, .. } => source.raw_os_error().map(Errno::from_raw),
        }
    }

    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.errno().map_or(ErrorKind::Other, ErrorKind::from_errno)
    }

    /// Path the failed operation was given
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Os { path, .. } | Self::Io { path, .. } => path,
        }
    }

    /// Shorthand for `kind() == ErrorKind::NotFound`
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<JailError> for io::Error {
    fn from(err: JailError) -> Self {
        match err {
            JailError::Os { source, .. } => io::Error::from(source),
            JailError::Io { source, .. } => source,
        }
    }
}

/// Result type for confined filesystem operations
pub type Result<T> = std::result::Result<T, JailError>;
