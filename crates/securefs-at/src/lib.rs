//! # securefs-at
//!
//! Confined `*at` syscalls for securefs:
//! - `openat2(2)` with `RESOLVE_IN_ROOT`, retried across `EINTR`/`EAGAIN`
//! - `DirectoryFd`, an owned `O_PATH` directory descriptor with leaf-level
//!   `mkdirat`, `unlinkat` and `symlinkat`
//! - Directory entry enumeration from an open descriptor
//! - Descriptor introspection through `/proc/self/fd`
//!
//! Every function returns [`nix::Result`] so the caller always sees the raw
//! errno. Nothing here allocates a path relative to the process cwd except
//! [`DirectoryFd::open`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use nix::fcntl::OFlag;
//! use nix::sys::stat::Mode;
//! use securefs_at::DirectoryFd;
//! use std::path::Path;
//!
//! # fn example() -> nix::Result<()> {
//! let root = DirectoryFd::open(Path::new("/srv/tenant"))?;
//! // "../../etc/passwd" is clamped to the root and resolves to /srv/tenant/etc/passwd
//! let fd = root.open_in_root(Path::new("../../etc/passwd"), OFlag::O_RDONLY, Mode::empty())?;
//! # drop(fd);
//! # Ok(())
//! # }
//! ```

#[cfg(not(target_os = "linux"))]
compile_error!("securefs-at requires Linux: confined resolution is built on openat2(2)");

pub mod directory;
pub mod entries;
pub mod fdinfo;
pub mod openat2;

// Re-export main types
pub use directory::DirectoryFd;
pub use entries::{read_entries, Entry};
pub use fdinfo::{fd_path, is_cloexec};
pub use openat2::openat2_in_root;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
