//! # securefs
//!
//! Path-confined filesystem access for Linux.
//!
//! A [`Jail`] holds an open descriptor for a root directory. Every operation
//! takes a path relative to that root and resolves it with `openat2(2)` and
//! `RESOLVE_IN_ROOT`, so symlinks, `..` and concurrent renames can never
//! carry a lookup outside the root. Anything that would have escaped fails
//! exactly like a missing path ([`ErrorKind::NotFound`]).
//!
//! - Confined opens: [`Jail::open_file`], [`Jail::open`], [`Jail::create`]
//! - Whole-file helpers: [`Jail::read`], [`Jail::write`]
//! - Inspection: [`Jail::read_dir`], [`Jail::metadata`], [`Jail::resolve_path`]
//! - Mutation via a confined parent: [`Jail::remove`], [`Jail::symlink`],
//!   [`Jail::mkdir`], [`Jail::mkdir_all`]
//! - [`default_jail`], a process-wide jail rooted at `/`
//! - [`oneshot`], single-operation helpers taking the root path
//!
//! Every descriptor returned or held has `FD_CLOEXEC` set.
//!
//! ## Example
//!
//! ```rust,no_run
//! use securefs::{ErrorKind, Jail, Mode};
//!
//! # fn example() -> securefs::Result<()> {
//! let jail = Jail::new("/srv/tenants/42")?;
//! jail.write("notes.txt", "hi", Mode::from_bits_truncate(0o644))?;
//!
//! // Climbing out is clamped to the root
//! let err = jail.read("../../../etc/shadow").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! # Ok(())
//! # }
//! ```
//!
//! Requires Linux 5.6 or newer; older kernels report [`ErrorKind::Unsupported`].

pub mod cli;
pub mod default;
pub mod error;
pub mod jail;
pub mod oneshot;

// Re-export main types
pub use default::default_jail;
pub use error::{ErrorKind, JailError, Result};
pub use jail::{DirEntry, FileKind, Jail, Metadata};
pub use nix::fcntl::OFlag;
pub use nix::sys::stat::Mode;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
