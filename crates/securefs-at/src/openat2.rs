//! `openat2(2)` with `RESOLVE_IN_ROOT`
//!
//! `RESOLVE_IN_ROOT` makes the kernel treat the directory descriptor as the
//! filesystem root for the duration of the lookup: absolute symlink targets
//! and `..` components are interpreted relative to it, so a lookup can never
//! climb above it. A path that would have escaped therefore resolves to some
//! location inside the root, which normally does not exist, and the caller
//! sees `ENOENT`.
//!
//! The kernel may fail a lookup with `EAGAIN` when a concurrent rename moves
//! something along the path (it cannot prove the walk stayed inside the
//! root), and any blocking syscall can be interrupted with `EINTR`. Both are
//! retried here in a plain spin loop until the kernel gives a definitive
//! answer. This is best effort: there is no backoff and no retry cap.

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::NixPath;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

/// Build the `open_how` argument for a confined open
///
/// `O_CLOEXEC` is always set. The mode is only forwarded when the flags can
/// create an inode; `openat2` rejects a non-zero mode otherwise.
#[allow(clippy::cast_sign_loss)] // O_* flags are non-negative
fn open_how(flags: OFlag, mode: Mode) -> libc::open_how {
    let flags = flags | OFlag::O_CLOEXEC;
    let creates = flags.contains(OFlag::O_CREAT) || flags.contains(OFlag::O_TMPFILE);

    // SAFETY: open_how is plain integers; all-zero is its documented default.
    let mut how: libc::open_how = unsafe { std::mem::zeroed() };
    how.flags = flags.bits() as u64;
    how.mode = if creates { u64::from(mode.bits()) } else { 0 };
    how.resolve = libc::RESOLVE_IN_ROOT;
    how
}

/// Run `attempt` until it returns something other than `EINTR`/`EAGAIN`
fn retry_transient<T>(mut attempt: impl FnMut() -> nix::Result<T>) -> nix::Result<T> {
    loop {
        match attempt() {
            Err(errno @ (Errno::EINTR | Errno::EAGAIN)) => {
                log::trace!("openat2 transient failure ({errno}), retrying");
            }
            result => return result,
        }
    }
}

fn openat2_once<P: ?Sized + NixPath>(
    dirfd: BorrowedFd<'_>,
    path: &P,
    how: &libc::open_how,
) -> nix::Result<OwnedFd> {
    let res = path.with_nix_path(|cstr| {
        // SAFETY: cstr is NUL-terminated and outlives the call, `how` points to
        // a fully initialized open_how whose size is passed alongside it.
        unsafe {
            libc::syscall(
                libc::SYS_openat2,
                dirfd.as_raw_fd(),
                cstr.as_ptr(),
                std::ptr::from_ref(how),
                std::mem::size_of::<libc::open_how>(),
            )
        }
    })?;

    #[allow(clippy::cast_possible_truncation)] // descriptors fit in an int
    let fd = Errno::result(res)? as RawFd;

    // SAFETY: a non-negative return from openat2 is a fresh descriptor that
    // nothing else owns.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Open `path` relative to `dirfd`, never resolving outside of `dirfd`
///
/// # Arguments
///
/// * `dirfd` - Directory acting as the root of the lookup
/// * `path` - Path to resolve; a leading `/` means the root itself
/// * `flags` - `open(2)` flags; `O_CLOEXEC` is added unconditionally
/// * `mode` - Permissions for a newly created file (ignored without `O_CREAT`/`O_TMPFILE`)
///
/// # Errors
///
/// Returns the errno of the final, non-transient attempt. `EINTR` and
/// `EAGAIN` are never returned. A path with an interior NUL byte fails with
/// `EINVAL`; kernels without `openat2` fail with `ENOSYS`.
pub fn openat2_in_root<P: ?Sized + NixPath>(
    dirfd: BorrowedFd<'_>,
    path: &P,
    flags: OFlag,
    mode: Mode,
) -> nix::Result<OwnedFd> {
    let how = open_how(flags, mode);
    retry_transient(|| openat2_once(dirfd, path, &how))
}
