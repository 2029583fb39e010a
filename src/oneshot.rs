//! One-shot helpers that open a jail for a single operation
//!
//! Each function opens `root` as a [`Jail`], performs one operation and
//! releases the jail again. Handy for call sites that touch a root once;
//! anything doing more than one operation should keep a `Jail` around.
//!
//! ```rust,no_run
//! # fn example() -> securefs::Result<()> {
//! let config = securefs::oneshot::read("/srv/tenants/42", "etc/app.toml")?;
//! # drop(config);
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::jail::{DirEntry, Jail, Metadata};
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use std::fs::File;
use std::path::{Path, PathBuf};

fn with_jail<T>(root: &Path, op: impl FnOnce(&Jail) -> Result<T>) -> Result<T> {
    let jail = Jail::new(root)?;
    op(&jail)
}

/// [`Jail::open_file`] under `root`
///
/// # Errors
///
/// Fails if `root` cannot be opened as a jail, or as [`Jail::open_file`].
pub fn open_file(
    root: impl AsRef<Path>,
    path: impl AsRef<Path>,
    flags: OFlag,
    mode: Mode,
) -> Result<File> {
    with_jail(root.as_ref(), |jail| jail.open_file(path, flags, mode))
}

/// [`Jail::open`] under `root`
///
/// # Errors
///
/// Fails if `root` cannot be opened as a jail, or as [`Jail::open`].
pub fn open(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<File> {
    with_jail(root.as_ref(), |jail| jail.open(path))
}

/// [`Jail::create`] under `root`
///
/// # Errors
///
/// Fails if `root` cannot be opened as a jail, or as [`Jail::create`].
pub fn create(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<File> {
    with_jail(root.as_ref(), |jail| jail.create(path))
}

/// [`Jail::read`] under `root`
///
/// # Errors
///
/// Fails if `root` cannot be opened as a jail, or as [`Jail::read`].
pub fn read(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<Vec<u8>> {
    with_jail(root.as_ref(), |jail| jail.read(path))
}

/// [`Jail::write`] under `root`
///
/// # Errors
///
/// Fails if `root` cannot be opened as a jail, or as [`Jail::write`].
pub fn write(
    root: impl AsRef<Path>,
    path: impl AsRef<Path>,
    data: impl AsRef<[u8]>,
    mode: Mode,
) -> Result<()> {
    with_jail(root.as_ref(), |jail| jail.write(path, data, mode))
}

/// [`Jail::remove`] under `root`
///
/// # Errors
///
/// Fails if `root` cannot be opened as a jail, or as [`Jail::remove`].
pub fn remove(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<()> {
    with_jail(root.as_ref(), |jail| jail.remove(path))
}

/// [`Jail::symlink`] under `root`
///
/// # Errors
///
/// Fails if `root` cannot be opened as a jail, or as [`Jail::symlink`].
pub fn symlink(
    root: impl AsRef<Path>,
    target: impl AsRef<Path>,
    link: impl AsRef<Path>,
) -> Result<()> {
    with_jail(root.as_ref(), |jail| jail.symlink(target, link))
}

/// [`Jail::mkdir`] under `root`
///
/// # Errors
///
/// Fails if `root` cannot be opened as a jail, or as [`Jail::mkdir`].
pub fn mkdir(root: impl AsRef<Path>, path: impl AsRef<Path>, mode: Mode) -> Result<()> {
    with_jail(root.as_ref(), |jail| jail.mkdir(path, mode))
}

/// [`Jail::mkdir_all`] under `root`
///
/// # Errors
///
/// Fails if `root` cannot be opened as a jail, or as [`Jail::mkdir_all`].
pub fn mkdir_all(root: impl AsRef<Path>, path: impl AsRef<Path>, mode: Mode) -> Result<()> {
    with_jail(root.as_ref(), |jail| jail.mkdir_all(path, mode))
}

/// [`Jail::read_dir`] under `root`
///
/// # Errors
///
/// Fails if `root` cannot be opened as a jail, or as [`Jail::read_dir`].
pub fn read_dir(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<Vec<DirEntry>> {
    with_jail(root.as_ref(), |jail| jail.read_dir(path))
}

/// [`Jail::metadata`] under `root`
///
/// # Errors
///
/// Fails if `root` cannot be opened as a jail, or as [`Jail::metadata`].
pub fn metadata(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<Metadata> {
    with_jail(root.as_ref(), |jail| jail.metadata(path))
}

/// [`Jail::resolve_path`] under `root`
///
/// # Errors
///
/// Fails if `root` cannot be opened as a jail, or as [`Jail::resolve_path`].
pub fn resolve_path(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<PathBuf> {
    with_jail(root.as_ref(), |jail| jail.resolve_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("a")).unwrap();
        fs::write(temp_dir.path().join("a/file"), b"hello").unwrap();
        temp_dir
    }

    #[test]
    fn test_open_outlives_jail() {
        let root = setup();

        let mut file = open(root.path(), "a/file").unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");
    }

    #[test]
    fn test_create_and_write() {
        let root = setup();

        drop(create(root.path(), "a/created").unwrap());
        assert!(root.path().join("a/created").is_file());

        write(root.path(), "a/file", b"world", Mode::from_bits_truncate(0o600)).unwrap();
        assert_eq!(read(root.path(), "a/file").unwrap(), b"world");
    }

    #[test]
    fn test_directory_helpers() {
        let root = setup();
        let mode = Mode::from_bits_truncate(0o700);

        mkdir(root.path(), "b", mode).unwrap();
        mkdir_all(root.path(), "/.//.c/d//.//", mode).unwrap();
        assert!(root.path().join(".c/d").is_dir());

        symlink(root.path(), "a/file", "b/link").unwrap();
        assert_eq!(fs::read_link(root.path().join("b/link")).unwrap(), Path::new("a/file"));

        let names: Vec<_> = read_dir(root.path(), "b")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("link")]);

        remove(root.path(), "b/link").unwrap();
        remove(root.path(), "b").unwrap();
        assert!(!root.path().join("b").exists());
    }

    #[test]
    fn test_metadata_and_resolve() {
        let root = setup();

        assert_eq!(metadata(root.path(), "a/file").unwrap().size, 5);
        assert_eq!(
            resolve_path(root.path(), "a/file").unwrap(),
            root.path().canonicalize().unwrap().join("a/file")
        );
    }

    #[test]
    fn test_open_file_flags() {
        let root = setup();

        let err = open_file(
            root.path(),
            "a/file",
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_EXCL,
            Mode::from_bits_truncate(0o600),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_missing_root() {
        let root = setup();

        let err = read(root.path().join("missing"), "a/file").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
