//! Mutating operations built on a confined parent directory
//!
//! `openat2(2)` only opens things; there is no confined `unlinkat`,
//! `symlinkat` or `mkdirat`. Instead the parent of the target is opened
//! confined (`O_DIRECTORY | O_PATH`) and the primitive runs against that
//! descriptor with the bare leaf name, which is never resolved through a
//! symlink by these syscalls.

use super::Jail;
use crate::error::{ErrorKind, JailError, Result};
use nix::errno::Errno;
use nix::sys::stat::Mode;
use securefs_at::DirectoryFd;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path};
use tracing::debug;

/// Split `path` into its parent directory and final component
///
/// The split is purely lexical over path components: empty segments and
/// `.` are dropped, `..` is kept as-is (it is resolved by the kernel inside
/// the jail, never cleaned textually). A path with no final name (`""`,
/// `"."`, `"/"`) splits into `(".", ".")`.
pub(crate) fn split_parent(path: &Path) -> (&Path, &OsStr) {
    let mut components = path.components();
    match components.next_back() {
        Some(leaf @ (Component::Normal(_) | Component::ParentDir)) => {
            let parent = components.as_path();
            if parent.as_os_str().is_empty() {
                (Path::new("."), leaf.as_os_str())
            } else {
                (parent, leaf.as_os_str())
            }
        }
        _ => (Path::new("."), OsStr::new(".")),
    }
}

/// How the final segment of a path is spelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeafForm {
    /// A plain name (`a/b`)
    Name,
    /// Followed by `/`, so it can only name a directory (`a/b/`)
    Directory,
    /// The segment is `.` (`a/.`, `a/./`)
    Dot,
}

/// Classify the last textual segment of `path`
///
/// [`split_parent`] drops these distinctions, so operations that must not
/// act on a normalized name check this first.
pub(crate) fn leaf_form(path: &Path) -> LeafForm {
    let bytes = path.as_os_str().as_bytes();
    let end = bytes.iter().rposition(|&b| b != b'/').map_or(0, |i| i + 1);
    let trimmed = &bytes[..end];

    match trimmed.rsplit(|&b| b == b'/').next() {
        Some(b".") => LeafForm::Dot,
        _ if !trimmed.is_empty() && end < bytes.len() => LeafForm::Directory,
        _ => LeafForm::Name,
    }
}

/// Whether `path` names the jail root itself (`""`, `"."`, `"/"` and spellings thereof)
fn is_jail_root(path: &Path) -> bool {
    matches!(
        path.components().next_back(),
        None | Some(Component::CurDir | Component::RootDir)
    )
}

impl Jail {
    /// Confined-open the parent of `path` and return it with the leaf name
    fn open_parent<'p>(
        &self,
        op: &'static str,
        path: &'p Path,
    ) -> Result<(DirectoryFd, &'p OsStr)> {
        let (parent, name) = split_parent(path);
        let dir = self
            .root
            .open_dir_in_root(parent)
            .map_err(|e| JailError::os(op, path, e))?;
        Ok((dir, name))
    }

    /// Remove the file, symlink or empty directory at `path`
    ///
    /// A symlink is removed itself, never its target. Directories are only
    /// removed when `unlink` reports `EISDIR`; any other unlink failure is
    /// returned as-is. A trailing `/` means the path must be a directory, so
    /// `link/` never removes the symlink `link`.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The parent does not resolve inside the jail or `path` is missing
    ///   ([`ErrorKind::NotFound`])
    /// - `path` is a non-empty directory ([`ErrorKind::DirectoryNotEmpty`])
    /// - `path` ends in `/` but is not a directory ([`ErrorKind::NotADirectory`])
    /// - The last segment of `path` is `.` (`EINVAL`, [`ErrorKind::Other`])
    /// - Permission is denied ([`ErrorKind::PermissionDenied`])
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let form = leaf_form(path);
        if form == LeafForm::Dot {
            return Err(JailError::os("remove", path, Errno::EINVAL));
        }
        let (parent, name) = self.open_parent("remove", path)?;

        let result = match form {
            LeafForm::Directory => parent.remove_dir(name),
            _ => match parent.unlink(name) {
                Err(Errno::EISDIR) => parent.remove_dir(name),
                result => result,
            },
        };
        result.map_err(|e| JailError::os("remove", path, e))?;

        debug!("Removed {}", path.display());
        Ok(())
    }

    /// Create a symlink at `link` whose target text is `target`
    ///
    /// The target is stored verbatim and may point anywhere. It is inert
    /// until something resolves through it, and every resolution through
    /// this jail interprets it relative to the jail root.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::AlreadyExists`] if `link` exists, or
    /// [`ErrorKind::NotFound`] if its parent does not resolve inside the jail.
    /// A `link` ending in `/` fails with [`ErrorKind::NotADirectory`] and one
    /// whose last segment is `.` with `EINVAL`.
    pub fn symlink(&self, target: impl AsRef<Path>, link: impl AsRef<Path>) -> Result<()> {
        let (target, link) = (target.as_ref(), link.as_ref());
        match leaf_form(link) {
            LeafForm::Dot => return Err(JailError::os("symlink", link, Errno::EINVAL)),
            LeafForm::Directory => {
                return Err(JailError::os("symlink", link, Errno::ENOTDIR));
            }
            LeafForm::Name => {}
        }
        let (parent, name) = self.open_parent("symlink", link)?;

        parent
            .symlinkat(target.as_os_str(), name)
            .map_err(|e| JailError::os("symlink", link, e))?;

        debug!("Created symlink {} -> {}", link.display(), target.display());
        Ok(())
    }

    /// Create the single directory `path` with `mode` (before umask)
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::AlreadyExists`] on collision, or
    /// [`ErrorKind::NotFound`] if the parent does not resolve inside the jail.
    pub fn mkdir(&self, path: impl AsRef<Path>, mode: Mode) -> Result<()> {
        let path = path.as_ref();
        let (parent, name) = self.open_parent("mkdir", path)?;

        parent
            .create_directory(name, mode)
            .map_err(|e| JailError::os("mkdir", path, e))?;

        debug!("Created directory {}", path.display());
        Ok(())
    }

    /// Create `path` and every missing ancestor
    ///
    /// Succeeds without doing anything for the jail root itself, and when
    /// `path` already exists. Redundant `.` and empty segments are ignored.
    /// Ancestors are resolved inside the jail, so symlinked ancestors are
    /// followed without escaping.
    ///
    /// # Errors
    ///
    /// Returns the first error other than [`ErrorKind::AlreadyExists`], e.g.
    /// [`ErrorKind::NotADirectory`] when an ancestor is a file.
    pub fn mkdir_all(&self, path: impl AsRef<Path>, mode: Mode) -> Result<()> {
        let path = path.as_ref();
        if is_jail_root(path) {
            return Ok(());
        }

        match self.mkdir(path, mode) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(()),
            Err(_) => {}
        }

        // Parent may be missing: build it, then try once more
        let (parent, _) = split_parent(path);
        self.mkdir_all(parent, mode)?;

        match self.mkdir(path, mode) {
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn mode() -> Mode {
        Mode::from_bits_truncate(0o755)
    }

    fn setup() -> (TempDir, Jail) {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("a")).unwrap();
        fs::write(temp_dir.path().join("a/file"), b"hello").unwrap();
        let jail = Jail::new(temp_dir.path()).unwrap();
        (temp_dir, jail)
    }

    #[rstest]
    #[case("a/b", "a", "b")]
    #[case("a", ".", "a")]
    #[case("/a", "/", "a")]
    #[case("a/b/", "a", "b")]
    #[case("a//./b", "a", "b")]
    #[case("./a", ".", "a")]
    #[case("a/..", "a", "..")]
    #[case("", ".", ".")]
    #[case(".", ".", ".")]
    #[case("/", ".", ".")]
    fn test_split_parent(#[case] path: &str, #[case] parent: &str, #[case] leaf: &str) {
        let (p, l) = split_parent(Path::new(path));
        assert_eq!(p, Path::new(parent));
        assert_eq!(l, OsStr::new(leaf));
    }

    #[rstest]
    #[case("", true)]
    #[case(".", true)]
    #[case("/", true)]
    #[case("/.//.", true)]
    #[case("a", false)]
    #[case("..", false)]
    fn test_is_jail_root(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_jail_root(Path::new(path)), expected);
    }

    #[rstest]
    #[case("a", LeafForm::Name)]
    #[case("a/b", LeafForm::Name)]
    #[case("a/..", LeafForm::Name)]
    #[case("", LeafForm::Name)]
    #[case("/", LeafForm::Name)]
    #[case("a/", LeafForm::Directory)]
    #[case("a/b//", LeafForm::Directory)]
    #[case(".", LeafForm::Dot)]
    #[case("a/.", LeafForm::Dot)]
    #[case("a/./", LeafForm::Dot)]
    #[case("a/.b", LeafForm::Name)]
    fn test_leaf_form(#[case] path: &str, #[case] expected: LeafForm) {
        assert_eq!(leaf_form(Path::new(path)), expected);
    }

    #[test]
    fn test_remove_dot_segment_is_rejected() {
        let (temp_dir, jail) = setup();
        fs::create_dir(temp_dir.path().join("empty")).unwrap();

        let err = jail.remove("empty/.").unwrap_err();
        assert_eq!(err.errno(), Some(Errno::EINVAL));
        assert!(temp_dir.path().join("empty").is_dir());
    }

    #[test]
    fn test_remove_trailing_slash_keeps_symlink() {
        let (temp_dir, jail) = setup();
        fs::create_dir(temp_dir.path().join("empty")).unwrap();
        std::os::unix::fs::symlink("empty", temp_dir.path().join("link")).unwrap();

        let err = jail.remove("link/").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);
        assert!(fs::symlink_metadata(temp_dir.path().join("link")).is_ok());
        assert!(temp_dir.path().join("empty").is_dir());

        let err = jail.remove("a/file/").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);
        assert!(temp_dir.path().join("a/file").exists());
    }

    #[test]
    fn test_remove_trailing_slash_on_directory() {
        let (temp_dir, jail) = setup();
        fs::create_dir(temp_dir.path().join("empty")).unwrap();

        jail.remove("empty/").unwrap();
        assert!(!temp_dir.path().join("empty").exists());
    }

    #[test]
    fn test_symlink_rejects_dot_and_trailing_slash() {
        let (temp_dir, jail) = setup();

        let err = jail.symlink("target", "new/.").unwrap_err();
        assert_eq!(err.errno(), Some(Errno::EINVAL));
        let err = jail.symlink("target", "new/").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);

        assert!(fs::symlink_metadata(temp_dir.path().join("new")).is_err());
    }

    #[test]
    fn test_remove_file_then_directory() {
        let (temp_dir, jail) = setup();

        jail.remove("a/file").unwrap();
        assert!(!temp_dir.path().join("a/file").exists());
        assert!(jail.metadata("a/file").unwrap_err().is_not_found());

        jail.remove("a").unwrap();
        assert!(!temp_dir.path().join("a").exists());
    }

    #[test]
    fn test_remove_non_empty_directory() {
        let (_temp_dir, jail) = setup();

        let err = jail.remove("a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirectoryNotEmpty);
    }

    #[test]
    fn test_remove_missing() {
        let (_temp_dir, jail) = setup();

        assert!(jail.remove("a/missing").unwrap_err().is_not_found());
        assert!(jail.remove("missing/file").unwrap_err().is_not_found());
    }

    #[test]
    fn test_remove_symlink_keeps_target() {
        let (temp_dir, jail) = setup();
        std::os::unix::fs::symlink("file", temp_dir.path().join("a/link")).unwrap();

        jail.remove("a/link").unwrap();
        assert!(fs::symlink_metadata(temp_dir.path().join("a/link")).is_err());
        assert!(temp_dir.path().join("a/file").exists());
    }

    #[test]
    fn test_symlink_stores_target_verbatim() {
        let (temp_dir, jail) = setup();

        jail.symlink("a/file", "a/file2").unwrap();
        let target = fs::read_link(temp_dir.path().join("a/file2")).unwrap();
        assert_eq!(target, Path::new("a/file"));
    }

    #[test]
    fn test_symlink_relative_target_resolves_inside() {
        let (_temp_dir, jail) = setup();

        jail.symlink("file", "a/alias").unwrap();
        assert_eq!(jail.read("a/alias").unwrap(), b"hello");
    }

    #[test]
    fn test_symlink_existing_link() {
        let (_temp_dir, jail) = setup();

        let err = jail.symlink("anything", "a/file").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_mkdir_single_level() {
        let (temp_dir, jail) = setup();

        jail.mkdir("b", mode()).unwrap();
        assert!(temp_dir.path().join("b").is_dir());

        let err = jail.mkdir("b", mode()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let err = jail.mkdir("x/y", mode()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_mkdir_all_is_idempotent() {
        let (temp_dir, jail) = setup();

        jail.mkdir_all("x/y/z", mode()).unwrap();
        jail.mkdir_all("x/y/z", mode()).unwrap();
        jail.mkdir_all("x/y//.//z//", mode()).unwrap();

        assert!(temp_dir.path().join("x/y/z").is_dir());
        let entries = jail.read_dir("x/y").unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("/")]
    fn test_mkdir_all_root_is_noop(#[case] path: &str) {
        let (_temp_dir, jail) = setup();
        jail.mkdir_all(path, mode()).unwrap();
    }

    #[test]
    fn test_mkdir_all_through_file_fails() {
        let (_temp_dir, jail) = setup();

        let err = jail.mkdir_all("a/file/sub", mode()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);
    }
}
