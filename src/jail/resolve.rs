//! Canonical host paths for confined lookups

use super::Jail;
use crate::error::{JailError, Result};
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use std::path::{Path, PathBuf};

impl Jail {
    /// Resolve `path` inside the jail and return the absolute host path it denotes
    ///
    /// The lookup itself is confined; the result is read back from the
    /// `/proc/self/fd` magic link of the opened descriptor. This is the way
    /// to hand a real path to a collaborator that needs one without ever
    /// trusting the caller's path text. The answer is a snapshot: the
    /// filesystem may change after it is returned.
    ///
    /// For a jail rooted at `/` this is `/` joined with the normalized path.
    ///
    /// # Errors
    ///
    /// Fails as [`Jail::open_file`] for the lookup, or with
    /// [`ErrorKind::NotFound`](crate::ErrorKind::NotFound) if `/proc` is not
    /// mounted.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let fd = self.open_fd("resolve", path, OFlag::O_PATH, Mode::empty())?;

        securefs_at::fd_path(&fd).map_err(|e| JailError::os("resolve", path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, Jail) {
        let temp_dir = TempDir::new().unwrap();
        let canonical = temp_dir.path().canonicalize().unwrap();
        fs::create_dir(canonical.join("a")).unwrap();
        fs::write(canonical.join("a/file"), b"hello").unwrap();
        let jail = Jail::new(&canonical).unwrap();
        (temp_dir, canonical, jail)
    }

    #[test]
    fn test_resolve_plain_path() {
        let (_temp_dir, root, jail) = setup();
        assert_eq!(jail.resolve_path("a/file").unwrap(), root.join("a/file"));
    }

    #[test]
    fn test_resolve_normalizes_dots() {
        let (_temp_dir, root, jail) = setup();
        assert_eq!(
            jail.resolve_path("./a/../a//file").unwrap(),
            root.join("a/file")
        );
    }

    #[test]
    fn test_resolve_follows_symlink_inside() {
        let (_temp_dir, root, jail) = setup();
        std::os::unix::fs::symlink("/a", root.join("abs")).unwrap();

        // absolute link target is jail-relative
        assert_eq!(jail.resolve_path("abs/file").unwrap(), root.join("a/file"));
    }

    #[test]
    fn test_resolve_dotdot_clamped_to_root() {
        let (_temp_dir, root, jail) = setup();
        assert_eq!(jail.resolve_path("../../..").unwrap(), root);
    }

    #[test]
    fn test_resolve_missing() {
        let (_temp_dir, _root, jail) = setup();
        assert!(jail.resolve_path("a/missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_resolve_in_host_root_jail() {
        let (_temp_dir, root, _jail) = setup();
        let jail = Jail::new("/").unwrap();

        let relative = root.strip_prefix("/").unwrap().join("a/file");
        assert_eq!(jail.resolve_path(&relative).unwrap(), root.join("a/file"));
    }
}
