//! Shared fixtures for integration tests

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A jail root next to a directory that must stay unreachable from it
#[allow(dead_code)]
pub struct Fixture {
    pub root: TempDir,
    pub outside: TempDir,
}

#[allow(dead_code)]
impl Fixture {
    /// Root containing `a/file` = "hello", plus a sibling `outside/secret`
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create jail root");
        let outside = TempDir::new().expect("Failed to create outside directory");

        fs::create_dir(root.path().join("a")).expect("Failed to create a/");
        fs::write(root.path().join("a/file"), "hello").expect("Failed to write a/file");
        fs::write(outside.path().join("secret"), "top secret").expect("Failed to write secret");

        Self { root, outside }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Host path of `rel` inside the root
    pub fn host(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// Create `link` inside the root pointing at `target` (stored verbatim)
    pub fn link(&self, target: impl AsRef<Path>, link: &str) {
        symlink(target, self.host(link)).expect("Failed to create symlink");
    }
}
