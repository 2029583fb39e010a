//! Process-wide default jail tests

use securefs::{default_jail, oneshot, Mode};
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn test_default_jail_identity_across_threads() {
    let addresses: Vec<usize> = (0..8)
        .map(|_| thread::spawn(|| std::ptr::from_ref(default_jail()) as usize))
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(addresses[0], std::ptr::from_ref(default_jail()) as usize);
}

#[test]
fn test_default_jail_reaches_absolute_host_paths() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("hello.txt");

    default_jail()
        .write(&file, "from the default jail", Mode::from_bits_truncate(0o644))
        .unwrap();

    assert_eq!(fs::read_to_string(&file).unwrap(), "from the default jail");
    assert_eq!(default_jail().read(&file).unwrap(), b"from the default jail");
}

#[test]
fn test_default_jail_resolve_path_is_normalized() {
    let temp_dir = TempDir::new().unwrap();
    let canonical = temp_dir.path().canonicalize().unwrap();
    fs::create_dir(canonical.join("sub")).unwrap();
    let messy = canonical.join(".//sub/./../sub");

    let resolved = default_jail().resolve_path(&messy).unwrap();

    assert_eq!(resolved, canonical.join("sub"));
}

#[test]
fn test_shared_jail_via_arc() {
    let temp_dir = TempDir::new().unwrap();
    let jail = Arc::new(securefs::Jail::new(temp_dir.path()).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let jail = Arc::clone(&jail);
            thread::spawn(move || {
                let name = format!("worker-{i}");
                jail.write(&name, name.as_bytes(), Mode::from_bits_truncate(0o644))
                    .unwrap();
                jail.read(&name).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), format!("worker-{i}").into_bytes());
    }

    let jail = Arc::try_unwrap(jail).unwrap();
    jail.close().unwrap();
}

#[test]
fn test_oneshot_helpers_match_jail_behavior() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    std::os::unix::fs::symlink("/etc/passwd", root.join("passwd")).unwrap();

    oneshot::mkdir_all(root, "x/y", Mode::from_bits_truncate(0o755)).unwrap();
    oneshot::write(root, "x/y/f", "data", Mode::from_bits_truncate(0o644)).unwrap();

    assert_eq!(oneshot::read(root, "x/y/f").unwrap(), b"data");
    assert!(oneshot::read(root, "passwd").unwrap_err().is_not_found());
    assert!(root.join("x/y/f").is_file());
}
