//! Restore pass integration tests

use gitperm_core::{reapply, Applier, Error, MetadataRecord, MetadataStore, NativeApplier, RepoPath, Result};
use std::cell::RefCell;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Records every call; fails like the real applier when the target is gone.
#[derive(Default)]
struct RecordingApplier {
    calls: RefCell<Vec<(PathBuf, u32, String, String)>>,
}

impl Applier for RecordingApplier {
    fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        let mut calls = self.calls.borrow_mut();
        match calls.last_mut() {
            Some(last) if last.0 == path => last.1 = mode,
            _ => panic!("chmod before chown for {:?}", path),
        }
        Ok(())
    }

    fn chown(&self, path: &Path, owner: &str, group: &str) -> Result<()> {
        if fs::symlink_metadata(path).is_err() {
            return Err(Error::MissingTarget(path.to_path_buf()));
        }
        self.calls
            .borrow_mut()
            .push((path.to_path_buf(), 0, owner.to_string(), group.to_string()));
        Ok(())
    }
}

fn p(s: &str) -> RepoPath {
    RepoPath::new(s).unwrap()
}

fn setup() -> (TempDir, MetadataStore) {
    let tmp = TempDir::new().unwrap();
    let store = MetadataStore::new(tmp.path().join(".gitperm"));
    (tmp, store)
}

#[test]
fn test_applies_stored_record() {
    let (tmp, store) = setup();
    fs::create_dir_all(tmp.path().join("bin")).unwrap();
    fs::write(tmp.path().join("bin/tool"), "#!/bin/sh\n").unwrap();
    store.write(&p("bin/tool"), &MetadataRecord::new(0o755, "root", "wheel")).unwrap();

    let applier = RecordingApplier::default();
    let report = reapply(tmp.path(), &store, &applier).unwrap();

    assert_eq!(report.applied, 1);
    assert_eq!(
        applier.calls.borrow().as_slice(),
        &[(tmp.path().join("bin").join("tool"), 0o755, "root".to_string(), "wheel".to_string())]
    );
}

#[test]
fn test_missing_target_is_skipped() {
    let (tmp, store) = setup();
    fs::write(tmp.path().join("a.txt"), "a").unwrap();
    fs::write(tmp.path().join("z.txt"), "z").unwrap();
    store.write(&p("a.txt"), &MetadataRecord::new(0o644, "alice", "staff")).unwrap();
    store.write(&p("bin/tool"), &MetadataRecord::new(0o755, "root", "wheel")).unwrap();
    store.write(&p("z.txt"), &MetadataRecord::new(0o600, "alice", "staff")).unwrap();

    let applier = RecordingApplier::default();
    let report = reapply(tmp.path(), &store, &applier).unwrap();

    assert_eq!(report.applied, 2);
    assert_eq!(report.skipped, 1);
    let touched: Vec<PathBuf> = applier.calls.borrow().iter().map(|c| c.0.clone()).collect();
    assert_eq!(touched, vec![tmp.path().join("a.txt"), tmp.path().join("z.txt")]);
}

#[test]
fn test_malformed_record_is_skipped() {
    let (tmp, store) = setup();
    fs::write(tmp.path().join("a.txt"), "a").unwrap();
    fs::write(tmp.path().join("b.txt"), "b").unwrap();
    store.write(&p("a.txt"), &MetadataRecord::new(0o644, "alice", "staff")).unwrap();
    fs::write(store.dir().join("@b.txt"), "0644\n").unwrap();

    let applier = RecordingApplier::default();
    let report = reapply(tmp.path(), &store, &applier).unwrap();

    assert_eq!(report.to_string(), "applied:1, skipped:1");
}

#[test]
fn test_empty_store() {
    let (tmp, store) = setup();
    let report = reapply(tmp.path(), &store, &RecordingApplier::default()).unwrap();
    assert_eq!(report.applied + report.skipped, 0);
}

#[test]
fn test_native_restore_of_modes() {
    let (tmp, store) = setup();
    let script = tmp.path().join("run.sh");
    fs::write(&script, "#!/bin/sh\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o644)).unwrap();
    let meta = fs::metadata(&script).unwrap();

    // Numeric ids of the current owner keep chown a no-op for unprivileged runs.
    let record = MetadataRecord::new(0o750, meta.uid().to_string(), meta.gid().to_string());
    store.write(&p("run.sh"), &record).unwrap();

    let report = reapply(tmp.path(), &store, &NativeApplier).unwrap();

    assert_eq!(report.applied, 1);
    assert_eq!(fs::metadata(&script).unwrap().mode() & 0o7777, 0o750);
}
