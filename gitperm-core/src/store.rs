//! Flat-file metadata store
//!
//! Layout on disk:
//! ```text
//! {repo}/.gitperm/
//!   @a.txt               # "0644 alice:staff"
//!   @dir                 # "0755 alice:staff"
//!   @dir%2Fb.txt         # "0755 alice:staff"
//! ```
//!
//! One file per tracked path keeps git diffs of the store at one line per
//! metadata change. Writes go through a short `.<pid>.tmp` file in the same
//! directory; keys always start with `@`, so leftovers never collide with one.

use crate::codec::{self, RepoPath};
use crate::error::{Error, Result};
use crate::record::MetadataRecord;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Path-keyed record store backed by a single directory
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    /// Use `dir` as the store directory. Nothing is created until the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_file(&self, path: &RepoPath) -> PathBuf {
        self.dir.join(codec::encode(path))
    }

    /// Read the record for `path`; `None` if it was never written.
    pub fn read(&self, path: &RepoPath) -> Result<Option<MetadataRecord>> {
        match fs::read_to_string(self.record_file(path)) {
            Ok(line) => MetadataRecord::parse(path.as_str(), &line).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create or overwrite the record for `path`.
    pub fn write(&self, path: &RepoPath, record: &MetadataRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let file = self.record_file(path);
        let tmp = self.dir.join(format!(".{}.tmp", std::process::id()));
        fs::write(&tmp, record.to_line())?;
        if let Err(e) = fs::rename(&tmp, &file) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        tracing::debug!("Wrote {} -> {}", path, record);
        Ok(())
    }

    /// Remove the record for `path`. Returns `false` if there was none.
    pub fn delete(&self, path: &RepoPath) -> Result<bool> {
        match fs::remove_file(self.record_file(path)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Every path with a stored record.
    ///
    /// Entries whose names do not decode, or that cannot be inspected, are
    /// logged and skipped. Temp files left by an interrupted write are removed
    /// so they never get staged.
    pub fn list_all(&self) -> Result<BTreeSet<RepoPath>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = BTreeSet::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable store entry: {}", e);
                    continue;
                }
            };
            let name = entry.file_name();
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => {
                    tracing::warn!("Skipping directory in store: {:?}", name);
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Skipping store entry {:?}: {}", name, e);
                    continue;
                }
            }
            if is_temp_file(&name) {
                match fs::remove_file(entry.path()) {
                    Ok(()) => tracing::debug!("Removed stale temp file {:?}", name),
                    Err(e) => tracing::warn!("Failed to remove stale temp file {:?}: {}", name, e),
                }
                continue;
            }
            let decoded = match name.to_str() {
                Some(key) => codec::decode(key),
                None => Err(Error::MalformedKey(name.to_string_lossy().into_owned())),
            };
            match decoded {
                Ok(path) => {
                    paths.insert(path);
                }
                Err(e) => tracing::warn!("Skipping store entry: {}", e),
            }
        }
        Ok(paths)
    }
}

fn is_temp_file(name: &OsStr) -> bool {
    name.to_str()
        .is_some_and(|name| name.starts_with('.') && name.ends_with(".tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn p(s: &str) -> RepoPath {
        RepoPath::new(s).unwrap()
    }

    fn store(tmp: &TempDir) -> MetadataStore {
        MetadataStore::new(tmp.path().join(".gitperm"))
    }

    #[test]
    fn test_read_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        assert!(store.read(&p("nope.txt")).unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let rec = MetadataRecord::new(0o755, "alice", "staff");
        store.write(&p("dir/b.txt"), &rec).unwrap();

        assert_eq!(store.read(&p("dir/b.txt")).unwrap(), Some(rec));
        let on_disk = fs::read_to_string(store.dir().join("@dir%2Fb.txt")).unwrap();
        assert_eq!(on_disk, "0755 alice:staff\n");
    }

    #[test]
    fn test_write_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.write(&p("a"), &MetadataRecord::new(0o644, "a", "b")).unwrap();
        store.write(&p("a"), &MetadataRecord::new(0o600, "a", "b")).unwrap();
        assert_eq!(store.read(&p("a")).unwrap().unwrap().mode, 0o600);
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.write(&p("a"), &MetadataRecord::new(0o644, "a", "b")).unwrap();
        assert!(store.delete(&p("a")).unwrap());
        assert!(!store.delete(&p("a")).unwrap());
        assert!(store.read(&p("a")).unwrap().is_none());
    }

    #[test]
    fn test_list_all_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(store(&tmp).list_all().unwrap().is_empty());
    }

    #[test]
    fn test_list_all_skips_malformed_entries() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.write(&p("a.txt"), &MetadataRecord::new(0o644, "a", "b")).unwrap();
        store.write(&p("dir/b.txt"), &MetadataRecord::new(0o644, "a", "b")).unwrap();
        fs::write(store.dir().join("README"), "not a key").unwrap();
        fs::write(store.dir().join("@"), "0644 a:b\n").unwrap();
        fs::write(store.dir().join("@bad%zz"), "0644 a:b\n").unwrap();
        fs::create_dir(store.dir().join("@subdir")).unwrap();

        let all: Vec<String> = store.list_all().unwrap().iter().map(|p| p.to_string()).collect();
        assert_eq!(all, vec!["a.txt", "dir/b.txt"]);
    }

    #[test]
    fn test_list_all_removes_stale_temp_files() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.write(&p("a.txt"), &MetadataRecord::new(0o644, "a", "b")).unwrap();
        fs::write(store.dir().join(".4242.tmp"), "0600 a:b\n").unwrap();
        fs::write(store.dir().join(".@b.txt.tmp"), "0600 a:b\n").unwrap();

        let all: Vec<String> = store.list_all().unwrap().iter().map(|p| p.to_string()).collect();

        assert_eq!(all, vec!["a.txt"]);
        let left: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(left, vec!["@a.txt"]);
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        // The key is exactly 255 bytes, the usual file name limit.
        let long = "x".repeat(254);
        let rec = MetadataRecord::new(0o640, "a", "b");
        store.write(&p(&long), &rec).unwrap();

        assert_eq!(store.read(&p(&long)).unwrap(), Some(rec));
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_write_cleans_up_temp_file() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let too_long = "y".repeat(300);

        assert!(store.write(&p(&too_long), &MetadataRecord::new(0o644, "a", "b")).is_err());
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_read_malformed_record() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join("@a.txt"), "garbage\n").unwrap();
        assert!(matches!(store.read(&p("a.txt")), Err(Error::MalformedRecord { .. })));
    }
}
