//! Tracked tree listing
//!
//! git tracks files only, so directory entries are synthesized from the
//! parents of every tracked file.

use crate::codec::RepoPath;
use crate::error::Result;
use crate::vcs::Vcs;
use std::collections::BTreeSet;

/// Every path whose metadata should be recorded, in sorted order
pub type Snapshot = BTreeSet<RepoPath>;

/// Build the current snapshot from the VCS file list.
pub fn current_snapshot(vcs: &dyn Vcs, store_dir: &str) -> Result<Snapshot> {
    let files = vcs.list_tracked_paths()?;
    let snapshot = snapshot_from_files(files, store_dir);
    tracing::debug!("Snapshot has {} entries", snapshot.len());
    Ok(snapshot)
}

/// Union of `files` and all of their parent directories, minus the store.
///
/// Entries that are not valid repository paths are logged and dropped.
pub fn snapshot_from_files<I, S>(files: I, store_dir: &str) -> Snapshot
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut snapshot = Snapshot::new();
    for file in files {
        let path = match RepoPath::new(file) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Ignoring tracked entry: {}", e);
                continue;
            }
        };
        if path.is_within(store_dir) {
            continue;
        }

        let mut parent = path.parent();
        snapshot.insert(path);
        while let Some(dir) = parent {
            parent = dir.parent();
            // Parents of an already-seen directory are already present.
            if !snapshot.insert(dir) {
                break;
            }
        }
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn test_synthesizes_directories_once() {
        let snap = snapshot_from_files(["a.txt", "dir/b.txt", "dir/c.txt", "dir/sub/d.txt"], ".gitperm");
        assert_eq!(
            names(&snap),
            vec!["a.txt", "dir", "dir/b.txt", "dir/c.txt", "dir/sub", "dir/sub/d.txt"]
        );
    }

    #[test]
    fn test_excludes_store_directory() {
        let snap = snapshot_from_files(
            [".gitperm/@a.txt", ".gitperm", "a.txt", ".gitpermissions"],
            ".gitperm",
        );
        assert_eq!(names(&snap), vec![".gitpermissions", "a.txt"]);
    }

    #[test]
    fn test_order_insensitive() {
        let a = snapshot_from_files(["x/y/z", "b", "x/a"], ".gitperm");
        let b = snapshot_from_files(["x/a", "x/y/z", "b", "x/a"], ".gitperm");
        assert_eq!(a, b);
    }

    #[test]
    fn test_drops_invalid_entries() {
        let snap = snapshot_from_files(["", "ok", "bad//path"], ".gitperm");
        assert_eq!(names(&snap), vec!["ok"]);
    }
}
