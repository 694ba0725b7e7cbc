//! Reconciliation of the live tree against the metadata store
//!
//! A pass runs three phases:
//! 1. prune records whose path left the snapshot,
//! 2. stat every snapshot path that still exists,
//! 3. write records that differ from what is stored.
//!
//! Every mutation hits the store as soon as it is decided. An interrupted pass
//! leaves a store that the next pass converges from.

use crate::codec::RepoPath;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::lister::Snapshot;
use crate::record::{MetadataRecord, MODE_MASK, SYMLINK_MODE};
use crate::stat::{RawStat, StatProvider};
use crate::store::MetadataStore;
use std::fmt;
use std::path::Path;

/// Knobs for a reconciliation pass
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Only register first-seen paths, with `placeholder`
    pub dev_mode: bool,
    pub nobody_id: u32,
    pub legacy_group_pinning: bool,
    pub placeholder: MetadataRecord,
}

impl ReconcileOptions {
    pub fn from_config(config: &Config, dev_mode: bool) -> Result<Self> {
        Ok(Self {
            dev_mode,
            nobody_id: config.nobody_id,
            legacy_group_pinning: config.legacy_group_pinning,
            placeholder: config.placeholder_record()?,
        })
    }

    fn is_sentinel(&self, id: u32) -> bool {
        id == 0 || id == self.nobody_id
    }

    /// Record describing `raw` under these options.
    ///
    /// Symlinks get mode 0777. Ids 0 and `nobody_id` are written numerically,
    /// as are ids without a symbolic name.
    pub fn record_for(&self, raw: &RawStat) -> MetadataRecord {
        let mode = if raw.is_symlink {
            SYMLINK_MODE
        } else {
            raw.mode_bits & MODE_MASK
        };

        let pin_owner = self.is_sentinel(raw.uid);
        let pin_group = if self.legacy_group_pinning {
            raw.gid == 0 || raw.uid == self.nobody_id
        } else {
            self.is_sentinel(raw.gid)
        };

        let owner = spec(pin_owner, raw.owner_name.as_deref(), raw.uid);
        let group = spec(pin_group, raw.group_name.as_deref(), raw.gid);
        MetadataRecord::new(mode, owner, group)
    }
}

fn spec(pin: bool, name: Option<&str>, id: u32) -> String {
    match name {
        Some(name) if !pin => name.to_string(),
        _ => id.to_string(),
    }
}

/// One mutation applied to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added {
        path: RepoPath,
        record: MetadataRecord,
    },
    /// `old` is `None` when the previous record could not be parsed.
    Changed {
        path: RepoPath,
        old: Option<MetadataRecord>,
        new: MetadataRecord,
    },
    Removed {
        path: RepoPath,
    },
}

impl Change {
    pub fn path(&self) -> &RepoPath {
        match self {
            Change::Added { path, .. } | Change::Changed { path, .. } | Change::Removed { path } => path,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Added { path, record } => write!(f, "added {} (new file -> {})", path, record),
            Change::Changed { path, old: Some(old), new } => write!(f, "changed {} ({} -> {})", path, old, new),
            Change::Changed { path, old: None, new } => write!(f, "changed {} (unreadable -> {})", path, new),
            Change::Removed { path } => write!(f, "removed {}", path),
        }
    }
}

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    /// Paths left untouched after a per-path failure
    pub skipped: usize,
    /// Mutations in the order they were applied
    pub changes: Vec<Change>,
}

impl ReconcileReport {
    /// Number of records written
    pub fn writes(&self) -> usize {
        self.added + self.changed
    }

    /// True when the pass touched nothing
    pub fn is_clean(&self) -> bool {
        self.changes.is_empty()
    }

    fn push(&mut self, change: Change) {
        tracing::info!("{}", change);
        match change {
            Change::Added { .. } => self.added += 1,
            Change::Changed { .. } => self.changed += 1,
            Change::Removed { .. } => self.removed += 1,
        }
        self.changes.push(change);
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added:{}, removed:{}, changed:{}",
            self.added, self.removed, self.changed
        )
    }
}

/// What the store holds for a path before the write phase
enum Stored {
    Missing,
    Present(MetadataRecord),
    Unreadable,
}

/// Any failure to read the stored record counts as divergence.
fn stored(store: &MetadataStore, path: &RepoPath) -> Stored {
    match store.read(path) {
        Ok(Some(record)) => Stored::Present(record),
        Ok(None) => Stored::Missing,
        Err(e) => {
            tracing::warn!("Unreadable record for {}: {}", path, e);
            Stored::Unreadable
        }
    }
}

/// Apply `change` to the store and report it. A failed write or delete only
/// skips that path.
fn commit_change(store: &MetadataStore, change: Change, report: &mut ReconcileReport) {
    let result = match &change {
        Change::Added { path, record } => store.write(path, record).map(|()| true),
        Change::Changed { path, new, .. } => store.write(path, new).map(|()| true),
        Change::Removed { path } => store.delete(path),
    };
    match result {
        Ok(true) => report.push(change),
        Ok(false) => {}
        Err(e) => {
            tracing::warn!("Skipping {}: {}", change.path(), e);
            report.skipped += 1;
        }
    }
}

/// Bring `store` in line with `snapshot` as seen on disk under `root`.
///
/// Only a store directory that cannot be listed fails the pass; everything
/// else is skipped per path.
pub fn reconcile(
    root: &Path,
    snapshot: &Snapshot,
    store: &MetadataStore,
    stat: &dyn StatProvider,
    options: &ReconcileOptions,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    // Prune
    for path in store.list_all()? {
        if !snapshot.contains(&path) {
            commit_change(store, Change::Removed { path }, &mut report);
        }
    }

    // Stat, compare, write
    for path in snapshot {
        let target = path.to_fs_path(root);
        let raw = match stat.stat(&target) {
            Ok(raw) => raw,
            Err(Error::MissingTarget(_)) => {
                tracing::debug!("Skipping {}: no longer on disk", path);
                report.skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path, e);
                report.skipped += 1;
                continue;
            }
        };
        let fresh = options.record_for(&raw);

        let change = match stored(store, path) {
            Stored::Present(old) if old == fresh => continue,
            Stored::Missing if options.dev_mode => Change::Added {
                path: path.clone(),
                record: options.placeholder.clone(),
            },
            _ if options.dev_mode => {
                tracing::debug!("Keeping existing record for {} in dev mode", path);
                continue;
            }
            Stored::Missing => Change::Added {
                path: path.clone(),
                record: fresh,
            },
            Stored::Present(old) => Change::Changed {
                path: path.clone(),
                old: Some(old),
                new: fresh,
            },
            Stored::Unreadable => Change::Changed {
                path: path.clone(),
                old: None,
                new: fresh,
            },
        };
        commit_change(store, change, &mut report);
    }

    tracing::info!("Reconciled {} paths: {}", snapshot.len(), report);
    Ok(report)
}
