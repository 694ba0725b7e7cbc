//! Restore pass: applies every stored record onto the work tree

use crate::apply::Applier;
use crate::error::Result;
use crate::store::MetadataStore;
use std::fmt;
use std::path::Path;

/// Outcome of a restore pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapplyReport {
    pub applied: usize,
    /// Entries whose record was unreadable or whose target could not be updated
    pub skipped: usize,
}

impl fmt::Display for ReapplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "applied:{}, skipped:{}", self.applied, self.skipped)
    }
}

/// Apply every record in `store` to the matching path under `root`.
///
/// Failures are per entry: they are logged, counted and the pass moves on.
/// Only a store directory that cannot be listed aborts the pass.
pub fn reapply(root: &Path, store: &MetadataStore, applier: &dyn Applier) -> Result<ReapplyReport> {
    let mut report = ReapplyReport::default();

    for path in store.list_all()? {
        let record = match store.read(&path) {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path, e);
                report.skipped += 1;
                continue;
            }
        };

        let target = path.to_fs_path(root);
        match applier.apply(&target, &record) {
            Ok(()) => {
                tracing::debug!("Applied {} to {}", record, path);
                report.applied += 1;
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path, e);
                report.skipped += 1;
            }
        }
    }

    tracing::info!("Restore finished: {}", report);
    Ok(report)
}
