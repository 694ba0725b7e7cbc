//! Lifecycle operations run from git hooks

use crate::apply::Applier;
use crate::context::RepoContext;
use crate::error::Result;
use crate::lister;
use crate::reapply::{self, ReapplyReport};
use crate::reconcile::{self, ReconcileOptions, ReconcileReport};
use crate::stat::StatProvider;
use crate::vcs::Vcs;

/// Pre-commit: record metadata for the tracked tree and stage the store.
///
/// If the pass leaves the store empty the store directory is dropped from
/// the index instead, since there is nothing to add.
pub fn commit(
    vcs: &dyn Vcs,
    ctx: &RepoContext,
    stat: &dyn StatProvider,
    dev_mode: bool,
) -> Result<ReconcileReport> {
    let options = ReconcileOptions::from_config(ctx.config(), dev_mode)?;
    let snapshot = lister::current_snapshot(vcs, ctx.store_dir())?;
    let store = ctx.store();

    let report = reconcile::reconcile(ctx.root(), &snapshot, &store, stat, &options)?;

    if store.list_all()?.is_empty() {
        vcs.unstage(ctx.store_dir())?;
    } else {
        vcs.stage(ctx.store_dir())?;
    }
    Ok(report)
}

/// Post-merge: restore stored metadata onto the work tree.
///
/// Dev-mode stores hold placeholder ownership, so nothing is applied in dev
/// mode and `None` is returned.
pub fn merge(ctx: &RepoContext, applier: &dyn Applier, dev_mode: bool) -> Result<Option<ReapplyReport>> {
    if dev_mode {
        tracing::info!("Dev mode: skipping metadata restore");
        return Ok(None);
    }
    reapply::reapply(ctx.root(), &ctx.store(), applier).map(Some)
}
