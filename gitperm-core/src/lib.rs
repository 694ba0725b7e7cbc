//! gitperm Core Library
//!
//! Keeps file mode, owner and group of a git work tree in a flat-file store
//! committed next to the code:
//! - Path codec mapping repository paths to flat store keys
//! - Metadata store (one single-line file per tracked path)
//! - Tree listing with synthesized directory entries
//! - Reconciliation of the live tree against the store
//! - Restore of stored metadata onto the filesystem
//! - git, stat and hook collaborators

pub mod apply;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod hooks;
pub mod ids;
pub mod lister;
pub mod ops;
pub mod reapply;
pub mod reconcile;
pub mod record;
pub mod stat;
pub mod store;
pub mod vcs;

pub use apply::{Applier, NativeApplier};
pub use codec::{decode, encode, RepoPath};
pub use config::{Config, StatBackend};
pub use context::RepoContext;
pub use error::{Error, Result};
pub use hooks::{HookEvent, HookInstaller};
pub use lister::Snapshot;
pub use reapply::{reapply, ReapplyReport};
pub use reconcile::{reconcile, Change, ReconcileOptions, ReconcileReport};
pub use record::MetadataRecord;
pub use stat::{CommandStat, NativeStat, RawStat, StatFlavor, StatProvider};
pub use store::MetadataStore;
pub use vcs::{GitCli, Vcs};
