//! Repository context resolved once at startup

use crate::config::Config;
use crate::error::Result;
use crate::store::MetadataStore;
use crate::vcs::Vcs;
use std::path::{Path, PathBuf};

/// Immutable view of the repository a command operates on.
#[derive(Debug, Clone)]
pub struct RepoContext {
    root: PathBuf,
    git_dir: PathBuf,
    hooks_dir: PathBuf,
    config: Config,
}

impl RepoContext {
    /// Build the context from a discovered repository, loading its config.
    pub fn from_vcs(vcs: &dyn Vcs) -> Result<Self> {
        let config = Config::load(vcs.git_dir())?;
        Ok(Self::new(vcs, config))
    }

    /// Build the context with an explicit config.
    pub fn new(vcs: &dyn Vcs, config: Config) -> Self {
        Self {
            root: vcs.root().to_path_buf(),
            git_dir: vcs.git_dir().to_path_buf(),
            hooks_dir: vcs.hooks_dir().to_path_buf(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn hooks_dir(&self) -> &Path {
        &self.hooks_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Store directory relative to the root, without a trailing slash
    pub fn store_dir(&self) -> &str {
        self.config.store_dir.trim_end_matches('/')
    }

    /// The metadata store of this repository
    pub fn store(&self) -> MetadataStore {
        MetadataStore::new(self.root.join(self.store_dir()))
    }
}
