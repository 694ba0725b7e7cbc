//! gitperm configuration
//!
//! Stored at `<git-dir>/gitperm.json` so it stays local to a clone and is never
//! committed. A missing file means defaults.

use crate::error::{Error, Result};
use crate::record::MetadataRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file name inside the git directory
pub const CONFIG_FILE: &str = "gitperm.json";

/// Environment variable overriding [`Config::store_dir`]
pub const STORE_DIR_ENV: &str = "GITPERM_STORE_DIR";

/// Conventional uid/gid of the unprivileged "nobody" account
pub const DEFAULT_NOBODY_ID: u32 = 65534;

/// Which stat backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatBackend {
    /// In-process lstat
    #[default]
    Native,
    /// GNU coreutils `stat -c`
    Gnu,
    /// BSD/macOS `stat -f`
    Bsd,
}

/// Repository-local settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store directory, relative to the work tree root.
    pub store_dir: String,
    /// Id that is always recorded numerically, alongside 0.
    pub nobody_id: u32,
    /// Decide group pinning from the owner's id, matching databases written
    /// by older tools.
    pub legacy_group_pinning: bool,
    pub stat_backend: StatBackend,
    /// Record written for first-seen paths in dev mode (`"<mode> <owner>:<group>"`).
    pub placeholder: String,
    /// Program invoked from installed hooks.
    pub command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: ".gitperm".to_string(),
            nobody_id: DEFAULT_NOBODY_ID,
            legacy_group_pinning: false,
            stat_backend: StatBackend::Native,
            placeholder: "0644 0:0".to_string(),
            command: "gitperm".to_string(),
        }
    }
}

impl Config {
    pub fn path(git_dir: &Path) -> PathBuf {
        git_dir.join(CONFIG_FILE)
    }

    /// Load config from a git directory, applying environment overrides.
    pub fn load(git_dir: &Path) -> Result<Self> {
        let mut config = Self::load_file(&Self::path(git_dir))?;
        if let Ok(dir) = std::env::var(STORE_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.store_dir = dir;
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Save config into a git directory.
    pub fn save(&self, git_dir: &Path) -> Result<()> {
        let path = Self::path(git_dir);
        let tmp_path = path.with_extension("tmp");
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Check values that would otherwise fail deep inside a pass.
    pub fn validate(&self) -> Result<()> {
        let store_dir = self.store_dir.trim_end_matches('/');
        if store_dir.is_empty() || store_dir.starts_with('/') || store_dir.split('/').any(|c| c.is_empty() || c == "." || c == "..") {
            return Err(Error::Config(format!("invalid store_dir {:?}", self.store_dir)));
        }
        if self.command.trim().is_empty() {
            return Err(Error::Config("command must not be empty".to_string()));
        }
        self.placeholder_record()?;
        Ok(())
    }

    /// Parsed dev-mode placeholder record.
    pub fn placeholder_record(&self) -> Result<MetadataRecord> {
        MetadataRecord::parse("<placeholder>", &self.placeholder)
            .map_err(|_| Error::Config(format!("invalid placeholder {:?}", self.placeholder)))
    }
}
