//! Apply collaborator: writes mode and ownership back onto the filesystem

use crate::error::{Error, Result};
use crate::ids;
use crate::record::MetadataRecord;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

/// Filesystem mutations needed to restore a record.
pub trait Applier {
    /// Set permission bits on `path`.
    fn chmod(&self, path: &Path, mode: u32) -> Result<()>;

    /// Set owner and group; each spec is a symbolic name or a numeric id.
    fn chown(&self, path: &Path, owner: &str, group: &str) -> Result<()>;

    /// Apply a full record. Ownership goes first since chown may clear
    /// setuid/setgid bits.
    fn apply(&self, path: &Path, record: &MetadataRecord) -> Result<()> {
        self.chown(path, &record.owner, &record.group)?;
        self.chmod(path, record.mode)
    }
}

/// [`Applier`] using the process's own privileges
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeApplier;

impl Applier for NativeApplier {
    fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        let meta = fs::symlink_metadata(path).map_err(|e| Error::from_io_at(e, path))?;
        if meta.file_type().is_symlink() {
            // chmod would follow the link and change its target.
            return Ok(());
        }
        if meta.mode() & 0o7777 == mode {
            return Ok(());
        }
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| Error::from_io_at(e, path))
    }

    fn chown(&self, path: &Path, owner: &str, group: &str) -> Result<()> {
        let uid = ids::resolve_uid(owner).ok_or_else(|| Error::UnknownId(owner.to_string()))?;
        let gid = ids::resolve_gid(group).ok_or_else(|| Error::UnknownId(group.to_string()))?;

        let meta = fs::symlink_metadata(path).map_err(|e| Error::from_io_at(e, path))?;
        if meta.uid() == uid && meta.gid() == gid {
            return Ok(());
        }
        std::os::unix::fs::lchown(path, Some(uid), Some(gid)).map_err(|e| Error::from_io_at(e, path))
    }
}
