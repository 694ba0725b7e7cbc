//! Stat collaborator
//!
//! Produces the raw mode/owner/group of a filesystem object without following
//! symlinks. Two families of backend exist:
//!
//! - [`NativeStat`] reads `lstat` through `std` and resolves names with libc.
//! - [`CommandStat`] shells out to `stat(1)`, whose format flags differ
//!   between GNU coreutils (`stat -c`) and the BSDs/macOS (`stat -f`).

use crate::config::StatBackend;
use crate::error::{Error, Result};
use crate::ids;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::process::Command;

/// Raw stat result normalized across backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStat {
    /// Full `st_mode`, file type bits included
    pub mode_bits: u32,
    pub owner_name: Option<String>,
    pub uid: u32,
    pub group_name: Option<String>,
    pub gid: u32,
    pub is_symlink: bool,
}

/// Source of [`RawStat`] values
pub trait StatProvider {
    /// Stat `path` without following a final symlink.
    ///
    /// A vanished path is reported as [`Error::MissingTarget`].
    fn stat(&self, path: &Path) -> Result<RawStat>;
}

/// Construct the provider selected in configuration.
pub fn provider(backend: StatBackend) -> Box<dyn StatProvider> {
    match backend {
        StatBackend::Native => Box::new(NativeStat),
        StatBackend::Gnu => Box::new(CommandStat::new(StatFlavor::Gnu)),
        StatBackend::Bsd => Box::new(CommandStat::new(StatFlavor::Bsd)),
    }
}

/// In-process `lstat` backend
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeStat;

impl StatProvider for NativeStat {
    fn stat(&self, path: &Path) -> Result<RawStat> {
        let meta = fs::symlink_metadata(path).map_err(|e| Error::from_io_at(e, path))?;
        let (uid, gid) = (meta.uid(), meta.gid());
        Ok(RawStat {
            mode_bits: meta.mode(),
            owner_name: ids::user_name(uid),
            uid,
            group_name: ids::group_name(gid),
            gid,
            is_symlink: meta.file_type().is_symlink(),
        })
    }
}

/// Output convention of the platform's `stat(1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatFlavor {
    /// GNU coreutils
    Gnu,
    /// FreeBSD, OpenBSD, macOS
    Bsd,
}

impl StatFlavor {
    /// Arguments requesting `<mode> <user> <uid> <group> <gid> <type>`.
    /// The type comes last because it may contain spaces.
    fn args(self) -> [&'static str; 2] {
        match self {
            StatFlavor::Gnu => ["-c", "%f %U %u %G %g %F"],
            StatFlavor::Bsd => ["-f", "%Op %Su %u %Sg %g %HT"],
        }
    }

    /// Parse one line of `stat` output in this flavor.
    pub fn parse(self, output: &str) -> Result<RawStat> {
        let bad = || Error::ToolOutput {
            tool: "stat".to_string(),
            output: output.to_string(),
        };

        let line = output.trim_end_matches(['\n', '\r']);
        let mut fields = line.splitn(6, ' ');
        let mut next = || fields.next().filter(|f| !f.is_empty()).ok_or_else(bad);
        let (mode, user, uid, group, gid, kind) = (next()?, next()?, next()?, next()?, next()?, next()?);

        // GNU %f is hex, BSD %Op is octal; both carry the file type bits.
        let radix = match self {
            StatFlavor::Gnu => 16,
            StatFlavor::Bsd => 8,
        };
        let mode_bits = u32::from_str_radix(mode, radix).map_err(|_| bad())?;
        let uid: u32 = uid.parse().map_err(|_| bad())?;
        let gid: u32 = gid.parse().map_err(|_| bad())?;

        Ok(RawStat {
            mode_bits,
            owner_name: symbolic(user, uid),
            uid,
            group_name: symbolic(group, gid),
            gid,
            is_symlink: kind.eq_ignore_ascii_case("symbolic link"),
        })
    }
}

/// GNU prints `UNKNOWN` and BSD prints the number when an id has no name.
fn symbolic(name: &str, id: u32) -> Option<String> {
    if name == "UNKNOWN" || name == id.to_string() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Backend running the `stat` command
#[derive(Debug, Clone, Copy)]
pub struct CommandStat {
    flavor: StatFlavor,
}

impl CommandStat {
    pub fn new(flavor: StatFlavor) -> Self {
        Self { flavor }
    }
}

impl StatProvider for CommandStat {
    fn stat(&self, path: &Path) -> Result<RawStat> {
        fs::symlink_metadata(path).map_err(|e| Error::from_io_at(e, path))?;

        let output = Command::new("stat")
            .args(self.flavor.args())
            .arg(path)
            .output()?;
        if !output.status.success() {
            return Err(Error::ToolOutput {
                tool: "stat".to_string(),
                output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        self.flavor.parse(&String::from_utf8_lossy(&output.stdout))
    }
}
