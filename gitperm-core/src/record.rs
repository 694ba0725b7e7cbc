//! Metadata record value type and its one-line text form
//!
//! A record is stored as a single line: `<mode> <owner>:<group>`, for example
//! `0755 alice:staff` or `0644 0:0`.

use crate::error::{Error, Result};
use std::fmt;

/// Mode bits kept in a record (permissions plus setuid/setgid/sticky)
pub const MODE_MASK: u32 = 0o7777;

/// Mode recorded for every symbolic link
pub const SYMLINK_MODE: u32 = 0o777;

/// Stored mode/owner/group for one repository path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub mode: u32,
    /// Symbolic user name or numeric uid
    pub owner: String,
    /// Symbolic group name or numeric gid
    pub group: String,
}

impl MetadataRecord {
    pub fn new(mode: u32, owner: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            mode: mode & MODE_MASK,
            owner: owner.into(),
            group: group.into(),
        }
    }

    /// Parse a stored line. `path` is only used for error reporting.
    pub fn parse(path: &str, line: &str) -> Result<Self> {
        let malformed = || Error::MalformedRecord {
            path: path.to_string(),
            line: line.to_string(),
        };

        let body = line.strip_suffix('\n').unwrap_or(line);
        let (mode, ownership) = body.split_once(' ').ok_or_else(malformed)?;
        let (owner, group) = ownership.split_once(':').ok_or_else(malformed)?;

        let mode_ok = (3..=4).contains(&mode.len()) && mode.bytes().all(|b| (b'0'..=b'7').contains(&b));
        if !mode_ok || !is_id_spec(owner) || !is_id_spec(group) {
            return Err(malformed());
        }
        let mode = u32::from_str_radix(mode, 8).map_err(|_| malformed())?;

        Ok(Self::new(mode, owner, group))
    }

    /// Text written to the store file, newline-terminated.
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }

    /// `owner:group` form accepted by chown(1)
    pub fn ownership(&self) -> String {
        format!("{}:{}", self.owner, self.group)
    }
}

impl fmt::Display for MetadataRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o} {}:{}", self.mode, self.owner, self.group)
    }
}

fn is_id_spec(s: &str) -> bool {
    !s.is_empty() && !s.contains(|c: char| c == ':' || c.is_whitespace() || c.is_control())
}
