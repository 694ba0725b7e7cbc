//! Repository paths and their flat store keys
//!
//! The store keeps one file per tracked path with no subdirectories, so every
//! repository-relative path is mapped to a single file name:
//!
//! ```text
//! dir/sub/file.txt   ->  @dir%2Fsub%2Ffile.txt
//! 100%/done          ->  @100%25%2Fdone
//! ```
//!
//! The `@` sentinel marks a file as a key. A name without it, or one that
//! decodes to nothing, is rejected instead of being mapped onto the store root.

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Marker prepended to every encoded key
pub const KEY_SENTINEL: char = '@';

const ESCAPED_SEPARATOR: &str = "%2F";
const ESCAPED_PERCENT: &str = "%25";

/// A validated, slash-separated path relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoPath(String);

impl RepoPath {
    /// Validate and wrap a relative path.
    ///
    /// Rejects empty paths, absolute or trailing-slash paths, NUL bytes and
    /// empty, `.` or `..` components.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let valid = !path.is_empty()
            && !path.contains('\0')
            && path
                .split('/')
                .all(|c| !c.is_empty() && c != "." && c != "..");
        if valid {
            Ok(Self(path))
        } else {
            Err(Error::InvalidPath(path))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parent directory, or `None` for a top-level entry.
    pub fn parent(&self) -> Option<RepoPath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| RepoPath(parent.to_string()))
    }

    /// True if this path is `dir` itself or lies underneath it.
    pub fn is_within(&self, dir: &str) -> bool {
        let dir = dir.trim_end_matches('/');
        self.0 == dir
            || (self.0.len() > dir.len()
                && self.0.starts_with(dir)
                && self.0.as_bytes()[dir.len()] == b'/')
    }

    /// Absolute location of this path under `root`.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, c| acc.join(c))
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RepoPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encode a repository path as a flat store key.
pub fn encode(path: &RepoPath) -> String {
    let mut key = String::with_capacity(path.0.len() + 8);
    key.push(KEY_SENTINEL);
    for ch in path.0.chars() {
        match ch {
            '%' => key.push_str(ESCAPED_PERCENT),
            '/' => key.push_str(ESCAPED_SEPARATOR),
            c => key.push(c),
        }
    }
    key
}

/// Decode a store key back into a repository path.
///
/// Only the canonical escapes produced by [`encode`] are accepted, so every
/// key that decodes successfully re-encodes to itself.
pub fn decode(key: &str) -> Result<RepoPath> {
    let malformed = || Error::MalformedKey(key.to_string());

    let body = key.strip_prefix(KEY_SENTINEL).ok_or_else(malformed)?;
    if body.is_empty() {
        return Err(malformed());
    }

    let mut path = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(idx) = rest.find(['%', '/']) {
        path.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        if let Some(after) = tail.strip_prefix(ESCAPED_SEPARATOR) {
            path.push('/');
            rest = after;
        } else if let Some(after) = tail.strip_prefix(ESCAPED_PERCENT) {
            path.push('%');
            rest = after;
        } else {
            return Err(malformed());
        }
    }
    path.push_str(rest);

    RepoPath::new(path).map_err(|_| malformed())
}
