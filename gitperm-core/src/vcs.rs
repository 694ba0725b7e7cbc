//! Version control collaborator
//!
//! gitperm only needs a narrow slice of git: where the work tree and hooks
//! live, which paths are tracked, and staging of the store directory.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// The operations gitperm needs from the version control system.
pub trait Vcs {
    /// Absolute work tree root
    fn root(&self) -> &Path;

    /// Absolute git metadata directory (`.git`)
    fn git_dir(&self) -> &Path;

    /// Directory holding hook scripts (honors `core.hooksPath`)
    fn hooks_dir(&self) -> &Path;

    /// Every tracked file, relative to the root, in git's order.
    fn list_tracked_paths(&self) -> Result<Vec<String>>;

    /// Stage `path` (relative to the root), including deletions under it.
    fn stage(&self, path: &str) -> Result<()>;

    /// Drop `path` (relative to the root) from the index, keeping the work tree.
    fn unstage(&self, path: &str) -> Result<()>;
}

/// [`Vcs`] backed by the `git` command line tool
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
    git_dir: PathBuf,
    hooks_dir: PathBuf,
}

impl GitCli {
    /// Locate the repository containing `start`.
    ///
    /// Fails with [`Error::Environment`] when git is unavailable or `start` is
    /// not inside a work tree.
    pub fn discover(start: &Path) -> Result<Self> {
        let environment = |e: Error| match e {
            Error::Vcs { message, .. } => Error::Environment(format!("not a git work tree: {}", message)),
            other => other,
        };

        let root = PathBuf::from(run_git(start, &["rev-parse", "--show-toplevel"]).map_err(environment)?.trim());
        let git_dir = PathBuf::from(run_git(&root, &["rev-parse", "--absolute-git-dir"]).map_err(environment)?.trim());
        let hooks = PathBuf::from(run_git(&root, &["rev-parse", "--git-path", "hooks"]).map_err(environment)?.trim());
        let hooks_dir = if hooks.is_absolute() { hooks } else { root.join(hooks) };

        tracing::debug!("Discovered repository at {:?} (git dir {:?})", root, git_dir);
        Ok(Self { root, git_dir, hooks_dir })
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        run_git(&self.root, args)
    }
}

impl Vcs for GitCli {
    fn root(&self) -> &Path {
        &self.root
    }

    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn hooks_dir(&self) -> &Path {
        &self.hooks_dir
    }

    fn list_tracked_paths(&self) -> Result<Vec<String>> {
        let out = self.git(&["ls-files", "-z"])?;
        Ok(parse_nul_list(&out))
    }

    fn stage(&self, path: &str) -> Result<()> {
        self.git(&["add", "--all", "--", path]).map(|_| ())
    }

    fn unstage(&self, path: &str) -> Result<()> {
        self.git(&["rm", "-r", "-q", "--cached", "--ignore-unmatch", "--", path])
            .map(|_| ())
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let command = args.first().copied().unwrap_or_default().to_string();
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(|e| Error::Environment(format!("failed to execute git: {}", e)))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            format!("exited with code {}", output.status.code().unwrap_or(-1))
        } else {
            stderr.trim().to_string()
        };
        Err(Error::Vcs { command, message })
    }
}

/// Split `git ... -z` output into entries.
fn parse_nul_list(out: &str) -> Vec<String> {
    out.split('\0')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
