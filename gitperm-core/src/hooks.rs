//! git hook installation
//!
//! Wires gitperm into the git lifecycle:
//! - pre-commit: `gitperm commit` records metadata and stages the store
//! - post-merge: `gitperm merge` restores metadata after a pull/merge
//!
//! Dev mode installs only pre-commit, running `gitperm dev commit`.
//! Existing hook scripts are appended to, never replaced.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Hooks gitperm can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    PreCommit,
    PostMerge,
}

impl HookEvent {
    /// Hook script file name
    pub fn name(self) -> &'static str {
        match self {
            HookEvent::PreCommit => "pre-commit",
            HookEvent::PostMerge => "post-merge",
        }
    }
}

/// Hook lines to install for `command` in the given mode.
pub fn invocations(command: &str, dev_mode: bool) -> Vec<(HookEvent, String)> {
    if dev_mode {
        vec![(HookEvent::PreCommit, format!("{} dev commit", command))]
    } else {
        vec![
            (HookEvent::PreCommit, format!("{} commit", command)),
            (HookEvent::PostMerge, format!("{} merge", command)),
        ]
    }
}

/// Appends invocation lines to hook scripts in a hooks directory.
pub struct HookInstaller {
    hooks_dir: PathBuf,
}

impl HookInstaller {
    pub fn new(hooks_dir: impl Into<PathBuf>) -> Self {
        Self {
            hooks_dir: hooks_dir.into(),
        }
    }

    /// Return the path to a named hook script.
    pub fn hook_path(&self, event: HookEvent) -> PathBuf {
        self.hooks_dir.join(event.name())
    }

    /// Ensure the hooks directory exists (creates it if missing).
    pub fn ensure_hooks_dir(&self) -> Result<()> {
        if !self.hooks_dir.exists() {
            fs::create_dir_all(&self.hooks_dir)
                .with_context(|| format!("Failed to create hooks directory {:?}", self.hooks_dir))?;
        }
        Ok(())
    }

    /// Append `line` to the hook for `event` unless it is already there.
    ///
    /// A missing hook is created as a `/bin/sh` script. The hook is left
    /// executable either way. Returns whether the script changed.
    pub fn install(&self, event: HookEvent, line: &str) -> Result<bool> {
        self.ensure_hooks_dir()?;
        let hook_path = self.hook_path(event);

        let existing = if hook_path.exists() {
            fs::read_to_string(&hook_path).with_context(|| format!("Failed to read hook {:?}", hook_path))?
        } else {
            String::new()
        };

        let changed = if existing.lines().any(|l| l.trim() == line) {
            false
        } else {
            let mut text = String::new();
            if existing.is_empty() {
                text.push_str("#!/bin/sh\n");
            } else if !existing.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(line);
            text.push('\n');

            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&hook_path)
                .with_context(|| format!("Failed to open hook {:?}", hook_path))?;
            file.write_all(text.as_bytes())?;
            true
        };

        make_executable(&hook_path)?;
        Ok(changed)
    }

    /// Install every invocation for `command` in the given mode.
    ///
    /// Returns the events whose scripts changed.
    pub fn install_all(&self, command: &str, dev_mode: bool) -> Result<Vec<HookEvent>> {
        let mut changed = Vec::new();
        for (event, line) in invocations(command, dev_mode) {
            if self.install(event, &line)? {
                tracing::info!("Installed '{}' into {} hook", line, event.name());
                changed.push(event);
            } else {
                tracing::debug!("{} hook already runs '{}'", event.name(), line);
            }
        }
        Ok(changed)
    }
}

fn make_executable(path: &Path) -> Result<()> {
    let mode = fs::metadata(path)?.permissions().mode();
    if mode & 0o111 != 0o111 {
        fs::set_permissions(path, fs::Permissions::from_mode((mode | 0o755) & 0o7777))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_hook(dir: &Path, name: &str, script: &str) {
        let hooks_dir = dir.join("hooks");
        fs::create_dir_all(&hooks_dir).unwrap();
        let hook_path = hooks_dir.join(name);
        fs::write(&hook_path, script).unwrap();
        fs::set_permissions(&hook_path, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn test_invocations_per_mode() {
        let normal = invocations("gitperm", false);
        assert_eq!(
            normal,
            vec![
                (HookEvent::PreCommit, "gitperm commit".to_string()),
                (HookEvent::PostMerge, "gitperm merge".to_string()),
            ]
        );
        let dev = invocations("/opt/bin/gitperm", true);
        assert_eq!(dev, vec![(HookEvent::PreCommit, "/opt/bin/gitperm dev commit".to_string())]);
    }

    #[test]
    fn test_install_creates_script() {
        let tmp = TempDir::new().unwrap();
        let installer = HookInstaller::new(tmp.path().join("hooks"));
        assert!(installer.install(HookEvent::PreCommit, "gitperm commit").unwrap());

        let path = installer.hook_path(HookEvent::PreCommit);
        assert_eq!(fs::read_to_string(&path).unwrap(), "#!/bin/sh\ngitperm commit\n");
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o755);
    }

    #[test]
    fn test_install_appends_to_existing_script() {
        let tmp = TempDir::new().unwrap();
        make_hook(tmp.path(), "pre-commit", "#!/bin/bash\n./run-lint");
        let installer = HookInstaller::new(tmp.path().join("hooks"));
        installer.install(HookEvent::PreCommit, "gitperm commit").unwrap();

        let path = installer.hook_path(HookEvent::PreCommit);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#!/bin/bash\n./run-lint\ngitperm commit\n"
        );
        assert_ne!(fs::metadata(&path).unwrap().permissions().mode() & 0o111, 0);
    }

    #[test]
    fn test_install_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let installer = HookInstaller::new(tmp.path().join("hooks"));
        assert_eq!(installer.install_all("gitperm", false).unwrap().len(), 2);
        assert!(installer.install_all("gitperm", false).unwrap().is_empty());

        let script = fs::read_to_string(installer.hook_path(HookEvent::PostMerge)).unwrap();
        assert_eq!(script.matches("gitperm merge").count(), 1);
    }

    #[test]
    fn test_dev_mode_installs_pre_commit_only() {
        let tmp = TempDir::new().unwrap();
        let installer = HookInstaller::new(tmp.path().join("hooks"));
        let changed = installer.install_all("gitperm", true).unwrap();

        assert_eq!(changed, vec![HookEvent::PreCommit]);
        assert!(!installer.hook_path(HookEvent::PostMerge).exists());
        let script = fs::read_to_string(installer.hook_path(HookEvent::PreCommit)).unwrap();
        assert!(script.contains("gitperm dev commit"));
    }

    #[test]
    fn test_installed_hook_runs() {
        let tmp = TempDir::new().unwrap();
        let marker = tmp.path().join("ran");
        let installer = HookInstaller::new(tmp.path().join("hooks"));
        installer
            .install(HookEvent::PostMerge, &format!("touch '{}'", marker.display()))
            .unwrap();

        let status = std::process::Command::new(installer.hook_path(HookEvent::PostMerge))
            .status()
            .unwrap();
        assert!(status.success());
        assert!(marker.exists());
    }
}
