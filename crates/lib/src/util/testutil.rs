//! Test utilities for run-lib.
//!
//! Helpers to lay out project roots, command namespaces and git repositories
//! on disk.

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::consts::NAMESPACE_DIR;

/// Write `content` to `path`, creating parent directories.
pub fn write_file(path: &Path, content: &str) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

/// Create an executable command `name` in `root`'s namespace.
pub fn write_command(root: &Path, name: &str, body: &str) {
  let path = root.join(NAMESPACE_DIR).join(name);
  write_file(&path, &format!("#!/bin/sh\n{}\n", body));
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  }
}

/// Whether a `git` binary is available to tests.
pub fn git_available() -> bool {
  Command::new("git").arg("--version").output().is_ok()
}

/// Run `git` in `repo`, panicking on failure, and return trimmed stdout.
pub fn git(repo: &Path, args: &[&str]) -> String {
  let out = Command::new("git")
    .args(args)
    .current_dir(repo)
    .env("GIT_AUTHOR_NAME", "test")
    .env("GIT_AUTHOR_EMAIL", "test@example.com")
    .env("GIT_COMMITTER_NAME", "test")
    .env("GIT_COMMITTER_EMAIL", "test@example.com")
    .output()
    .expect("failed to run git");
  assert!(out.status.success(), "git command failed: {args:?}");
  String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// Initialize a repository at `repo` and commit everything in it.
///
/// Returns the commit id.
pub fn git_commit_all(repo: &Path, message: &str) -> String {
  if !repo.join(".git").exists() {
    git(repo, &["init", "--quiet"]);
  }
  git(repo, &["add", "-A"]);
  git(repo, &["-c", "commit.gpgsign=false", "commit", "--quiet", "--allow-empty", "-m", message]);
  git(repo, &["rev-parse", "HEAD"])
}
