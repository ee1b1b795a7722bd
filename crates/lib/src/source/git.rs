//! Git operations behind a small trait so the fetch pipeline can be driven by
//! a fake in tests.

use std::io;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GitError {
  #[error("failed to run git {args}: {source}")]
  Spawn {
    args: String,
    #[source]
    source: io::Error,
  },

  #[error("git {args} failed ({status}){stderr}")]
  Failed { args: String, status: String, stderr: String },
}

/// The version-control operations needed to materialize a source tree.
pub trait Git {
  /// Full clone of `url` into the (empty) directory `dest`.
  fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError>;

  /// Check out `rev` in the repository at `repo`.
  fn checkout(&self, repo: &Path, rev: &str) -> Result<(), GitError>;

  /// Commit id of `HEAD` in the repository at `repo`.
  fn head(&self, repo: &Path) -> Result<String, GitError>;
}

/// Runs the `git` command line tool.
#[derive(Debug, Default, Clone)]
pub struct GitCli {
  /// Forward git's progress output to stderr instead of silencing it.
  pub verbose: bool,
}

impl GitCli {
  pub fn new(verbose: bool) -> Self {
    Self { verbose }
  }

  fn run(&self, repo: Option<&Path>, args: &[&str]) -> Result<Output, GitError> {
    let mut cmd = Command::new("git");
    if let Some(repo) = repo {
      cmd.arg("-C").arg(repo);
    }
    cmd.args(args).stdin(Stdio::null());
    if self.verbose {
      cmd.stderr(Stdio::inherit());
    }
    debug!(?repo, ?args, "running git");

    let joined = args.join(" ");
    let output = cmd.output().map_err(|source| GitError::Spawn {
      args: joined.clone(),
      source,
    })?;
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      return Err(GitError::Failed {
        args: joined,
        status: output.status.to_string(),
        stderr: if stderr.is_empty() {
          String::new()
        } else {
          format!(": {}", stderr)
        },
      });
    }
    Ok(output)
  }
}

impl Git for GitCli {
  fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
    let dest = dest.to_string_lossy();
    let mut args = vec!["clone"];
    if !self.verbose {
      args.push("--quiet");
    }
    args.extend([url, dest.as_ref()]);
    self.run(None, &args).map(|_| ())
  }

  fn checkout(&self, repo: &Path, rev: &str) -> Result<(), GitError> {
    self.run(Some(repo), &["checkout", "--quiet", rev]).map(|_| ())
  }

  fn head(&self, repo: &Path) -> Result<String, GitError> {
    let output = self.run(Some(repo), &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}
