//! Shared helpers for library tests.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;

use run_lib::build::{BuildError, BuildRunner};
use run_lib::defer::DeferList;
use run_lib::import::Importer;
use run_lib::node::EnvNode;
use run_lib::reference::{UrlError, UrlResolver};
use run_lib::source::{Git, GitCli, GitError, SourceCache};
use run_lib::store::Store;
use tempfile::TempDir;

/// Isolated project, store and source cache.
pub struct Sandbox {
  pub temp: TempDir,
  pub counters: Counters,
}

#[derive(Default, Clone)]
pub struct Counters {
  pub clones: Rc<Cell<usize>>,
  pub builds: Rc<Cell<usize>>,
  pub redirects: Rc<Cell<usize>>,
}

impl Counters {
  pub fn total(&self) -> usize {
    self.clones.get() + self.builds.get() + self.redirects.get()
  }
}

impl Sandbox {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let sandbox = Self {
      temp,
      counters: Counters::default(),
    };
    fs::create_dir_all(sandbox.project().join(".git")).unwrap();
    sandbox
  }

  /// Canonical sandbox root.
  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  pub fn project(&self) -> PathBuf {
    let p = self.root().join("project");
    fs::create_dir_all(&p).unwrap();
    p
  }

  pub fn store(&self) -> Store {
    Store::with_path(self.root().join("store"))
  }

  pub fn sources(&self) -> SourceCache {
    SourceCache::with_path(self.root().join("cache").join("src"))
  }

  /// An importer over the real `git` CLI, a publishing build step and
  /// counting URL resolution.
  pub fn importer(&self) -> Importer {
    Importer::new(self.store(), self.sources(), DeferList::new(), false)
      .with_git(Box::new(CountingGit {
        inner: GitCli::new(false),
        clones: self.counters.clones.clone(),
      }))
      .with_runner(Box::new(PublishRunner {
        runs: self.counters.builds.clone(),
      }))
      .with_url_resolver(Box::new(IdentityResolver {
        calls: self.counters.redirects.clone(),
      }))
  }

  /// A root node for the project with an empty environment.
  pub fn root_node(&self, argv: &[&str]) -> EnvNode {
    EnvNode::new(
      self.project(),
      BTreeMap::new(),
      argv.iter().map(|s| s.to_string()).collect(),
    )
  }
}

/// Write `content` to `path`, creating parent directories.
pub fn write_file(path: &Path, content: &str) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

/// Create an executable `.run/<name>` script under `root`.
pub fn write_command(root: &Path, name: &str, body: &str) {
  let path = root.join(".run").join(name);
  write_file(&path, &format!("#!/bin/sh\n{}\n", body));
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  }
}

pub fn git_available() -> bool {
  Command::new("git").arg("--version").output().is_ok()
}

fn git(repo: &Path, args: &[&str]) -> String {
  let out = Command::new("git")
    .args(args)
    .current_dir(repo)
    .env("GIT_AUTHOR_NAME", "test")
    .env("GIT_AUTHOR_EMAIL", "test@example.com")
    .env("GIT_COMMITTER_NAME", "test")
    .env("GIT_COMMITTER_EMAIL", "test@example.com")
    .output()
    .unwrap();
  assert!(out.status.success(), "git {:?} failed", args);
  String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// Commit the tree at `repo` into a fresh repository and return the commit.
pub fn commit_repo(repo: &Path) -> String {
  if !repo.join(".git").exists() {
    git(repo, &["init", "--quiet"]);
  }
  git(repo, &["add", "-A"]);
  git(repo, &["-c", "commit.gpgsign=false", "commit", "--quiet", "-m", "snapshot"]);
  git(repo, &["rev-parse", "HEAD"])
}

/// The `file://` URL of a local repository.
pub fn file_url(repo: &Path) -> String {
  format!("file://{}", repo.display())
}

struct CountingGit {
  inner: GitCli,
  clones: Rc<Cell<usize>>,
}

impl Git for CountingGit {
  fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
    self.clones.set(self.clones.get() + 1);
    self.inner.clone_repo(url, dest)
  }

  fn checkout(&self, repo: &Path, rev: &str) -> Result<(), GitError> {
    self.inner.checkout(repo, rev)
  }

  fn head(&self, repo: &Path) -> Result<String, GitError> {
    self.inner.head(repo)
  }
}

/// Publishes the source's own `.run` directory as the build output.
struct PublishRunner {
  runs: Rc<Cell<usize>>,
}

impl BuildRunner for PublishRunner {
  fn run(&self, src: &Path) -> Result<(), BuildError> {
    self.runs.set(self.runs.get() + 1);
    let from = src.join(".run");
    let out = src.join("out");
    let to = if from.is_dir() { out.join(".run") } else { out };
    fs::create_dir_all(&to).map_err(|source| BuildError::Spawn {
      program: PathBuf::from("publish"),
      source,
    })?;
    if !from.is_dir() {
      return Ok(());
    }
    for entry in fs::read_dir(&from).unwrap() {
      let entry = entry.unwrap();
      if entry.file_type().unwrap().is_file() {
        fs::copy(entry.path(), to.join(entry.file_name())).unwrap();
      }
    }
    Ok(())
  }
}

struct IdentityResolver {
  calls: Rc<Cell<usize>>,
}

impl UrlResolver for IdentityResolver {
  fn resolve(&self, url: &str) -> Result<String, UrlError> {
    self.calls.set(self.calls.get() + 1);
    Ok(url.to_string())
  }
}
