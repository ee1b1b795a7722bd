//! Environment nodes: one point in the command search tree.
//!
//! A node carries the environment, argument list and lock table of one
//! filesystem root. Its `RUNPATH` names the roots searched beneath it; every
//! node shares a handle on the topmost node's lock table so that pins recorded
//! anywhere in the tree land in one file.

use std::cell::{OnceCell, Ref, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::consts::{LIST_SEP, NAMESPACE_DIR, PATH_VAR, PKGS_SEP, RUNPATH_VAR, RUNPKGS_VAR};
use crate::import::Importer;
use crate::lock::{LockError, LockTable};
use crate::lua::hook::{HookError, run_config_hook};
use crate::store::Store;

#[derive(Debug, Error)]
pub enum NodeError {
  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  Hook(#[from] HookError),
}

type SharedLocks = Rc<RefCell<LockTable>>;

#[derive(Debug)]
pub struct EnvNode {
  pub env: BTreeMap<String, String>,
  pub argv: Vec<String>,
  pub path: PathBuf,
  locks: SharedLocks,
  /// The topmost node's lock table; `None` on the topmost node itself.
  root: Option<SharedLocks>,
  id: OnceCell<String>,
}

impl Clone for EnvNode {
  /// Deep copy. The clone's root is this node if this node is the root.
  fn clone(&self) -> Self {
    Self {
      env: self.env.clone(),
      argv: self.argv.clone(),
      path: self.path.clone(),
      locks: Rc::new(RefCell::new(self.locks.borrow().clone())),
      root: Some(self.root.clone().unwrap_or_else(|| self.locks.clone())),
      id: self.id.clone(),
    }
  }
}

impl EnvNode {
  /// A topmost node.
  pub fn new(path: PathBuf, env: BTreeMap<String, String>, argv: Vec<String>) -> Self {
    Self {
      env,
      argv,
      path,
      locks: Rc::default(),
      root: None,
      id: OnceCell::new(),
    }
  }

  /// A topmost node for `root` carrying the process environment.
  ///
  /// Variables whose name or value is not valid UTF-8 are left out.
  pub fn from_process(root: &Path, argv: Vec<String>) -> Self {
    let env = std::env::vars_os()
      .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
      .collect();
    Self::new(root.to_path_buf(), env, argv)
  }

  /// A child rooted at `path`, as the search expands beneath this node.
  ///
  /// `RUNPATH` is cleared for the child to compute its own, and `parent_id`
  /// (this node's store key, if any) joins the child's `RUNPKGS` chain.
  pub fn child(&self, path: &str, parent_id: &str) -> Self {
    let mut child = self.clone();
    child.env.remove(RUNPATH_VAR);
    child.path = PathBuf::from(path);
    child.id = OnceCell::new();
    if !parent_id.is_empty() {
      let chain = match child.env.get(RUNPKGS_VAR) {
        Some(existing) if !existing.is_empty() => format!("{}{}{}", existing, PKGS_SEP, parent_id),
        _ => parent_id.to_string(),
      };
      child.env.insert(RUNPKGS_VAR.to_string(), chain);
    }
    child
  }

  pub fn is_root(&self) -> bool {
    self.root.is_none()
  }

  /// The store key of this node's path, or an empty string outside the store.
  pub fn id(&self, store: &Store) -> &str {
    self.id.get_or_init(|| store.id_of(&self.path).unwrap_or_default())
  }

  /// The entries of `RUNPATH`, skipping empty ones.
  pub fn runpath(&self) -> Vec<String> {
    self
      .env
      .get(RUNPATH_VAR)
      .map(|paths| {
        paths
          .split(LIST_SEP)
          .filter(|p| !p.is_empty())
          .map(str::to_string)
          .collect()
      })
      .unwrap_or_default()
  }

  /// Environment for executable lookup.
  ///
  /// `PATH` becomes each `RUNPATH` entry's command namespace, and `RUNPATH`
  /// itself is dropped.
  pub fn lp_env(&self) -> BTreeMap<String, String> {
    let mut env = self.env.clone();
    let path = self
      .runpath()
      .iter()
      .map(|entry| Path::new(entry).join(NAMESPACE_DIR).to_string_lossy().into_owned())
      .collect::<Vec<_>>()
      .join(LIST_SEP);
    env.remove(RUNPATH_VAR);
    env.insert(PATH_VAR.to_string(), path);
    env
  }

  /// Prepare the node for lookup.
  ///
  /// Seeds `RUNPATH` with the node's own path, merges the node's lock file
  /// into its table, then runs its config hook.
  pub fn init(&mut self, importer: &Importer) -> Result<(), NodeError> {
    self
      .env
      .insert(RUNPATH_VAR.to_string(), self.path.to_string_lossy().into_owned());
    if let Some(file) = LockTable::load(&self.path)? {
      debug!(path = %self.path.display(), entries = file.len(), "loaded lock file");
      self.locks.borrow_mut().merge(&file);
    }
    run_config_hook(self, importer)?;
    Ok(())
  }

  /// Revision pinned for `reference`, from this node's table or the root's.
  pub fn locked(&self, reference: &str) -> Option<String> {
    if let Some(rev) = self.locks.borrow().get(reference) {
      return Some(rev.to_string());
    }
    self
      .root
      .as_ref()
      .and_then(|root| root.borrow().get(reference).map(str::to_string))
  }

  /// Pin `reference` to `rev` in the root lock table.
  pub fn set_lock(&self, reference: &str, rev: &str) {
    let table = self.root.as_ref().unwrap_or(&self.locks);
    table.borrow_mut().set(reference, rev);
  }

  /// This node's own lock table.
  pub fn lock_table(&self) -> Ref<'_, LockTable> {
    self.locks.borrow()
  }

  /// Handle on the lock table that [`set_lock`](Self::set_lock) writes to.
  pub fn root_locks(&self) -> Rc<RefCell<LockTable>> {
    self.root.clone().unwrap_or_else(|| self.locks.clone())
  }

  /// Append `path` to `RUNPATH`.
  pub fn push_runpath(&mut self, path: &Path) {
    let path = path.to_string_lossy();
    let joined = match self.env.get(RUNPATH_VAR) {
      Some(current) if !current.is_empty() => format!("{}{}{}", current, LIST_SEP, path),
      _ => path.into_owned(),
    };
    self.env.insert(RUNPATH_VAR.to_string(), joined);
  }
}
