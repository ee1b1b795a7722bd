//! Breadth-first command resolution.
//!
//! The search starts at the invocation root. Each dequeued node is
//! initialized (lock file, config hook, imports), its `RUNPATH` entries are
//! enqueued as children, and `argv[0]` is looked up in the node's command
//! namespaces. The first hit wins, so a command at the invocation root always
//! beats one provided by an imported package, and sibling packages are tried
//! before any package's own imports.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::consts::PATH_VAR;
use crate::import::Importer;
use crate::lock::LockError;
use crate::node::{EnvNode, NodeError};

#[derive(Debug, Error)]
pub enum ResolveError {
  #[error(transparent)]
  Node(#[from] NodeError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error("bad command: {0}")]
  BadCommand(String),

  #[error("no command given")]
  NoCommand,
}

/// The command a resolution settled on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
  /// Absolute path of the executable.
  pub program: PathBuf,
  /// Full argument list, `argv[0]` included.
  pub argv: Vec<String>,
  /// Environment of the winning node.
  pub env: BTreeMap<String, String>,
}

impl Resolution {
  /// Arguments after `argv[0]`.
  pub fn args(&self) -> &[String] {
    self.argv.get(1..).unwrap_or_default()
  }
}

/// Resolve `root`'s `argv[0]`.
///
/// The root lock table is written back afterwards if anything was pinned,
/// whether or not a command was found.
pub fn resolve(root: EnvNode, importer: &Importer) -> Result<Resolution, ResolveError> {
  resolve_from(root, importer, false)
}

/// Like [`resolve`], for a root that has already been initialized.
pub fn resolve_prepared(root: EnvNode, importer: &Importer) -> Result<Resolution, ResolveError> {
  resolve_from(root, importer, true)
}

fn resolve_from(root: EnvNode, importer: &Importer, prepared: bool) -> Result<Resolution, ResolveError> {
  let root_path = root.path.clone();
  let root_locks = root.root_locks();

  let result = search(root, importer, prepared);

  if matches!(result, Ok(_) | Err(ResolveError::BadCommand(_)) | Err(ResolveError::NoCommand)) {
    let locks = root_locks.borrow();
    if locks.is_changed() {
      locks.write(&root_path)?;
    }
  }
  result
}

fn search(root: EnvNode, importer: &Importer, mut prepared: bool) -> Result<Resolution, ResolveError> {
  let mut visited = HashSet::from([root.path.clone()]);
  let mut queue = VecDeque::from([root]);
  let mut wanted: Option<String> = None;

  while let Some(mut node) = queue.pop_front() {
    if !std::mem::take(&mut prepared) {
      node.init(importer)?;
    }
    let id = node.id(importer.store()).to_string();
    trace!(path = %node.path.display(), id, "visiting node");

    for entry in node.runpath() {
      let path = PathBuf::from(&entry);
      if path == node.path || !visited.insert(path) {
        continue;
      }
      queue.push_back(node.child(&entry, &id));
    }

    let Some(name) = node.argv.first() else {
      continue;
    };
    if wanted.is_none() {
      wanted = Some(name.clone());
    }
    if let Some(program) = lookup(&node, name) {
      info!(command = %name, program = %program.display(), "resolved command");
      return Ok(Resolution {
        program,
        argv: node.argv,
        env: node.env,
      });
    }
  }

  match wanted {
    Some(name) => Err(ResolveError::BadCommand(name)),
    None => Err(ResolveError::NoCommand),
  }
}

/// Find `name` among `node`'s command namespaces.
///
/// Only bare names are looked up; anything with a directory part would reach
/// outside the namespaces.
fn lookup(node: &EnvNode, name: &str) -> Option<PathBuf> {
  let mut parts = Path::new(name).components();
  if !matches!((parts.next(), parts.next()), (Some(Component::Normal(_)), None)) {
    debug!(command = name, "not a bare command name");
    return None;
  }
  let env = node.lp_env();
  let search = env.get(PATH_VAR).filter(|p| !p.is_empty())?;
  match which::which_in(name, Some(search), &node.path) {
    Ok(path) => Some(path),
    Err(e) => {
      debug!(command = name, path = %search, error = %e, "not found in node");
      None
    }
  }
}
