//! The resolution context: everything one invocation needs, threaded through
//! explicitly instead of living in process globals.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::consts::RUNRPC_VAR;
use crate::defer::DeferList;
use crate::import::{ImportError, Importer, Package};
use crate::lock::LockError;
use crate::node::{EnvNode, NodeError};
use crate::project::{ProjectError, find_git_root, project_id};
use crate::resolve::{Resolution, ResolveError, resolve, resolve_prepared};
use crate::source::SourceCache;
use crate::store::Store;

#[derive(Debug, Error)]
pub enum ContextError {
  #[error(transparent)]
  Project(#[from] ProjectError),

  #[error(transparent)]
  Node(#[from] NodeError),

  #[error(transparent)]
  Import(#[from] ImportError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  Resolve(#[from] ResolveError),
}

#[derive(Debug)]
pub struct RunContext {
  pub root: PathBuf,
  pub project_id: Uuid,
  pub verbose: bool,
  pub defers: DeferList,
  importer: Importer,
}

impl RunContext {
  /// Find the project containing `cwd` and set up the default store, source
  /// cache and collaborators.
  pub fn discover(cwd: &Path, verbose: bool, defers: DeferList) -> Result<Self, ContextError> {
    let root = find_git_root(cwd)?;
    let project_id = project_id(&root)?;
    if std::env::var_os(RUNRPC_VAR).is_none() {
      debug!("{} not set, no rpc collaborator", RUNRPC_VAR);
    }
    let importer = Importer::new(Store::new(), SourceCache::new(), defers.clone(), verbose);
    debug!(root = %root.display(), id = %project_id, "project discovered");
    Ok(Self::new(root, project_id, verbose, defers, importer))
  }

  pub fn new(root: PathBuf, project_id: Uuid, verbose: bool, defers: DeferList, importer: Importer) -> Self {
    Self {
      root,
      project_id,
      verbose,
      defers,
      importer,
    }
  }

  pub fn importer(&self) -> &Importer {
    &self.importer
  }

  /// The topmost node, carrying the process environment and `argv`.
  pub fn root_node(&self, argv: Vec<String>) -> EnvNode {
    EnvNode::from_process(&self.root, argv)
  }

  /// Resolve `argv[0]` from the project root.
  pub fn resolve(&self, argv: Vec<String>) -> Result<Resolution, ContextError> {
    Ok(resolve(self.root_node(argv), &self.importer)?)
  }

  /// Fetch and build `reference` as the project root would see it, without
  /// recording anything.
  pub fn fetch(&self, reference: &str) -> Result<Package, ContextError> {
    let mut node = self.root_node(Vec::new());
    node.init(&self.importer)?;
    Ok(self.importer.fetch(&node, reference)?)
  }

  /// Import `reference` into the project root and pin it.
  ///
  /// Returns the initialized root node with the package on its `RUNPATH`,
  /// ready for [`resolve_imported`](Self::resolve_imported).
  pub fn import(&self, argv: Vec<String>, reference: &str) -> Result<EnvNode, ContextError> {
    let mut node = self.root_node(argv);
    node.init(&self.importer)?;
    let path = self.importer.import(&node, reference)?;
    node.push_runpath(&path);

    let locks = node.root_locks();
    let locks = locks.borrow();
    if locks.is_changed() {
      locks.write(&self.root)?;
    }
    Ok(node)
  }

  /// Resolve from a root node returned by [`import`](Self::import).
  pub fn resolve_imported(&self, node: EnvNode) -> Result<Resolution, ContextError> {
    Ok(resolve_prepared(node, &self.importer)?)
  }
}
