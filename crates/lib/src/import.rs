//! Package import.
//!
//! Turns a package reference into a store entry:
//!
//! 1. Use the locked revision for the reference, or its pin.
//! 2. If `by-src` already maps that revision to a store entry, return it.
//! 3. Otherwise normalize the URL (redirect-resolving unpinned references),
//!    fetch the source, build it, and return the new entry.
//!
//! [`Importer::import`] additionally requires the entry to expose a command
//! namespace and records the resolved revision in the root lock table.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::build::{BuildError, BuildRunner, SelfInvocation, build_package};
use crate::consts::NAMESPACE_DIR;
use crate::defer::DeferList;
use crate::node::EnvNode;
use crate::reference::{HttpResolver, PackageRef, UrlError, UrlResolver};
use crate::source::{FetchError, Git, GitCli, SourceCache};
use crate::store::Store;

#[derive(Debug, Error)]
pub enum ImportError {
  #[error(transparent)]
  Url(#[from] UrlError),

  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error("failed to build '{url}': {source}")]
  Build {
    url: String,
    #[source]
    source: BuildError,
  },

  #[error("failed to import '{0}': no .run directory")]
  NoNamespace(String),
}

/// A package materialized in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
  pub path: PathBuf,
  pub rev: String,
}

pub struct Importer {
  store: Store,
  sources: SourceCache,
  git: Box<dyn Git>,
  runner: Box<dyn BuildRunner>,
  urls: Box<dyn UrlResolver>,
  defers: DeferList,
}

impl std::fmt::Debug for Importer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Importer")
      .field("store", &self.store)
      .field("sources", &self.sources)
      .finish_non_exhaustive()
  }
}

impl Importer {
  /// An importer using the `git` CLI, HTTP redirect resolution and recursive
  /// self-invocation for builds.
  pub fn new(store: Store, sources: SourceCache, defers: DeferList, verbose: bool) -> Self {
    Self {
      store,
      sources,
      git: Box::new(GitCli::new(verbose)),
      runner: Box::new(SelfInvocation),
      urls: Box::new(HttpResolver),
      defers,
    }
  }

  pub fn with_git(mut self, git: Box<dyn Git>) -> Self {
    self.git = git;
    self
  }

  pub fn with_runner(mut self, runner: Box<dyn BuildRunner>) -> Self {
    self.runner = runner;
    self
  }

  pub fn with_url_resolver(mut self, urls: Box<dyn UrlResolver>) -> Self {
    self.urls = urls;
    self
  }

  pub fn store(&self) -> &Store {
    &self.store
  }

  pub fn defers(&self) -> &DeferList {
    &self.defers
  }

  /// Materialize `reference` without recording it anywhere.
  pub fn fetch(&self, node: &EnvNode, reference: &str) -> Result<Package, ImportError> {
    let pkg = PackageRef::parse(reference);
    let rev = node.locked(pkg.as_str()).or_else(|| pkg.rev().map(str::to_string));

    if let Some(rev) = &rev
      && let Some(path) = self.store.lookup_src(rev)
    {
      debug!(reference, rev, path = %path.display(), "import satisfied from store");
      return Ok(Package { path, rev: rev.clone() });
    }

    let mut url = pkg.normalized_url();
    if !pkg.is_pinned() {
      url = self.urls.resolve(&url)?;
    }

    let source = self.sources.fetch(self.git.as_ref(), &url, rev.as_deref(), &self.defers)?;
    let path = build_package(&source.path, &self.store, self.runner.as_ref())
      .map_err(|source| ImportError::Build { url: url.clone(), source })?;
    Ok(Package { path, rev: source.rev })
  }

  /// Materialize `reference` and pin it in `node`'s root lock table.
  ///
  /// Returns the store entry; appending it to a search path is up to the
  /// caller. Nothing is recorded when the import fails.
  pub fn import(&self, node: &EnvNode, reference: &str) -> Result<PathBuf, ImportError> {
    let package = self.fetch(node, reference)?;
    if !package.path.join(NAMESPACE_DIR).is_dir() {
      return Err(ImportError::NoNamespace(reference.to_string()));
    }
    node.set_lock(reference, &package.rev);
    info!(reference, rev = %package.rev, path = %package.path.display(), "imported package");
    Ok(package.path)
  }
}
