//! Revision-keyed source cache.
//!
//! Fetched packages live at `<cache>/src/<revision>/` as full checkouts.
//! Clones are made in a temporary directory inside the cache so the final move
//! into place is a rename on the same filesystem.

pub mod git;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

pub use self::git::{Git, GitCli, GitError};
use crate::defer::DeferList;
use crate::platform::paths::src_cache_dir;

#[derive(Debug, Error)]
pub enum FetchError {
  /// Failed to create the cache directory.
  #[error("failed to create cache directory '{0}': {1}")]
  CreateCacheDir(PathBuf, #[source] io::Error),

  #[error("failed to create temp directory in '{0}': {1}")]
  TempDir(PathBuf, #[source] io::Error),

  #[error("failed to clone '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: GitError,
  },

  #[error("failed to checkout revision '{rev}' of '{url}': {source}")]
  Checkout {
    url: String,
    rev: String,
    #[source]
    source: GitError,
  },

  #[error("failed to get HEAD rev from '{url}': {source}")]
  ResolveHead {
    url: String,
    #[source]
    source: GitError,
  },

  #[error("failed to move clone into '{path}': {source}")]
  Persist {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// A checked-out source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
  pub path: PathBuf,
  pub rev: String,
}

#[derive(Debug, Clone)]
pub struct SourceCache {
  dir: PathBuf,
}

impl Default for SourceCache {
  fn default() -> Self {
    Self::new()
  }
}

impl SourceCache {
  /// Cache at the default location.
  pub fn new() -> Self {
    Self { dir: src_cache_dir() }
  }

  pub fn with_path(dir: PathBuf) -> Self {
    Self { dir }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Location of the checkout for `rev`.
  pub fn entry(&self, rev: &str) -> PathBuf {
    self.dir.join(rev)
  }

  /// Fetch `url`, checked out at `rev` or the remote's default tip.
  ///
  /// The temporary clone directory is registered on `defers` and removed when
  /// they run, whether or not it ended up moved into the cache.
  pub fn fetch(&self, git: &dyn Git, url: &str, rev: Option<&str>, defers: &DeferList) -> Result<Source, FetchError> {
    if let Some(rev) = rev {
      let cached = self.entry(rev);
      if cached.is_dir() {
        debug!(url, rev, "source already cached");
        return Ok(Source {
          path: cached,
          rev: rev.to_string(),
        });
      }
    }

    fs::create_dir_all(&self.dir).map_err(|e| FetchError::CreateCacheDir(self.dir.clone(), e))?;
    let tmp = tempfile::Builder::new()
      .prefix(".clone-")
      .tempdir_in(&self.dir)
      .map_err(|e| FetchError::TempDir(self.dir.clone(), e))?
      .keep();
    {
      let tmp = tmp.clone();
      defers.add(move || {
        let _ = fs::remove_dir_all(&tmp);
      });
    }

    info!(url, dir = %tmp.display(), "cloning");
    git.clone_repo(url, &tmp).map_err(|source| FetchError::Clone {
      url: url.to_string(),
      source,
    })?;

    if let Some(rev) = rev {
      git.checkout(&tmp, rev).map_err(|source| FetchError::Checkout {
        url: url.to_string(),
        rev: rev.to_string(),
        source,
      })?;
    }

    let head = git.head(&tmp).map_err(|source| FetchError::ResolveHead {
      url: url.to_string(),
      source,
    })?;

    let path = self.entry(&head);
    if path.exists() {
      debug!(url, rev = %head, "revision already cached, discarding clone");
      return Ok(Source { path, rev: head });
    }

    if persist_clone(&tmp, &path)? {
      info!(url, rev = %head, path = %path.display(), "cached source");
    } else {
      debug!(url, rev = %head, "revision cached concurrently, discarding clone");
    }
    Ok(Source { path, rev: head })
  }
}

/// Move a finished clone to its cache entry.
///
/// Returns `false` when another invocation landed the same revision first; the
/// existing entry is kept and `tmp` is left for the deferred cleanup.
fn persist_clone(tmp: &Path, path: &Path) -> Result<bool, FetchError> {
  match fs::rename(tmp, path) {
    Ok(()) => Ok(true),
    Err(_) if path.is_dir() => Ok(false),
    Err(source) => Err(FetchError::Persist {
      path: path.to_path_buf(),
      source,
    }),
  }
}
