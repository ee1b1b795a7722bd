//! Ownership remapping for files under a project root.
//!
//! A mapping `uid:gid::uid:gid` hands every path owned by the first pair over
//! to the second. Directories owned by anyone else are not descended into.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ChownError {
  #[error("bad format: {0}")]
  BadFormat(String),

  #[error("bad user: {0}")]
  BadUser(String),

  #[error("bad id: {0}")]
  BadId(String),

  #[error("failed to walk '{}': {source}", .path.display())]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to chown '{}': {source}", .path.display())]
  Chown {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("changing file ownership is not supported on this platform")]
  Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
  pub uid: u32,
  pub gid: u32,
}

impl FromStr for Owner {
  type Err = ChownError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (uid, gid) = s.split_once(':').ok_or_else(|| ChownError::BadUser(s.to_string()))?;
    let id = |raw: &str| raw.parse::<u32>().map_err(|_| ChownError::BadId(s.to_string()));
    Ok(Self {
      uid: id(uid)?,
      gid: id(gid)?,
    })
  }
}

/// A `from::to` ownership mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserMapping {
  pub from: Owner,
  pub to: Owner,
}

impl FromStr for UserMapping {
  type Err = ChownError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (from, to) = s.split_once("::").ok_or_else(|| ChownError::BadFormat(s.to_string()))?;
    Ok(Self {
      from: from.parse()?,
      to: to.parse()?,
    })
  }
}

/// Apply `mapping` to every matching path under `root`.
///
/// Returns the number of paths changed.
#[cfg(unix)]
pub fn chown_tree(root: &Path, mapping: &UserMapping) -> Result<usize, ChownError> {
  use std::os::unix::fs::{MetadataExt, lchown};

  let mut changed = 0;
  let mut walker = walkdir::WalkDir::new(root).into_iter();
  while let Some(entry) = walker.next() {
    let entry = entry.map_err(|source| ChownError::Walk {
      path: root.to_path_buf(),
      source,
    })?;
    let meta = entry.metadata().map_err(|source| ChownError::Walk {
      path: entry.path().to_path_buf(),
      source,
    })?;
    if meta.uid() != mapping.from.uid || meta.gid() != mapping.from.gid {
      if entry.file_type().is_dir() {
        walker.skip_current_dir();
      }
      continue;
    }
    lchown(entry.path(), Some(mapping.to.uid), Some(mapping.to.gid)).map_err(|source| ChownError::Chown {
      path: entry.path().to_path_buf(),
      source,
    })?;
    changed += 1;
  }
  debug!(root = %root.display(), changed, "remapped ownership");
  Ok(changed)
}

#[cfg(not(unix))]
pub fn chown_tree(_root: &Path, _mapping: &UserMapping) -> Result<usize, ChownError> {
  Err(ChownError::Unsupported)
}
