//! Lock file management for package imports.
//!
//! The lock file (`.run/.runlock`) pins every package a project imports,
//! directly or through nested config hooks, to the revision it resolved to.
//!
//! # Lock File Format
//!
//! One entry per line, sorted by reference:
//!
//! ```text
//! example.org/bar 5d41402abc4b2a76b9719d911017c592
//! https://example.org/foo@v1 7d793037a0760186574b0282f2f435e7
//! ```
//!
//! Only the topmost node of a resolution writes its table back. Writers take
//! an advisory lock on `.run/.runlock.lck`, re-read the file, overlay only the
//! pins they set themselves, and replace the file atomically. Entries that
//! were merely loaded never overwrite what another invocation wrote since.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{LOCK_FILENAME, NAMESPACE_DIR};

/// Errors that can occur when working with lock files.
#[derive(Debug, Error)]
pub enum LockError {
  /// Failed to read the lock file.
  #[error("failed to read lock file '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to write the lock file.
  #[error("failed to write lock file '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// A line is not a `reference revision` pair.
  #[error("bad lock (line {line}): '{content}'")]
  Parse { line: usize, content: String },
}

/// Pinned package revisions for one project root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockTable {
  entries: BTreeMap<String, String>,
  pinned: BTreeSet<String>,
}

impl LockTable {
  /// Create a new empty lock table.
  pub fn new() -> Self {
    Self::default()
  }

  /// Location of the lock file for the project at `root`.
  pub fn path_for(root: &Path) -> PathBuf {
    root.join(NAMESPACE_DIR).join(LOCK_FILENAME)
  }

  /// Parse lock file content.
  pub fn parse(content: &str) -> Result<Self, LockError> {
    let mut entries = BTreeMap::new();
    for (idx, line) in content.lines().enumerate() {
      let line = line.trim_end_matches('\r');
      if line.trim().is_empty() {
        continue;
      }
      let mut parts = line.split(' ');
      match (parts.next(), parts.next(), parts.next()) {
        (Some(reference), Some(rev), None) if !reference.is_empty() && !rev.is_empty() => {
          entries.insert(reference.to_string(), rev.to_string());
        }
        _ => {
          return Err(LockError::Parse {
            line: idx + 1,
            content: line.to_string(),
          });
        }
      }
    }
    Ok(Self {
      entries,
      pinned: BTreeSet::new(),
    })
  }

  /// Load the lock file of the project at `root`.
  ///
  /// Returns `Ok(None)` if the file doesn't exist.
  pub fn load(root: &Path) -> Result<Option<Self>, LockError> {
    let path = Self::path_for(root);
    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(LockError::Read { path, source: e }),
    };
    Self::parse(&content).map(Some)
  }

  /// Get the pinned revision for a reference.
  pub fn get(&self, reference: &str) -> Option<&str> {
    self.entries.get(reference).map(String::as_str)
  }

  /// Pin `reference` to `rev`.
  pub fn set(&mut self, reference: &str, rev: &str) {
    if self.get(reference) != Some(rev) {
      self.entries.insert(reference.to_string(), rev.to_string());
      self.pinned.insert(reference.to_string());
    }
  }

  /// Overlay `other`'s entries without marking the table changed.
  pub fn merge(&mut self, other: &LockTable) {
    for (reference, rev) in &other.entries {
      self.entries.insert(reference.clone(), rev.clone());
    }
  }

  /// Whether [`set`](Self::set) changed anything since load.
  pub fn is_changed(&self) -> bool {
    !self.pinned.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Serialize as sorted `reference revision` lines.
  pub fn render(&self) -> String {
    let mut out = String::new();
    for (reference, rev) in &self.entries {
      out.push_str(reference);
      out.push(' ');
      out.push_str(rev);
      out.push('\n');
    }
    out
  }

  /// Write the table's own pins to the project at `root`.
  ///
  /// Everything else in the file on disk at write time is kept, including
  /// entries another invocation changed after this table was loaded. On a
  /// conflicting pin this table's revision wins.
  pub fn write(&self, root: &Path) -> Result<(), LockError> {
    let path = Self::path_for(root);
    let dir = root.join(NAMESPACE_DIR);
    let write_err = |source| LockError::Write {
      path: path.clone(),
      source,
    };
    fs::create_dir_all(&dir).map_err(write_err)?;

    let _guard = WriteLock::acquire(&dir.join(format!("{}.lck", LOCK_FILENAME))).map_err(write_err)?;

    let mut merged = Self::load(root)?.unwrap_or_default();
    for reference in &self.pinned {
      if let Some(rev) = self.entries.get(reference) {
        merged.entries.insert(reference.clone(), rev.clone());
      }
    }

    let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    file.write_all(merged.render().as_bytes()).map_err(write_err)?;
    file.persist(&path).map_err(|e| write_err(e.error))?;

    info!(path = %path.display(), entries = merged.len(), "wrote lock file");
    Ok(())
  }
}

/// Advisory exclusive lock held for the duration of a lock file write.
struct WriteLock {
  _file: fs::File,
}

impl WriteLock {
  fn acquire(path: &Path) -> io::Result<Self> {
    let file = fs::OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(path)?;
    lock_exclusive(&file)?;
    debug!(path = %path.display(), "acquired lock file guard");
    Ok(Self { _file: file })
  }
}

#[cfg(unix)]
fn lock_exclusive(file: &fs::File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::LockExclusive).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &fs::File) -> io::Result<()> {
  Ok(())
}
