//! Content-addressed store of package build outputs.
//!
//! # Layout
//!
//! ```text
//! store/
//! ├── h1_<digest>/            # Build outputs (immutable, read-only files)
//! │   └── .run/...
//! └── by-src/                 # Source revision -> store entry
//!     └── <rev> -> ../h1_<digest>
//! ```
//!
//! Entries are written once into a temporary sibling directory and renamed
//! into place, so a digest directory is either complete or absent. A `by-src`
//! alias is only created after its entry exists.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::consts::BY_SRC_DIR;
use crate::platform::paths::store_dir;
use crate::util::hash::{HashError, hash_directory};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
  /// Failed to create a directory.
  #[error("failed to create directory '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to create a symlink.
  #[error("failed to create symlink from '{from}' to '{to}': {source}")]
  CreateSymlink {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to copy a build output into the store.
  #[error("failed to copy '{from}' into the store: {source}")]
  Copy {
    from: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to resolve a store path.
  #[error("failed to resolve '{path}': {source}")]
  Resolve {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to hash a build output.
  #[error("failed to hash '{path}': {source}")]
  Hash {
    path: PathBuf,
    #[source]
    source: HashError,
  },
}

/// The package store manager.
#[derive(Debug, Clone)]
pub struct Store {
  dir: PathBuf,
}

impl Default for Store {
  fn default() -> Self {
    Self::new()
  }
}

impl Store {
  /// Create a store rooted at the default store directory.
  pub fn new() -> Self {
    Self { dir: store_dir() }
  }

  /// Create a store with a custom base path.
  pub fn with_path(dir: PathBuf) -> Self {
    Self { dir }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn by_src_dir(&self) -> PathBuf {
    self.dir.join(BY_SRC_DIR)
  }

  /// Ensure the store and its `by-src` index exist.
  pub fn ensure_store_dir(&self) -> Result<(), StoreError> {
    let by_src = self.by_src_dir();
    fs::create_dir_all(&by_src).map_err(|e| StoreError::CreateDir { path: by_src, source: e })
  }

  /// Resolve a `by-src` alias to its store entry.
  ///
  /// Returns `None` when no alias exists or it dangles.
  pub fn lookup_src(&self, key: &str) -> Option<PathBuf> {
    if key.is_empty() {
      return None;
    }
    let link = self.by_src_dir().join(key);
    link.symlink_metadata().ok()?;
    let entry = dunce::canonicalize(&link).ok()?;
    if entry.is_dir() {
      trace!(key, entry = %entry.display(), "by-src hit");
      Some(entry)
    } else {
      None
    }
  }

  /// Hash `out` and copy it into the store.
  ///
  /// Returns the canonical path of the (possibly pre-existing) entry.
  pub fn add(&self, out: &Path) -> Result<PathBuf, StoreError> {
    let hash = hash_directory(out).map_err(|e| StoreError::Hash {
      path: out.to_path_buf(),
      source: e,
    })?;
    self.ensure_store_dir()?;

    let entry = self.dir.join(&hash.0);
    if entry.is_dir() {
      debug!(hash = %hash, "store entry already present");
      return canonical(&entry);
    }

    let staging = tempfile::Builder::new()
      .prefix(".tmp-")
      .tempdir_in(&self.dir)
      .map_err(|e| StoreError::CreateDir {
        path: self.dir.clone(),
        source: e,
      })?;
    let staged = staging.path().join(&hash.0);
    copy_read_only(out, &staged).map_err(|e| StoreError::Copy {
      from: out.to_path_buf(),
      source: e,
    })?;

    match fs::rename(&staged, &entry) {
      Ok(()) => debug!(hash = %hash, entry = %entry.display(), "added store entry"),
      // Another invocation produced the same digest first.
      Err(_) if entry.is_dir() => debug!(hash = %hash, "store entry raced, keeping existing"),
      Err(e) => {
        return Err(StoreError::Copy {
          from: out.to_path_buf(),
          source: e,
        });
      }
    }

    canonical(&entry)
  }

  /// Point `by-src/<key>` at `entry`, replacing any previous alias.
  pub fn alias(&self, key: &str, entry: &Path) -> Result<(), StoreError> {
    self.ensure_store_dir()?;
    let name = entry.file_name().map(PathBuf::from).unwrap_or_default();
    let target = Path::new("..").join(name);
    let link = self.by_src_dir().join(key);
    let tmp = self.by_src_dir().join(format!(".{}.{}", key, std::process::id()));

    let _ = fs::remove_file(&tmp);
    create_dir_link(&target, &tmp)?;
    fs::rename(&tmp, &link).map_err(|e| StoreError::CreateSymlink {
      from: target.clone(),
      to: link.clone(),
      source: e,
    })?;

    debug!(key, target = %target.display(), "linked by-src alias");
    Ok(())
  }

  /// The store key of `path`, if `path` lies inside the store.
  pub fn id_of(&self, path: &Path) -> Option<String> {
    if !path.is_absolute() {
      return None;
    }
    let rel = match path.strip_prefix(&self.dir) {
      Ok(rel) => rel.to_path_buf(),
      Err(_) => {
        let dir = dunce::canonicalize(&self.dir).ok()?;
        path.strip_prefix(dir).ok()?.to_path_buf()
      }
    };
    match rel.components().next() {
      Some(Component::Normal(name)) => {
        let name = name.to_string_lossy();
        if name == BY_SRC_DIR || name.starts_with('.') {
          None
        } else {
          Some(name.into_owned())
        }
      }
      _ => None,
    }
  }
}

fn canonical(path: &Path) -> Result<PathBuf, StoreError> {
  dunce::canonicalize(path).map_err(|e| StoreError::Resolve {
    path: path.to_path_buf(),
    source: e,
  })
}

/// Copy a directory tree, making every file read-only.
///
/// Symlinks are replaced by copies of their targets so the entry holds exactly
/// the bytes its digest covers. Executable bits survive; directories are
/// created fresh.
fn copy_read_only(src: &Path, dst: &Path) -> io::Result<()> {
  for entry in WalkDir::new(src).follow_links(true) {
    let entry = entry.map_err(io::Error::other)?;
    let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
    let target = dst.join(rel);
    let file_type = entry.file_type();

    if file_type.is_dir() {
      fs::create_dir(&target)?;
    } else if file_type.is_file() {
      fs::copy(entry.path(), &target)?;
      set_read_only(&target)?;
    }
  }
  Ok(())
}

#[cfg(unix)]
fn set_read_only(path: &Path) -> io::Result<()> {
  use std::os::unix::fs::PermissionsExt;

  let mode = fs::metadata(path)?.permissions().mode();
  let mode = if mode & 0o111 != 0 { 0o555 } else { 0o444 };
  fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_read_only(path: &Path) -> io::Result<()> {
  let mut perms = fs::metadata(path)?.permissions();
  perms.set_readonly(true);
  fs::set_permissions(path, perms)
}

/// Create a directory symlink.
#[cfg(unix)]
fn create_dir_link(target: &Path, link: &Path) -> Result<(), StoreError> {
  std::os::unix::fs::symlink(target, link).map_err(|e| StoreError::CreateSymlink {
    from: target.to_path_buf(),
    to: link.to_path_buf(),
    source: e,
  })
}

/// Create a directory symlink (Windows, requires developer mode or admin).
#[cfg(windows)]
fn create_dir_link(target: &Path, link: &Path) -> Result<(), StoreError> {
  std::os::windows::fs::symlink_dir(target, link).map_err(|e| StoreError::CreateSymlink {
    from: target.to_path_buf(),
    to: link.to_path_buf(),
    source: e,
  })
}
