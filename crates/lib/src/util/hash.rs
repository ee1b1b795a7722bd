//! Directory and file hashing for the content-addressed store.
//!
//! `hash_directory()` implements the `h1` scheme. Its output is equivalent to:
//!
//! ```text
//! for f in $(find -L . -type f | sort | cut -c 3-); do
//!   if [ -x "$f" ]; then printf "+ "; else printf "  "; fi
//!   sha256sum "$f"
//! done | sha256sum
//! ```
//!
//! prefixed with `h1_`. Only regular files contribute, with symlinks followed
//! to their targets; the order in which the filesystem yields entries never
//! affects the result.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::consts::HASH_TAG;

/// A tagged directory digest, e.g. `h1_3b0c…`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Error during directory hashing.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
  #[error("failed to walk directory: {0}")]
  WalkDir(#[from] walkdir::Error),

  #[error("failed to read file {path}: {source}")]
  ReadFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("files with newlines are not allowed: {0:?}")]
  NewlineInPath(String),
}

/// Compute the `h1` digest of every regular file under `path`.
///
/// A symlink counts as the file or directory it points to.
pub fn hash_directory(path: &Path) -> Result<ContentHash, HashError> {
  let mut files: Vec<(String, PathBuf)> = Vec::new();

  for entry in WalkDir::new(path).follow_links(true) {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }
    let rel = entry.path().strip_prefix(path).unwrap_or(entry.path());
    files.push((slash_path(rel), entry.path().to_path_buf()));
  }

  files.sort_by(|a, b| a.0.cmp(&b.0));

  let mut hasher = Sha256::new();
  for (name, full) in &files {
    if name.contains('\n') {
      return Err(HashError::NewlineInPath(name.clone()));
    }
    let digest = hash_file(full)?;
    let marker = if is_executable(full)? { '+' } else { ' ' };
    hasher.update(format!("{} {}  {}\n", marker, digest, name).as_bytes());
  }

  Ok(ContentHash(format!("{}{}", HASH_TAG, hex::encode(hasher.finalize()))))
}

/// Hex SHA-256 of a file's bytes.
pub fn hash_file(path: &Path) -> Result<String, HashError> {
  let read_err = |source| HashError::ReadFile {
    path: path.to_path_buf(),
    source,
  };
  let mut file = fs::File::open(path).map_err(read_err)?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(hex::encode(hasher.finalize()))
}

/// Whether any executable bit is set on `path`.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> Result<bool, HashError> {
  use std::os::unix::fs::PermissionsExt;

  let meta = fs::metadata(path).map_err(|source| HashError::ReadFile {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
pub fn is_executable(_path: &Path) -> Result<bool, HashError> {
  Ok(false)
}

// Forward slashes on every platform so digests are portable.
fn slash_path(rel: &Path) -> String {
  rel
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}
