//! Project root discovery, identity and command listing.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::consts::{ID_FILENAME, LIST_SEP, NAMESPACE_DIR};

#[derive(Debug, Error)]
pub enum ProjectError {
  #[error("failed to find git root: no .git directory was found")]
  NoGitRoot,

  #[error("failed to resolve '{path}': {source}")]
  Resolve {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read .runid file: {0}")]
  ReadId(#[source] io::Error),

  #[error("failed to parse project id: {0}")]
  ParseId(#[from] uuid::Error),

  #[error("failed to write .runid file: {0}")]
  WriteId(#[source] io::Error),

  #[error("error reading directory '{path}': {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// The nearest ancestor of `start` (inclusive) containing a `.git` directory.
pub fn find_git_root(start: &Path) -> Result<PathBuf, ProjectError> {
  let start = dunce::canonicalize(start).map_err(|source| ProjectError::Resolve {
    path: start.to_path_buf(),
    source,
  })?;
  start
    .ancestors()
    .find(|dir| dir.join(".git").is_dir())
    .map(Path::to_path_buf)
    .ok_or(ProjectError::NoGitRoot)
}

/// Read the project's identity, creating it on first use.
pub fn project_id(root: &Path) -> Result<Uuid, ProjectError> {
  let path = root.join(ID_FILENAME);
  match fs::read_to_string(&path) {
    Ok(raw) => Ok(Uuid::parse_str(raw.trim())?),
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      let id = Uuid::new_v4();
      fs::write(&path, format!("{}\n", id)).map_err(ProjectError::WriteId)?;
      info!(id = %id, "created project id");
      Ok(id)
    }
    Err(e) => Err(ProjectError::ReadId(e)),
  }
}

/// The roots listed by a `RUNPATH` value, defaulting to `.`.
///
/// A leading `.` component is replaced by `root`.
pub fn run_path(root: &Path, runpath: Option<&str>) -> Vec<PathBuf> {
  let runpath = runpath.filter(|p| !p.is_empty()).unwrap_or(".");
  runpath
    .split(LIST_SEP)
    .filter(|p| !p.is_empty())
    .map(|entry| {
      let entry = Path::new(entry);
      let mut components = entry.components();
      match components.next() {
        Some(Component::CurDir) if components.as_path().as_os_str().is_empty() => root.to_path_buf(),
        Some(Component::CurDir) => root.join(components.as_path()),
        _ => entry.to_path_buf(),
      }
    })
    .collect()
}

/// Executable commands exposed by `roots`, in search order.
///
/// Hidden files and directories are skipped, and a root without a command
/// namespace contributes nothing.
pub fn list_commands(roots: &[PathBuf]) -> Result<Vec<PathBuf>, ProjectError> {
  let mut commands = Vec::new();
  for root in roots {
    let dir = root.join(NAMESPACE_DIR);
    let entries = match fs::read_dir(&dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(dir = %dir.display(), "no command namespace");
        continue;
      }
      Err(source) => return Err(ProjectError::ReadDir { path: dir, source }),
    };

    let mut found = Vec::new();
    for entry in entries {
      let entry = entry.map_err(|source| ProjectError::ReadDir {
        path: dir.clone(),
        source,
      })?;
      if entry.file_name().to_string_lossy().starts_with('.') {
        continue;
      }
      let meta = entry.metadata().map_err(|source| ProjectError::ReadDir {
        path: entry.path(),
        source,
      })?;
      if meta.is_file() && is_executable(&meta) {
        found.push(entry.path());
      }
    }
    found.sort();
    commands.extend(found);
  }
  Ok(commands)
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
  use std::os::unix::fs::PermissionsExt;
  meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
  true
}
