//! Package builds.
//!
//! A package is built by running this same tool, without arguments, inside the
//! fetched source tree. The build must leave its output in `<src>/out`, which
//! is then copied into the store and aliased under `by-src/<source name>` so
//! the next import of the same revision skips the build entirely.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{APP_NAME, OUTPUT_DIR};
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("failed to start '{program}': {source}")]
  Spawn {
    program: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("run failed: {0}")]
  Failed(ExitStatus),

  #[error("build produced no output directory at '{0}'")]
  MissingOutput(PathBuf),

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Runs a package's build inside its source tree.
pub trait BuildRunner {
  fn run(&self, src: &Path) -> Result<(), BuildError>;
}

/// Re-invokes the current executable with no arguments.
///
/// Standard streams are inherited so the build is as interactive as the
/// outer invocation.
#[derive(Debug, Default, Clone)]
pub struct SelfInvocation;

impl SelfInvocation {
  fn program() -> PathBuf {
    std::env::current_exe().unwrap_or_else(|_| PathBuf::from(APP_NAME))
  }
}

impl BuildRunner for SelfInvocation {
  fn run(&self, src: &Path) -> Result<(), BuildError> {
    let program = Self::program();
    debug!(program = %program.display(), src = %src.display(), "invoking build");
    let status = Command::new(&program)
      .current_dir(src)
      .status()
      .map_err(|source| BuildError::Spawn { program, source })?;
    if status.success() {
      Ok(())
    } else {
      Err(BuildError::Failed(status))
    }
  }
}

/// Build the source tree at `src` and return its store entry.
pub fn build_package(src: &Path, store: &Store, runner: &dyn BuildRunner) -> Result<PathBuf, BuildError> {
  let key = src
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default();
  if let Some(entry) = store.lookup_src(&key) {
    debug!(src = %src.display(), entry = %entry.display(), "build skipped, by-src alias present");
    return Ok(entry);
  }

  runner.run(src)?;

  let out = src.join(OUTPUT_DIR);
  if !out.is_dir() {
    return Err(BuildError::MissingOutput(out));
  }
  let entry = store.add(&out)?;
  if !key.is_empty() {
    store.alias(&key, &entry)?;
  }

  info!(src = %src.display(), entry = %entry.display(), "built package");
  Ok(entry)
}
