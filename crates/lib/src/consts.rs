//! Names and environment variables shared across the crate.

pub const APP_NAME: &str = "run";

/// Per-root directory holding a project's commands, lock file and hook.
pub const NAMESPACE_DIR: &str = ".run";

/// Lock file name inside [`NAMESPACE_DIR`].
pub const LOCK_FILENAME: &str = ".runlock";

/// Config hook script inside [`NAMESPACE_DIR`].
pub const HOOK_FILENAME: &str = "init.lua";

/// Project identity file at the project root.
pub const ID_FILENAME: &str = ".runid";

/// Output directory a package build must produce.
pub const OUTPUT_DIR: &str = "out";

/// Store subdirectory mapping source revisions to store entries.
pub const BY_SRC_DIR: &str = "by-src";

/// Prefix of every directory digest.
pub const HASH_TAG: &str = "h1_";

pub const RUNPATH_VAR: &str = "RUNPATH";
pub const RUNPKGS_VAR: &str = "RUNPKGS";
pub const RUNRPC_VAR: &str = "RUNRPC";
pub const PATH_VAR: &str = "PATH";
pub const CACHE_DIR_VAR: &str = "RUN_CACHE_DIR";
pub const STORE_DIR_VAR: &str = "RUN_STORE";

/// Separator for `RUNPATH` and the derived lookup `PATH`.
#[cfg(windows)]
pub const LIST_SEP: &str = ";";
#[cfg(not(windows))]
pub const LIST_SEP: &str = ":";

/// Separator for the `RUNPKGS` chain.
pub const PKGS_SEP: &str = ":";
