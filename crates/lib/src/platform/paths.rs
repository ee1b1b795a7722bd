use crate::consts::{APP_NAME, CACHE_DIR_VAR, STORE_DIR_VAR};
use std::path::PathBuf;

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE").map(PathBuf::from).unwrap_or_default()
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME").map(PathBuf::from).unwrap_or_default()
}

/// Returns the directory for cache files for the application.
///
/// `RUN_CACHE_DIR` wins over the platform default.
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  if let Ok(path) = std::env::var(CACHE_DIR_VAR) {
    return PathBuf::from(path);
  }
  let local_appdata = std::env::var("LOCALAPPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Local"));
  local_appdata.join(APP_NAME).join("Cache")
}

/// Returns the directory for cache files for the application.
///
/// `RUN_CACHE_DIR` wins over the platform default.
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  if let Ok(path) = std::env::var(CACHE_DIR_VAR) {
    return PathBuf::from(path);
  }
  let cache_home = std::env::var("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".cache"));
  cache_home.join(APP_NAME)
}

/// Revision-keyed checkouts of fetched packages.
pub fn src_cache_dir() -> PathBuf {
  cache_dir().join("src")
}

/// Content-addressed build outputs.
pub fn store_dir() -> PathBuf {
  if let Ok(path) = std::env::var(STORE_DIR_VAR) {
    return PathBuf::from(path);
  }
  cache_dir().join("var").join("pkg")
}
