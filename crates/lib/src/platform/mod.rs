//! Platform-specific paths and privilege checks.

pub mod paths;

/// Whether the process runs with root privileges.
#[cfg(unix)]
pub fn is_elevated() -> bool {
  rustix::process::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
  false
}
