//! Lua runtime and the per-root config hook.
//!
//! # Submodules
//!
//! - [`hook`] - Runs `.run/init.lua` against an environment node
//! - [`runtime`] - Sandboxed Lua VM creation and file loading

pub mod hook;
pub mod runtime;
