//! run-lib: Core logic for the `run` command runner
//!
//! A project exposes commands as executables under `.run/`. Resolving a
//! command walks a tree of environments breadth-first:
//! - `EnvNode`: one root in the tree, with its environment and lock table
//! - `Importer`: fetches, builds and pins packages named by config hooks
//! - `Store`: content-addressed build outputs, indexed by source revision
//! - `LockTable`: the `.run/.runlock` pins recorded at the project root

pub mod build;
pub mod chown;
pub mod consts;
pub mod context;
pub mod defer;
pub mod import;
pub mod lock;
pub mod lua;
pub mod node;
pub mod platform;
pub mod project;
pub mod reference;
pub mod resolve;
pub mod source;
pub mod store;
pub mod util;
