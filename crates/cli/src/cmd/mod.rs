mod chown;
mod completions;
mod exec;
mod fetch;
mod import;
mod list;

pub use chown::cmd_chown;
pub use completions::cmd_install_completions;
pub use exec::cmd_exec;
pub use fetch::cmd_get;
pub use import::cmd_import;
pub use list::cmd_list;

use run_lib::context::ContextError;

/// Flatten a library error into a single-line diagnostic.
pub fn lib_err(e: ContextError) -> anyhow::Error {
  anyhow::anyhow!("{}", e)
}
