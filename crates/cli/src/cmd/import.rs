use std::process::ExitCode;

use anyhow::Result;
use tracing::info;

use run_lib::context::RunContext;

use super::exec::finish;
use super::lib_err;

/// Import `reference` into the project root, pin it, then run `argv` with the
/// package on the search path. An empty command line stops after the import.
pub fn cmd_import(ctx: &RunContext, argv: Vec<String>, reference: &str) -> Result<ExitCode> {
  let node = ctx.import(argv, reference).map_err(lib_err)?;
  if node.argv.is_empty() {
    info!(reference, "imported without a command to run");
    return Ok(ExitCode::SUCCESS);
  }
  finish(ctx, ctx.resolve_imported(node))
}
