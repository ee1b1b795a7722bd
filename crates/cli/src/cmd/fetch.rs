use anyhow::Result;

use run_lib::context::RunContext;

use super::lib_err;

/// Fetch and build `reference`, then print its store path.
///
/// Nothing is pinned and the project's search path is left alone.
pub fn cmd_get(ctx: &RunContext, reference: &str) -> Result<()> {
  let package = ctx.fetch(reference).map_err(lib_err)?;
  println!("{}", package.path.display());
  Ok(())
}
