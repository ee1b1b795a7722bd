//! Implementation of `run COMMAND [ARGS...]`.

use std::process::{Command, ExitCode};

use anyhow::{Context, Result, bail};
use tracing::debug;

use run_lib::context::{ContextError, RunContext};
use run_lib::resolve::{Resolution, ResolveError};

use super::lib_err;
use super::list::cmd_list;

/// Resolve `argv` from the project root and run it.
pub fn cmd_exec(ctx: &RunContext, argv: Vec<String>) -> Result<ExitCode> {
  finish(ctx, ctx.resolve(argv))
}

/// Run a resolution, or explain why there is nothing to run.
///
/// An unknown command lists what is available and fails; an empty command
/// line lists what is available and succeeds.
pub(super) fn finish(ctx: &RunContext, resolved: Result<Resolution, ContextError>) -> Result<ExitCode> {
  match resolved {
    Ok(resolution) => {
      exec(&resolution)?;
      Ok(ExitCode::SUCCESS)
    }
    Err(ContextError::Resolve(ResolveError::BadCommand(name))) => {
      debug!(command = %name, "command not found");
      eprintln!("bad command. available commands:");
      cmd_list(&ctx.root)?;
      Ok(ExitCode::FAILURE)
    }
    Err(ContextError::Resolve(ResolveError::NoCommand)) => {
      eprintln!("no command given. available commands:");
      cmd_list(&ctx.root)?;
      Ok(ExitCode::SUCCESS)
    }
    Err(e) => Err(lib_err(e)),
  }
}

fn exec(resolution: &Resolution) -> Result<()> {
  debug!(program = %resolution.program.display(), args = ?resolution.args(), "executing");
  let status = Command::new(&resolution.program)
    .args(resolution.args())
    .env_clear()
    .envs(&resolution.env)
    .status()
    .context("error running command")?;
  if !status.success() {
    bail!("error running command: {}", status);
  }
  Ok(())
}
