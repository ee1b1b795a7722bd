mod cmd;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use run_lib::chown::UserMapping;
use run_lib::context::RunContext;
use run_lib::defer::DeferList;

use crate::cmd::{cmd_chown, cmd_exec, cmd_get, cmd_import, cmd_install_completions, cmd_list, lib_err};
use crate::output::print_error;

/// Project-local command runner
#[derive(Parser)]
#[command(name = "run", version, about, long_about = None)]
#[command(override_usage = "run [OPTIONS] COMMAND [ARGS...]")]
struct Cli {
  /// List all commands
  #[arg(short = 'l')]
  list: bool,

  /// Print the project root
  #[arg(short = 'r')]
  print_root: bool,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,

  /// Fetch and build a package, then print its store path
  #[arg(short = 'g', value_name = "REF")]
  get: Option<String>,

  /// Import a package into the project and pin it
  #[arg(short = 'i', value_name = "REF")]
  import: Option<String>,

  /// Chown files under the project root (uid:gid::uid:gid)
  #[arg(short = 'u', value_name = "MAPPING")]
  usermap: Vec<UserMapping>,

  /// Install bash and zsh completion scripts
  #[arg(long)]
  install_completions: bool,

  /// Command to run, followed by its arguments
  #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
  command: Vec<String>,
}

fn main() -> ExitCode {
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(e) => {
      let _ = e.print();
      return if e.use_stderr() {
        ExitCode::FAILURE
      } else {
        ExitCode::SUCCESS
      };
    }
  };

  init_logging(cli.verbose);

  let defers = DeferList::new();
  spawn_interrupt_listener(defers.clone());

  let result = dispatch(cli, &defers);
  defers.run();

  match result {
    Ok(code) => code,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}

fn init_logging(verbose: bool) {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(if verbose { "run=debug" } else { "run=warn" }));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

/// Run the deferred actions and exit on the first interrupt.
fn spawn_interrupt_listener(defers: DeferList) {
  std::thread::spawn(move || {
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
      Ok(rt) => rt,
      Err(e) => {
        warn!(error = %e, "failed to start interrupt listener");
        return;
      }
    };
    rt.block_on(async {
      if tokio::signal::ctrl_c().await.is_ok() {
        debug!(pending = defers.len(), "interrupted");
        defers.run();
        std::process::exit(1);
      }
    });
  });
}

fn dispatch(cli: Cli, defers: &DeferList) -> Result<ExitCode> {
  if cli.install_completions {
    cmd_install_completions(Cli::command())?;
    return Ok(ExitCode::SUCCESS);
  }

  let cwd = std::env::current_dir()?;
  let ctx = RunContext::discover(&cwd, cli.verbose, defers.clone()).map_err(lib_err)?;

  if cli.list {
    cmd_list(&ctx.root)?;
    return Ok(ExitCode::SUCCESS);
  } else if cli.print_root {
    println!("{}", ctx.root.display());
    return Ok(ExitCode::SUCCESS);
  } else if !cli.usermap.is_empty() {
    cmd_chown(&ctx.root, &cli.usermap)?;
    return Ok(ExitCode::SUCCESS);
  }

  if let Some(reference) = &cli.get {
    cmd_get(&ctx, reference)?;
    return Ok(ExitCode::SUCCESS);
  } else if let Some(reference) = &cli.import {
    return cmd_import(&ctx, cli.command, reference);
  }

  cmd_exec(&ctx, cli.command)
}
