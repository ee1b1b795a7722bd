use std::path::Path;

use anyhow::Result;

use run_lib::consts::RUNPATH_VAR;
use run_lib::project::{list_commands, run_path};

/// Print the commands reachable through the process `RUNPATH`, one per line.
pub fn cmd_list(root: &Path) -> Result<()> {
  let runpath = std::env::var(RUNPATH_VAR).ok();
  let commands = list_commands(&run_path(root, runpath.as_deref()))?;
  if commands.is_empty() {
    eprintln!("<none>");
  }
  for command in commands {
    if let Some(name) = command.file_name() {
      println!("{}", name.to_string_lossy());
    }
  }
  Ok(())
}
