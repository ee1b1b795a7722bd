//! Implementation of `run --install-completions`.
//!
//! Writes bash and zsh completion scripts generated from the CLI definition
//! into the system completion directories. Requires root.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap_complete::{Shell, generate};

use run_lib::consts::APP_NAME;
use run_lib::platform;

use crate::output::print_success;

#[cfg(target_os = "macos")]
const BASH_PATH: &str = "/usr/local/share/bash-completion/completions/run";
#[cfg(not(target_os = "macos"))]
const BASH_PATH: &str = "/usr/share/bash-completion/completions/run";

const ZSH_PATH: &str = "/usr/local/share/zsh/site-functions/_run";

pub fn cmd_install_completions(mut command: clap::Command) -> Result<()> {
  if !platform::is_elevated() {
    bail!("--install-completions must be run as root");
  }

  for (shell, path, label) in [(Shell::Bash, BASH_PATH, "Bash"), (Shell::Zsh, ZSH_PATH, "Zsh")] {
    let script = render(shell, &mut command);
    let changed =
      install_file(&script, Path::new(path)).with_context(|| format!("failed to install {} completion script", label))?;
    if changed {
      print_success(&format!("{} completion script updated.", label));
    }
  }

  println!(r#"BASH: Install your system's bash-completion package, then run "exec bash"."#);
  println!(
    r#"ZSH: Run "rm -f ~/.zcompdump && compinit". If compinit fails with a "command not found" error, add "autoload -Uz compinit && compinit" to your ~/.zshrc, then run "exec zsh"."#
  );
  Ok(())
}

fn render(shell: Shell, command: &mut clap::Command) -> Vec<u8> {
  let mut buf = Vec::new();
  generate(shell, command, APP_NAME, &mut buf);
  buf
}

/// Write `content` to `path` unless it already holds exactly that.
///
/// Returns whether the file was written.
fn install_file(content: &[u8], path: &Path) -> Result<bool> {
  if fs::read(path).is_ok_and(|existing| existing == content) {
    return Ok(false);
  }
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
  }
  fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
  Ok(true)
}
