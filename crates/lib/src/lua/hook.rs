//! The per-root config hook.
//!
//! `.run/init.lua` runs with a single global, `run`:
//!
//! - `run.argv` - the node's argument list
//! - `run.env` - the node's environment as a string table
//! - `run.import(reference)` - imports a package and appends its path to
//!   `run.env.RUNPATH`
//!
//! Whatever the script leaves in `run.argv` and `run.env` replaces the node's
//! argument list and environment.

use std::collections::BTreeMap;
use std::path::PathBuf;

use mlua::prelude::*;
use thiserror::Error;
use tracing::debug;

use super::runtime::{create_runtime, load_file};
use crate::consts::{HOOK_FILENAME, LIST_SEP, NAMESPACE_DIR, RUNPATH_VAR};
use crate::import::Importer;
use crate::node::EnvNode;

#[derive(Debug, Error)]
pub enum HookError {
  #[error("failed to run {}: {source}", .path.display())]
  Script {
    path: PathBuf,
    #[source]
    source: LuaError,
  },
}

/// Run `node`'s config hook, if it has one.
pub fn run_config_hook(node: &mut EnvNode, importer: &Importer) -> Result<(), HookError> {
  let script = node.path.join(NAMESPACE_DIR).join(HOOK_FILENAME);
  if !script.is_file() {
    return Ok(());
  }
  debug!(script = %script.display(), "running config hook");

  let (argv, env) = evaluate(node, importer, &script).map_err(|source| HookError::Script {
    path: script.clone(),
    source,
  })?;
  node.argv = argv;
  node.env = env;
  Ok(())
}

fn evaluate(
  node: &EnvNode,
  importer: &Importer,
  script: &std::path::Path,
) -> LuaResult<(Vec<String>, BTreeMap<String, String>)> {
  let lua = create_runtime()?;
  let argv = lua.create_sequence_from(node.argv.iter().map(String::as_str))?;
  let env = lua.create_table_from(node.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;

  let run = lua.create_table()?;
  run.set("argv", argv.clone())?;
  run.set("env", env.clone())?;

  lua.scope(|scope| {
    let import_env = env.clone();
    let import = scope.create_function(move |_, reference: String| {
      let path = importer
        .import(node, &reference)
        .map_err(|e| LuaError::external(format!("failed to import package '{}': {}", reference, e)))?;
      let path = path.to_string_lossy();
      let runpath = match import_env.get::<Option<String>>(RUNPATH_VAR)? {
        Some(current) if !current.is_empty() => format!("{}{}{}", current, LIST_SEP, path),
        _ => path.into_owned(),
      };
      import_env.set(RUNPATH_VAR, runpath)
    })?;
    run.set("import", import)?;
    lua.globals().set("run", run.clone())?;
    load_file(&lua, script)
  })?;

  let argv = argv
    .sequence_values::<LuaValue>()
    .map(|value| value.and_then(|v| lua_string(&lua, v)))
    .collect::<LuaResult<Vec<_>>>()?;
  let env = env
    .pairs::<LuaValue, LuaValue>()
    .map(|pair| {
      let (k, v) = pair?;
      Ok((lua_string(&lua, k)?, lua_string(&lua, v)?))
    })
    .collect::<LuaResult<BTreeMap<_, _>>>()?;
  Ok((argv, env))
}

/// Coerce a script value to a string the way Lua's `tostring` would.
fn lua_string(lua: &Lua, value: LuaValue) -> LuaResult<String> {
  match value {
    LuaValue::String(s) => Ok(s.to_string_lossy().to_string()),
    other => {
      let tostring: LuaFunction = lua.globals().get("tostring")?;
      tostring.call(other)
    }
  }
}
