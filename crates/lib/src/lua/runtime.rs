use std::path::Path;

use mlua::prelude::*;

/// Create a sandboxed Lua runtime.
///
/// Only the base, `string`, `table` and `math` libraries are loaded, and the
/// base functions that reach the filesystem are removed.
pub fn create_runtime() -> LuaResult<Lua> {
  let lua = Lua::new_with(
    LuaStdLib::STRING | LuaStdLib::TABLE | LuaStdLib::MATH,
    LuaOptions::default(),
  )?;
  let globals = lua.globals();
  for name in ["dofile", "loadfile"] {
    globals.set(name, LuaValue::Nil)?;
  }
  Ok(lua)
}

/// Load and execute the Lua file at `path`.
pub fn load_file(lua: &Lua, path: &Path) -> LuaResult<()> {
  let content = std::fs::read_to_string(path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", path.display(), e)))?;
  lua.load(&content).set_name(format!("@{}", path.display())).exec()
}
