use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use tracing::{debug, trace};

use super::LoadError;
use super::convert;
use crate::consts::DEFINITIONS_FILE;
use crate::module::{ModuleDefinition, ModuleTypeRegistry, SourceLocation};
use crate::paths;

/// A file being evaluated: its path and directory relative to the root.
#[derive(Debug, Clone, Default)]
struct Frame {
  file: String,
  dir: String,
}

#[derive(Debug)]
struct LoadState {
  root: PathBuf,
  frames: Vec<Frame>,
  defs: Vec<ModuleDefinition>,
  /// The first typed failure; reported instead of the Lua error it raised.
  error: Option<LoadError>,
}

type Shared = Rc<RefCell<LoadState>>;

impl LoadState {
  fn frame(&self) -> Frame {
    self.frames.last().cloned().unwrap_or_default()
  }

  fn fail(&mut self, err: LoadError) -> LuaError {
    let message = err.to_string();
    if self.error.is_none() {
      self.error = Some(err);
    }
    LuaError::runtime(message)
  }
}

/// The line of the Lua code calling the running Rust function.
fn caller_line(lua: &Lua) -> u32 {
  lua
    .inspect_stack(1, |debug| debug.current_line())
    .flatten()
    .and_then(|line| u32::try_from(line).ok())
    .unwrap_or(0)
}

/// Names that read like module types when looked up as globals.
fn looks_like_module_type(name: &str) -> bool {
  name.contains('_') && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn register_module_type(lua: &Lua, state: &Shared, module_type: String) -> LuaResult<()> {
  let state = state.clone();
  let name = module_type.clone();
  let define = lua.create_function(move |lua, value: LuaValue| {
    let line = caller_line(lua);
    let frame = state.borrow().frame();
    let location = SourceLocation::new(&frame.file, line);
    let LuaValue::Table(table) = value else {
      return Err(state.borrow_mut().fail(LoadError::Definition {
        location,
        message: format!("{name} expects a property table"),
      }));
    };
    let properties = match convert::to_properties("", &table) {
      Ok(properties) => properties,
      Err(err) => {
        return Err(state.borrow_mut().fail(LoadError::Definition {
          location,
          message: err.to_string(),
        }));
      }
    };
    trace!(module_type = %name, location = %location, "module defined");
    state.borrow_mut().defs.push(ModuleDefinition {
      module_type: name.clone(),
      properties,
      location,
      dir: frame.dir,
    });
    Ok(())
  })?;
  lua.globals().set(module_type, define)
}

/// Undefined globals that read like module types resolve to a function
/// reporting the unknown type at its call site.
fn register_unknown_types(lua: &Lua, state: &Shared) -> LuaResult<()> {
  let state = state.clone();
  let index = lua.create_function(move |lua, (_globals, key): (LuaTable, LuaValue)| {
    let LuaValue::String(key) = key else {
      return Ok(LuaValue::Nil);
    };
    let name = key.to_str()?.to_string();
    if !looks_like_module_type(&name) {
      return Ok(LuaValue::Nil);
    }
    let state = state.clone();
    let unknown = lua.create_function(move |lua, _: LuaMultiValue| -> LuaResult<()> {
      let location = SourceLocation::new(&state.borrow().frame().file, caller_line(lua));
      Err(state.borrow_mut().fail(LoadError::UnknownModuleType {
        module_type: name.clone(),
        location,
      }))
    })?;
    Ok(LuaValue::Function(unknown))
  })?;
  let meta = lua.create_table()?;
  meta.set("__index", index)?;
  let set_metatable: LuaFunction = lua.globals().get("setmetatable")?;
  set_metatable.call::<LuaValue>((lua.globals(), meta))?;
  Ok(())
}

fn register_subdir(lua: &Lua, state: &Shared) -> LuaResult<()> {
  let state = state.clone();
  let subdir = lua.create_function(move |lua, path: String| {
    let parent = state.borrow().frame();
    let dir = paths::join(&[&parent.dir, &path]);
    let file = paths::join(&[&dir, DEFINITIONS_FILE]);
    let full = state.borrow().root.join(&file);
    let source = match std::fs::read_to_string(&full) {
      Ok(source) => source,
      Err(source) => return Err(state.borrow_mut().fail(LoadError::Read { path: full, source })),
    };
    debug!(file = %file, "loading subdirectory");
    exec(lua, &state, Frame { file, dir }, &source)
  })?;
  lua.globals().set("subdir", subdir)
}

/// Evaluates `source` as the file described by `frame`.
fn exec(lua: &Lua, state: &Shared, frame: Frame, source: &str) -> LuaResult<()> {
  let name = format!("@{}", frame.file);
  state.borrow_mut().frames.push(frame);
  let result = lua.load(source).set_name(name).exec();
  state.borrow_mut().frames.pop();
  result
}

/// Creates a Lua runtime whose globals define modules into `state`.
fn create_runtime(types: &ModuleTypeRegistry, state: &Shared) -> LuaResult<Lua> {
  let lua = Lua::new();
  for module_type in types.names() {
    register_module_type(&lua, state, module_type.clone())?;
  }
  register_subdir(&lua, state)?;
  register_unknown_types(&lua, state)?;
  Ok(lua)
}

/// Evaluates `source` as the definitions file `file`, relative to `root`.
pub fn load_str(
  root: &Path,
  file: &str,
  source: &str,
  types: &ModuleTypeRegistry,
) -> Result<Vec<ModuleDefinition>, LoadError> {
  let state: Shared = Rc::new(RefCell::new(LoadState {
    root: root.to_path_buf(),
    frames: Vec::new(),
    defs: Vec::new(),
    error: None,
  }));
  let lua_error = |source: LuaError| LoadError::Lua {
    file: file.to_string(),
    source,
  };
  let lua = create_runtime(types, &state).map_err(lua_error)?;

  let dir = match file.rsplit_once('/') {
    Some((dir, _)) => dir.to_string(),
    None => String::new(),
  };
  let frame = Frame {
    file: file.to_string(),
    dir,
  };
  if let Err(err) = exec(&lua, &state, frame, source) {
    let typed = state.borrow_mut().error.take();
    return Err(typed.unwrap_or_else(|| lua_error(err)));
  }
  drop(lua);

  let defs = std::mem::take(&mut state.borrow_mut().defs);
  debug!(file, modules = defs.len(), "definitions loaded");
  Ok(defs)
}

/// Loads `file` (relative to `root`) and every subdirectory it names.
pub fn load_definitions(
  root: &Path,
  file: &str,
  types: &ModuleTypeRegistry,
) -> Result<Vec<ModuleDefinition>, LoadError> {
  let path = root.join(file);
  let source = std::fs::read_to_string(&path).map_err(|source| LoadError::Read { path, source })?;
  load_str(root, file, &source, types)
}
