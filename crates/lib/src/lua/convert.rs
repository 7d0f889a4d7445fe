//! Lua values to property trees.
//!
//! Sequence tables become string lists, keyed tables become maps and an
//! empty table is an empty list. Integral numbers become integers.

use mlua::prelude::*;

use crate::props::{PropValue, Properties};

fn key_name(key: LuaValue) -> LuaResult<String> {
  match key {
    LuaValue::String(s) => Ok(s.to_str()?.to_string()),
    other => Err(LuaError::external(format!(
      "property names must be strings, found {}",
      other.type_name()
    ))),
  }
}

fn list_item(path: &str, value: LuaValue) -> LuaResult<String> {
  match value {
    LuaValue::String(s) => Ok(s.to_str()?.to_string()),
    other => Err(LuaError::external(format!(
      "{path}: list elements must be strings, found {}",
      other.type_name()
    ))),
  }
}

fn is_sequence(table: &LuaTable) -> LuaResult<bool> {
  let len = table.raw_len();
  let mut count = 0;
  for pair in table.clone().pairs::<LuaValue, LuaValue>() {
    let (key, _) = pair?;
    if !matches!(key, LuaValue::Integer(_)) {
      return Ok(false);
    }
    count += 1;
  }
  Ok(count == len)
}

/// Converts one property value found at `path`.
pub fn to_prop(path: &str, value: LuaValue) -> LuaResult<PropValue> {
  match value {
    LuaValue::Boolean(b) => Ok(PropValue::Bool(b)),
    LuaValue::Integer(i) => Ok(PropValue::Int(i)),
    LuaValue::Number(n) if n.fract() == 0.0 => Ok(PropValue::Int(n as i64)),
    LuaValue::String(s) => Ok(PropValue::Str(s.to_str()?.to_string())),
    LuaValue::Table(table) => {
      if is_sequence(&table)? {
        let items = table
          .sequence_values::<LuaValue>()
          .map(|v| v.and_then(|v| list_item(path, v)))
          .collect::<LuaResult<Vec<_>>>()?;
        Ok(PropValue::List(items))
      } else {
        Ok(PropValue::Map(to_properties(path, &table)?))
      }
    }
    other => Err(LuaError::external(format!(
      "{path}: unsupported property value of type {}",
      other.type_name()
    ))),
  }
}

/// Converts a keyed table. `prefix` is the dotted path of the table.
pub fn to_properties(prefix: &str, table: &LuaTable) -> LuaResult<Properties> {
  let mut props = Properties::new();
  for pair in table.clone().pairs::<LuaValue, LuaValue>() {
    let (key, value) = pair?;
    let name = key_name(key)?;
    let path = if prefix.is_empty() {
      name.clone()
    } else {
      format!("{prefix}.{name}")
    };
    props.insert(name, to_prop(&path, value)?);
  }
  Ok(props)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn eval(lua: &Lua, source: &str) -> LuaTable {
    lua.load(source).eval::<LuaTable>().unwrap()
  }

  #[test]
  fn nested_tables_become_trees() {
    let lua = Lua::new();
    let table = eval(
      &lua,
      r#"return { name = "libfoo", srcs = { "a.c", "b.c" }, shared = false, arch = { arm = { cflags = {} } } }"#,
    );
    let props = to_properties("", &table).unwrap();

    assert_eq!(props["name"], PropValue::Str("libfoo".to_string()));
    assert_eq!(props["srcs"], PropValue::List(vec!["a.c".to_string(), "b.c".to_string()]));
    assert_eq!(props["shared"], PropValue::Bool(false));
    let arm = props["arch"].as_map().unwrap()["arm"].as_map().unwrap();
    assert_eq!(arm["cflags"], PropValue::List(Vec::new()));
  }

  #[test]
  fn numbers_are_integers() {
    let lua = Lua::new();
    let table = eval(&lua, "return { sdk_version = 21, api = 9.0 }");
    let props = to_properties("", &table).unwrap();
    assert_eq!(props["sdk_version"], PropValue::Int(21));
    assert_eq!(props["api"], PropValue::Int(9));
  }

  #[test]
  fn non_string_list_items_are_rejected() {
    let lua = Lua::new();
    let table = eval(&lua, "return { srcs = { 1, 2 } }");
    let err = to_properties("", &table).unwrap_err();
    assert!(err.to_string().contains("srcs: list elements must be strings"));
  }
}
