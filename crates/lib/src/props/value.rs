//! Property trees.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A property bag: field name to value.
pub type Properties = BTreeMap<String, PropValue>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
  Bool(bool),
  Int(i64),
  Str(String),
  List(Vec<String>),
  Map(Properties),
}

impl PropValue {
  pub fn kind_name(&self) -> &'static str {
    match self {
      PropValue::Bool(_) => "bool",
      PropValue::Int(_) => "int",
      PropValue::Str(_) => "string",
      PropValue::List(_) => "list of strings",
      PropValue::Map(_) => "map",
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      PropValue::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      PropValue::Str(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[String]> {
    match self {
      PropValue::List(l) => Some(l),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&Properties> {
    match self {
      PropValue::Map(m) => Some(m),
      _ => None,
    }
  }
}

impl From<bool> for PropValue {
  fn from(value: bool) -> Self {
    PropValue::Bool(value)
  }
}

impl From<&str> for PropValue {
  fn from(value: &str) -> Self {
    PropValue::Str(value.to_string())
  }
}

impl From<Vec<&str>> for PropValue {
  fn from(value: Vec<&str>) -> Self {
    PropValue::List(value.into_iter().map(str::to_string).collect())
  }
}

/// Looks up a dotted path such as `target.vendor.cflags`.
pub fn lookup<'a>(props: &'a Properties, path: &str) -> Option<&'a PropValue> {
  let mut parts = path.split('.');
  let mut current = props.get(parts.next()?)?;
  for part in parts {
    current = current.as_map()?.get(part)?;
  }
  Some(current)
}

/// Reads a boolean at `path`.
pub fn get_bool(props: &Properties, path: &str) -> Option<bool> {
  lookup(props, path).and_then(PropValue::as_bool)
}

/// Reads a string at `path`.
pub fn get_str<'a>(props: &'a Properties, path: &str) -> Option<&'a str> {
  lookup(props, path).and_then(PropValue::as_str)
}

/// Reads a list at `path`; absent lists are empty.
pub fn get_list<'a>(props: &'a Properties, path: &str) -> &'a [String] {
  lookup(props, path).and_then(PropValue::as_list).unwrap_or_default()
}

/// Sets a value at a dotted path, creating intermediate maps.
pub fn set(props: &mut Properties, path: &str, value: PropValue) {
  match path.split_once('.') {
    None => {
      props.insert(path.to_string(), value);
    }
    Some((head, rest)) => {
      let entry = props
        .entry(head.to_string())
        .or_insert_with(|| PropValue::Map(Properties::new()));
      if !matches!(entry, PropValue::Map(_)) {
        *entry = PropValue::Map(Properties::new());
      }
      if let PropValue::Map(map) = entry {
        set(map, rest, value);
      }
    }
  }
}

/// Converts a property tree into JSON for typed deserialisation.
pub fn to_json(props: &Properties) -> serde_json::Value {
  serde_json::Value::Object(
    props
      .iter()
      .map(|(key, value)| (key.clone(), value_to_json(value)))
      .collect(),
  )
}

fn value_to_json(value: &PropValue) -> serde_json::Value {
  match value {
    PropValue::Bool(b) => serde_json::Value::Bool(*b),
    PropValue::Int(i) => serde_json::Value::from(*i),
    PropValue::Str(s) => serde_json::Value::String(s.clone()),
    PropValue::List(l) => serde_json::Value::Array(l.iter().cloned().map(serde_json::Value::String).collect()),
    PropValue::Map(m) => to_json(m),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dotted_paths() {
    let mut props = Properties::new();
    set(&mut props, "target.vendor.cflags", vec!["-DV"].into());
    set(&mut props, "enabled", true.into());
    assert_eq!(get_list(&props, "target.vendor.cflags"), &["-DV".to_string()]);
    assert_eq!(get_bool(&props, "enabled"), Some(true));
    assert!(get_list(&props, "target.host.cflags").is_empty());
    assert_eq!(get_str(&props, "enabled"), None);
  }

  #[test]
  fn json_conversion() {
    let mut props = Properties::new();
    set(&mut props, "name", "libfoo".into());
    set(&mut props, "static.cflags", vec!["-a"].into());
    let json = to_json(&props);
    assert_eq!(json["name"], "libfoo");
    assert_eq!(json["static"]["cflags"][0], "-a");
  }
}
