//! Merging one property tree into another.

use super::schema::{FieldKind, Order, Schema, check_kind, join_path};
use super::value::{PropValue, Properties};
use super::{ExtendErrorKind, ExtendPropertyError};

/// Whether the source tree is merged after or before the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendMode {
  /// `src` comes later: lists append and scalars in `src` win.
  Append,
  /// `src` comes earlier: lists prepend and scalars already in `dst` win.
  Prepend,
}

/// Merges `src` into `dst`, rejecting fields `schema` does not declare.
pub fn extend_properties(
  dst: &mut Properties,
  src: &Properties,
  schema: &Schema,
  mode: ExtendMode,
) -> Result<(), ExtendPropertyError> {
  extend_at(dst, src, schema, mode, true, "")
}

/// Merges the fields of `src` that `schema` declares, ignoring the rest.
pub fn extend_matching(
  dst: &mut Properties,
  src: &Properties,
  schema: &Schema,
  mode: ExtendMode,
  prefix: &str,
) -> Result<(), ExtendPropertyError> {
  extend_at(dst, src, schema, mode, false, prefix)
}

fn extend_at(
  dst: &mut Properties,
  src: &Properties,
  schema: &Schema,
  mode: ExtendMode,
  strict: bool,
  prefix: &str,
) -> Result<(), ExtendPropertyError> {
  for (name, value) in src {
    let path = join_path(prefix, name);
    let Some(spec) = schema.field(name) else {
      if strict {
        return Err(ExtendPropertyError::new(&path, ExtendErrorKind::Unknown));
      }
      continue;
    };
    check_kind(spec, value, &path)?;

    match (&spec.kind, value) {
      (FieldKind::Struct(inner), PropValue::Map(src_map)) => {
        let entry = dst
          .entry(name.clone())
          .or_insert_with(|| PropValue::Map(Properties::new()));
        if let PropValue::Map(dst_map) = entry {
          extend_at(dst_map, src_map, inner, mode, strict, &path)?;
        }
      }
      (FieldKind::List, _) => {
        let src_list = value.as_list().unwrap_or_default();
        let dst_list = dst.get(name).and_then(PropValue::as_list).unwrap_or_default();
        let merged = merge_lists(dst_list, src_list, mode, spec.order);
        dst.insert(name.clone(), PropValue::List(merged));
      }
      _ => {
        let replace = match mode {
          ExtendMode::Prepend => !dst.contains_key(name),
          ExtendMode::Append => spec.order == Order::Replace || !is_zero(value) || !dst.contains_key(name),
        };
        if replace {
          dst.insert(name.clone(), value.clone());
        }
      }
    }
  }
  Ok(())
}

fn merge_lists(dst: &[String], src: &[String], mode: ExtendMode, order: Order) -> Vec<String> {
  let src_first = || -> Vec<String> { src.iter().chain(dst).cloned().collect() };
  match (mode, order) {
    (ExtendMode::Prepend, _) | (ExtendMode::Append, Order::Prepend) => src_first(),
    (ExtendMode::Append, Order::Replace) => src.to_vec(),
    (ExtendMode::Append, Order::Append) => dst.iter().chain(src).cloned().collect(),
  }
}

fn is_zero(value: &PropValue) -> bool {
  match value {
    PropValue::Bool(b) => !b,
    PropValue::Int(i) => *i == 0,
    PropValue::Str(s) => s.is_empty(),
    PropValue::List(l) => l.is_empty(),
    PropValue::Map(m) => m.is_empty(),
  }
}
