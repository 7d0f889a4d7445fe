//! Property schemas.
//!
//! A [`Schema`] names every field a module type accepts, with its kind and
//! composition behaviour. The variant-axis sub-blocks (`arch`, `multilib`,
//! `target`, `product_variables`) are derived from it: each holds the
//! schema filtered to its `arch_variant` fields.

use std::collections::BTreeMap;

use super::value::{PropValue, Properties};
use super::{ExtendErrorKind, ExtendPropertyError};
use crate::arch::{ArchType, OsType, registry};
use crate::config::PRODUCT_VARIABLE_BLOCKS;

/// How a field merges when a later block sets it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
  /// Lists concatenate; scalars keep the earlier value when the later one is zero.
  Append,
  /// Lists put the later values first.
  Prepend,
  /// The later value wins outright.
  Replace,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
  Bool,
  Int,
  Str,
  List,
  Struct(Schema),
}

impl FieldKind {
  fn name(&self) -> &'static str {
    match self {
      FieldKind::Bool => "bool",
      FieldKind::Int => "int",
      FieldKind::Str => "string",
      FieldKind::List => "list of strings",
      FieldKind::Struct(_) => "map",
    }
  }

  /// Whether `value` has this kind. An empty map is accepted as an empty list.
  pub fn accepts(&self, value: &PropValue) -> bool {
    match (self, value) {
      (FieldKind::Bool, PropValue::Bool(_))
      | (FieldKind::Int, PropValue::Int(_))
      | (FieldKind::Str, PropValue::Str(_))
      | (FieldKind::List, PropValue::List(_))
      | (FieldKind::Struct(_), PropValue::Map(_)) => true,
      (FieldKind::List, PropValue::Map(m)) => m.is_empty(),
      _ => false,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
  pub kind: FieldKind,
  pub arch_variant: bool,
  pub order: Order,
  pub mutated: bool,
}

impl FieldSpec {
  fn of(kind: FieldKind, order: Order) -> Self {
    Self {
      kind,
      arch_variant: false,
      order,
      mutated: false,
    }
  }

  pub fn bool() -> Self {
    Self::of(FieldKind::Bool, Order::Replace)
  }

  pub fn int() -> Self {
    Self::of(FieldKind::Int, Order::Replace)
  }

  pub fn string() -> Self {
    Self::of(FieldKind::Str, Order::Replace)
  }

  pub fn list() -> Self {
    Self::of(FieldKind::List, Order::Append)
  }

  pub fn group(schema: Schema) -> Self {
    Self::of(FieldKind::Struct(schema), Order::Append)
  }

  /// Participates in variant composition.
  pub fn variant(mut self) -> Self {
    self.arch_variant = true;
    self
  }

  pub fn prepend(mut self) -> Self {
    self.order = Order::Prepend;
    self
  }

  pub fn replace(mut self) -> Self {
    self.order = Order::Replace;
    self
  }

  pub fn append(mut self) -> Self {
    self.order = Order::Append;
    self
  }

  /// Set only by the engine; definitions may not assign it.
  pub fn mutated(mut self) -> Self {
    self.mutated = true;
    self
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
  fields: BTreeMap<String, FieldSpec>,
}

impl Schema {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, name: &str, spec: FieldSpec) -> Self {
    self.fields.insert(name.to_string(), spec);
    self
  }

  /// Adds every field of `other`, which wins on name clashes.
  pub fn merge(mut self, other: &Schema) -> Self {
    for (name, spec) in &other.fields {
      self.fields.insert(name.clone(), spec.clone());
    }
    self
  }

  pub fn field(&self, name: &str) -> Option<&FieldSpec> {
    self.fields.get(name)
  }

  pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldSpec)> {
    self.fields.iter()
  }

  /// The fields that participate in variant composition.
  pub fn arch_variant_subset(&self) -> Schema {
    let fields = self
      .fields
      .iter()
      .filter(|(_, spec)| spec.arch_variant)
      .map(|(name, spec)| {
        let mut spec = spec.clone();
        if let FieldKind::Struct(inner) = &spec.kind {
          spec.kind = FieldKind::Struct(inner.arch_variant_subset());
        }
        (name.clone(), spec)
      })
      .collect();
    Schema { fields }
  }

  /// Adds the `arch`, `multilib`, `target` and `product_variables` blocks.
  pub fn with_variant_blocks(self) -> Schema {
    let subset = self.arch_variant_subset();
    let block = || FieldSpec::group(subset.clone());

    let mut arch = Schema::new();
    for arch_type in ArchType::ALL {
      let mut per_arch = subset.clone();
      for sub in registry::arch_sub_blocks(arch_type) {
        per_arch = per_arch.with(&sub, block());
      }
      arch = arch.with(arch_type.name(), FieldSpec::group(per_arch));
    }

    let multilib = Schema::new().with("lib32", block()).with("lib64", block());

    let mut target = Schema::new();
    for name in ["host", "not_windows", "android32", "android64", "arm_on_x86", "arm_on_x86_64", "vendor", "linux"] {
      target = target.with(name, block());
    }
    for os in OsType::ALL {
      target = target.with(os.name(), block());
      for arch_type in os.arches() {
        target = target.with(&format!("{}_{}", os.name(), arch_type.name()), block());
        for alias in os.aliases() {
          target = target.with(&format!("{}_{}", alias, arch_type.name()), block());
        }
      }
    }

    let mut product_variables = Schema::new();
    for name in PRODUCT_VARIABLE_BLOCKS {
      product_variables = product_variables.with(name, block());
    }

    self
      .with("arch", FieldSpec::group(arch))
      .with("multilib", FieldSpec::group(multilib))
      .with("target", FieldSpec::group(target))
      .with("product_variables", FieldSpec::group(product_variables))
  }

  /// Checks field names and kinds of a definition's properties.
  pub fn validate(&self, props: &Properties) -> Result<(), ExtendPropertyError> {
    self.validate_at(props, "")
  }

  fn validate_at(&self, props: &Properties, prefix: &str) -> Result<(), ExtendPropertyError> {
    for (name, value) in props {
      let path = join_path(prefix, name);
      let spec = self.field(name).ok_or_else(|| ExtendPropertyError::new(&path, ExtendErrorKind::Unknown))?;
      if spec.mutated {
        return Err(ExtendPropertyError::new(&path, ExtendErrorKind::Mutated));
      }
      check_kind(spec, value, &path)?;
      if let (FieldKind::Struct(inner), PropValue::Map(map)) = (&spec.kind, value) {
        inner.validate_at(map, &path)?;
      }
    }
    Ok(())
  }
}

pub(crate) fn check_kind(spec: &FieldSpec, value: &PropValue, path: &str) -> Result<(), ExtendPropertyError> {
  if spec.kind.accepts(value) {
    Ok(())
  } else {
    Err(ExtendPropertyError::new(
      path,
      ExtendErrorKind::TypeMismatch {
        expected: spec.kind.name(),
        found: value.kind_name(),
      },
    ))
  }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
  if prefix.is_empty() {
    name.to_string()
  } else {
    format!("{prefix}.{name}")
  }
}
