//! Registered module types.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::types::{ModuleDefinition, ModuleLogic};
use crate::arch::HostOrDeviceSupported;
use crate::props::{FieldSpec, Schema};
use crate::util::once::OncePer;

/// Builds the type-specific state of a fresh module.
pub type ModuleFactory = fn(&ModuleDefinition) -> ModuleLogic;

#[derive(Clone)]
pub struct ModuleType {
  pub name: &'static str,
  pub schema: Schema,
  pub hod: HostOrDeviceSupported,
  pub default_multilib: &'static str,
  pub factory: ModuleFactory,
}

impl std::fmt::Debug for ModuleType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ModuleType")
      .field("name", &self.name)
      .field("hod", &self.hod)
      .field("default_multilib", &self.default_multilib)
      .finish()
  }
}

/// Properties every module type accepts.
pub fn common_schema() -> Schema {
  Schema::new()
    .with("name", FieldSpec::string())
    .with("enabled", FieldSpec::bool().variant())
    .with("host_supported", FieldSpec::bool())
    .with("device_supported", FieldSpec::bool())
    .with("compile_multilib", FieldSpec::string().variant())
    .with("defaults", FieldSpec::list())
    .with("owner", FieldSpec::string())
    .with("vendor", FieldSpec::bool())
    .with("proprietary", FieldSpec::bool())
    .with("required", FieldSpec::list().variant())
    .with("tags", FieldSpec::list())
}

#[derive(Debug, Default)]
pub struct ModuleTypeRegistry {
  types: BTreeMap<String, ModuleType>,
  schemas: OncePer<String, Arc<Schema>>,
}

impl ModuleTypeRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, module_type: ModuleType) {
    self.types.insert(module_type.name.to_string(), module_type);
  }

  pub fn get(&self, name: &str) -> Option<&ModuleType> {
    self.types.get(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &String> {
    self.types.keys()
  }

  /// The full schema of a type: common properties, type properties and the
  /// derived variant-axis blocks. Computed once per type.
  pub fn schema(&self, name: &str) -> Option<Arc<Schema>> {
    let module_type = self.types.get(name)?;
    Some(self.schemas.get_or_init(&name.to_string(), || {
      Arc::new(common_schema().merge(&module_type.schema).with_variant_blocks())
    }))
  }
}
