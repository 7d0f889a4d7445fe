//! Load hooks and arch hooks.
//!
//! Hooks are registered per module type and may add properties to a module
//! before it is split (load hooks) or to each arch variant after the split
//! (arch hooks). Added properties are validated against the type's schema.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::module::Module;
use crate::mutator::{Mutator, MutatorContext, Phase};
use crate::props::{ExtendMode, Properties, Schema, extend_properties};

pub type Hook = Arc<dyn Fn(&mut HookContext<'_>) + Send + Sync>;

pub struct HookContext<'a> {
  module: &'a mut Module,
  schema: &'a Schema,
  config: &'a Config,
  errors: Vec<(Option<String>, String)>,
}

impl<'a> HookContext<'a> {
  pub fn module(&self) -> &Module {
    self.module
  }

  pub fn config(&self) -> &Config {
    self.config
  }

  /// Merges `props` after the module's own values.
  pub fn append_properties(&mut self, props: &Properties) {
    self.extend(props, ExtendMode::Append);
  }

  /// Merges `props` before the module's own values.
  pub fn prepend_properties(&mut self, props: &Properties) {
    self.extend(props, ExtendMode::Prepend);
  }

  pub fn property_error(&mut self, property: &str, message: impl Into<String>) {
    self.errors.push((Some(property.to_string()), message.into()));
  }

  pub fn module_error(&mut self, message: impl Into<String>) {
    self.errors.push((None, message.into()));
  }

  fn extend(&mut self, props: &Properties, mode: ExtendMode) {
    if let Err(err) = extend_properties(&mut self.module.props, props, self.schema, mode) {
      self.errors.push((Some(err.property), err.kind.to_string()));
    }
  }
}

#[derive(Clone, Default)]
pub struct HookRegistry {
  load: BTreeMap<String, Vec<Hook>>,
  arch: BTreeMap<String, Vec<Hook>>,
}

impl fmt::Debug for HookRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HookRegistry")
      .field("load", &self.load.keys().collect::<Vec<_>>())
      .field("arch", &self.arch.keys().collect::<Vec<_>>())
      .finish()
  }
}

impl HookRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register_load_hook<F>(&mut self, module_type: &str, hook: F)
  where
    F: Fn(&mut HookContext<'_>) + Send + Sync + 'static,
  {
    self.load.entry(module_type.to_string()).or_default().push(Arc::new(hook));
  }

  pub fn register_arch_hook<F>(&mut self, module_type: &str, hook: F)
  where
    F: Fn(&mut HookContext<'_>) + Send + Sync + 'static,
  {
    self.arch.entry(module_type.to_string()).or_default().push(Arc::new(hook));
  }

  pub fn load_hooks(&self, module_type: &str) -> &[Hook] {
    self.load.get(module_type).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn arch_hooks(&self, module_type: &str) -> &[Hook] {
    self.arch.get(module_type).map(Vec::as_slice).unwrap_or_default()
  }
}

fn run_hooks(ctx: &mut MutatorContext<'_>, hooks: &[Hook]) {
  if hooks.is_empty() {
    return;
  }
  let Some(schema) = ctx.types().schema(&ctx.module().module_type) else {
    return;
  };
  let config = ctx.config();
  let mut hook_ctx = HookContext {
    module: ctx.module_mut(),
    schema: &schema,
    config,
    errors: Vec::new(),
  };
  for hook in hooks {
    hook(&mut hook_ctx);
  }
  let errors = std::mem::take(&mut hook_ctx.errors);
  debug!(module = %ctx.module().name, hooks = hooks.len(), "ran hooks");
  for (property, message) in errors {
    match property {
      Some(property) => ctx.property_error(&property, message),
      None => ctx.module_error(message),
    }
  }
}

pub fn load_hooks_mutator(hooks: Arc<HookRegistry>) -> Mutator {
  Mutator::new("load_hooks", Phase::LoadHooks, move |ctx| {
    let module_type = ctx.module().module_type.clone();
    run_hooks(ctx, hooks.load_hooks(&module_type));
  })
}

/// Runs arch hooks on every variant that has a target.
pub fn arch_hooks_mutator(hooks: Arc<HookRegistry>) -> Mutator {
  Mutator::new("arch_hooks", Phase::ArchHooks, move |ctx| {
    if ctx.module().target.is_none() {
      return;
    }
    let module_type = ctx.module().module_type.clone();
    run_hooks(ctx, hooks.arch_hooks(&module_type));
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::props::{PropValue, get_list};

  #[test]
  fn registry_is_keyed_by_type() {
    let mut hooks = HookRegistry::new();
    hooks.register_load_hook("cc_library", |_| {});
    hooks.register_load_hook("cc_library", |_| {});
    hooks.register_arch_hook("cc_binary", |_| {});
    assert_eq!(hooks.load_hooks("cc_library").len(), 2);
    assert!(hooks.load_hooks("cc_binary").is_empty());
    assert_eq!(hooks.arch_hooks("cc_binary").len(), 1);
  }

  #[test]
  fn hook_context_validates_against_schema() {
    let schema = Schema::new().with("cflags", crate::props::FieldSpec::list());
    let config = Config::for_testing(crate::config::ProductVariables::defaults()).unwrap();
    let def = crate::module::ModuleDefinition {
      module_type: "t".to_string(),
      properties: Properties::from([("cflags".to_string(), PropValue::from(vec!["-B"]))]),
      location: crate::module::SourceLocation::new("Blueprints.lua", 1),
      dir: String::new(),
    };
    let mut module = Module::new(
      &def,
      "m",
      crate::arch::HostOrDeviceSupported::NeitherHostNorDevice,
      "",
      crate::module::ModuleLogic::Defaults,
    );
    let mut ctx = HookContext {
      module: &mut module,
      schema: &schema,
      config: &config,
      errors: Vec::new(),
    };
    ctx.prepend_properties(&Properties::from([("cflags".to_string(), PropValue::from(vec!["-A"]))]));
    ctx.append_properties(&Properties::from([("cflags".to_string(), PropValue::from(vec!["-C"]))]));
    ctx.append_properties(&Properties::from([("ldflags".to_string(), PropValue::from(vec!["-x"]))]));
    assert_eq!(ctx.errors, vec![(Some("ldflags".to_string()), "unrecognized property".to_string())]);
    assert_eq!(get_list(&module.props, "cflags"), ["-A", "-B", "-C"]);
  }
}
