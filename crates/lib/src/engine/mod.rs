//! The engine entry point.
//!
//! A [`Context`] owns the configuration, the registered module types, hooks
//! and mutators, and the module definitions loaded for a build. Running it
//! instantiates one module per definition, drives the phased pipeline and
//! collects the final variants into a [`BuildResult`].

mod error;
mod plan;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::arch;
use crate::cc;
use crate::config::Config;
use crate::defaults;
use crate::genrule;
use crate::hooks::{self, HookRegistry};
use crate::module::{Module, ModuleDefinition, ModuleTable, ModuleTypeRegistry};
use crate::mutator::{Mutator, MutatorRegistry, Phase, Pipeline};
use crate::prebuilt;
use crate::props::{ExtendErrorKind, ExtendPropertyError};

pub use error::{EngineError, FatalError};
pub use plan::{BuildPlan, BuildResult, ModuleEdges, ModuleSummary, OutputFiles};

/// Everything one build needs before it runs.
#[derive(Debug)]
pub struct Context {
  config: Arc<Config>,
  types: Arc<ModuleTypeRegistry>,
  hooks: HookRegistry,
  extra: Vec<(Phase, Mutator)>,
  definitions: Vec<ModuleDefinition>,
}

impl Context {
  /// A context with every built-in module type registered.
  pub fn new(config: Config) -> Self {
    let mut types = ModuleTypeRegistry::new();
    cc::register_types(&mut types);
    genrule::register_types(&mut types);
    Self {
      config: Arc::new(config),
      types: Arc::new(types),
      hooks: HookRegistry::new(),
      extra: Vec::new(),
      definitions: Vec::new(),
    }
  }

  pub fn config(&self) -> &Arc<Config> {
    &self.config
  }

  pub fn types(&self) -> &ModuleTypeRegistry {
    &self.types
  }

  pub fn hooks_mut(&mut self) -> &mut HookRegistry {
    &mut self.hooks
  }

  /// Adds a mutator that runs after the built-in ones of its phase.
  pub fn register_mutator(&mut self, phase: Phase, mutator: Mutator) {
    self.extra.push((phase, mutator));
  }

  pub fn add_definition(&mut self, def: ModuleDefinition) {
    self.definitions.push(def);
  }

  pub fn add_definitions(&mut self, defs: impl IntoIterator<Item = ModuleDefinition>) {
    self.definitions.extend(defs);
  }

  pub fn definitions(&self) -> &[ModuleDefinition] {
    &self.definitions
  }

  /// The mutators of every phase, in registration order.
  fn mutators(&self) -> MutatorRegistry {
    let hooks = Arc::new(self.hooks.clone());
    let mut registry = MutatorRegistry::new();
    registry.register(Phase::LoadHooks, hooks::load_hooks_mutator(hooks.clone()));
    registry.register(Phase::PrebuiltMark, prebuilt::prebuilt_mark_mutator());
    registry.register(Phase::DefaultsExpand, defaults::defaults_deps_mutator());
    registry.register(Phase::DefaultsExpand, defaults::defaults_mutator());
    registry.register(Phase::VariantSplit, arch::arch_mutator());
    registry.register(Phase::ArchHooks, arch::product_variables_mutator());
    registry.register(Phase::ArchHooks, hooks::arch_hooks_mutator(hooks));
    registry.register(Phase::PrebuiltSelect, prebuilt::prebuilt_select_mutator());
    registry.register(Phase::PrebuiltSubst, prebuilt::prebuilt_subst_mutator());
    cc::register_mutators(&mut registry);
    genrule::register_mutators(&mut registry);
    for (phase, mutator) in &self.extra {
      registry.register(*phase, mutator.clone());
    }
    registry
  }

  /// One module per definition, checked against its type's schema.
  fn instantiate(&self) -> Result<ModuleTable, FatalError> {
    let mut table = ModuleTable::new();
    for def in &self.definitions {
      let module_type = self.types.get(&def.module_type).ok_or_else(|| FatalError::UnknownModuleType {
        module_type: def.module_type.clone(),
        location: def.location.clone(),
      })?;
      let declared = def.name().unwrap_or_default();
      if declared.is_empty() {
        return Err(FatalError::MalformedProperty {
          name: String::new(),
          location: def.location.clone(),
          error: ExtendPropertyError::new(
            "name",
            ExtendErrorKind::TypeMismatch {
              expected: "string",
              found: "nothing",
            },
          ),
        });
      }
      if let Some(schema) = self.types.schema(&def.module_type)
        && let Err(error) = schema.validate(&def.properties)
      {
        return Err(FatalError::MalformedProperty {
          name: declared.to_string(),
          location: def.location.clone(),
          error,
        });
      }

      let name = match cc::kind_of(&def.module_type) {
        Some(kind) => kind.module_name(declared),
        None => declared.to_string(),
      };
      let logic = (module_type.factory)(def);
      let module = Module::new(def, &name, module_type.hod, module_type.default_multilib, logic);
      if table.add(module).is_none() {
        return Err(FatalError::DuplicateModule {
          name,
          variant: String::new(),
          location: def.location.clone(),
        });
      }
    }
    Ok(table)
  }

  /// Runs every phase and collects the final variants.
  pub fn run(&self) -> Result<BuildResult, EngineError> {
    let table = self.instantiate()?;
    info!(modules = table.len(), "definitions instantiated");

    let registry = self.mutators();
    debug!(mutators = registry.len(), "mutators registered");
    let mut pipeline = Pipeline::new(table, self.config.clone(), self.types.clone());
    pipeline.run(&registry)?;

    for (_, module) in pipeline.table.iter() {
      if module.enabled && !module.missing_deps.is_empty() {
        warn!(
          module = %module.name,
          variant = %module.variant(),
          missing = %module.missing_deps.join(", "),
          "deferring missing dependencies to build time"
        );
      }
    }
    let result = BuildResult::new(pipeline.table, self.config.clone());
    info!(
      variants = result.plan.modules.len(),
      edges = result.plan.edge_count(),
      hash = %result.plan.hash,
      "build planned"
    );
    Ok(result)
  }
}
