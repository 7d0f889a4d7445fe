//! The per-visit view a mutator works through.

use std::sync::mpsc::Sender;

use super::registry::Phase;
use super::shared::{SharedRecord, SharedTables};
use crate::config::Config;
use crate::engine::FatalError;
use crate::module::{Axis, DependencyTag, Module, ModuleError, ModuleRef, ModuleTable, ModuleTypeRegistry};

/// A deferred write to another module, applied once the current wave ends.
pub type Mark = Box<dyn FnOnce(&mut Module) + Send>;

#[derive(Debug, Clone)]
pub(crate) struct DepRequest {
  pub tag: DependencyTag,
  pub name: String,
  pub variations: Vec<(Axis, String)>,
  /// Start from the requesting module's non-local variations.
  pub inherit: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ReverseRequest {
  pub tag: DependencyTag,
  pub from: String,
}

#[derive(Debug)]
pub(crate) struct Split {
  pub axis: Axis,
  pub variants: Vec<Module>,
  /// Edges between new variants, by index into `variants`.
  pub inter: Vec<(usize, DependencyTag, usize)>,
}

/// Everything a visit produced besides in-place edits of its own module.
#[derive(Default)]
pub(crate) struct VisitOutcome {
  pub errors: Vec<ModuleError>,
  pub fatal: Option<FatalError>,
  pub split: Option<Split>,
  pub requests: Vec<DepRequest>,
  pub reverse: Vec<ReverseRequest>,
  pub replace: Vec<String>,
  pub marks: Vec<(ModuleRef, Mark)>,
  pub rename: Option<String>,
}

pub struct MutatorContext<'a> {
  pub(crate) phase: Phase,
  pub(crate) config: &'a Config,
  pub(crate) types: &'a ModuleTypeRegistry,
  pub(crate) table: &'a ModuleTable,
  pub(crate) shared: &'a SharedTables,
  pub(crate) records: &'a Sender<SharedRecord>,
  pub(crate) this: ModuleRef,
  pub(crate) module: &'a mut Module,
  pub(crate) out: VisitOutcome,
}

impl<'a> MutatorContext<'a> {
  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn config(&self) -> &'a Config {
    self.config
  }

  pub fn types(&self) -> &'a ModuleTypeRegistry {
    self.types
  }

  pub fn shared(&self) -> &'a SharedTables {
    self.shared
  }

  pub fn this(&self) -> ModuleRef {
    self.this
  }

  pub fn module(&self) -> &Module {
    self.module
  }

  pub fn module_mut(&mut self) -> &mut Module {
    self.module
  }

  /// Another module of the table. The visited module itself and modules
  /// being visited concurrently are not readable through this.
  pub fn other(&self, r: ModuleRef) -> Option<&'a Module> {
    self.table.get(r)
  }

  /// Live variants of `name`, in creation order.
  pub fn variants_of(&self, name: &str) -> Vec<(ModuleRef, &'a Module)> {
    let table = self.table;
    table.group(name).iter().filter_map(|r| table.get(*r).map(|m| (*r, m))).collect()
  }

  pub fn module_exists(&self, name: &str) -> bool {
    self.table.contains_name(name) || self.module.name == name
  }

  /// Resolved direct dependencies in edge order.
  pub fn direct_deps(&self) -> Vec<(DependencyTag, ModuleRef, &'a Module)> {
    let table = self.table;
    self
      .module
      .deps
      .iter()
      .filter_map(|edge| table.get(edge.to).map(|m| (edge.tag, edge.to, m)))
      .collect()
  }

  pub fn module_error(&mut self, message: impl Into<String>) {
    let err = self.module.error(None, message);
    self.out.errors.push(err);
  }

  pub fn property_error(&mut self, property: &str, message: impl Into<String>) {
    let err = self.module.error(Some(property), message);
    self.out.errors.push(err);
  }

  pub fn fatal(&mut self, err: FatalError) {
    if self.out.fatal.is_none() {
      self.out.fatal = Some(err);
    }
  }

  pub fn has_errors(&self) -> bool {
    !self.out.errors.is_empty() || self.out.fatal.is_some()
  }

  /// Replaces the visited module by one copy per name, each tagged with its
  /// value on `axis`. Existing dependencies are copied to every copy.
  pub fn create_variations(&mut self, axis: Axis, names: &[&str]) -> &mut [Module] {
    let variants = names
      .iter()
      .map(|name| {
        let mut m = self.module.clone();
        m.variations.set(axis, name);
        m
      })
      .collect();
    let split = self.out.split.insert(Split {
      axis,
      variants,
      inter: Vec::new(),
    });
    &mut split.variants
  }

  /// Like [`create_variations`](Self::create_variations) on an axis that
  /// dependents do not inherit.
  pub fn create_local_variations(&mut self, axis: Axis, names: &[&str]) -> &mut [Module] {
    debug_assert!(axis.is_local());
    self.create_variations(axis, names)
  }

  /// Adds an edge between two variants created by this visit.
  pub fn add_inter_variant_dependency(&mut self, tag: DependencyTag, from: usize, to: usize) {
    if let Some(split) = self.out.split.as_mut() {
      split.inter.push((from, tag, to));
    }
  }

  pub fn add_dependency(&mut self, tag: DependencyTag, name: &str) {
    self.out.requests.push(DepRequest {
      tag,
      name: name.to_string(),
      variations: Vec::new(),
      inherit: true,
    });
  }

  pub fn add_variation_dependencies(&mut self, variations: &[(Axis, &str)], tag: DependencyTag, name: &str) {
    self.out.requests.push(DepRequest {
      tag,
      name: name.to_string(),
      variations: owned(variations),
      inherit: true,
    });
  }

  /// Requests exactly `variations`, ignoring the visited module's own.
  pub fn add_far_variation_dependencies(&mut self, variations: &[(Axis, &str)], tag: DependencyTag, name: &str) {
    self.out.requests.push(DepRequest {
      tag,
      name: name.to_string(),
      variations: owned(variations),
      inherit: false,
    });
  }

  /// Adds an edge from a matching variant of `from` to the visited module.
  pub fn add_reverse_dependency(&mut self, tag: DependencyTag, from: &str) {
    self.out.reverse.push(ReverseRequest {
      tag,
      from: from.to_string(),
    });
  }

  pub fn add_missing_dependencies(&mut self, names: &[String]) {
    for name in names {
      if !self.module.missing_deps.contains(name) {
        self.module.missing_deps.push(name.clone());
      }
    }
  }

  /// Points every edge aimed at the same variant of `name` at the visited
  /// module instead.
  pub fn replace_dependencies(&mut self, name: &str) {
    self.out.replace.push(name.to_string());
  }

  pub fn rename(&mut self, name: &str) {
    self.out.rename = Some(name.to_string());
  }

  /// Queues a write to another module.
  pub fn mark<F>(&mut self, r: ModuleRef, f: F)
  where
    F: FnOnce(&mut Module) + Send + 'static,
  {
    self.out.marks.push((r, Box::new(f)));
  }

  pub fn record(&self, record: SharedRecord) {
    // The receiver outlives every visit of the phase.
    let _ = self.records.send(record);
  }
}

fn owned(variations: &[(Axis, &str)]) -> Vec<(Axis, String)> {
  variations.iter().map(|(axis, value)| (*axis, value.to_string())).collect()
}
