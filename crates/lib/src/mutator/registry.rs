use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::context::MutatorContext;

/// Visit order of a mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  /// Dependents before their dependencies.
  TopDown,
  /// Dependencies before their dependents.
  BottomUp,
}

/// Whether the modules of one wave may be visited concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  Parallel,
  Serial,
}

/// The fixed pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
  LoadHooks,
  PrebuiltMark,
  DefaultsExpand,
  VariantSplit,
  ArchHooks,
  LinkageSplit,
  ImageSplit,
  ApiLevelSplit,
  PerSource,
  Begin,
  DepResolve,
  PrebuiltSelect,
  PrebuiltSubst,
  SanitizerProp,
  SanitizerSplit,
  CoverageSplit,
  AbiDep,
  Emit,
}

impl Phase {
  pub const ALL: [Phase; 18] = [
    Phase::LoadHooks,
    Phase::PrebuiltMark,
    Phase::DefaultsExpand,
    Phase::VariantSplit,
    Phase::ArchHooks,
    Phase::LinkageSplit,
    Phase::ImageSplit,
    Phase::ApiLevelSplit,
    Phase::PerSource,
    Phase::Begin,
    Phase::DepResolve,
    Phase::PrebuiltSelect,
    Phase::PrebuiltSubst,
    Phase::SanitizerProp,
    Phase::SanitizerSplit,
    Phase::CoverageSplit,
    Phase::AbiDep,
    Phase::Emit,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Phase::LoadHooks => "load-hooks",
      Phase::PrebuiltMark => "prebuilt-mark",
      Phase::DefaultsExpand => "defaults-expand",
      Phase::VariantSplit => "variant-split",
      Phase::ArchHooks => "arch-hooks",
      Phase::LinkageSplit => "linkage-split",
      Phase::ImageSplit => "image-split",
      Phase::ApiLevelSplit => "api-level-split",
      Phase::PerSource => "per-source",
      Phase::Begin => "begin",
      Phase::DepResolve => "dep-resolve",
      Phase::PrebuiltSelect => "prebuilt-select",
      Phase::PrebuiltSubst => "prebuilt-subst",
      Phase::SanitizerProp => "sanitizer-prop",
      Phase::SanitizerSplit => "sanitizer-split",
      Phase::CoverageSplit => "coverage-split",
      Phase::AbiDep => "abi-dep",
      Phase::Emit => "emit",
    }
  }

  pub fn direction(&self) -> Direction {
    match self {
      Phase::LoadHooks
      | Phase::DefaultsExpand
      | Phase::ArchHooks
      | Phase::PrebuiltSelect
      | Phase::SanitizerProp
      | Phase::AbiDep => Direction::TopDown,
      _ => Direction::BottomUp,
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

pub type MutatorFn = Arc<dyn Fn(&mut MutatorContext<'_>) + Send + Sync>;

#[derive(Clone)]
pub struct Mutator {
  pub name: String,
  pub direction: Direction,
  pub scope: Scope,
  pub func: MutatorFn,
}

impl Mutator {
  /// A parallel mutator running in the phase's own direction.
  pub fn new<F>(name: &str, phase: Phase, func: F) -> Self
  where
    F: Fn(&mut MutatorContext<'_>) + Send + Sync + 'static,
  {
    Self {
      name: name.to_string(),
      direction: phase.direction(),
      scope: Scope::Parallel,
      func: Arc::new(func),
    }
  }

  pub fn serial(mut self) -> Self {
    self.scope = Scope::Serial;
    self
  }
}

impl fmt::Debug for Mutator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Mutator")
      .field("name", &self.name)
      .field("direction", &self.direction)
      .field("scope", &self.scope)
      .finish_non_exhaustive()
  }
}

/// Mutators per phase, in registration order.
#[derive(Debug, Clone, Default)]
pub struct MutatorRegistry {
  phases: BTreeMap<Phase, Vec<Mutator>>,
}

impl MutatorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, phase: Phase, mutator: Mutator) {
    self.phases.entry(phase).or_default().push(mutator);
  }

  pub fn mutators(&self, phase: Phase) -> &[Mutator] {
    self.phases.get(&phase).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn len(&self) -> usize {
    self.phases.values().map(Vec::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
