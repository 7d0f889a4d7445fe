//! Wave scheduling and outcome application.
//!
//! A mutator runs over Kahn levels of the live dependency graph. All
//! modules of one level are independent, so they are taken out of the
//! table and visited concurrently while the rest of the table stays
//! readable. Splits, marks and errors are applied in `(name, variant)`
//! order when the level finishes; dependency requests, reverse
//! dependencies, replacements and renames when the whole mutator finishes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc;

use petgraph::Direction as Edges;
use petgraph::graph::{DiGraph, NodeIndex};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::context::{DepRequest, MutatorContext, ReverseRequest, Split, VisitOutcome};
use super::registry::{Direction, Mutator, MutatorRegistry, Phase, Scope};
use super::shared::SharedTables;
use crate::config::Config;
use crate::engine::{EngineError, FatalError};
use crate::module::{
  Axis, DepEdge, DepKind, Module, ModuleError, ModuleRef, ModuleTable, ModuleTypeRegistry, Variations,
};

/// Groups live modules into levels such that every module comes after the
/// modules it must wait for: its dependencies when bottom-up, its
/// dependents when top-down. Each level is sorted by `(name, variant)`.
pub fn compute_waves(table: &ModuleTable, direction: Direction) -> Result<Vec<Vec<ModuleRef>>, FatalError> {
  let mut graph: DiGraph<ModuleRef, ()> = DiGraph::new();
  let mut nodes: HashMap<ModuleRef, NodeIndex> = HashMap::new();
  for (r, _) in table.iter() {
    nodes.insert(r, graph.add_node(r));
  }

  for (r, module) in table.iter() {
    let dependent = nodes[&r];
    for edge in &module.deps {
      if edge.to == r {
        continue;
      }
      if let Some(&dep) = nodes.get(&edge.to) {
        match direction {
          Direction::BottomUp => graph.update_edge(dep, dependent, ()),
          Direction::TopDown => graph.update_edge(dependent, dep, ()),
        };
      }
    }
  }

  let mut in_degree: HashMap<NodeIndex, usize> = graph
    .node_indices()
    .map(|idx| (idx, graph.neighbors_directed(idx, Edges::Incoming).count()))
    .collect();
  let mut remaining: HashSet<NodeIndex> = graph.node_indices().collect();
  let mut waves = Vec::new();

  while !remaining.is_empty() {
    let ready: Vec<NodeIndex> = remaining.iter().filter(|idx| in_degree[*idx] == 0).copied().collect();
    if ready.is_empty() {
      let mut modules: Vec<String> = remaining
        .iter()
        .filter_map(|idx| table.get(graph[*idx]).map(|m| m.name.clone()))
        .collect();
      modules.sort();
      modules.dedup();
      return Err(FatalError::DependencyCycle { modules });
    }

    for idx in &ready {
      remaining.remove(idx);
      for neighbor in graph.neighbors_directed(*idx, Edges::Outgoing) {
        if let Some(deg) = in_degree.get_mut(&neighbor) {
          *deg = deg.saturating_sub(1);
        }
      }
    }

    let mut wave: Vec<(ModuleRef, String, String)> = ready
      .into_iter()
      .filter_map(|idx| {
        let r = graph[idx];
        table.get(r).map(|m| (r, m.name.clone(), m.variant()))
      })
      .collect();
    wave.sort_by(|a, b| (&a.1, &a.2).cmp(&(&b.1, &b.2)));
    waves.push(wave.into_iter().map(|(r, _, _)| r).collect());
  }

  Ok(waves)
}

/// The module table together with everything mutators read while running.
#[derive(Debug)]
pub struct Pipeline {
  pub table: ModuleTable,
  pub config: Arc<Config>,
  pub types: Arc<ModuleTypeRegistry>,
  pub shared: SharedTables,
}

/// Work deferred to the end of a mutator, attributed to the modules that
/// replaced the visited one.
struct Deferred {
  owners: Vec<ModuleRef>,
  requests: Vec<DepRequest>,
  reverse: Vec<ReverseRequest>,
  replace: Vec<String>,
  rename: Option<String>,
}

enum Unresolved {
  Missing,
  NoVariant(String),
}

impl Pipeline {
  pub fn new(table: ModuleTable, config: Arc<Config>, types: Arc<ModuleTypeRegistry>) -> Self {
    Self {
      table,
      config,
      types,
      shared: SharedTables::default(),
    }
  }

  /// Runs every phase in order.
  pub fn run(&mut self, registry: &MutatorRegistry) -> Result<(), EngineError> {
    for phase in Phase::ALL {
      self.run_phase(phase, registry.mutators(phase))?;
      info!(phase = %phase, modules = self.table.len(), "phase complete");
    }
    Ok(())
  }

  pub fn run_phase(&mut self, phase: Phase, mutators: &[Mutator]) -> Result<(), EngineError> {
    for mutator in mutators {
      let mut errors = self.run_mutator(phase, mutator)?;
      if !errors.is_empty() {
        errors.sort();
        errors.dedup();
        return Err(EngineError::Module {
          phase: format!("{phase} ({})", mutator.name),
          errors,
        });
      }
    }
    Ok(())
  }

  fn run_mutator(&mut self, phase: Phase, mutator: &Mutator) -> Result<Vec<ModuleError>, FatalError> {
    let waves = compute_waves(&self.table, mutator.direction)?;
    debug!(phase = %phase, mutator = %mutator.name, waves = waves.len(), "running mutator");

    let (tx, rx) = mpsc::channel();
    let mut errors = Vec::new();
    let mut pending = Vec::new();

    for wave in waves {
      let mut taken: Vec<(ModuleRef, Module)> = wave
        .iter()
        .filter_map(|r| self.table.take(*r).map(|m| (*r, m)))
        .collect();

      let outcomes: Vec<(ModuleRef, VisitOutcome)> = {
        let table = &self.table;
        let config = self.config.as_ref();
        let types = self.types.as_ref();
        let shared = &self.shared;
        let tx = &tx;
        let visit = |(r, module): &mut (ModuleRef, Module)| {
          let mut ctx = MutatorContext {
            phase,
            config,
            types,
            table,
            shared,
            records: tx,
            this: *r,
            module,
            out: VisitOutcome::default(),
          };
          (mutator.func)(&mut ctx);
          (*r, ctx.out)
        };
        match mutator.scope {
          Scope::Parallel => taken.par_iter_mut().map(visit).collect(),
          Scope::Serial => taken.iter_mut().map(visit).collect(),
        }
      };

      for (r, module) in taken {
        self.table.put(r, module);
      }

      let mut splits = Vec::new();
      let mut marks = Vec::new();
      let mut visited = Vec::new();
      for (r, outcome) in outcomes {
        if let Some(fatal) = outcome.fatal {
          return Err(fatal);
        }
        errors.extend(outcome.errors);
        marks.extend(outcome.marks);
        if let Some(split) = outcome.split {
          splits.push((r, split));
        }
        visited.push((
          r,
          Deferred {
            owners: Vec::new(),
            requests: outcome.requests,
            reverse: outcome.reverse,
            replace: outcome.replace,
            rename: outcome.rename,
          },
        ));
      }

      let replaced = apply_splits(&mut self.table, splits);
      for (target, mark) in marks {
        if let Some(module) = self.table.get_mut(target) {
          mark(module);
        }
      }

      for (r, mut work) in visited {
        if work.is_empty() {
          continue;
        }
        work.owners = replaced.get(&r).map(|(_, refs)| refs.clone()).unwrap_or_else(|| vec![r]);
        pending.push(work);
      }
    }

    drop(tx);
    for record in rx.try_iter() {
      self.shared.record(record);
    }

    self.apply_deferred(pending, &mut errors);
    Ok(errors)
  }

  fn apply_deferred(&mut self, pending: Vec<Deferred>, errors: &mut Vec<ModuleError>) {
    for work in &pending {
      if let Some(name) = &work.rename
        && let Some(current) = work.owners.first().and_then(|r| self.table.get(*r)).map(|m| m.name.clone())
        && !self.table.rename(&current, name)
        && let Some(m) = work.owners.first().and_then(|r| self.table.get(*r))
      {
        errors.push(m.error(None, format!("cannot rename to {name:?}: name already in use")));
      }
    }

    for work in &pending {
      for &owner in &work.owners {
        for request in &work.requests {
          self.add_requested(owner, request, errors);
        }
        for request in &work.reverse {
          self.add_reverse(owner, request, errors);
        }
      }
    }

    for work in &pending {
      for &owner in &work.owners {
        for name in &work.replace {
          self.replace_dependencies(owner, name);
        }
      }
    }
  }

  fn add_requested(&mut self, owner: ModuleRef, request: &DepRequest, errors: &mut Vec<ModuleError>) {
    let Some(from) = self.table.get(owner) else {
      return;
    };
    let mut wanted = if request.inherit {
      from.variations.dependency_variations()
    } else {
      Variations::new()
    };
    for (axis, value) in &request.variations {
      wanted.set(*axis, value);
    }

    match resolve(&self.table, &request.name, &wanted, request.tag.kind) {
      Ok(to) => {
        if let Some(from) = self.table.get_mut(owner) {
          from.deps.push(DepEdge { tag: request.tag, to });
        }
      }
      Err(Unresolved::Missing) if self.config.allow_missing => {
        warn!(
          module = %from.name,
          variant = %from.variant(),
          dependency = %request.name,
          "deferring missing dependency"
        );
        if let Some(from) = self.table.get_mut(owner)
          && !from.missing_deps.contains(&request.name)
        {
          from.missing_deps.push(request.name.clone());
        }
      }
      Err(Unresolved::Missing) => {
        errors.push(from.error(None, format!("depends on undefined module {:?}", request.name)));
      }
      Err(Unresolved::NoVariant(message)) => errors.push(from.error(None, message)),
    }
  }

  fn add_reverse(&mut self, owner: ModuleRef, request: &ReverseRequest, errors: &mut Vec<ModuleError>) {
    let Some(to) = self.table.get(owner) else {
      return;
    };
    let wanted = to.variations.dependency_variations();
    match resolve(&self.table, &request.from, &wanted, request.tag.kind) {
      Ok(from) => {
        if let Some(from) = self.table.get_mut(from) {
          from.deps.push(DepEdge {
            tag: request.tag,
            to: owner,
          });
        }
      }
      Err(Unresolved::Missing) => {
        errors.push(to.error(None, format!("depends on undefined module {:?}", request.from)));
      }
      Err(Unresolved::NoVariant(message)) => errors.push(to.error(None, message)),
    }
  }

  /// Points every edge aimed at the variant of `name` matching `owner` at
  /// `owner` instead.
  fn replace_dependencies(&mut self, owner: ModuleRef, name: &str) {
    let Some(variations) = self.table.get(owner).map(|m| m.variations.clone()) else {
      return;
    };
    let Some(target) = self
      .table
      .group(name)
      .iter()
      .copied()
      .find(|r| self.table.get(*r).is_some_and(|m| m.variations.matches_exactly(&variations)))
    else {
      return;
    };

    for r in self.table.refs() {
      if r == owner {
        continue;
      }
      if let Some(m) = self.table.get_mut(r) {
        for edge in m.deps.iter_mut().filter(|e| e.to == target) {
          edge.to = owner;
        }
      }
    }
  }
}

impl Deferred {
  fn is_empty(&self) -> bool {
    self.requests.is_empty() && self.reverse.is_empty() && self.replace.is_empty() && self.rename.is_none()
  }
}

/// Finds the variant of `name` a request for `wanted` selects: an exact
/// match, else the only variant whose non-empty values all appear in
/// `wanted`. Header edges fall back to the static, then shared, variant.
fn resolve(table: &ModuleTable, name: &str, wanted: &Variations, kind: DepKind) -> Result<ModuleRef, Unresolved> {
  let candidates: Vec<(ModuleRef, &Module)> = table
    .group(name)
    .iter()
    .filter_map(|r| table.get(*r).map(|m| (*r, m)))
    .collect();
  if candidates.is_empty() {
    return Err(Unresolved::Missing);
  }

  let select = |wanted: &Variations| -> Option<ModuleRef> {
    if let Some((r, _)) = candidates.iter().find(|(_, m)| m.variations.matches_exactly(wanted)) {
      return Some(*r);
    }
    let subset: Vec<ModuleRef> = candidates
      .iter()
      .filter(|(_, m)| m.variations.is_subset_of(wanted))
      .map(|(r, _)| *r)
      .collect();
    match subset.as_slice() {
      [only] => Some(*only),
      _ => None,
    }
  };

  if let Some(r) = select(wanted) {
    return Ok(r);
  }
  if kind == DepKind::Header && !wanted.has(Axis::Link) {
    for link in ["static", "shared"] {
      if let Some(r) = select(&wanted.clone().with(Axis::Link, link)) {
        return Ok(r);
      }
    }
  }

  let available: Vec<String> = candidates.iter().map(|(_, m)| format!("{:?}", m.variant())).collect();
  Err(Unresolved::NoVariant(format!(
    "dependency {name:?} has no variant matching {:?} (available: {})",
    wanted.describe(),
    available.join(", ")
  )))
}

/// Replaces split modules by their variants and retargets edges.
///
/// An edge aimed at a split module moves to the variant whose value on the
/// split axis equals the dependent's, else to the first variant. Each new
/// variant's own edges to modules split on the same axis then move to the
/// sibling carrying the new variant's value.
fn apply_splits(
  table: &mut ModuleTable,
  splits: Vec<(ModuleRef, Split)>,
) -> HashMap<ModuleRef, (Axis, Vec<ModuleRef>)> {
  let mut replaced = HashMap::new();
  let mut inter = Vec::new();
  for (r, split) in splits {
    let refs = table.replace(r, split.variants);
    for (from, tag, to) in split.inter {
      if let (Some(from), Some(to)) = (refs.get(from), refs.get(to)) {
        inter.push((*from, DepEdge { tag, to: *to }));
      }
    }
    replaced.insert(r, (split.axis, refs));
  }
  if replaced.is_empty() {
    return replaced;
  }

  for r in table.refs() {
    let Some(module) = table.get(r) else {
      continue;
    };
    if !module.deps.iter().any(|e| replaced.contains_key(&e.to)) {
      continue;
    }
    let deps: Vec<DepEdge> = module
      .deps
      .iter()
      .filter_map(|edge| match replaced.get(&edge.to) {
        Some((axis, refs)) => {
          let value = module.variations.get(*axis);
          let to = refs
            .iter()
            .copied()
            .find(|v| table.get(*v).is_some_and(|m| m.variations.get(*axis) == value))
            .or_else(|| refs.first().copied())?;
          Some(DepEdge { tag: edge.tag, to })
        }
        None => Some(edge.clone()),
      })
      .collect();
    if let Some(module) = table.get_mut(r) {
      module.deps = deps;
    }
  }

  for (axis, refs) in replaced.values() {
    for r in refs {
      convert_deps_to_variation(table, *r, *axis);
    }
  }

  for (from, edge) in inter {
    if let Some(module) = table.get_mut(from) {
      module.deps.push(edge);
    }
  }
  replaced
}

fn convert_deps_to_variation(table: &mut ModuleTable, r: ModuleRef, axis: Axis) {
  let Some(module) = table.get(r) else {
    return;
  };
  let value = module.variations.get(axis);
  let deps: Vec<DepEdge> = module
    .deps
    .iter()
    .map(|edge| {
      let sibling = table.get(edge.to).and_then(|dep| {
        if !dep.variations.has(axis) || dep.variations.get(axis) == value {
          return None;
        }
        let want = dep.variations.clone().with(axis, value);
        table
          .group(&dep.name)
          .iter()
          .copied()
          .find(|s| table.get(*s).is_some_and(|m| m.variations == want))
      });
      DepEdge {
        tag: edge.tag,
        to: sibling.unwrap_or(edge.to),
      }
    })
    .collect();
  if let Some(module) = table.get_mut(r) {
    module.deps = deps;
  }
}
