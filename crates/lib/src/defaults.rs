//! Defaults expansion.
//!
//! A module listing `defaults` receives the properties of each named
//! defaults module, merged before its own values. Defaults modules may name
//! defaults of their own; those come first. For `defaults: ["a", "b"]` the
//! result is `a`'s properties, then `b`'s, then the module's.

use crate::module::{DepKind, DependencyTag, Module, ModuleLogic};
use crate::mutator::{Mutator, MutatorContext, Phase};
use crate::props::{ExtendMode, Properties, extend_matching, get_list};

const DEFAULTS_TAG: DependencyTag = DependencyTag::new(DepKind::Defaults);

/// Adds an edge to every module named in `defaults`.
pub fn defaults_deps_mutator() -> Mutator {
  Mutator::new("defaults_deps", Phase::DefaultsExpand, |ctx| {
    let names = get_list(&ctx.module().props, "defaults").to_vec();
    for name in names {
      ctx.add_dependency(DEFAULTS_TAG, &name);
    }
  })
}

/// Merges the properties of the modules reached through defaults edges.
pub fn defaults_mutator() -> Mutator {
  Mutator::new("defaults", Phase::DefaultsExpand, |ctx| {
    if matches!(ctx.module().logic, ModuleLogic::Defaults) {
      return;
    }
    let roots: Vec<&Module> = ctx
      .direct_deps()
      .into_iter()
      .filter(|(tag, _, _)| tag.kind == DepKind::Defaults)
      .map(|(_, _, m)| m)
      .collect();
    if roots.is_empty() {
      return;
    }

    let mut chain = Vec::new();
    let mut stack = Vec::new();
    let mut errors = Vec::new();
    for root in roots {
      collect(ctx, root, &mut chain, &mut stack, &mut errors);
    }
    for message in errors {
      ctx.property_error("defaults", message);
    }

    let Some(schema) = ctx.types().schema(&ctx.module().module_type) else {
      return;
    };
    for props in chain.iter().rev() {
      if let Err(err) = extend_matching(&mut ctx.module_mut().props, props, &schema, ExtendMode::Prepend, "") {
        ctx.property_error(&err.property, err.kind.to_string());
        return;
      }
    }
  })
}

fn collect(
  ctx: &MutatorContext<'_>,
  module: &Module,
  chain: &mut Vec<Properties>,
  stack: &mut Vec<String>,
  errors: &mut Vec<String>,
) {
  if !matches!(module.logic, ModuleLogic::Defaults) {
    errors.push(format!("module {:?} is not a defaults module", module.name));
    return;
  }
  if stack.contains(&module.name) {
    errors.push(format!("defaults cycle through {:?}", module.name));
    return;
  }
  stack.push(module.name.clone());
  for edge in &module.deps {
    if edge.tag.kind == DepKind::Defaults
      && let Some(parent) = ctx.other(edge.to)
    {
      collect(ctx, parent, chain, stack, errors);
    }
  }
  stack.pop();

  let mut props = module.props.clone();
  props.remove("name");
  props.remove("defaults");
  chain.push(props);
}
