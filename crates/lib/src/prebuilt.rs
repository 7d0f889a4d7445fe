//! Prebuilt twins.
//!
//! A prebuilt module is registered as `prebuilt_<name>`. When a source
//! module `<name>` exists the two are paired with a one-way twin edge from
//! the source; otherwise the prebuilt takes the plain name. The prebuilt is
//! used when it has sources and either sets `prefer` or the source is
//! disabled. The losing side is not installed, and a chosen prebuilt takes
//! over every edge aimed at its source.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::PREBUILT_PREFIX;
use crate::module::{DepKind, DependencyTag, Module};
use crate::mutator::{Mutator, Phase};
use crate::props::{get_bool, get_list};

const TWIN_TAG: DependencyTag = DependencyTag::new(DepKind::PrebuiltTwin);

/// Pairing state of a prebuilt module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prebuilt {
  pub source_exists: bool,
  pub use_prebuilt: bool,
}

pub fn state(module: &Module) -> Option<&Prebuilt> {
  module.cc().and_then(|cc| cc.prebuilt.as_ref())
}

fn state_mut(module: &mut Module) -> Option<&mut Prebuilt> {
  module.cc_mut().and_then(|cc| cc.prebuilt.as_mut())
}

pub fn is_prebuilt(module: &Module) -> bool {
  state(module).is_some()
}

/// The name a prebuilt is registered under.
pub fn prebuilt_name(name: &str) -> String {
  format!("{PREBUILT_PREFIX}{name}")
}

/// The source module name a prebuilt stands in for.
pub fn base_name(name: &str) -> &str {
  name.strip_prefix(PREBUILT_PREFIX).unwrap_or(name)
}

fn use_prebuilt(prebuilt: &Module, source_enabled: bool) -> bool {
  if get_list(&prebuilt.props, "srcs").is_empty() {
    return false;
  }
  get_bool(&prebuilt.props, "prefer").unwrap_or(false) || !source_enabled
}

/// Pairs prebuilts with their sources, or renames them.
pub fn prebuilt_mark_mutator() -> Mutator {
  Mutator::new("prebuilts", Phase::PrebuiltMark, |ctx| {
    if !is_prebuilt(ctx.module()) {
      return;
    }
    let base = base_name(&ctx.module().name).to_string();
    if ctx.module_exists(&base) {
      ctx.add_reverse_dependency(TWIN_TAG, &base);
      if let Some(state) = state_mut(ctx.module_mut()) {
        state.source_exists = true;
      }
    } else {
      ctx.rename(&base);
    }
  })
}

/// Visits each source and decides which twin wins.
pub fn prebuilt_select_mutator() -> Mutator {
  Mutator::new("prebuilt_select", Phase::PrebuiltSelect, |ctx| {
    if is_prebuilt(ctx.module()) {
      return;
    }
    let source_enabled = ctx.module().enabled;
    let twins: Vec<_> = ctx
      .direct_deps()
      .into_iter()
      .filter(|(tag, _, m)| tag.kind == DepKind::PrebuiltTwin && m.variations.matches_exactly(&ctx.module().variations))
      .map(|(_, r, m)| (r, use_prebuilt(m, source_enabled)))
      .collect();
    for (r, chosen) in twins {
      if chosen {
        debug!(module = %ctx.module().name, variant = %ctx.module().variant(), "using prebuilt");
        ctx.module_mut().skip_install = true;
        ctx.mark(r, |m| {
          if let Some(state) = state_mut(m) {
            state.use_prebuilt = true;
          }
        });
      }
    }
  })
}

/// Redirects edges to the chosen prebuilt and hides unused ones.
pub fn prebuilt_subst_mutator() -> Mutator {
  Mutator::new("prebuilt_postdeps", Phase::PrebuiltSubst, |ctx| {
    let Some(state) = state(ctx.module()).cloned() else {
      return;
    };
    if state.use_prebuilt {
      if state.source_exists {
        let base = base_name(&ctx.module().name).to_string();
        ctx.replace_dependencies(&base);
      }
    } else {
      let module = ctx.module_mut();
      module.skip_install = true;
      module.hidden_from_legacy = state.source_exists;
    }
  })
}
