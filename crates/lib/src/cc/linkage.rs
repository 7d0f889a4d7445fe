//! The linkage split: one variant per link form a library builds.

use tracing::trace;

use super::Linkage;
use crate::module::{Axis, DepKind, DependencyTag, Module};
use crate::mutator::{Mutator, Phase};
use crate::props::{PropValue, get_bool, get_list, set};

const REUSE_TAG: DependencyTag = DependencyTag::new(DepKind::ReuseObjects);

fn set_linkage(module: &mut Module, linkage: Linkage) {
  if let Some(lib) = module.cc_mut().and_then(|cc| cc.library.as_mut()) {
    lib.linkage = Some(linkage);
  }
}

/// Splits libraries into `static` and `shared` variants. When neither
/// side sets its own `cflags` the shared variant compiles nothing and
/// links the objects of its static twin.
pub fn linkage_mutator() -> Mutator {
  Mutator::new("link", Phase::LinkageSplit, |ctx| {
    let module = ctx.module();
    let Some(lib) = module.cc().and_then(|cc| cc.library.as_ref()) else {
      return;
    };
    let build_static = lib.build_static && get_bool(&module.props, "static.enabled") != Some(false);
    let build_shared = lib.build_shared && get_bool(&module.props, "shared.enabled") != Some(false);
    let reuse =
      get_list(&module.props, "static.cflags").is_empty() && get_list(&module.props, "shared.cflags").is_empty();

    match (build_static, build_shared) {
      (true, true) => {
        let variants = ctx.create_local_variations(Axis::Link, &["static", "shared"]);
        set_linkage(&mut variants[0], Linkage::Static);
        set_linkage(&mut variants[1], Linkage::Shared);
        if reuse {
          let shared = &mut variants[1];
          set(&mut shared.props, "srcs", PropValue::List(Vec::new()));
          set(&mut shared.props, "generated_sources", PropValue::List(Vec::new()));
          if let Some(lib) = shared.cc_mut().and_then(|cc| cc.library.as_mut()) {
            lib.reuse_objects = true;
          }
          ctx.add_inter_variant_dependency(REUSE_TAG, 1, 0);
        }
      }
      (true, false) => {
        let variants = ctx.create_local_variations(Axis::Link, &["static"]);
        set_linkage(&mut variants[0], Linkage::Static);
      }
      (false, true) => {
        let variants = ctx.create_local_variations(Axis::Link, &["shared"]);
        set_linkage(&mut variants[0], Linkage::Shared);
      }
      (false, false) => {
        trace!(module = %ctx.module().name, "header-only library keeps a single variant");
      }
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reuse_tag_is_not_a_library_edge() {
    assert!(!REUSE_TAG.kind.is_library());
    assert_eq!(REUSE_TAG.kind.required_link(), None);
  }
}
