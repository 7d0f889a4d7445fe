//! The variant-split mutators: one variant per selected target, then the
//! product-variable blocks.

use tracing::debug;

use super::{OsClass, Target, decode_multilib};
use crate::module::Axis;
use crate::mutator::{Mutator, Phase};
use crate::props::{Properties, compose_arch, compose_product_variables, get_bool, get_str};

/// `compile_multilib` for one OS class: the per-class override, then the
/// module-wide value, then the type default.
fn class_multilib<'a>(props: &'a Properties, class: OsClass, default: &'a str) -> &'a str {
  let per_class = match class {
    OsClass::Device => get_str(props, "target.android.compile_multilib"),
    OsClass::Host | OsClass::HostCross => get_str(props, "target.host.compile_multilib"),
  };
  per_class
    .filter(|v| !v.is_empty())
    .or_else(|| get_str(props, "compile_multilib").filter(|v| !v.is_empty()))
    .unwrap_or(default)
}

/// Splits every arch-specific module across its targets and composes the
/// arch, multilib and OS blocks into each variant.
pub fn arch_mutator() -> Mutator {
  Mutator::new("arch", Phase::VariantSplit, |ctx| {
    let config = ctx.config();
    let module = ctx.module();
    if !module.hod.is_arch_specific() {
      return;
    }
    let classes = module.hod.classes(
      get_bool(&module.props, "host_supported"),
      get_bool(&module.props, "device_supported"),
    );

    let mut selected: Vec<(Target, bool)> = Vec::new();
    let mut errors = Vec::new();
    for class in classes {
      let targets = config.targets_for(class);
      if targets.is_empty() {
        continue;
      }
      let multilib = class_multilib(&module.props, class, module.default_multilib);
      let prefer32 = match class {
        OsClass::Device => config.device_prefer32(),
        OsClass::HostCross => true,
        OsClass::Host => false,
      };
      match decode_multilib(multilib, targets, prefer32) {
        Ok(targets) => {
          for (i, target) in targets.into_iter().enumerate() {
            selected.push((target, i == 0));
          }
        }
        Err(err) => errors.push(err.to_string()),
      }
    }
    for message in errors {
      ctx.module_error(message);
    }

    if selected.is_empty() {
      debug!(module = %ctx.module().name, "no targets selected, disabling");
      ctx.module_mut().enabled = false;
      return;
    }

    let Some(schema) = ctx.types().schema(&ctx.module().module_type) else {
      return;
    };
    let names: Vec<String> = selected.iter().map(|(t, _)| t.to_string()).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();

    let mut failures = Vec::new();
    let variants = ctx.create_variations(Axis::Arch, &names);
    for (m, (target, primary)) in variants.iter_mut().zip(selected) {
      let arm_on_x86 = target.is_device() && config.arm_on_x86(&target.arch);
      if let Err(err) = compose_arch(&mut m.props, &schema, &target, arm_on_x86) {
        failures.push(err);
      }
      m.target = Some(target);
      m.primary = primary;
      m.enabled = m.enabled_property();
    }
    for err in failures {
      ctx.property_error(&err.property, err.kind.to_string());
    }
  })
}

/// Folds the `product_variables` blocks of every set variable into each
/// module.
pub fn product_variables_mutator() -> Mutator {
  Mutator::new("variable", Phase::ArchHooks, |ctx| {
    if ctx.module().props.get("product_variables").is_none() {
      return;
    }
    let active = ctx.config().variables.active_blocks();
    let Some(schema) = ctx.types().schema(&ctx.module().module_type) else {
      return;
    };
    if let Err(err) = compose_product_variables(&mut ctx.module_mut().props, &schema, &active) {
      ctx.property_error(&err.property, err.kind.to_string());
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::props::PropValue;

  fn props(pairs: &[(&str, &str)]) -> Properties {
    let mut props = Properties::new();
    for (path, value) in pairs {
      crate::props::set(&mut props, path, PropValue::Str(value.to_string()));
    }
    props
  }

  mod multilib {
    use super::*;

    #[test]
    fn per_class_override_wins() {
      let p = props(&[("compile_multilib", "both"), ("target.host.compile_multilib", "64")]);
      assert_eq!(class_multilib(&p, OsClass::Host, "first"), "64");
      assert_eq!(class_multilib(&p, OsClass::Device, "first"), "both");
    }

    #[test]
    fn falls_back_to_type_default() {
      let p = props(&[("compile_multilib", "")]);
      assert_eq!(class_multilib(&p, OsClass::Device, "first"), "first");
    }
  }
}
