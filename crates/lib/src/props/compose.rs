//! Variant composition: folding the axis sub-blocks that apply to a variant
//! into its base properties.
//!
//! Applied blocks are removed afterwards, so composing an already composed
//! tree changes nothing.

use super::extend::{ExtendMode, extend_matching};
use super::printf::printf_into;
use super::schema::Schema;
use super::value::{Properties, lookup};
use super::{ExtendErrorKind, ExtendPropertyError};
use crate::arch::{ArchType, OsClass, OsType, Target, registry::variant_block_name};
use crate::config::VarValue;

/// The ordered list of sub-block paths that apply to `target`.
///
/// `arm_on_x86` selects the `target.arm_on_x86[_64]` block for x86 devices
/// that also run arm code.
pub fn arch_blocks(target: &Target, arm_on_x86: bool) -> Vec<String> {
  let arch = &target.arch;
  let arch_name = arch.arch_type.name();
  let os = target.os;
  let mut blocks = vec![format!("arch.{arch_name}")];

  if !arch.arch_variant.is_empty() {
    blocks.push(format!("arch.{arch_name}.{}", variant_block_name(&arch.arch_variant)));
  }
  if !arch.cpu_variant.is_empty() && arch.cpu_variant != arch.arch_variant {
    blocks.push(format!("arch.{arch_name}.{}", variant_block_name(&arch.cpu_variant)));
  }
  for feature in &arch.features {
    blocks.push(format!("arch.{arch_name}.{}", variant_block_name(feature)));
  }

  blocks.push(format!("multilib.{}", arch.arch_type.multilib().as_str()));

  if matches!(os.class(), OsClass::Host | OsClass::HostCross) {
    blocks.push("target.host".to_string());
  }
  for alias in os.aliases() {
    blocks.push(format!("target.{alias}"));
  }
  blocks.push(format!("target.{}", os.name()));
  for alias in os.aliases() {
    blocks.push(format!("target.{alias}_{arch_name}"));
  }
  blocks.push(format!("target.{}_{arch_name}", os.name()));

  if os.class() == OsClass::Host && os != OsType::Windows {
    blocks.push("target.not_windows".to_string());
  }
  if os.class() == OsClass::Device {
    if arch.arch_type.is_64bit() {
      blocks.push("target.android64".to_string());
    } else {
      blocks.push("target.android32".to_string());
    }
  }
  if arm_on_x86 {
    match arch.arch_type {
      ArchType::X86 => blocks.push("target.arm_on_x86".to_string()),
      ArchType::X86_64 => blocks.push("target.arm_on_x86_64".to_string()),
      _ => {}
    }
  }

  blocks
}

fn apply_block(
  props: &mut Properties,
  original: &Properties,
  path: &str,
  subset: &Schema,
) -> Result<(), ExtendPropertyError> {
  if let Some(block) = lookup(original, path).and_then(|v| v.as_map()) {
    extend_matching(props, block, subset, ExtendMode::Append, path)?;
  }
  Ok(())
}

/// Folds the arch, multilib and OS blocks for `target` into `props`.
///
/// Common-arch variants keep their base properties. `target.vendor` is left
/// in place for the image split.
pub fn compose_arch(
  props: &mut Properties,
  schema: &Schema,
  target: &Target,
  arm_on_x86: bool,
) -> Result<(), ExtendPropertyError> {
  if !target.is_common() {
    let subset = schema.arch_variant_subset();
    let original = props.clone();
    for path in arch_blocks(target, arm_on_x86) {
      apply_block(props, &original, &path, &subset)?;
    }
  }

  props.remove("arch");
  props.remove("multilib");
  strip_target(props, true);
  Ok(())
}

/// Folds the `product_variables` blocks of every active variable into `props`.
pub fn compose_product_variables(
  props: &mut Properties,
  schema: &Schema,
  active: &[(&'static str, VarValue)],
) -> Result<(), ExtendPropertyError> {
  let subset = schema.arch_variant_subset();
  if let Some(blocks) = props.remove("product_variables").as_ref().and_then(|v| v.as_map().cloned()) {
    for (name, value) in active {
      let Some(block) = blocks.get(*name).and_then(|v| v.as_map()) else {
        continue;
      };
      let prefix = format!("product_variables.{name}");
      let mut block = block.clone();
      printf_into(&mut block, value)
        .map_err(|(path, err)| ExtendPropertyError::new(&format!("{prefix}.{path}"), ExtendErrorKind::Printf(err)))?;
      extend_matching(props, &block, &subset, ExtendMode::Append, &prefix)?;
    }
  }
  Ok(())
}

/// Folds `target.vendor` into `props` when `vendor` is set, then drops the
/// remaining `target` block.
pub fn compose_image(props: &mut Properties, schema: &Schema, vendor: bool) -> Result<(), ExtendPropertyError> {
  if vendor {
    let subset = schema.arch_variant_subset();
    let original = props.clone();
    apply_block(props, &original, "target.vendor", &subset)?;
  }
  strip_target(props, false);
  Ok(())
}

fn strip_target(props: &mut Properties, keep_vendor: bool) {
  let Some(super::value::PropValue::Map(target)) = props.get_mut("target") else {
    props.remove("target");
    return;
  };
  target.retain(|name, _| keep_vendor && name == "vendor");
  if target.is_empty() {
    props.remove("target");
  }
}
