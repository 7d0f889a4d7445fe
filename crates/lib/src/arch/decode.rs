//! Decoding product variables into per-class target lists, and selecting
//! the targets a module builds for from its `compile_multilib`.

use std::collections::BTreeMap;

use super::registry::features_for_variant;
use super::types::{Arch, ArchType, Multilib, OsClass, OsType, Target};
use super::ArchError;
use crate::config::ProductVariables;

/// Configured targets, keyed by OS class, in priority order.
pub type Targets = BTreeMap<OsClass, Vec<Target>>;

/// Builds an [`Arch`] from its configured names.
///
/// A variant equal to the arch name or `"generic"` is the baseline and
/// normalises to `""`; empty ABI entries are dropped.
pub fn decode_arch(
  name: &str,
  arch_variant: Option<&str>,
  cpu_variant: Option<&str>,
  abi: Option<&[String]>,
) -> Result<Arch, ArchError> {
  let arch_type = ArchType::from_name(name).ok_or_else(|| ArchError::UnknownArch(name.to_string()))?;
  let normalise = |variant: Option<&str>| match variant {
    Some(v) if v == arch_type.name() || v == "generic" => String::new(),
    Some(v) => v.to_string(),
    None => String::new(),
  };

  let mut arch = Arch::new(arch_type);
  arch.arch_variant = normalise(arch_variant);
  arch.cpu_variant = normalise(cpu_variant);
  arch.abi = abi
    .unwrap_or_default()
    .iter()
    .filter(|a| !a.is_empty())
    .cloned()
    .collect();
  arch.features = features_for_variant(arch_type, &arch.arch_variant)
    .iter()
    .map(|f| f.to_string())
    .collect();
  Ok(arch)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().filter(|v| !v.is_empty())
}

/// Decodes the target table for a build running on `build_os`.
pub fn decode_targets(vars: &ProductVariables, build_os: OsType) -> Result<Targets, ArchError> {
  let mut targets = Targets::new();
  let mut add = |os: OsType, arch: Arch| targets.entry(os.class()).or_default().push(Target::new(os, arch));

  let host_arch = non_empty(&vars.host_arch).ok_or(ArchError::NoHostPrimaryArch)?;
  add(build_os, decode_arch(host_arch, None, None, None)?);
  if let Some(secondary) = non_empty(&vars.host_secondary_arch) {
    add(build_os, decode_arch(secondary, None, None, None)?);
  }

  if vars.host_bionic == Some(true) {
    add(OsType::LinuxBionic, decode_arch("x86_64", None, None, None)?);
  }

  if let Some(cross) = non_empty(&vars.cross_host) {
    let os = OsType::from_name(cross).ok_or_else(|| ArchError::UnknownCrossHostOs(cross.to_string()))?;
    let primary = non_empty(&vars.cross_host_arch).ok_or(ArchError::NoCrossHostPrimaryArch)?;
    add(os, decode_arch(primary, None, None, None)?);
    if let Some(secondary) = non_empty(&vars.cross_host_secondary_arch) {
      add(os, decode_arch(secondary, None, None, None)?);
    }
  }

  if let Some(device) = non_empty(&vars.device_arch) {
    add(
      OsType::Android,
      decode_arch(
        device,
        vars.device_arch_variant.as_deref(),
        vars.device_cpu_variant.as_deref(),
        vars.device_abi.as_deref(),
      )?,
    );
    if let Some(secondary) = non_empty(&vars.device_secondary_arch) {
      add(
        OsType::Android,
        decode_arch(
          secondary,
          vars.device_secondary_arch_variant.as_deref(),
          vars.device_secondary_cpu_variant.as_deref(),
          vars.device_secondary_abi.as_deref(),
        )?,
      );
    }
  }

  if let Some(device) = targets.get_mut(&OsClass::Device)
    && device.len() > 1
    && device[0].arch.arch_type.multilib() == device[1].arch.arch_type.multilib()
  {
    device[1].arch.native = false;
  }

  Ok(targets)
}

/// Writes the target-relevant product variables back out of a target table.
pub fn encode_targets(targets: &Targets) -> ProductVariables {
  let some = |s: &str| (!s.is_empty()).then(|| s.to_string());
  let mut vars = ProductVariables::default();

  if let Some(host) = targets.get(&OsClass::Host) {
    let build: Vec<&Target> = host.iter().filter(|t| t.os != OsType::LinuxBionic).collect();
    vars.host_arch = build.first().map(|t| t.arch.arch_type.name().to_string());
    vars.host_secondary_arch = build.get(1).map(|t| t.arch.arch_type.name().to_string());
    if host.iter().any(|t| t.os == OsType::LinuxBionic) {
      vars.host_bionic = Some(true);
    }
  }

  if let Some(cross) = targets.get(&OsClass::HostCross) {
    vars.cross_host = cross.first().map(|t| t.os.name().to_string());
    vars.cross_host_arch = cross.first().map(|t| t.arch.arch_type.name().to_string());
    vars.cross_host_secondary_arch = cross.get(1).map(|t| t.arch.arch_type.name().to_string());
  }

  if let Some(device) = targets.get(&OsClass::Device) {
    if let Some(primary) = device.first() {
      vars.device_arch = Some(primary.arch.arch_type.name().to_string());
      vars.device_arch_variant = some(&primary.arch.arch_variant);
      vars.device_cpu_variant = some(&primary.arch.cpu_variant);
      vars.device_abi = (!primary.arch.abi.is_empty()).then(|| primary.arch.abi.clone());
    }
    if let Some(secondary) = device.get(1) {
      vars.device_secondary_arch = Some(secondary.arch.arch_type.name().to_string());
      vars.device_secondary_arch_variant = some(&secondary.arch.arch_variant);
      vars.device_secondary_cpu_variant = some(&secondary.arch.cpu_variant);
      vars.device_secondary_abi = (!secondary.arch.abi.is_empty()).then(|| secondary.arch.abi.clone());
    }
  }

  vars
}

fn filter_multilib(targets: &[Target], multilib: Multilib) -> Vec<Target> {
  targets
    .iter()
    .filter(|t| t.arch.arch_type.multilib() == multilib)
    .cloned()
    .collect()
}

/// One `common` target per distinct OS in `targets`.
fn common_targets(targets: &[Target]) -> Vec<Target> {
  let mut out: Vec<Target> = Vec::new();
  for target in targets {
    if !out.iter().any(|t| t.os == target.os) {
      out.push(Target::new(target.os, Arch::common()));
    }
  }
  out
}

/// Selects the targets a module builds for from one class's target list.
pub fn decode_multilib(multilib: &str, targets: &[Target], prefer32: bool) -> Result<Vec<Target>, ArchError> {
  let multilib = match multilib {
    "first" if prefer32 => "prefer32",
    "first" => "prefer64",
    other => other,
  };

  let selected = match multilib {
    "common" => common_targets(targets),
    "both" => {
      let (first, second) = if prefer32 {
        (Multilib::Lib32, Multilib::Lib64)
      } else {
        (Multilib::Lib64, Multilib::Lib32)
      };
      let mut both = filter_multilib(targets, first);
      both.extend(filter_multilib(targets, second));
      both
    }
    "32" => filter_multilib(targets, Multilib::Lib32),
    "64" => filter_multilib(targets, Multilib::Lib64),
    "prefer32" => {
      let selected = filter_multilib(targets, Multilib::Lib32);
      if selected.is_empty() { filter_multilib(targets, Multilib::Lib64) } else { selected }
    }
    "prefer64" => {
      let selected = filter_multilib(targets, Multilib::Lib64);
      if selected.is_empty() { filter_multilib(targets, Multilib::Lib32) } else { selected }
    }
    other => return Err(ArchError::BadCompileMultilib(other.to_string())),
  };
  Ok(selected)
}
