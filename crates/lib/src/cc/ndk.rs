//! NDK API levels and the stub libraries built per level.

use std::cmp::max;

use thiserror::Error;
use tracing::debug;

use super::builder;
use super::context::ModuleCtx;
use super::flags::{Flags, Objects};
use super::{CcKind, CcModule};
use crate::arch::ArchType;
use crate::config::Config;
use crate::consts::{NDK_MAX_PREBUILT_VERSION, NDK_MIN_API_LEVEL};
use crate::module::Axis;
use crate::mutator::{Mutator, Phase};
use crate::ninja::{BuildEdge, Rule};
use crate::props::get_str;

const STUB_GENERATOR: &str = "build/knit/cc/gen_stub_libs.py";

const STUB_CFLAGS: &[&str] = &[
  "-Wno-incompatible-library-redeclaration",
  "-Wno-builtin-requires-header",
  "-Wno-invalid-noreturn",
  "-fno-unwind-tables",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NdkError {
  #[error("API level must be an integer (is {0:?})")]
  NotAnInteger(String),

  #[error("no NDK API levels for arch {0:?}")]
  UnknownArch(&'static str),
}

/// The first API level an architecture shipped in.
fn first_arch_version(arch: ArchType) -> Result<i64, NdkError> {
  match arch {
    ArchType::Arm | ArchType::Mips | ArchType::X86 => Ok(9),
    ArchType::Arm64 | ArchType::Mips64 | ArchType::X86_64 => Ok(21),
    ArchType::Common => Err(NdkError::UnknownArch(arch.name())),
  }
}

/// Resolves `minimum` and clips numeric levels to what the NDK and the
/// architecture support. `current` passes through.
pub fn normalize_ndk_api_level(level: &str, arch: ArchType) -> Result<String, NdkError> {
  if level == "current" {
    return Ok(level.to_string());
  }
  let first = first_arch_version(arch)?;
  if level == "minimum" {
    return Ok(first.to_string());
  }
  let version: i64 = level.parse().map_err(|_| NdkError::NotAnInteger(level.to_string()))?;
  Ok(max(max(version, NDK_MIN_API_LEVEL), first).to_string())
}

/// The newest prebuilt NDK the platform can use.
pub fn current_ndk_prebuilt_version(config: &Config) -> String {
  config.platform_sdk_version().min(NDK_MAX_PREBUILT_VERSION).to_string()
}

fn first_generated_version(first_supported: &str, platform: i64) -> Result<i64, NdkError> {
  if first_supported == "current" {
    return Ok(platform + 1);
  }
  first_supported
    .parse()
    .map_err(|_| NdkError::NotAnInteger(first_supported.to_string()))
}

/// Every API level a stub library is generated for.
pub fn stub_api_levels(first_version: &str, arch: ArchType, config: &Config) -> Result<Vec<String>, NdkError> {
  let first = normalize_ndk_api_level(first_version, arch)?;
  let platform = config.platform_sdk_version();
  let start = first_generated_version(&first, platform)?;
  let mut levels: Vec<String> = (start..=platform).map(|v| v.to_string()).collect();
  levels.extend(config.active_codenames());
  levels.push("current".to_string());
  Ok(levels)
}

/// Whether a stub at `api_level` links with its version script.
pub fn should_use_version_script(unversioned_until: &str, api_level: &str) -> bool {
  if unversioned_until.is_empty() || api_level == "current" {
    return true;
  }
  if unversioned_until == "current" {
    return false;
  }
  match (unversioned_until.parse::<i64>(), api_level.parse::<i64>()) {
    (Ok(until), Ok(level)) => level > until,
    _ => true,
  }
}

/// Creates one variant of each NDK stub library per API level.
pub fn ndk_api_mutator() -> Mutator {
  Mutator::new("ndk_api", Phase::ApiLevelSplit, |ctx| {
    let module = ctx.module();
    if !module.enabled || module.cc().is_none_or(|cc| cc.kind != CcKind::NdkStub) {
      return;
    }
    let Some(arch) = module.target.as_ref().map(|t| t.arch.arch_type) else {
      return;
    };
    let name = module.name.clone();
    let first_version = get_str(&module.props, "first_version").unwrap_or_default().to_string();
    let levels = match stub_api_levels(&first_version, arch, ctx.config()) {
      Ok(levels) => levels,
      Err(err) => {
        ctx.property_error("first_version", err.to_string());
        return;
      }
    };
    debug!(module = %name, levels = levels.len(), "creating stub API variants");
    let names: Vec<&str> = levels.iter().map(String::as_str).collect();
    let variants = ctx.create_variations(Axis::ApiLevel, &names);
    for (m, level) in variants.iter_mut().zip(&levels) {
      if let Some(cc) = m.cc_mut() {
        cc.api_level = Some(level.clone());
      }
    }
  })
}

/// Checks the declared name of a stub. Returns the property errors found.
pub fn stub_begin(cc: &CcModule, base_name: &str) -> Vec<(String, String)> {
  let mut errors = Vec::new();
  if cc.kind == CcKind::NdkStub && base_name.ends_with(crate::consts::NDK_LIBRARY_SUFFIX) {
    errors.push((
      "name".to_string(),
      format!(
        "Do not append {:?} manually, just use the base name",
        crate::consts::NDK_LIBRARY_SUFFIX
      ),
    ));
  }
  errors
}

/// Generates the stub source and version script from the symbol file and
/// compiles the stub. Returns the objects and the version script.
pub fn compile_stub(ctx: &mut ModuleCtx<'_>, flags: &Flags) -> (Objects, String) {
  let llndk = ctx.cc.kind == CcKind::LlndkStub;
  let api_level = if llndk {
    "current".to_string()
  } else {
    ctx.cc.api_level.clone().unwrap_or_else(|| "current".to_string())
  };
  let symbol_file = ctx.src(&ctx.cc.props.symbol_file);
  let stub_src = join_gen(ctx, "stub.c");
  let version_script = join_gen(ctx, "stub.map");
  let rel = ctx.rel(&symbol_file);
  ctx.build(
    BuildEdge::new(Rule::NdkStubGen)
      .description(format!("generate stubs {rel}"))
      .output(&stub_src)
      .output(&version_script)
      .input(&symbol_file)
      .arg("toolPath", STUB_GENERATOR)
      .arg("arch", ctx.arch().name())
      .arg("apiLevel", api_level)
      .arg("vndk", if llndk { "--vndk" } else { "" }),
  );

  let mut flags = flags.clone();
  flags.c_flags.extend(STUB_CFLAGS.iter().map(|f| f.to_string()));
  let objs = builder::compile_objs(ctx, &flags, "", &[stub_src], &[]);
  (objs, version_script)
}

fn join_gen(ctx: &ModuleCtx<'_>, file: &str) -> String {
  crate::paths::join(&[&ctx.gen_dir(), file])
}

/// Whether a stub variant links with its version script.
pub fn stub_uses_version_script(cc: &CcModule) -> bool {
  match cc.kind {
    CcKind::LlndkStub => !cc.props.unversioned,
    CcKind::NdkStub => should_use_version_script(
      &cc.props.unversioned_until,
      cc.api_level.as_deref().unwrap_or("current"),
    ),
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ProductVariables;

  mod levels {
    use super::*;

    #[test]
    fn minimum_and_clipping() {
      assert_eq!(normalize_ndk_api_level("minimum", ArchType::Arm64).unwrap(), "21");
      assert_eq!(normalize_ndk_api_level("minimum", ArchType::Arm).unwrap(), "9");
      assert_eq!(normalize_ndk_api_level("3", ArchType::Arm).unwrap(), "9");
      assert_eq!(normalize_ndk_api_level("19", ArchType::X86_64).unwrap(), "21");
      assert_eq!(normalize_ndk_api_level("23", ArchType::X86_64).unwrap(), "23");
      assert_eq!(normalize_ndk_api_level("current", ArchType::Mips).unwrap(), "current");
    }

    #[test]
    fn non_integer_levels_are_rejected() {
      let err = normalize_ndk_api_level("O", ArchType::Arm).unwrap_err();
      assert_eq!(err.to_string(), r#"API level must be an integer (is "O")"#);
    }

    #[test]
    fn stub_levels_run_to_current() {
      let mut variables = ProductVariables::defaults();
      variables.platform_sdk_version = Some(24);
      variables.platform_version_active_codenames = Some(vec!["O".into()]);
      let config = Config::for_testing(variables).unwrap();
      let levels = stub_api_levels("23", ArchType::Arm, &config).unwrap();
      assert_eq!(levels, vec!["23", "24", "O", "current"]);
      let levels = stub_api_levels("current", ArchType::Arm, &config).unwrap();
      assert_eq!(levels, vec!["O", "current"]);
    }

    #[test]
    fn prebuilt_version_is_capped() {
      let mut variables = ProductVariables::defaults();
      variables.platform_sdk_version = Some(26);
      let config = Config::for_testing(variables).unwrap();
      assert_eq!(current_ndk_prebuilt_version(&config), "24");
    }
  }

  mod version_scripts {
    use super::*;

    #[test]
    fn unversioned_until_limits_old_levels() {
      assert!(should_use_version_script("", "9"));
      assert!(!should_use_version_script("21", "19"));
      assert!(!should_use_version_script("21", "21"));
      assert!(should_use_version_script("21", "22"));
      assert!(!should_use_version_script("current", "24"));
      assert!(should_use_version_script("current", "current"));
    }

    #[test]
    fn stub_names_must_not_carry_the_suffix() {
      let cc = CcModule::new(CcKind::NdkStub);
      let errors = stub_begin(&cc, "libfoo.ndk");
      assert_eq!(errors[0].0, "name");
      assert_eq!(errors[0].1, r#"Do not append ".ndk" manually, just use the base name"#);
      assert!(stub_begin(&cc, "libfoo").is_empty());
    }
  }
}
