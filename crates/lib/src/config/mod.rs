//! Decoded build configuration.
//!
//! [`Config`] is the immutable view every phase reads: the decoded target
//! table plus the product variables and environment switches that steer
//! flag assembly. It is shared by reference through an `Arc`.

mod variables;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::arch::{self, Arch, ArchError, ArchType, OsClass, OsType, Target, Targets};
use crate::consts::{DEFAULT_OUT_DIR, DEFAULT_PLATFORM_SDK_VERSION};
use crate::env::EnvRegistry;
use crate::paths::{FileSystem, PathContext};

pub use variables::{PRODUCT_VARIABLE_BLOCKS, ProductVariables, VarValue};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read product variables {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed product variables {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error(transparent)]
  Arch(#[from] ArchError),
}

#[derive(Debug)]
pub struct Config {
  pub variables: ProductVariables,
  pub targets: Targets,
  pub build_os: OsType,
  pub env: Arc<EnvRegistry>,
  pub src_dir: PathBuf,
  /// Memoised filesystem queries under `src_dir`.
  pub paths: Arc<PathContext>,
  pub out_dir: String,
  pub allow_missing: bool,
  pub disable_host_pie: bool,
  pub with_tidy: bool,
  pub native_coverage: bool,
  pub sanitize_host: Vec<String>,
}

impl Config {
  /// Decodes `variables` for a build running on `build_os`.
  ///
  /// Environment switches are read once here, through `env`, so the
  /// recorded environment covers everything the configuration depends on.
  pub fn new(
    variables: ProductVariables,
    build_os: OsType,
    env: Arc<EnvRegistry>,
    src_dir: PathBuf,
  ) -> Result<Self, ConfigError> {
    let targets = arch::decode_targets(&variables, build_os)?;

    let allow_missing = variables.allow_missing_dependencies.unwrap_or(false)
      || env.is_true("ALLOW_MISSING_DEPENDENCIES");
    let native_coverage = variables.native_coverage.unwrap_or(false) || env.is_true("NATIVE_COVERAGE");
    let sanitize_host = match env.get("SANITIZE_HOST") {
      value if !value.is_empty() => value.split_whitespace().map(str::to_string).collect(),
      _ => variables.sanitize_host.clone().unwrap_or_default(),
    };
    let out_dir = match env.get("KNIT_OUT_DIR") {
      value if !value.is_empty() => value,
      _ => DEFAULT_OUT_DIR.to_string(),
    };

    let config = Self {
      disable_host_pie: env.is_true("DISABLE_HOST_PIE"),
      with_tidy: env.is_true("WITH_TIDY") || variables.clang_tidy.unwrap_or(false),
      variables,
      targets,
      build_os,
      env,
      paths: Arc::new(PathContext::os(&src_dir)),
      src_dir,
      out_dir,
      allow_missing,
      native_coverage,
      sanitize_host,
    };
    debug!(
      targets = config.targets.values().map(Vec::len).sum::<usize>(),
      allow_missing = config.allow_missing,
      "configuration decoded"
    );
    Ok(config)
  }

  /// A configuration over fixed variables and an empty environment.
  pub fn for_testing(variables: ProductVariables) -> Result<Self, ConfigError> {
    Self::new(
      variables,
      OsType::LinuxGlibc,
      Arc::new(EnvRegistry::from_map(Default::default())),
      PathBuf::from("."),
    )
  }

  /// Answers path queries from `fs` instead of the real filesystem.
  pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
    self.paths = Arc::new(PathContext::new(&self.src_dir, fs));
    self
  }

  pub fn targets_for(&self, class: OsClass) -> &[Target] {
    self.targets.get(&class).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn has_device(&self) -> bool {
    !self.targets_for(OsClass::Device).is_empty()
  }

  /// True when x86 device code shares the device with arm code, either
  /// through an arm ABI on an x86 arch or an arm device target.
  pub fn arm_on_x86(&self, arch: &Arch) -> bool {
    let device = self.targets_for(OsClass::Device);
    arch.abi.iter().any(|abi| abi.starts_with("arm"))
      || device
        .iter()
        .any(|t| matches!(t.arch.arch_type, ArchType::Arm | ArchType::Arm64))
  }

  pub fn platform_sdk_version(&self) -> i64 {
    self.variables.platform_sdk_version.unwrap_or(DEFAULT_PLATFORM_SDK_VERSION)
  }

  pub fn platform_sdk_final(&self) -> bool {
    self.variables.platform_sdk_final.unwrap_or(false)
  }

  pub fn active_codenames(&self) -> Vec<String> {
    self.variables.platform_version_active_codenames.clone().unwrap_or_default()
  }

  pub fn device_prefer32(&self) -> bool {
    self.variables.device_prefer32_bit_executables.unwrap_or(false)
  }

  pub fn device_uses_clang(&self) -> bool {
    self.variables.device_uses_clang.unwrap_or(true)
  }

  /// The configured VNDK version, if vendor images are built.
  pub fn vndk_version(&self) -> Option<&str> {
    self.variables.device_vndk_version.as_deref().filter(|v| !v.is_empty())
  }

  pub fn product(&self) -> &str {
    self.variables.product.as_deref().unwrap_or("knit")
  }

  pub fn sanitize_device(&self) -> &[String] {
    self.variables.sanitize_device.as_deref().unwrap_or_default()
  }

  pub fn sanitize_device_diag(&self) -> &[String] {
    self.variables.sanitize_device_diag.as_deref().unwrap_or_default()
  }

  pub fn enable_cfi(&self) -> bool {
    self.variables.enable_cfi.unwrap_or(true)
  }

  pub fn cfi_enabled_for_path(&self, dir: &str) -> bool {
    if !self.enable_cfi() || has_prefix(dir, self.variables.cfi_exclude_paths.as_deref()) {
      return false;
    }
    has_prefix(dir, self.variables.cfi_include_paths.as_deref())
  }

  pub fn cfi_disabled_for_path(&self, dir: &str) -> bool {
    has_prefix(dir, self.variables.cfi_exclude_paths.as_deref())
  }

  /// Whether coverage is enabled for modules under `dir`.
  pub fn coverage_enabled_for_path(&self, dir: &str) -> bool {
    if !self.native_coverage {
      return false;
    }
    has_prefix(dir, self.variables.coverage_paths.as_deref())
      && !has_prefix(dir, self.variables.coverage_exclude_paths.as_deref())
  }

  pub fn tidy_checks(&self) -> Option<&str> {
    self.variables.tidy_checks.as_deref()
  }
}

fn has_prefix(dir: &str, prefixes: Option<&[String]>) -> bool {
  prefixes
    .unwrap_or_default()
    .iter()
    .any(|prefix| prefix == "*" || dir.starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;

  fn env(pairs: &[(&str, &str)]) -> Arc<EnvRegistry> {
    Arc::new(EnvRegistry::from_map(
      pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<BTreeMap<_, _>>(),
    ))
  }

  #[test]
  fn environment_switches_are_recorded() {
    let registry = env(&[("ALLOW_MISSING_DEPENDENCIES", "true"), ("SANITIZE_HOST", "address")]);
    let config = Config::new(
      ProductVariables::defaults(),
      OsType::LinuxGlibc,
      registry.clone(),
      PathBuf::from("."),
    )
    .unwrap();
    assert!(config.allow_missing);
    assert_eq!(config.sanitize_host, vec!["address".to_string()]);
    assert_eq!(config.out_dir, "out");

    let keys: Vec<String> = registry.snapshot().vars.into_iter().map(|e| e.key).collect();
    assert!(keys.contains(&"ALLOW_MISSING_DEPENDENCIES".to_string()));
    assert!(keys.contains(&"KNIT_OUT_DIR".to_string()));
  }

  #[test]
  fn defaults_have_no_device() {
    let config = Config::for_testing(ProductVariables::defaults()).unwrap();
    assert!(!config.has_device());
    assert_eq!(config.targets_for(OsClass::Host).len(), 2);
    assert_eq!(config.platform_sdk_version(), 27);
    assert!(config.vndk_version().is_none());
  }

  #[test]
  fn coverage_paths() {
    let vars = ProductVariables {
      native_coverage: Some(true),
      coverage_paths: Some(vec!["system/".to_string()]),
      coverage_exclude_paths: Some(vec!["system/skip".to_string()]),
      ..ProductVariables::defaults()
    };
    let config = Config::for_testing(vars).unwrap();
    assert!(config.coverage_enabled_for_path("system/core"));
    assert!(!config.coverage_enabled_for_path("system/skip/x"));
    assert!(!config.coverage_enabled_for_path("external/zlib"));
  }

  #[test]
  fn bad_targets_are_config_errors() {
    let err = Config::for_testing(ProductVariables::default()).unwrap_err();
    assert!(matches!(err, ConfigError::Arch(ArchError::NoHostPrimaryArch)));
  }
}
