//! Product variables: the JSON-serialisable product configuration.
//!
//! Every field is optional; an absent field is "not set". Boolean variables
//! that are set to `false` do not activate their `product_variables` block.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ConfigError;
use crate::consts::DEFAULT_PLATFORM_SDK_VERSION;

/// A product variable value as seen by `product_variables` blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarValue {
  Bool(bool),
  Int(i64),
  Str(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductVariables {
  #[serde(rename = "Product", skip_serializing_if = "Option::is_none")]
  pub product: Option<String>,

  #[serde(rename = "Platform_sdk_version", skip_serializing_if = "Option::is_none")]
  pub platform_sdk_version: Option<i64>,
  #[serde(rename = "Platform_sdk_final", skip_serializing_if = "Option::is_none")]
  pub platform_sdk_final: Option<bool>,
  #[serde(rename = "Platform_version_active_codenames", skip_serializing_if = "Option::is_none")]
  pub platform_version_active_codenames: Option<Vec<String>>,

  #[serde(rename = "HostArch", skip_serializing_if = "Option::is_none")]
  pub host_arch: Option<String>,
  #[serde(rename = "HostSecondaryArch", skip_serializing_if = "Option::is_none")]
  pub host_secondary_arch: Option<String>,
  #[serde(rename = "Host_bionic", skip_serializing_if = "Option::is_none")]
  pub host_bionic: Option<bool>,

  #[serde(rename = "CrossHost", skip_serializing_if = "Option::is_none")]
  pub cross_host: Option<String>,
  #[serde(rename = "CrossHostArch", skip_serializing_if = "Option::is_none")]
  pub cross_host_arch: Option<String>,
  #[serde(rename = "CrossHostSecondaryArch", skip_serializing_if = "Option::is_none")]
  pub cross_host_secondary_arch: Option<String>,

  #[serde(rename = "DeviceArch", skip_serializing_if = "Option::is_none")]
  pub device_arch: Option<String>,
  #[serde(rename = "DeviceArchVariant", skip_serializing_if = "Option::is_none")]
  pub device_arch_variant: Option<String>,
  #[serde(rename = "DeviceCpuVariant", skip_serializing_if = "Option::is_none")]
  pub device_cpu_variant: Option<String>,
  #[serde(rename = "DeviceAbi", skip_serializing_if = "Option::is_none")]
  pub device_abi: Option<Vec<String>>,

  #[serde(rename = "DeviceSecondaryArch", skip_serializing_if = "Option::is_none")]
  pub device_secondary_arch: Option<String>,
  #[serde(rename = "DeviceSecondaryArchVariant", skip_serializing_if = "Option::is_none")]
  pub device_secondary_arch_variant: Option<String>,
  #[serde(rename = "DeviceSecondaryCpuVariant", skip_serializing_if = "Option::is_none")]
  pub device_secondary_cpu_variant: Option<String>,
  #[serde(rename = "DeviceSecondaryAbi", skip_serializing_if = "Option::is_none")]
  pub device_secondary_abi: Option<Vec<String>>,

  #[serde(rename = "DevicePrefer32BitExecutables", skip_serializing_if = "Option::is_none")]
  pub device_prefer32_bit_executables: Option<bool>,
  #[serde(rename = "DeviceUsesClang", skip_serializing_if = "Option::is_none")]
  pub device_uses_clang: Option<bool>,
  #[serde(rename = "DeviceVndkVersion", skip_serializing_if = "Option::is_none")]
  pub device_vndk_version: Option<String>,

  #[serde(rename = "Allow_missing_dependencies", skip_serializing_if = "Option::is_none")]
  pub allow_missing_dependencies: Option<bool>,

  #[serde(rename = "SanitizeHost", skip_serializing_if = "Option::is_none")]
  pub sanitize_host: Option<Vec<String>>,
  #[serde(rename = "SanitizeDevice", skip_serializing_if = "Option::is_none")]
  pub sanitize_device: Option<Vec<String>>,
  #[serde(rename = "SanitizeDeviceDiag", skip_serializing_if = "Option::is_none")]
  pub sanitize_device_diag: Option<Vec<String>>,

  #[serde(rename = "NativeCoverage", skip_serializing_if = "Option::is_none")]
  pub native_coverage: Option<bool>,
  #[serde(rename = "CoveragePaths", skip_serializing_if = "Option::is_none")]
  pub coverage_paths: Option<Vec<String>>,
  #[serde(rename = "CoverageExcludePaths", skip_serializing_if = "Option::is_none")]
  pub coverage_exclude_paths: Option<Vec<String>>,

  #[serde(rename = "EnableCFI", skip_serializing_if = "Option::is_none")]
  pub enable_cfi: Option<bool>,
  #[serde(rename = "CFIExcludePaths", skip_serializing_if = "Option::is_none")]
  pub cfi_exclude_paths: Option<Vec<String>>,
  #[serde(rename = "CFIIncludePaths", skip_serializing_if = "Option::is_none")]
  pub cfi_include_paths: Option<Vec<String>>,

  #[serde(rename = "ClangTidy", skip_serializing_if = "Option::is_none")]
  pub clang_tidy: Option<bool>,
  #[serde(rename = "TidyChecks", skip_serializing_if = "Option::is_none")]
  pub tidy_checks: Option<String>,

  #[serde(rename = "Unbundled_build", skip_serializing_if = "Option::is_none")]
  pub unbundled_build: Option<bool>,
  #[serde(rename = "Brillo", skip_serializing_if = "Option::is_none")]
  pub brillo: Option<bool>,
  #[serde(rename = "Malloc_not_svelte", skip_serializing_if = "Option::is_none")]
  pub malloc_not_svelte: Option<bool>,
  #[serde(rename = "Safestack", skip_serializing_if = "Option::is_none")]
  pub safestack: Option<bool>,
  #[serde(rename = "Binder32bit", skip_serializing_if = "Option::is_none")]
  pub binder32bit: Option<bool>,
  #[serde(rename = "Device_uses_hwc2", skip_serializing_if = "Option::is_none")]
  pub device_uses_hwc2: Option<bool>,
  #[serde(rename = "Override_rs_driver", skip_serializing_if = "Option::is_none")]
  pub override_rs_driver: Option<String>,
  #[serde(rename = "Debuggable", skip_serializing_if = "Option::is_none")]
  pub debuggable: Option<bool>,
  #[serde(rename = "Eng", skip_serializing_if = "Option::is_none")]
  pub eng: Option<bool>,
  #[serde(rename = "Pdk", skip_serializing_if = "Option::is_none")]
  pub pdk: Option<bool>,
  #[serde(rename = "Uml", skip_serializing_if = "Option::is_none")]
  pub uml: Option<bool>,
}

/// Names of the `product_variables` sub-blocks, in composition order.
pub const PRODUCT_VARIABLE_BLOCKS: &[&str] = &[
  "platform_sdk_version",
  "unbundled_build",
  "brillo",
  "malloc_not_svelte",
  "safestack",
  "binder32bit",
  "device_uses_hwc2",
  "override_rs_driver",
  "debuggable",
  "eng",
  "pdk",
  "uml",
];

impl ProductVariables {
  /// A host-only configuration: x86_64 primary, x86 secondary, no device.
  pub fn defaults() -> Self {
    Self {
      platform_sdk_version: Some(DEFAULT_PLATFORM_SDK_VERSION),
      host_arch: Some("x86_64".to_string()),
      host_secondary_arch: Some("x86".to_string()),
      ..Self::default()
    }
  }

  /// Loads variables from `path`, falling back to [`ProductVariables::defaults`]
  /// when the file does not exist.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      info!(path = %path.display(), "no product variables file, using defaults");
      return Ok(Self::defaults());
    }
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&data).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(data)
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }

  /// The value of each `product_variables` block variable that activates
  /// its block, in [`PRODUCT_VARIABLE_BLOCKS`] order.
  pub fn active_blocks(&self) -> Vec<(&'static str, VarValue)> {
    let flag = |name: &'static str, value: Option<bool>| match value {
      Some(true) => Some((name, VarValue::Bool(true))),
      _ => None,
    };
    [
      self.platform_sdk_version.map(|v| ("platform_sdk_version", VarValue::Int(v))),
      flag("unbundled_build", self.unbundled_build),
      flag("brillo", self.brillo),
      flag("malloc_not_svelte", self.malloc_not_svelte),
      flag("safestack", self.safestack),
      flag("binder32bit", self.binder32bit),
      flag("device_uses_hwc2", self.device_uses_hwc2),
      self
        .override_rs_driver
        .as_ref()
        .map(|v| ("override_rs_driver", VarValue::Str(v.clone()))),
      flag("debuggable", self.debuggable),
      flag("eng", self.eng),
      flag("pdk", self.pdk),
      flag("uml", self.uml),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_pascal_case_names() {
    let vars = ProductVariables::from_json(
      r#"{"DeviceArch": "arm64", "Platform_sdk_version": 26, "Debuggable": true, "Eng": false}"#,
    )
    .unwrap();
    assert_eq!(vars.device_arch.as_deref(), Some("arm64"));
    assert_eq!(vars.platform_sdk_version, Some(26));
    assert_eq!(vars.debuggable, Some(true));
  }

  #[test]
  fn false_booleans_do_not_activate_blocks() {
    let vars = ProductVariables {
      debuggable: Some(true),
      eng: Some(false),
      override_rs_driver: Some("rs.so".to_string()),
      ..ProductVariables::default()
    };
    let names: Vec<&str> = vars.active_blocks().iter().map(|(name, _)| *name).collect();
    assert_eq!(names, vec!["override_rs_driver", "debuggable"]);
  }

  #[test]
  fn defaults_are_host_only() {
    let vars = ProductVariables::defaults();
    assert_eq!(vars.host_arch.as_deref(), Some("x86_64"));
    assert!(vars.device_arch.is_none());
    assert_eq!(vars.platform_sdk_version, Some(DEFAULT_PLATFORM_SDK_VERSION));
  }

  #[test]
  fn missing_file_loads_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let vars = ProductVariables::load(&temp.path().join("absent.json")).unwrap();
    assert_eq!(vars, ProductVariables::defaults());
  }

  #[test]
  fn unset_fields_are_not_serialised() {
    let json = ProductVariables::default().to_json().unwrap();
    assert_eq!(json, "{}");
  }
}
