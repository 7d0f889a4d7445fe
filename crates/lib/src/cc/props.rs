//! C/C++ property schemas and their typed view.
//!
//! The schemas drive validation and variant composition of the raw property
//! tree. Once a variant is final, the begin mutator deserialises the
//! composed tree into [`CcProps`].

use serde::{Deserialize, Serialize};

use super::CcKind;
use crate::props::{FieldSpec, Properties, Schema, to_json};

fn list() -> FieldSpec {
  FieldSpec::list().variant()
}

fn flag() -> FieldSpec {
  FieldSpec::bool().variant()
}

fn text() -> FieldSpec {
  FieldSpec::string().variant()
}

fn base_schema() -> Schema {
  Schema::new()
    .with("clang", flag())
    .with("sdk_version", FieldSpec::string())
    .with("no_default_compiler_flags", FieldSpec::bool())
    .with("vendor_available", FieldSpec::bool())
    .with("sanitize", FieldSpec::group(sanitize_schema()).variant())
    .with("native_coverage", FieldSpec::bool())
}

fn sanitize_schema() -> Schema {
  let diag = Schema::new()
    .with("undefined", flag())
    .with("cfi", flag())
    .with("misc_undefined", list());
  Schema::new()
    .with("never", flag())
    .with("address", flag())
    .with("thread", flag())
    .with("coverage", flag())
    .with("safestack", flag())
    .with("cfi", flag())
    .with("undefined", flag())
    .with("all_undefined", flag())
    .with("misc_undefined", list())
    .with("diag", FieldSpec::group(diag).variant())
}

fn compiler_schema() -> Schema {
  let release = Schema::new().with("cflags", list());
  let aidl = Schema::new()
    .with("include_dirs", list())
    .with("local_include_dirs", list())
    .with("export_aidl_headers", FieldSpec::bool());
  Schema::new()
    .with("srcs", list())
    .with("exclude_srcs", list())
    .with("cflags", list())
    .with("cppflags", list())
    .with("conlyflags", list())
    .with("asflags", list())
    .with("clang_cflags", list())
    .with("clang_asflags", list())
    .with("yaccflags", list())
    .with("instruction_set", text())
    .with("include_dirs", list().prepend())
    .with("local_include_dirs", list().prepend())
    .with("generated_sources", list())
    .with("generated_headers", list())
    .with("rtti", flag())
    .with("c_std", FieldSpec::string())
    .with("cpp_std", FieldSpec::string())
    .with("gnu_extensions", FieldSpec::bool())
    .with("release", FieldSpec::group(release).variant())
    .with("aidl", FieldSpec::group(aidl).variant())
    .with("tidy", FieldSpec::bool())
    .with("tidy_checks", FieldSpec::list())
    .with("tidy_flags", FieldSpec::list())
}

fn linker_schema() -> Schema {
  Schema::new()
    .with("whole_static_libs", list())
    .with("static_libs", list())
    .with("shared_libs", list())
    .with("header_libs", list())
    .with("system_shared_libs", list())
    .with("ldflags", list())
    .with("host_ldlibs", list())
    .with("allow_undefined_symbols", flag())
    .with("no_libgcc", flag())
    .with("nocrt", flag())
    .with("group_static_libs", FieldSpec::bool())
    .with("pack_relocations", flag())
    .with("export_shared_lib_headers", list())
    .with("export_static_lib_headers", list())
    .with("export_header_lib_headers", list())
    .with("export_generated_headers", list())
    .with("export_include_dirs", list())
    .with("objs", list())
    .with("version_script", text())
    .with("unexported_symbols_list", text())
    .with("force_symbols_not_weak_list", text())
    .with("force_symbols_weak_list", text())
    .with("strip", FieldSpec::group(strip_schema()).variant())
    .with("relative_install_path", text())
}

fn strip_schema() -> Schema {
  Schema::new()
    .with("none", flag())
    .with("keep_symbols", flag())
    .with("keep_mini_debug_info", flag())
}

fn linkage_schema() -> Schema {
  Schema::new()
    .with("srcs", list())
    .with("cflags", list())
    .with("whole_static_libs", list())
    .with("static_libs", list())
    .with("shared_libs", list())
    .with("enabled", flag())
}

fn library_schema() -> Schema {
  let vndk = Schema::new()
    .with("enabled", FieldSpec::bool())
    .with("support_system_process", FieldSpec::bool());
  Schema::new()
    .with("static", FieldSpec::group(linkage_schema()).variant())
    .with("shared", FieldSpec::group(linkage_schema()).variant())
    .with("unique_host_soname", FieldSpec::bool())
    .with("vndk", FieldSpec::group(vndk))
}

fn binary_schema() -> Schema {
  Schema::new()
    .with("static_executable", flag())
    .with("stem", text())
    .with("suffix", text())
    .with("prefix_symbols", FieldSpec::string())
    .with("dynamic_linker", FieldSpec::string())
}

fn test_schema() -> Schema {
  Schema::new()
    .with("gtest", FieldSpec::bool())
    .with("test_per_src", FieldSpec::bool())
}

fn stub_schema() -> Schema {
  Schema::new()
    .with("symbol_file", FieldSpec::string())
    .with("first_version", FieldSpec::string())
    .with("unversioned_until", FieldSpec::string())
    .with("unversioned", FieldSpec::bool())
    .with("export_include_dirs", list())
    .with("vendor_available", FieldSpec::bool())
}

fn prebuilt_schema() -> Schema {
  Schema::new()
    .with("srcs", list())
    .with("prefer", FieldSpec::bool())
}

/// The schema a C/C++ module type accepts.
pub fn schema_for(kind: CcKind) -> Schema {
  let base = base_schema();
  match kind {
    CcKind::Library => base.merge(&compiler_schema()).merge(&linker_schema()).merge(&library_schema()),
    CcKind::Binary => base.merge(&compiler_schema()).merge(&linker_schema()).merge(&binary_schema()),
    CcKind::Test => base
      .merge(&compiler_schema())
      .merge(&linker_schema())
      .merge(&binary_schema())
      .merge(&test_schema()),
    CcKind::Object => base.merge(&compiler_schema()).with("objs", list()),
    CcKind::NdkStub | CcKind::LlndkStub => stub_schema(),
    CcKind::PrebuiltShared | CcKind::PrebuiltStatic => base
      .merge(&linker_schema())
      .merge(&library_schema())
      .merge(&prebuilt_schema()),
    CcKind::ToolchainLibrary => base,
  }
}

/// Everything a `cc_defaults` module may carry.
pub fn defaults_schema() -> Schema {
  base_schema()
    .merge(&compiler_schema())
    .merge(&linker_schema())
    .merge(&library_schema())
    .merge(&binary_schema())
    .merge(&test_schema())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeDiag {
  pub undefined: Option<bool>,
  pub cfi: Option<bool>,
  pub misc_undefined: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeProps {
  pub never: bool,
  pub address: Option<bool>,
  pub thread: Option<bool>,
  pub coverage: Option<bool>,
  pub safestack: Option<bool>,
  pub cfi: Option<bool>,
  pub undefined: Option<bool>,
  pub all_undefined: Option<bool>,
  pub misc_undefined: Vec<String>,
  pub diag: SanitizeDiag,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseProps {
  pub cflags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AidlProps {
  pub include_dirs: Vec<String>,
  pub local_include_dirs: Vec<String>,
  pub export_aidl_headers: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripProps {
  pub none: bool,
  pub keep_symbols: bool,
  pub keep_mini_debug_info: bool,
}

/// `static { ... }` and `shared { ... }` blocks of a library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkageProps {
  pub srcs: Vec<String>,
  pub cflags: Vec<String>,
  pub whole_static_libs: Vec<String>,
  pub static_libs: Vec<String>,
  pub shared_libs: Vec<String>,
  pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VndkProps {
  pub enabled: Option<bool>,
  pub support_system_process: Option<bool>,
}

/// The composed properties of one C/C++ variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcProps {
  pub clang: Option<bool>,
  pub sdk_version: String,
  pub no_default_compiler_flags: bool,
  pub vendor_available: Option<bool>,
  pub vendor: bool,
  pub proprietary: bool,
  pub sanitize: SanitizeProps,
  pub native_coverage: Option<bool>,

  pub srcs: Vec<String>,
  pub exclude_srcs: Vec<String>,
  pub cflags: Vec<String>,
  pub cppflags: Vec<String>,
  pub conlyflags: Vec<String>,
  pub asflags: Vec<String>,
  pub clang_cflags: Vec<String>,
  pub clang_asflags: Vec<String>,
  pub yaccflags: Vec<String>,
  pub instruction_set: String,
  pub include_dirs: Vec<String>,
  pub local_include_dirs: Vec<String>,
  pub generated_sources: Vec<String>,
  pub generated_headers: Vec<String>,
  pub rtti: Option<bool>,
  pub c_std: String,
  pub cpp_std: String,
  pub gnu_extensions: Option<bool>,
  pub release: ReleaseProps,
  pub aidl: AidlProps,
  pub tidy: Option<bool>,
  pub tidy_checks: Vec<String>,
  pub tidy_flags: Vec<String>,

  pub whole_static_libs: Vec<String>,
  pub static_libs: Vec<String>,
  pub shared_libs: Vec<String>,
  pub header_libs: Vec<String>,
  /// `None` selects the default system libraries; an empty list links none.
  pub system_shared_libs: Option<Vec<String>>,
  pub ldflags: Vec<String>,
  pub host_ldlibs: Vec<String>,
  pub allow_undefined_symbols: bool,
  pub no_libgcc: bool,
  pub nocrt: bool,
  pub group_static_libs: bool,
  pub pack_relocations: Option<bool>,
  pub export_shared_lib_headers: Vec<String>,
  pub export_static_lib_headers: Vec<String>,
  pub export_header_lib_headers: Vec<String>,
  pub export_generated_headers: Vec<String>,
  pub export_include_dirs: Vec<String>,
  pub objs: Vec<String>,
  pub version_script: Option<String>,
  pub unexported_symbols_list: Option<String>,
  pub force_symbols_not_weak_list: Option<String>,
  pub force_symbols_weak_list: Option<String>,
  pub strip: StripProps,
  pub relative_install_path: String,

  #[serde(rename = "static")]
  pub static_lib: LinkageProps,
  #[serde(rename = "shared")]
  pub shared_lib: LinkageProps,
  pub unique_host_soname: bool,
  pub vndk: VndkProps,

  pub static_executable: Option<bool>,
  pub stem: String,
  pub suffix: String,
  pub prefix_symbols: String,
  pub dynamic_linker: String,

  pub gtest: Option<bool>,
  pub test_per_src: bool,

  pub symbol_file: String,
  pub first_version: String,
  pub unversioned_until: String,
  pub unversioned: bool,

  pub prefer: bool,
}

impl CcProps {
  /// Reads the typed view of a composed property tree.
  pub fn from_tree(props: &Properties) -> Result<Self, serde_json::Error> {
    serde_json::from_value(to_json(props))
  }

  pub fn is_vndk(&self) -> bool {
    self.vndk.enabled.unwrap_or(false)
  }

  pub fn is_vndk_sp(&self) -> bool {
    self.vndk.support_system_process.unwrap_or(false)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::props::{PropValue, set};

  #[test]
  fn typed_view_reads_nested_blocks() {
    let mut props = Properties::new();
    set(&mut props, "srcs", vec!["a.c"].into());
    set(&mut props, "static.cflags", vec!["-DSTATIC"].into());
    set(&mut props, "sanitize.address", true.into());
    set(&mut props, "system_shared_libs", PropValue::List(Vec::new()));
    set(&mut props, "name", "libfoo".into());
    let typed = CcProps::from_tree(&props).unwrap();
    assert_eq!(typed.srcs, vec!["a.c"]);
    assert_eq!(typed.static_lib.cflags, vec!["-DSTATIC"]);
    assert_eq!(typed.sanitize.address, Some(true));
    assert_eq!(typed.system_shared_libs, Some(Vec::new()));
    assert_eq!(typed.shared_lib.enabled, None);
  }

  #[test]
  fn absent_system_libs_are_none() {
    let typed = CcProps::from_tree(&Properties::new()).unwrap();
    assert_eq!(typed.system_shared_libs, None);
    assert!(!typed.is_vndk());
  }

  #[test]
  fn schemas_differ_by_kind() {
    assert!(schema_for(CcKind::Library).field("static").is_some());
    assert!(schema_for(CcKind::Binary).field("static").is_none());
    assert!(schema_for(CcKind::Binary).field("static_executable").is_some());
    assert!(schema_for(CcKind::NdkStub).field("symbol_file").is_some());
    assert!(defaults_schema().field("gtest").is_some());
  }
}
