//! The legacy make table.
//!
//! Every final C/C++ variant is described to the legacy build as a
//! prebuilt: the block names the module, its class, the file the graph
//! produces and the shared libraries it links. The file ends with the
//! number of base modules seen per module type.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::arch::OsClass;
use crate::cc::{CcKind, CcModule};
use crate::consts::VENDOR_SUFFIX;
use crate::module::Module;
use crate::ninja::WriteError;
use crate::paths;
use crate::util::fs::write_if_changed;

/// The legacy module class of a variant.
fn module_class(cc: &CcModule) -> &'static str {
  match cc.kind {
    CcKind::Binary => "EXECUTABLES",
    CcKind::Test => "NATIVE_TESTS",
    CcKind::Object | CcKind::ToolchainLibrary | CcKind::PrebuiltStatic => "STATIC_LIBRARIES",
    CcKind::NdkStub | CcKind::LlndkStub | CcKind::PrebuiltShared => "SHARED_LIBRARIES",
    CcKind::Library if cc.is_header_library() => "HEADER_LIBRARIES",
    CcKind::Library if cc.is_static_library() => "STATIC_LIBRARIES",
    CcKind::Library => "SHARED_LIBRARIES",
  }
}

/// The name the legacy build knows a variant by. Vendor variants of
/// libraries that also build for the core image carry a suffix.
pub fn legacy_name(module: &Module, cc: &CcModule) -> String {
  if cc.use_vndk && cc.vendor_available() == Some(true) {
    format!("{}{VENDOR_SUFFIX}", module.name)
  } else {
    module.name.clone()
  }
}

/// One variant's prebuilt block.
struct Block<'a> {
  module: &'a Module,
  cc: &'a CcModule,
}

impl fmt::Display for Block<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let (module, cc) = (self.module, self.cc);
    writeln!(f, "include $(CLEAR_VARS)")?;
    writeln!(f, "LOCAL_PATH := {}", module.dir)?;
    writeln!(f, "LOCAL_MODULE := {}", legacy_name(module, cc))?;
    writeln!(f, "LOCAL_MODULE_CLASS := {}", module_class(cc))?;
    if let Some(output) = &module.output_file {
      writeln!(f, "LOCAL_PREBUILT_MODULE_FILE := {output}")?;
      let suffix = paths::ext(output);
      if !suffix.is_empty() {
        writeln!(f, "LOCAL_MODULE_SUFFIX := {suffix}")?;
      }
    }
    if !cc.out.legacy_shared_libs.is_empty() {
      writeln!(f, "LOCAL_SHARED_LIBRARIES := {}", cc.out.legacy_shared_libs.join(" "))?;
    }
    if let Some(target) = &module.target {
      let arch = target.arch.arch_type.name();
      match target.class() {
        OsClass::Device => writeln!(f, "LOCAL_MODULE_TARGET_ARCH := {arch}")?,
        OsClass::Host => {
          writeln!(f, "LOCAL_IS_HOST_MODULE := true")?;
          writeln!(f, "LOCAL_MODULE_HOST_OS := {}", target.os.name())?;
          writeln!(f, "LOCAL_MODULE_HOST_ARCH := {arch}")?;
        }
        OsClass::HostCross => {
          writeln!(f, "LOCAL_IS_HOST_MODULE := true")?;
          writeln!(f, "LOCAL_MODULE_HOST_OS := {}", target.os.name())?;
          writeln!(f, "LOCAL_MODULE_HOST_CROSS_ARCH := {arch}")?;
        }
      }
    }
    if cc.use_vndk {
      writeln!(f, "LOCAL_VENDOR_MODULE := true")?;
    }
    if module.skip_install || module.install_files.is_empty() {
      writeln!(f, "LOCAL_UNINSTALLABLE_MODULE := true")?;
    }
    writeln!(f, "include $(BUILD_PREBUILT)")?;
    writeln!(f)
  }
}

/// Whether a variant is described to the legacy build at all.
fn emitted(module: &Module) -> Option<&CcModule> {
  if !module.enabled || module.hidden_from_legacy {
    return None;
  }
  let cc = module.cc()?;
  (module.output_file.is_some() || cc.is_header_library()).then_some(cc)
}

struct Table<'a> {
  blocks: Vec<Block<'a>>,
  per_type: BTreeMap<&'a str, BTreeSet<&'a str>>,
}

impl fmt::Display for Table<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "# Generated by knit. Do not edit.")?;
    let types: Vec<&str> = self.per_type.keys().copied().collect();
    writeln!(f, "SOONG_MODULE_TYPES := {}", types.join(" "))?;
    writeln!(f)?;
    for block in &self.blocks {
      write!(f, "{block}")?;
    }
    for (module_type, names) in &self.per_type {
      writeln!(f, "STATS.SOONG_MODULE_TYPE.{module_type} := {}", names.len())?;
    }
    Ok(())
  }
}

/// Renders the make table for `modules`, which the caller orders.
pub fn render<'a>(modules: impl IntoIterator<Item = &'a Module>) -> String {
  let mut table = Table {
    blocks: Vec::new(),
    per_type: BTreeMap::new(),
  };
  for module in modules {
    let Some(cc) = emitted(module) else {
      continue;
    };
    table.per_type.entry(&module.module_type).or_default().insert(&module.name);
    table.blocks.push(Block { module, cc });
  }
  table.to_string()
}

/// Writes the table unless `path` already holds it. Returns whether the
/// file changed.
pub fn write(path: &Path, content: &str) -> Result<bool, WriteError> {
  let written = write_if_changed(path, content)?;
  debug!(path = %path.display(), written, "legacy make table");
  Ok(written)
}
