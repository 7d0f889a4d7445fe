//! The view a C/C++ variant is emitted through.
//!
//! Flag assembly and edge derivation read the finished module and its
//! configuration through a [`ModuleCtx`], which also collects the edges
//! and errors the emit produces so they can be applied once the borrow of
//! the module table ends.

use std::sync::Arc;

use super::CcModule;
use super::toolchain::{Toolchain, ToolchainError, toolchain_for};
use crate::arch::{ArchType, OsType, Target};
use crate::config::Config;
use crate::consts::INTERMEDIATES_DIR;
use crate::module::Module;
use crate::mutator::SharedTables;
use crate::ninja::BuildEdge;
use crate::paths::{self, join};
use crate::prebuilt;

/// An error raised while emitting, with the property it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitError {
  pub property: Option<String>,
  pub message: String,
}

pub struct ModuleCtx<'a> {
  pub config: &'a Config,
  pub shared: &'a SharedTables,
  pub module: &'a Module,
  pub cc: &'a CcModule,
  pub target: &'a Target,
  pub toolchain: Arc<dyn Toolchain>,
  pub edges: Vec<BuildEdge>,
  errors: Vec<EmitError>,
}

impl<'a> ModuleCtx<'a> {
  /// Emits `module` with `cc` as its C/C++ state. Returns `None` for
  /// modules that are not arch-specific.
  pub fn new(
    config: &'a Config,
    shared: &'a SharedTables,
    module: &'a Module,
    cc: &'a CcModule,
  ) -> Option<Result<Self, ToolchainError>> {
    let target = module.target.as_ref()?;
    Some(toolchain_for(target).map(|toolchain| Self {
      config,
      shared,
      module,
      cc,
      target,
      toolchain,
      edges: Vec::new(),
      errors: Vec::new(),
    }))
  }

  pub fn name(&self) -> &str {
    &self.module.name
  }

  /// The module name without stub suffixes or the prebuilt prefix.
  pub fn base_name(&self) -> &str {
    let name = prebuilt::base_name(&self.module.name);
    if self.cc.kind.is_stub() {
      name.rsplit_once('.').map_or(name, |(base, _)| base)
    } else {
      name
    }
  }

  pub fn dir(&self) -> &str {
    &self.module.dir
  }

  pub fn os(&self) -> OsType {
    self.target.os
  }

  pub fn arch(&self) -> ArchType {
    self.target.arch.arch_type
  }

  pub fn device(&self) -> bool {
    self.target.is_device()
  }

  pub fn host(&self) -> bool {
    !self.device()
  }

  pub fn darwin(&self) -> bool {
    self.os() == OsType::Darwin
  }

  pub fn windows(&self) -> bool {
    self.os() == OsType::Windows
  }

  pub fn bionic(&self) -> bool {
    self.toolchain.bionic()
  }

  pub fn sdk(&self) -> bool {
    self.cc.sdk(self.device())
  }

  pub fn sdk_version(&self) -> &str {
    self.cc.sdk_version_for(self.device())
  }

  /// Built for the vendor image.
  pub fn vndk(&self) -> bool {
    self.cc.use_vndk
  }

  pub fn is_vndk(&self) -> bool {
    self.cc.is_vndk()
  }

  /// Installed on the vendor partition.
  pub fn vendor(&self) -> bool {
    self.cc.props.vendor || self.cc.props.proprietary || (self.vndk() && !self.is_vndk())
  }

  pub fn is_static(&self) -> bool {
    self.cc.is_static()
  }

  pub fn static_binary(&self) -> bool {
    self.cc.static_binary()
  }

  pub fn no_default_compiler_flags(&self) -> bool {
    self.cc.props.no_default_compiler_flags
  }

  pub fn create_vndk_source_abi_dump(&self) -> bool {
    self.device() && (self.is_vndk() || self.shared.is_llndk(self.base_name()))
  }

  pub fn property_error(&mut self, property: &str, message: impl Into<String>) {
    self.errors.push(EmitError {
      property: Some(property.to_string()),
      message: message.into(),
    });
  }

  pub fn module_error(&mut self, message: impl Into<String>) {
    self.errors.push(EmitError {
      property: None,
      message: message.into(),
    });
  }

  pub fn failed(&self) -> bool {
    !self.errors.is_empty()
  }

  pub fn take_errors(&mut self) -> Vec<EmitError> {
    std::mem::take(&mut self.errors)
  }

  pub fn build(&mut self, edge: BuildEdge) {
    self.edges.push(edge);
  }

  /// A path in the module's source directory.
  pub fn src(&self, rel: &str) -> String {
    paths::module_src(self.dir(), rel)
  }

  pub fn srcs(&self, rels: &[String]) -> Vec<String> {
    rels.iter().map(|rel| self.src(rel)).collect()
  }

  /// The variant's intermediates directory.
  pub fn out_dir(&self) -> String {
    let variant = self.module.variant();
    join(&[&self.config.out_dir, INTERMEDIATES_DIR, self.dir(), self.name(), &variant])
  }

  pub fn out(&self, rel: &str) -> String {
    join(&[&self.out_dir(), rel])
  }

  pub fn gen_dir(&self) -> String {
    self.out("gen")
  }

  /// `path` relative to the directory it belongs to: the module directory
  /// for sources, the generated-files directory for generated ones.
  pub fn rel(&self, path: &str) -> String {
    if let Some(rest) = path.split_once("/gen/").map(|(_, rest)| rest)
      && path.starts_with(&self.config.out_dir)
    {
      return rest.to_string();
    }
    let prefix = format!("{}/", self.dir());
    path.strip_prefix(prefix.as_str()).unwrap_or(path).to_string()
  }

  /// An object-tree path derived from a source path.
  pub fn obj_path(&self, subdir: &str, src: &str, ext: &str) -> String {
    let rel = paths::replace_ext(&self.rel(src), ext);
    join(&[&self.out_dir(), "obj", subdir, &rel])
  }

  /// A generated-tree path derived from a source path.
  pub fn gen_path(&self, subdir: &str, src: &str, ext: &str) -> String {
    let rel = paths::replace_ext(&self.rel(src), ext);
    join(&[&self.gen_dir(), subdir, &rel])
  }

  /// Where an installed file of this variant goes.
  ///
  /// `dir64` replaces `dir` on 64-bit targets; data installs of vendor
  /// variants go under a `vendor` subdirectory.
  pub fn install_dir(&self, dir: &str, dir64: &str, in_data: bool, relative: &[&str]) -> String {
    let mut sub = if self.toolchain.is_64bit() && !dir64.is_empty() {
      dir64.to_string()
    } else {
      dir.to_string()
    };
    if self.device() && !self.target.arch.native {
      sub = join(&[&sub, self.arch().name()]);
    }
    if in_data && self.vndk() {
      sub = join(&[&sub, "vendor"]);
    }
    let mut parts = vec![self.install_root(in_data), sub];
    parts.extend(relative.iter().map(|r| r.to_string()));
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
    join(&parts)
  }

  fn install_root(&self, in_data: bool) -> String {
    let out = &self.config.out_dir;
    if self.host() {
      return join(&[out, "host", &format!("{}-x86", host_dir_name(self.os()))]);
    }
    let partition = if in_data {
      "data"
    } else if self.vendor() {
      "vendor"
    } else {
      "system"
    };
    let product = join(&[out, "target", "product", self.config.product()]);
    if self.cc.sanitize.in_sanitizer_dir {
      join(&[&product, "data", "asan", partition])
    } else {
      join(&[&product, partition])
    }
  }
}

fn host_dir_name(os: OsType) -> &'static str {
  match os {
    OsType::LinuxGlibc => "linux",
    other => other.name(),
  }
}
