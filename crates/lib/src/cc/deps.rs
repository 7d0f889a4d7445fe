//! Per-variant setup and dependency requests of C/C++ modules.
//!
//! `begin` reads the typed properties of each final variant and settles
//! compiler choice, the NDK level and the sanitizer and coverage state.
//! `deps` turns the variant's properties into tagged dependency requests.

use tracing::{debug, trace};

use super::context::EmitError;
use super::toolchain::toolchain_for;
use super::{CcKind, CcModule, CcProps, Deps, coverage, ndk, sanitize, test};
use crate::arch::{OsType, Target};
use crate::config::Config;
use crate::consts::{
  DEFAULT_SYSTEM_SHARED_LIBS, LLNDK_LIBRARY_SUFFIX, NDK_LIBRARY_SUFFIX, NDK_PREBUILT_SHARED_LIBRARIES,
};
use crate::module::{Axis, DepKind, DependencyTag};
use crate::mutator::{Mutator, MutatorContext, Phase, SharedRecord, SharedTables};
use crate::paths;
use crate::util::lists::{filter_list, in_list, last_unique, remove_from_list};

const PROTOBUF_LITE: &str = "libprotobuf-cpp-lite";
const COMPILER_RT_EXTRAS: &str = "libcompiler_rt-extras";

/// Libraries a static executable links inside the libgcc group.
const STATIC_GROUP_LIBS: &[&str] = &["libc", "libc_nomalloc", "libcompiler_rt"];

pub(crate) fn property_error(property: &str, message: impl Into<String>) -> EmitError {
  EmitError {
    property: Some(property.to_string()),
    message: message.into(),
  }
}

pub(crate) fn module_error(message: impl Into<String>) -> EmitError {
  EmitError {
    property: None,
    message: message.into(),
  }
}

/// Reports collected errors through the mutator context.
pub fn report(ctx: &mut MutatorContext<'_>, errors: Vec<EmitError>) {
  for err in errors {
    match err.property {
      Some(property) => ctx.property_error(&property, err.message),
      None => ctx.module_error(err.message),
    }
  }
}

/// What `begin` found beyond its changes to the module.
#[derive(Debug, Default)]
pub struct BeginResult {
  pub errors: Vec<EmitError>,
  pub records: Vec<SharedRecord>,
}

/// Sets up a final variant from its composed properties.
pub fn begin(
  cc: &mut CcModule,
  props: CcProps,
  config: &Config,
  target: &Target,
  name: &str,
  dir: &str,
) -> BeginResult {
  let mut out = BeginResult::default();
  let device = target.is_device();
  cc.props = props;

  if cc.kind == CcKind::NdkStub {
    let base = name.strip_suffix(NDK_LIBRARY_SUFFIX).unwrap_or(name);
    out.errors.extend(
      ndk::stub_begin(cc, base)
        .into_iter()
        .map(|(property, message)| property_error(&property, message)),
    );
    out.records.push(SharedRecord::NdkMigrated(base.to_string()));
  }

  if cc.kind.is_binary() && !target.os.is_bionic() && target.os != OsType::LinuxGlibc {
    cc.props.static_executable = None;
  }

  let clang_supported = match toolchain_for(target) {
    Ok(toolchain) => toolchain.clang_supported(),
    Err(err) => {
      out.errors.push(module_error(err.to_string()));
      return out;
    }
  };
  let default_clang = cc.kind != CcKind::ToolchainLibrary && (!device || config.device_uses_clang());
  cc.clang = cc.props.clang.unwrap_or(default_clang) && clang_supported;

  cc.sdk_version = if device && !cc.use_vndk {
    cc.props.sdk_version.clone()
  } else {
    String::new()
  };

  out
    .errors
    .extend(sanitize::begin(cc, config, target, dir).into_iter().map(module_error));
  coverage::begin(cc, config, target, dir);

  if cc.sdk(device) {
    match ndk::normalize_ndk_api_level(&cc.sdk_version, target.arch.arch_type) {
      Ok(version) => cc.sdk_version = version,
      Err(err) => out.errors.push(property_error("sdk_version", err.to_string())),
    }
  }
  out
}

pub fn begin_mutator() -> Mutator {
  Mutator::new("begin", Phase::Begin, |ctx| {
    let config = ctx.config();
    let module = ctx.module();
    if !module.enabled || module.cc().is_none() {
      return;
    }
    let Some(target) = module.target.clone() else {
      return;
    };
    let props = match CcProps::from_tree(&module.props) {
      Ok(props) => props,
      Err(err) => {
        ctx.module_error(format!("malformed properties: {err}"));
        return;
      }
    };
    let (name, dir) = (module.name.clone(), module.dir.clone());
    let Some(cc) = ctx.module_mut().cc_mut() else {
      return;
    };
    let result = begin(cc, props, config, &target, &name, &dir);
    trace!(module = %name, clang = cc.clang, sdk = %cc.sdk_version, "variant set up");
    for record in result.records {
      ctx.record(record);
    }
    report(ctx, result.errors);
  })
}

/// What dependency collection reads about a variant.
pub struct DepsCtx<'a> {
  pub name: &'a str,
  pub cc: &'a CcModule,
  pub target: &'a Target,
  errors: Vec<EmitError>,
}

impl<'a> DepsCtx<'a> {
  pub fn new(name: &'a str, cc: &'a CcModule, target: &'a Target) -> Self {
    Self {
      name,
      cc,
      target,
      errors: Vec::new(),
    }
  }

  fn device(&self) -> bool {
    self.target.is_device()
  }

  fn bionic(&self) -> bool {
    self.target.os.is_bionic()
  }

  fn sdk(&self) -> bool {
    self.cc.sdk(self.device())
  }

  fn sdk_version(&self) -> &str {
    self.cc.sdk_version_for(self.device())
  }

  fn static_(&self) -> bool {
    self.cc.is_static()
  }

  pub fn take_errors(&mut self) -> Vec<EmitError> {
    std::mem::take(&mut self.errors)
  }
}

fn extend(list: &mut Vec<String>, items: &[String]) {
  list.extend(items.iter().cloned());
}

fn strs(list: &[&str]) -> Vec<String> {
  list.iter().map(|s| s.to_string()).collect()
}

fn compiler_deps(ctx: &DepsCtx<'_>, deps: &mut Deps) {
  let props = &ctx.cc.props;
  extend(&mut deps.generated_sources, &props.generated_sources);
  extend(&mut deps.generated_headers, &props.generated_headers);
  if props.srcs.iter().any(|src| paths::ext(src) == ".proto") {
    if ctx.static_() {
      deps.static_libs.push(PROTOBUF_LITE.to_string());
    } else {
      deps.shared_libs.push(PROTOBUF_LITE.to_string());
    }
  }
}

fn base_linker_deps(ctx: &mut DepsCtx<'_>, deps: &mut Deps) {
  let props = &ctx.cc.props;
  extend(&mut deps.whole_static_libs, &props.whole_static_libs);
  extend(&mut deps.header_libs, &props.header_libs);
  extend(&mut deps.static_libs, &props.static_libs);
  extend(&mut deps.reexport_header_lib_headers, &props.export_header_lib_headers);
  extend(&mut deps.reexport_static_lib_headers, &props.export_static_lib_headers);
  extend(&mut deps.reexport_shared_lib_headers, &props.export_shared_lib_headers);
  extend(&mut deps.reexport_generated_headers, &props.export_generated_headers);
  extend(&mut deps.shared_libs, &props.shared_libs);

  if ctx.bionic() {
    if ctx.name != COMPILER_RT_EXTRAS {
      deps.late_static_libs.push(COMPILER_RT_EXTRAS.to_string());
    }
    deps.late_static_libs.push("libatomic".to_string());
    if !props.no_libgcc {
      deps.late_static_libs.push("libgcc".to_string());
    }
    if !ctx.static_() {
      let system = props
        .system_shared_libs
        .clone()
        .unwrap_or_else(|| strs(DEFAULT_SYSTEM_SHARED_LIBS));
      if in_list("libdl", &deps.shared_libs) && in_list("libc", &system) {
        if !in_list("libdl", &system) {
          ctx
            .errors
            .push(property_error("shared_libs", "libdl must be in system_shared_libs, not shared_libs"));
        }
        remove_from_list("libdl", &mut deps.shared_libs);
      }
      let index = |lib: &str| system.iter().position(|s| s == lib);
      if let (Some(dl), Some(c)) = (index("libdl"), index("libc"))
        && dl < c
      {
        ctx
          .errors
          .push(property_error("system_shared_libs", "libdl must be after libc"));
      }
      deps.late_shared_libs.extend(system);
    } else if ctx.sdk() || ctx.cc.use_vndk {
      deps.late_shared_libs.extend(strs(&["libc", "libdl"]));
    }
  }
  if ctx.target.os == OsType::Windows {
    deps.late_static_libs.push("libwinpthread".to_string());
  }
}

fn library_deps(ctx: &mut DepsCtx<'_>, deps: &mut Deps) {
  base_linker_deps(ctx, deps);
  let cc = ctx.cc;
  let Some(lib) = cc.library.as_ref() else {
    return;
  };
  let block = if lib.is_static() {
    &cc.props.static_lib
  } else if lib.is_shared() {
    if ctx.bionic() && !cc.props.nocrt && !cc.kind.is_prebuilt() {
      if ctx.sdk() {
        deps.crt_begin = Some(format!("ndk_crtbegin_so.{}", ctx.sdk_version()));
        deps.crt_end = Some(format!("ndk_crtend_so.{}", ctx.sdk_version()));
      } else {
        deps.crt_begin = Some("crtbegin_so".to_string());
        deps.crt_end = Some("crtend_so".to_string());
      }
    }
    &cc.props.shared_lib
  } else {
    return;
  };
  extend(&mut deps.whole_static_libs, &block.whole_static_libs);
  extend(&mut deps.static_libs, &block.static_libs);
  extend(&mut deps.shared_libs, &block.shared_libs);
}

fn binary_deps(ctx: &mut DepsCtx<'_>, deps: &mut Deps) {
  base_linker_deps(ctx, deps);
  let static_binary = ctx.cc.static_binary();
  if ctx.bionic() {
    if !ctx.cc.props.nocrt {
      if ctx.sdk() {
        let version = ctx.sdk_version();
        let begin = if static_binary { "ndk_crtbegin_static" } else { "ndk_crtbegin_dynamic" };
        deps.crt_begin = Some(format!("{begin}.{version}"));
        deps.crt_end = Some(format!("ndk_crtend_android.{version}"));
      } else {
        let begin = if static_binary { "crtbegin_static" } else { "crtbegin_dynamic" };
        deps.crt_begin = Some(begin.to_string());
        deps.crt_end = Some("crtend_android".to_string());
      }
    }
    if static_binary {
      let (rest, group) = filter_list(&deps.static_libs, STATIC_GROUP_LIBS);
      deps.static_libs = rest;
      let mut late = group;
      late.append(&mut deps.late_static_libs);
      deps.late_static_libs = late;
    }
  }
  if !static_binary && in_list("libc", &deps.static_libs) {
    ctx.errors.push(module_error(
      "statically linking libc to dynamic executable, please remove libc\n\
       from static libs or set static_executable: true",
    ));
  }
}

/// The dependency requests of a variant, deduplicated and checked.
pub fn collect(ctx: &mut DepsCtx<'_>) -> Deps {
  let mut deps = Deps::default();
  let cc = ctx.cc;
  match cc.kind {
    CcKind::Library => {
      compiler_deps(ctx, &mut deps);
      library_deps(ctx, &mut deps);
    }
    CcKind::PrebuiltShared | CcKind::PrebuiltStatic => library_deps(ctx, &mut deps),
    CcKind::Binary => {
      compiler_deps(ctx, &mut deps);
      binary_deps(ctx, &mut deps);
    }
    CcKind::Test => {
      compiler_deps(ctx, &mut deps);
      test::deps(cc, ctx.sdk(), &mut deps);
      binary_deps(ctx, &mut deps);
    }
    CcKind::Object => {
      compiler_deps(ctx, &mut deps);
      extend(&mut deps.obj_files, &cc.props.objs);
    }
    CcKind::NdkStub | CcKind::LlndkStub | CcKind::ToolchainLibrary => {}
  }
  sanitize::deps(&cc.sanitize, ctx.device(), &mut deps);

  deps.whole_static_libs = last_unique(&deps.whole_static_libs);
  deps.static_libs = last_unique(&deps.static_libs);
  deps.late_static_libs = last_unique(&deps.late_static_libs);
  deps.shared_libs = last_unique(&deps.shared_libs);
  deps.late_shared_libs = last_unique(&deps.late_shared_libs);
  deps.header_libs = last_unique(&deps.header_libs);

  let checks: [(&str, &str, &[String], &[String]); 4] = [
    (
      "export_shared_lib_headers",
      "Shared library not in shared_libs",
      &deps.reexport_shared_lib_headers,
      &deps.shared_libs,
    ),
    (
      "export_static_lib_headers",
      "Static library not in static_libs",
      &deps.reexport_static_lib_headers,
      &deps.static_libs,
    ),
    (
      "export_header_lib_headers",
      "Header library not in header_libs",
      &deps.reexport_header_lib_headers,
      &deps.header_libs,
    ),
    (
      "export_generated_headers",
      "Generated header module not in generated_headers",
      &deps.reexport_generated_headers,
      &deps.generated_headers,
    ),
  ];
  for (property, message, exported, declared) in checks {
    for lib in exported {
      if !in_list(lib, declared) {
        ctx.errors.push(property_error(property, format!("{message}: '{lib}'")));
      }
    }
  }
  deps
}

/// Shared library names split into plain dependencies and NDK stub
/// libraries, which depend on an API-level variant.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Rewritten {
  pub plain: Vec<String>,
  pub stubs: Vec<String>,
}

/// Points NDK libraries of SDK variants at their prebuilt or stub, and
/// LL-NDK libraries of vendor variants at their stub.
pub fn rewrite_ndk_libs(
  list: &[String],
  sdk: bool,
  vndk: bool,
  version: &str,
  shared: &SharedTables,
) -> Rewritten {
  let mut out = Rewritten::default();
  for entry in list {
    if sdk && NDK_PREBUILT_SHARED_LIBRARIES.contains(&entry.as_str()) {
      if shared.is_ndk_migrated(entry) {
        out.stubs.push(format!("{entry}{NDK_LIBRARY_SUFFIX}"));
      } else {
        out.plain.push(format!("{entry}.ndk.{version}"));
      }
    } else if vndk && shared.is_llndk(entry) {
      out.plain.push(format!("{entry}{LLNDK_LIBRARY_SUFFIX}"));
    } else {
      out.plain.push(entry.clone());
    }
  }
  out
}

fn tag(kind: DepKind, exported: &[String], name: &str) -> DependencyTag {
  if in_list(name, exported) {
    DependencyTag::reexported(kind)
  } else {
    DependencyTag::new(kind)
  }
}

pub fn deps_mutator() -> Mutator {
  Mutator::new("deps", Phase::DepResolve, |ctx| {
    let module = ctx.module();
    if !module.enabled {
      return;
    }
    let (Some(cc), Some(target)) = (module.cc(), module.target.as_ref()) else {
      return;
    };
    let name = module.name.clone();
    let mut dctx = DepsCtx::new(&name, cc, target);
    let mut deps = collect(&mut dctx);
    let errors = dctx.take_errors();
    let version = cc.sdk_version_for(target.is_device()).to_string();

    let mut stubs = Rewritten::default();
    let mut late_stubs = Rewritten::default();
    if target.os == OsType::Android {
      let (sdk, vndk) = (cc.sdk(true), cc.use_vndk);
      let shared = ctx.shared();
      stubs = rewrite_ndk_libs(&deps.shared_libs, sdk, vndk, &version, shared);
      late_stubs = rewrite_ndk_libs(&deps.late_shared_libs, sdk, vndk, &version, shared);
      deps.shared_libs = std::mem::take(&mut stubs.plain);
      deps.late_shared_libs = std::mem::take(&mut late_stubs.plain);
      deps.reexport_shared_lib_headers =
        rewrite_ndk_libs(&deps.reexport_shared_lib_headers, sdk, vndk, &version, shared).plain;
    }
    report(ctx, errors);

    let static_link = [(Axis::Link, "static")];
    let shared_link = [(Axis::Link, "shared")];
    for lib in &deps.header_libs {
      ctx.add_variation_dependencies(&[], tag(DepKind::Header, &deps.reexport_header_lib_headers, lib), lib);
    }
    for lib in &deps.whole_static_libs {
      ctx.add_variation_dependencies(&static_link, DependencyTag::new(DepKind::WholeStatic), lib);
    }
    for lib in &deps.static_libs {
      ctx.add_variation_dependencies(&static_link, tag(DepKind::Static, &deps.reexport_static_lib_headers, lib), lib);
    }
    for lib in &deps.late_static_libs {
      ctx.add_variation_dependencies(&static_link, DependencyTag::new(DepKind::LateStatic), lib);
    }
    for lib in &deps.shared_libs {
      ctx.add_variation_dependencies(&shared_link, tag(DepKind::Shared, &deps.reexport_shared_lib_headers, lib), lib);
    }
    for lib in &deps.late_shared_libs {
      ctx.add_variation_dependencies(&shared_link, DependencyTag::new(DepKind::LateShared), lib);
    }
    for generated in &deps.generated_sources {
      ctx.add_dependency(DependencyTag::new(DepKind::GeneratedSource), generated);
    }
    for generated in &deps.generated_headers {
      ctx.add_dependency(tag(DepKind::GeneratedHeader, &deps.reexport_generated_headers, generated), generated);
    }
    for obj in &deps.obj_files {
      ctx.add_dependency(DependencyTag::new(DepKind::Object), obj);
    }
    if let Some(crt) = &deps.crt_begin {
      ctx.add_dependency(DependencyTag::new(DepKind::CrtBegin), crt);
    }
    if let Some(crt) = &deps.crt_end {
      ctx.add_dependency(DependencyTag::new(DepKind::CrtEnd), crt);
    }
    let stub_variant = [(Axis::ApiLevel, version.as_str()), (Axis::Link, "shared")];
    for lib in &stubs.stubs {
      ctx.add_variation_dependencies(&stub_variant, DependencyTag::new(DepKind::NdkStub), lib);
    }
    for lib in &late_stubs.stubs {
      ctx.add_variation_dependencies(&stub_variant, DependencyTag::new(DepKind::NdkLateStub), lib);
    }
    debug!(
      module = %name,
      shared = deps.shared_libs.len() + stubs.stubs.len(),
      statics = deps.static_libs.len() + deps.whole_static_libs.len(),
      "dependencies requested"
    );
  })
}
