//! Compile flags and object compilation for C/C++ variants.
//!
//! Flags are layered in a fixed order: module flags, include directories,
//! system includes, SDK sysroot, instruction set, driver flags, toolchain
//! and global defaults, language standards, then flags for generated
//! sources. Later layers land later on the command line.

use super::builder;
use super::check::{FlagError, check_bad_compiler_flags, check_bad_tidy_checks, check_bad_tidy_flags};
use super::context::ModuleCtx;
use super::flags::{Flags, Objects, PathDeps};
use super::generate::gen_sources;
use super::global::{
  C_STD_VERSION, COMMON_CLANG_GLOBAL_CFLAGS, COMMON_CLANG_GLOBAL_CPPFLAGS, COMMON_GLOBAL_CFLAGS,
  COMMON_GLOBAL_CONLYFLAGS, COMMON_GLOBAL_CPPFLAGS, COMMON_GLOBAL_INCLUDES, COMMON_NATIVEHELPER_INCLUDE,
  CPP_STD_VERSION, DEVICE_CLANG_GLOBAL_CFLAGS, DEVICE_GLOBAL_CFLAGS, EXPERIMENTAL_C_STD_VERSION,
  EXPERIMENTAL_CPP_STD_VERSION, GCC_CPP_STD_VERSION, HOST_CLANG_GLOBAL_CFLAGS, HOST_GLOBAL_CFLAGS, ILLEGAL_FLAGS,
  RS_GLOBAL_INCLUDES, TIDY_DEFAULT_GLOBAL_CHECKS, TIDY_DEFAULT_HEADER_DIRS, TIDY_EXTERNAL_VENDOR_CHECKS,
  clang_filter_unknown_cflags, strings,
};
use super::{CcKind, Linkage};
use crate::consts::EXTERNAL_PREFIX;
use crate::paths;
use crate::util::lists::filter_list;

pub(super) fn report(ctx: &mut ModuleCtx<'_>, errors: Vec<FlagError>) {
  for err in errors {
    ctx.property_error(&err.property, err.message);
  }
}

fn include_dirs_to_flags(dirs: &[String]) -> String {
  dirs.iter().map(|d| format!("-I{d}")).collect::<Vec<_>>().join(" ")
}

fn has_src_ext(srcs: &[String], exts: &[&str]) -> bool {
  srcs.iter().any(|s| exts.contains(&paths::ext(s)))
}

/// The `-std=` values for C and C++.
pub fn std_versions(c_std: &str, cpp_std: &str, clang: bool, gnu_extensions: Option<bool>) -> (String, String) {
  let mut c = match c_std {
    "" => C_STD_VERSION.to_string(),
    "experimental" => EXPERIMENTAL_C_STD_VERSION.to_string(),
    other => other.to_string(),
  };
  let mut cpp = match cpp_std {
    "" => CPP_STD_VERSION.to_string(),
    "experimental" => EXPERIMENTAL_CPP_STD_VERSION.to_string(),
    "c++17" | "gnu++17" => cpp_std.replacen("17", "1z", 1),
    other => other.to_string(),
  };
  if !clang {
    cpp = GCC_CPP_STD_VERSION.to_string();
  }
  if gnu_extensions == Some(false) {
    c = c.replacen("gnu", "c", 1);
    cpp = cpp.replacen("gnu", "c", 1);
  }
  (c, cpp)
}

/// The clang-tidy checks for code in `dir`.
pub fn tidy_checks_for_dir(dir: &str, global: Option<&str>) -> String {
  let third_party = ["external/", "vendor/", "hardware/"].iter().any(|p| dir.starts_with(p));
  let checks = if third_party {
    TIDY_EXTERNAL_VENDOR_CHECKS
  } else {
    global.unwrap_or(TIDY_DEFAULT_GLOBAL_CHECKS)
  };
  format!("-checks={checks}")
}

/// The NDK sysroot headers SDK and vendor variants compile against.
fn current_include_path(ctx: &ModuleCtx<'_>) -> String {
  paths::join(&[&ctx.config.out_dir, "ndk", "sysroot", "usr", "include"])
}

/// Appends the compile flags common to every compiled variant.
pub fn compiler_flags(ctx: &mut ModuleCtx<'_>, flags: &mut Flags) {
  let tc = ctx.toolchain.clone();
  let props = &ctx.cc.props;

  let mut errors = Vec::new();
  for (property, list) in [
    ("cflags", &props.cflags),
    ("cppflags", &props.cppflags),
    ("conlyflags", &props.conlyflags),
    ("asflags", &props.asflags),
    ("release.cflags", &props.release.cflags),
  ] {
    errors.extend(check_bad_compiler_flags(property, list));
  }

  flags.c_flags.extend(props.cflags.iter().cloned());
  flags.cpp_flags.extend(props.cppflags.iter().cloned());
  flags.conly_flags.extend(props.conlyflags.iter().cloned());
  flags.as_flags.extend(props.asflags.iter().cloned());
  flags.yasm_flags.extend(props.asflags.iter().cloned());
  flags.yacc_flags.extend(props.yaccflags.iter().cloned());

  for dirs in [
    props.local_include_dirs.iter().map(|d| ctx.src(d)).collect::<Vec<_>>(),
    props.include_dirs.clone(),
  ] {
    if !dirs.is_empty() {
      let f = include_dirs_to_flags(&dirs);
      flags.global_flags.push(f.clone());
      flags.yasm_flags.push(f);
    }
  }

  let sdk_or_vndk = ctx.sdk() || ctx.vndk();
  if !ctx.no_default_compiler_flags() {
    let module_dir = format!("-I{}", ctx.dir());
    flags.global_flags.push(module_dir.clone());
    flags.yasm_flags.push(module_dir);
    if !sdk_or_vndk || ctx.host() {
      flags
        .system_include_flags
        .extend(COMMON_GLOBAL_INCLUDES.iter().map(|d| format!("-isystem {d}")));
      flags.system_include_flags.extend(tc.include_flags());
      flags
        .system_include_flags
        .push(format!("-I{COMMON_NATIVEHELPER_INCLUDE}"));
    }
  }

  if sdk_or_vndk {
    let sysroot = current_include_path(ctx);
    flags.system_include_flags.push(format!("-isystem {sysroot}"));
    flags
      .system_include_flags
      .push(format!("-isystem {}", paths::join(&[&sysroot, tc.clang_triple()])));
    let version = match ctx.sdk_version() {
      "current" => "__ANDROID_API_FUTURE__",
      v => v,
    };
    flags.global_flags.push(format!("-D__ANDROID_API__={version}"));
    flags.system_include_flags.push(format!(
      "-isystem prebuilts/ndk/current/platforms/android-{}/arch-{}/usr/include",
      ctx.sdk_version(),
      ctx.arch().name()
    ));
  }
  if ctx.vndk() {
    flags.global_flags.push("-D__ANDROID_VNDK__".to_string());
  }

  let instruction_set = if flags.required_instruction_set.is_empty() {
    props.instruction_set.clone()
  } else {
    flags.required_instruction_set.clone()
  };
  let isa_flags = if flags.clang {
    tc.clang_instruction_set_flags(&instruction_set)
  } else {
    tc.instruction_set_flags(&instruction_set)
  };
  let isa_flags = match isa_flags {
    Ok(f) => f,
    Err(err) => {
      ctx.module_error(err.to_string());
      Vec::new()
    }
  };

  let props = &ctx.cc.props;
  flags.c_flags.extend(props.release.cflags.iter().cloned());

  if flags.clang {
    errors.extend(check_bad_compiler_flags("clang_cflags", &props.clang_cflags));
    errors.extend(check_bad_compiler_flags("clang_asflags", &props.clang_asflags));

    flags.c_flags = clang_filter_unknown_cflags(&flags.c_flags);
    flags.c_flags.extend(props.clang_cflags.iter().cloned());
    flags.as_flags.extend(props.clang_asflags.iter().cloned());
    flags.cpp_flags = clang_filter_unknown_cflags(&flags.cpp_flags);
    flags.conly_flags = clang_filter_unknown_cflags(&flags.conly_flags);
    flags.ld_flags = clang_filter_unknown_cflags(&flags.ld_flags);

    let mut driver = vec![format!("-target {}", tc.clang_triple())];
    if !ctx.darwin() {
      driver.push(format!("-B{}", tc.tool_path()));
    }
    flags.c_flags.extend(driver.iter().cloned());
    flags.as_flags.extend(driver.iter().cloned());
    flags.ld_flags.extend(driver);
  }

  flags.global_flags.extend(isa_flags);
  let mut conly = strings(COMMON_GLOBAL_CONLYFLAGS);
  conly.append(&mut flags.conly_flags);
  flags.conly_flags = conly;

  let device = ctx.device();
  if flags.clang {
    flags.as_flags.extend(tc.clang_asflags());
    let mut cpp = strings(COMMON_CLANG_GLOBAL_CPPFLAGS);
    cpp.append(&mut flags.cpp_flags);
    flags.cpp_flags = cpp;
    flags.global_flags.extend(tc.clang_cflags());
    flags.global_flags.extend(strings(COMMON_CLANG_GLOBAL_CFLAGS));
    flags.global_flags.extend(strings(if device {
      DEVICE_CLANG_GLOBAL_CFLAGS
    } else {
      HOST_CLANG_GLOBAL_CFLAGS
    }));
  } else {
    let mut cpp = strings(COMMON_GLOBAL_CPPFLAGS);
    cpp.append(&mut flags.cpp_flags);
    flags.cpp_flags = cpp;
    flags.global_flags.extend(tc.cflags());
    flags.global_flags.extend(strings(COMMON_GLOBAL_CFLAGS));
    flags.global_flags.extend(strings(if device { DEVICE_GLOBAL_CFLAGS } else { HOST_GLOBAL_CFLAGS }));
  }

  if ctx.config.variables.brillo.unwrap_or(false) {
    flags.global_flags.push("-D__BRILLO__".to_string());
  }

  if device {
    let rtti = if props.rtti.unwrap_or(false) { "-frtti" } else { "-fno-rtti" };
    flags.cpp_flags.push(rtti.to_string());
  }
  flags.as_flags.push("-D__ASSEMBLY__".to_string());
  flags
    .cpp_flags
    .extend(if flags.clang { tc.clang_cppflags() } else { tc.cppflags() });
  flags.yasm_flags.extend(tc.yasm_flags());
  flags.global_flags.extend(if flags.clang {
    tc.toolchain_clang_cflags()
  } else {
    tc.toolchain_cflags()
  });

  if !ctx.sdk() {
    let (c_std, cpp_std) = std_versions(&props.c_std, &props.cpp_std, flags.clang, props.gnu_extensions);
    flags.conly_flags.insert(0, format!("-std={c_std}"));
    flags.cpp_flags.insert(0, format!("-std={cpp_std}"));
  }

  if !ctx.dir().starts_with(EXTERNAL_PREFIX) {
    flags.c_flags.push("-DANDROID_STRICT".to_string());
  }

  generated_source_flags(ctx, flags);
  report(ctx, errors);
}

/// Flags for sources produced by generators: include paths of generated
/// headers and the generators' own options.
fn generated_source_flags(ctx: &mut ModuleCtx<'_>, flags: &mut Flags) {
  let srcs = &ctx.cc.props.srcs;
  let gen_dir = ctx.gen_dir();

  if has_src_ext(srcs, &[".proto"]) {
    flags.c_flags.push("-DGOOGLE_PROTOBUF_NO_RTTI".to_string());
    let proto_dir = paths::join(&[&gen_dir, "proto"]);
    flags
      .global_flags
      .push(format!("-I{}", paths::join(&[&proto_dir, ctx.dir()])));
    flags.global_flags.push(format!("-I{proto_dir}"));
    flags.proto_flags.push("-I .".to_string());
  }

  if has_src_ext(srcs, &[".y", ".yy"]) {
    flags
      .global_flags
      .push(format!("-I{}", paths::join(&[&gen_dir, "yacc"])));
  }

  if has_src_ext(srcs, &[".aidl"]) {
    let aidl = &ctx.cc.props.aidl;
    if !aidl.local_include_dirs.is_empty() {
      let dirs: Vec<String> = aidl.local_include_dirs.iter().map(|d| ctx.src(d)).collect();
      flags.aidl_flags.push(include_dirs_to_flags(&dirs));
    }
    if !aidl.include_dirs.is_empty() {
      flags.aidl_flags.push(include_dirs_to_flags(&aidl.include_dirs));
    }
    flags
      .global_flags
      .push(format!("-I{}", paths::join(&[&gen_dir, "aidl"])));
  }

  if has_src_ext(srcs, &[".rs", ".fs"]) {
    if ctx.sdk() && ctx.sdk_version() != "current" {
      flags.rs_flags.push(format!("-target-api {}", ctx.sdk_version()));
    }
    flags.rs_flags.extend(["-Wall".to_string(), "-Werror".to_string()]);
    let bits = if ctx.toolchain.is_64bit() { "-m64" } else { "-m32" };
    flags.rs_flags.push(bits.to_string());
    flags.rs_flags.extend(strings(RS_GLOBAL_INCLUDES));
    flags.global_flags.extend([
      format!("-I{}", paths::join(&[&gen_dir, "rs"])),
      "-Iframeworks/rs".to_string(),
      "-Iframeworks/rs/cpp".to_string(),
    ]);
  }
}

/// The include flags a library exports to its dependents.
pub fn exported_include_flags(ctx: &ModuleCtx<'_>) -> Vec<String> {
  let props = &ctx.cc.props;
  let mut flags: Vec<String> = props
    .export_include_dirs
    .iter()
    .map(|d| format!("-I{}", ctx.src(d)))
    .collect();
  if props.aidl.export_aidl_headers && has_src_ext(&props.srcs, &[".aidl"]) {
    flags.push(format!("-I{}", paths::join(&[&ctx.gen_dir(), "aidl"])));
  }
  flags
}

/// Library additions: position independence, per-linkage flags and the
/// library's own exported include directories.
pub fn library_compiler_flags(ctx: &mut ModuleCtx<'_>, flags: &mut Flags) {
  let Some(linkage) = ctx.cc.library.as_ref().and_then(|l| l.linkage) else {
    return;
  };
  let exported = exported_include_flags(ctx);
  if !exported.is_empty() {
    let f = exported.join(" ");
    flags.global_flags.push(f.clone());
    flags.yasm_flags.push(f);
  }
  if !ctx.windows() {
    flags.c_flags.push("-fPIC".to_string());
  }
  let props = &ctx.cc.props;
  let extra = match linkage {
    Linkage::Static => &props.static_lib.cflags,
    Linkage::Shared => &props.shared_lib.cflags,
  };
  let property = match linkage {
    Linkage::Static => "static.cflags",
    Linkage::Shared => "shared.cflags",
  };
  let errors = check_bad_compiler_flags(property, extra);
  flags.c_flags.extend(extra.iter().cloned());
  report(ctx, errors);
}

/// clang-tidy flags, when tidy is requested for the module or globally.
pub fn tidy_flags(ctx: &mut ModuleCtx<'_>, flags: &mut Flags) {
  let props = &ctx.cc.props;
  let mut errors = check_bad_tidy_flags("tidy_flags", &props.tidy_flags);
  errors.extend(check_bad_tidy_checks("tidy_checks", &props.tidy_checks));
  let enabled = props.tidy.unwrap_or(ctx.config.with_tidy);
  if enabled && flags.clang {
    flags.tidy = true;
    flags.tidy_flags.extend(props.tidy_flags.iter().cloned());
    if flags.tidy_flags.is_empty() {
      flags.tidy_flags.push(format!(
        "-header-filter=\"({}/|{TIDY_DEFAULT_HEADER_DIRS})\"",
        ctx.dir()
      ));
    }
    let mut checks = tidy_checks_for_dir(ctx.dir(), ctx.config.tidy_checks());
    if !props.tidy_checks.is_empty() {
      checks = format!("{checks},{}", props.tidy_checks.join(","));
    }
    flags.tidy_flags.push(checks);
  }
  report(ctx, errors);
}

/// Strips flags the build never passes through from module flags.
pub fn filter_illegal_flags(flags: &mut Flags) {
  flags.c_flags = filter_list(&flags.c_flags, ILLEGAL_FLAGS).0;
  flags.cpp_flags = filter_list(&flags.cpp_flags, ILLEGAL_FLAGS).0;
  flags.conly_flags = filter_list(&flags.conly_flags, ILLEGAL_FLAGS).0;
}

/// The sources a variant compiles, before generation.
fn sources(ctx: &ModuleCtx<'_>, deps: &PathDeps) -> Vec<String> {
  let props = &ctx.cc.props;
  let excluded = ctx.srcs(&props.exclude_srcs);
  let mut srcs: Vec<String> = ctx
    .srcs(&props.srcs)
    .into_iter()
    .filter(|s| !excluded.contains(s))
    .collect();
  srcs.extend(deps.generated_sources.iter().cloned());
  srcs
}

/// A variant's compiled objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compiled {
  pub objs: Objects,
  /// The objects of the shared sources, which a shared twin may link
  /// instead of compiling its own.
  pub reusable: Objects,
}

/// Compiles the variant's sources. Libraries additionally compile their
/// per-linkage sources into a `static` or `shared` subdirectory.
pub fn compile(ctx: &mut ModuleCtx<'_>, flags: &Flags, deps: &PathDeps) -> Compiled {
  let cc = ctx.cc;
  if cc.is_header_library() {
    if !cc.props.srcs.is_empty() {
      ctx.property_error("srcs", "cc_library_headers must not have any srcs");
    }
    return Compiled::default();
  }
  if matches!(
    cc.kind,
    CcKind::PrebuiltShared | CcKind::PrebuiltStatic | CcKind::ToolchainLibrary
  ) {
    return Compiled::default();
  }

  let srcs = sources(ctx, deps);
  let generated = gen_sources(ctx, &srcs, flags);
  let mut order_only = deps.generated_headers.clone();
  order_only.extend(generated.deps);
  order_only.extend(flags.cflags_deps.iter().cloned());
  let reusable = builder::compile_objs(ctx, flags, "", &generated.srcs, &order_only);
  let mut objs = reusable.clone();

  let linkage = cc.library.as_ref().and_then(|l| l.linkage);
  let extra = match linkage {
    Some(Linkage::Static) => Some(("static", &cc.props.static_lib.srcs)),
    Some(Linkage::Shared) => Some(("shared", &cc.props.shared_lib.srcs)),
    None => None,
  };
  if let Some((subdir, extra)) = extra
    && !extra.is_empty()
  {
    let extra = ctx.srcs(extra);
    let generated = gen_sources(ctx, &extra, flags);
    order_only.extend(generated.deps);
    let more = builder::compile_objs(ctx, flags, subdir, &generated.srcs, &order_only);
    objs.append(&more);
  }
  Compiled { objs, reusable }
}
