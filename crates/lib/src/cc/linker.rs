//! Link flags, link edges and installation for C/C++ variants.

use super::builder::{self, LinkInputs};
use super::check::{check_bad_host_ldlibs, check_bad_linker_flags};
use super::compiler::report;
use super::context::ModuleCtx;
use super::flags::{Flags, Objects, PathDeps};
use super::global::strings;
use super::sabi;
use super::test::{TEST_INSTALL_DIR, TEST_INSTALL_DIR64};
use super::{CcKind, Linkage};
use crate::arch::{ArchType, OsType};
use crate::paths::{self, base};
use crate::util::lists::in_list;

/// What linking one variant produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Linked {
  /// The file dependents link against.
  pub output: Option<String>,
  pub toc: Option<String>,
  pub unstripped: Option<String>,
  pub sabi_dump: Option<String>,
  pub sabi_diff: Option<String>,
  /// Objects archived by a static library, for whole-static dependents.
  pub objs: Objects,
}

/// The soname stem of a library: its `stem`, or the module's base name.
pub fn lib_name(ctx: &ModuleCtx<'_>) -> String {
  let props = &ctx.cc.props;
  let mut name = if props.stem.is_empty() {
    ctx.base_name().to_string()
  } else {
    props.stem.clone()
  };
  if ctx.host() && props.unique_host_soname && !name.ends_with("-host") {
    name.push_str("-host");
  }
  name
}

fn run_paths(ctx: &ModuleCtx<'_>) -> [&'static str; 2] {
  if ctx.toolchain.is_64bit() {
    ["../lib64", "lib64"]
  } else {
    ["../lib", "lib"]
  }
}

fn base_linker_flags(ctx: &mut ModuleCtx<'_>, flags: &mut Flags) {
  let cc = ctx.cc;
  let props = &cc.props;
  let tc = ctx.toolchain.clone();
  let mut errors = Vec::new();

  if !ctx.no_default_compiler_flags() {
    if ctx.device() && !props.allow_undefined_symbols {
      flags.ld_flags.push("-Wl,--no-undefined".to_string());
    }
    flags.ld_flags.extend(if flags.clang { tc.clang_ldflags() } else { tc.ldflags() });
    if ctx.sdk() && !matches!(ctx.arch(), ArchType::Mips | ArchType::Mips64) {
      flags.ld_flags.push("-Wl,--hash-style=both".to_string());
    }
    if !tc.bionic() {
      errors.extend(check_bad_host_ldlibs("host_ldlibs", &props.host_ldlibs, tc.available_libraries()));
      flags.ld_flags.extend(props.host_ldlibs.iter().cloned());
      if !ctx.windows() {
        flags.ld_flags.extend(strings(&["-ldl", "-lpthread", "-lm"]));
        if !ctx.darwin() {
          flags.ld_flags.push("-lrt".to_string());
        }
      }
    }
  }

  errors.extend(check_bad_linker_flags("ldflags", &props.ldflags));
  flags.ld_flags.extend(props.ldflags.iter().cloned());

  if ctx.host() && !ctx.windows() && !ctx.is_static() {
    let prefix = if ctx.darwin() { "@loader_path/" } else { r"\$$ORIGIN/" };
    for rpath in run_paths(ctx) {
      flags.ld_flags.push(format!("-Wl,-rpath,{prefix}{rpath}"));
    }
  }
  if ctx.device() && !ctx.is_static() && props.pack_relocations == Some(true) {
    flags.ld_flags.push("-Wl,--pack-dyn-relocs=android".to_string());
  }
  flags.ld_flags.extend(tc.toolchain_ldflags());
  if props.group_static_libs {
    flags.group_static_libs = true;
  }
  report(ctx, errors);
}

fn library_linker_flags(ctx: &ModuleCtx<'_>, flags: &mut Flags) {
  if !ctx.cc.is_shared_library() {
    return;
  }
  let lib = lib_name(ctx);
  let suffix = ctx.toolchain.shlib_suffix();
  let mut head = Vec::new();
  if ctx.bionic() {
    head.extend(strings(&["-nostdlib", "-Wl,--gc-sections"]));
  }
  if ctx.darwin() {
    head.extend(strings(&["-dynamiclib", "-single_module"]));
    head.push(format!("-install_name @rpath/{lib}{suffix}"));
    if ctx.arch() == ArchType::X86 {
      head.push("-read_only_relocs suppress".to_string());
    }
  } else {
    let shared = if flags.clang || ctx.host() { "-shared" } else { "-Wl,-shared" };
    head.push(shared.to_string());
    head.push(format!("-Wl,-soname,{lib}{suffix}"));
  }
  head.append(&mut flags.ld_flags);
  flags.ld_flags = head;
}

fn binary_linker_flags(ctx: &mut ModuleCtx<'_>, flags: &mut Flags) {
  let static_binary = ctx.static_binary();
  if ctx.host() && !static_binary && !ctx.config.disable_host_pie {
    flags.ld_flags.push("-pie".to_string());
    if ctx.windows() {
      flags.ld_flags.push("-Wl,-e_mainCRTStartup".to_string());
    }
  }
  if !ctx.windows() {
    flags.c_flags.push("-fpie".to_string());
  }

  if ctx.bionic() {
    if static_binary {
      // -static and -shared cannot be combined on x86.
      if !in_list("-shared", &flags.ld_flags) {
        flags.ld_flags.push("-static".to_string());
      }
      flags.ld_flags.extend(strings(&["-nostdlib", "-Bstatic", "-Wl,--gc-sections"]));
      return;
    }
    if flags.dynamic_linker.is_empty() {
      let declared = &ctx.cc.props.dynamic_linker;
      if !declared.is_empty() {
        flags.dynamic_linker = declared.clone();
      } else {
        match ctx.os() {
          OsType::Android => flags.dynamic_linker = "/system/bin/linker".to_string(),
          OsType::LinuxBionic => {}
          _ => ctx.module_error("unknown dynamic linker"),
        }
        if ctx.toolchain.is_64bit() && !flags.dynamic_linker.is_empty() {
          flags.dynamic_linker.push_str("64");
        }
      }
    }
    flags.ld_flags.extend(strings(&[
      "-pie",
      "-nostdlib",
      "-Bdynamic",
      "-Wl,--gc-sections",
      "-Wl,-z,nocopyreloc",
    ]));
  } else {
    if static_binary {
      flags.ld_flags.push("-static".to_string());
    }
    if ctx.darwin() {
      flags.ld_flags.push("-Wl,-headerpad_max_install_names".to_string());
    }
  }
}

/// Adds the link flags of the variant's kind.
pub fn linker_flags(ctx: &mut ModuleCtx<'_>, flags: &mut Flags) {
  match ctx.cc.kind {
    CcKind::Object => flags.ld_flags.extend(ctx.toolchain.toolchain_ldflags()),
    CcKind::Binary | CcKind::Test => {
      base_linker_flags(ctx, flags);
      binary_linker_flags(ctx, flags);
    }
    CcKind::Library | CcKind::NdkStub | CcKind::LlndkStub => {
      base_linker_flags(ctx, flags);
      library_linker_flags(ctx, flags);
    }
    CcKind::PrebuiltShared | CcKind::PrebuiltStatic | CcKind::ToolchainLibrary => {}
  }
}

fn needs_strip(ctx: &ModuleCtx<'_>) -> bool {
  !ctx.cc.props.strip.none
}

fn strip(ctx: &mut ModuleCtx<'_>, unstripped: &str, output: &str) {
  let strip = &ctx.cc.props.strip;
  let (keep_symbols, keep_mini) = (strip.keep_symbols, strip.keep_mini_debug_info);
  builder::strip(ctx, unstripped, output, keep_symbols, keep_mini);
}

/// Symbol export lists: version scripts everywhere but Darwin, the
/// symbol lists only on Darwin.
fn symbol_list_flags(ctx: &mut ModuleCtx<'_>, flags: &mut Flags, deps: &mut Vec<String>) {
  let props = &ctx.cc.props;
  let lists = [
    ("unexported_symbols_list", &props.unexported_symbols_list, "-Wl,-unexported_symbols_list,"),
    ("force_symbols_not_weak_list", &props.force_symbols_not_weak_list, "-Wl,-force_symbols_not_weak_list,"),
    ("force_symbols_weak_list", &props.force_symbols_weak_list, "-Wl,-force_symbols_weak_list,"),
  ];
  if ctx.darwin() {
    if props.version_script.is_some() {
      ctx.property_error("version_script", "Not supported on Darwin");
    }
    for (_, file, flag) in lists {
      if let Some(file) = file {
        let path = ctx.src(file);
        flags.ld_flags.push(format!("{flag}{path}"));
        deps.push(path);
      }
    }
  } else {
    if let Some(script) = &props.version_script {
      let path = ctx.src(script);
      flags.ld_flags.push(format!("-Wl,--version-script,{path}"));
      deps.push(path);
    }
    for (property, file, _) in lists {
      if file.is_some() {
        ctx.property_error(property, "Only supported on Darwin");
      }
    }
  }
}

fn link_shared(
  ctx: &mut ModuleCtx<'_>,
  flags: &Flags,
  deps: &PathDeps,
  objs: &Objects,
  stub_script: Option<&str>,
) -> Linked {
  let mut flags = flags.clone();
  let mut linker_deps = Vec::new();
  symbol_list_flags(ctx, &mut flags, &mut linker_deps);
  if let Some(script) = stub_script {
    flags.ld_flags.push(format!("-Wl,--version-script,{script}"));
    linker_deps.push(script.to_string());
  }

  let file_name = format!("{}{}", lib_name(ctx), ctx.toolchain.shlib_suffix());
  let output = ctx.out(&file_name);
  let mut linked = Linked {
    output: Some(output.clone()),
    ..Linked::default()
  };
  if !ctx.darwin() && !ctx.windows() {
    let toc = format!("{output}.toc");
    builder::toc(ctx, &output, &toc);
    linked.toc = Some(toc);
  }
  let mut link_output = output.clone();
  if needs_strip(ctx) {
    link_output = paths::join(&[&ctx.out_dir(), "unstripped", &file_name]);
    strip(ctx, &link_output, &output);
    linked.unstripped = Some(link_output.clone());
  }

  let mut shared_libs = deps.shared_libs.clone();
  shared_libs.extend(deps.late_shared_libs.iter().cloned());
  linker_deps.extend(deps.shared_libs_deps.iter().cloned());
  linker_deps.extend(deps.late_shared_libs_deps.iter().cloned());
  linker_deps.extend(objs.tidy_files.iter().cloned());
  let inputs = LinkInputs {
    objs: &objs.obj_files,
    shared_libs: &shared_libs,
    static_libs: &deps.static_libs,
    late_static_libs: &deps.late_static_libs,
    whole_static_libs: &deps.whole_static_libs,
    deps: &linker_deps,
    crt_begin: deps.crt_begin.as_deref(),
    crt_end: deps.crt_end.as_deref(),
    group_late: false,
  };
  builder::link(ctx, &flags, &inputs, &link_output);

  let mut dump_objs = objs.clone();
  dump_objs.append(&deps.static_lib_objs);
  dump_objs.append(&deps.whole_static_lib_objs);
  let (dump, diff) = sabi::link_dumps(ctx, &dump_objs, &lib_name(ctx), &output);
  linked.sabi_dump = dump;
  linked.sabi_diff = diff;
  linked
}

fn link_static(ctx: &mut ModuleCtx<'_>, flags: &Flags, deps: &PathDeps, objs: &Objects) -> Linked {
  let mut archived = deps.whole_static_lib_objs.clone();
  archived.append(objs);
  let output = ctx.out(&format!("{}.a", ctx.name()));
  builder::static_lib(ctx, flags, &archived.obj_files, &output, &objs.tidy_files);
  Linked {
    output: Some(output),
    objs: archived,
    ..Linked::default()
  }
}

fn link_binary(ctx: &mut ModuleCtx<'_>, flags: &Flags, deps: &PathDeps, objs: &Objects) -> Linked {
  let props = &ctx.cc.props;
  let stem = if props.stem.is_empty() { ctx.base_name() } else { &props.stem };
  let file_name = format!("{stem}{}{}", props.suffix, ctx.toolchain.executable_suffix());
  let output = ctx.out(&file_name);
  let mut linked = Linked {
    output: Some(output.clone()),
    ..Linked::default()
  };

  let mut flags = flags.clone();
  if !flags.dynamic_linker.is_empty() {
    flags.ld_flags.push(format!("-Wl,-dynamic-linker,{}", flags.dynamic_linker));
  }

  let mut link_output = output;
  if needs_strip(ctx) {
    let unstripped = paths::join(&[&ctx.out_dir(), "unstripped", &file_name]);
    strip(ctx, &unstripped, &link_output);
    link_output = unstripped;
    linked.unstripped = Some(link_output.clone());
  }
  if !props.prefix_symbols.is_empty() {
    let unprefixed = paths::join(&[&ctx.out_dir(), "unprefixed", &file_name]);
    builder::prefix_symbols(ctx, &props.prefix_symbols, &unprefixed, &link_output);
    link_output = unprefixed;
  }

  let mut shared_libs = deps.shared_libs.clone();
  shared_libs.extend(deps.late_shared_libs.iter().cloned());
  let mut linker_deps = deps.shared_libs_deps.clone();
  linker_deps.extend(deps.late_shared_libs_deps.iter().cloned());
  linker_deps.extend(objs.tidy_files.iter().cloned());
  let inputs = LinkInputs {
    objs: &objs.obj_files,
    shared_libs: &shared_libs,
    static_libs: &deps.static_libs,
    late_static_libs: &deps.late_static_libs,
    whole_static_libs: &deps.whole_static_libs,
    deps: &linker_deps,
    crt_begin: deps.crt_begin.as_deref(),
    crt_end: deps.crt_end.as_deref(),
    group_late: true,
  };
  builder::link(ctx, &flags, &inputs, &link_output);
  linked
}

fn link_object(ctx: &mut ModuleCtx<'_>, flags: &Flags, objs: &Objects) -> Linked {
  let output = match objs.obj_files.as_slice() {
    [single] => single.clone(),
    files => {
      let output = ctx.out(&format!("{}.o", ctx.name()));
      builder::partial_link(ctx, flags, files, &output);
      output
    }
  };
  Linked {
    output: Some(output),
    ..Linked::default()
  }
}

fn link_toolchain_library(ctx: &mut ModuleCtx<'_>, flags: &Flags) -> Linked {
  let lib = format!("{}.a", ctx.name());
  let output = ctx.out(&lib);
  if flags.clang {
    ctx.module_error("toolchain_library must use GCC, not Clang");
  }
  builder::copy_gcc_lib(ctx, flags, &lib, &output);
  Linked {
    output: Some(output),
    ..Linked::default()
  }
}

/// Prebuilts link against their single source file in place.
fn link_prebuilt(ctx: &mut ModuleCtx<'_>) -> Linked {
  let srcs = &ctx.cc.props.srcs;
  match srcs.as_slice() {
    [] => Linked::default(),
    [src] => Linked {
      output: Some(ctx.src(src)),
      ..Linked::default()
    },
    _ => {
      ctx.property_error("srcs", "multiple prebuilt source files");
      Linked::default()
    }
  }
}

/// Links the variant. `stub_script` is the generated version script of a
/// stub library, when the stub links with one.
pub fn link(
  ctx: &mut ModuleCtx<'_>,
  flags: &Flags,
  deps: &PathDeps,
  objs: &Objects,
  stub_script: Option<&str>,
) -> Linked {
  let cc = ctx.cc;
  let mut objs = objs.clone();
  objs.append(&deps.objs);
  match cc.kind {
    CcKind::Object => link_object(ctx, flags, &objs),
    CcKind::Binary | CcKind::Test => link_binary(ctx, flags, deps, &objs),
    CcKind::ToolchainLibrary => link_toolchain_library(ctx, flags),
    CcKind::PrebuiltShared | CcKind::PrebuiltStatic => link_prebuilt(ctx),
    CcKind::Library | CcKind::NdkStub | CcKind::LlndkStub => {
      match cc.library.as_ref().and_then(|l| l.linkage) {
        Some(Linkage::Static) => link_static(ctx, flags, deps, &objs),
        Some(Linkage::Shared) => link_shared(ctx, flags, deps, &objs, stub_script),
        None => Linked::default(),
      }
    }
  }
}

/// NDK stubs install into the NDK sysroot of their API level.
fn ndk_install_dir(ctx: &ModuleCtx<'_>) -> String {
  let arch = ctx.arch();
  let lib_dir = if ctx.toolchain.is_64bit() && arch != ArchType::Arm64 {
    "lib64"
  } else {
    "lib"
  };
  let api = ctx.cc.api_level.as_deref().unwrap_or("current");
  paths::join(&[
    &ctx.config.out_dir,
    "ndk",
    "platforms",
    &format!("android-{api}"),
    &format!("arch-{}", arch.name()),
    "usr",
    lib_dir,
  ])
}

/// Copies the variant's output to where it installs. Returns the
/// installed path; static libraries, objects and LL-NDK stubs install
/// nothing.
pub fn install(ctx: &mut ModuleCtx<'_>, output: &str) -> Option<String> {
  let cc = ctx.cc;
  let relative = cc.props.relative_install_path.as_str();
  let dir = match cc.kind {
    CcKind::Binary => ctx.install_dir("bin", "", false, &[relative]),
    CcKind::Test => ctx.install_dir(TEST_INSTALL_DIR, TEST_INSTALL_DIR64, true, &[relative, ctx.name()]),
    CcKind::Library | CcKind::PrebuiltShared if cc.is_shared_library() => {
      ctx.install_dir("lib", "lib64", false, &[relative])
    }
    CcKind::NdkStub => ndk_install_dir(ctx),
    _ => return None,
  };
  let installed = paths::join(&[&dir, base(output)]);
  builder::copy(ctx, "install", output, &installed);
  Some(installed)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cc::testing;
  use crate::cc::{CcModule, LibraryState};
  use crate::ninja::Rule;

  fn shared_lib() -> CcModule {
    let mut cc = CcModule::library(false, true);
    cc.clang = true;
    if let Some(lib) = cc.library.as_mut() {
      lib.linkage = Some(Linkage::Shared);
    }
    cc
  }

  fn static_lib() -> CcModule {
    let mut cc = CcModule::library(true, false);
    cc.clang = true;
    cc.library = Some(LibraryState {
      build_static: true,
      linkage: Some(Linkage::Static),
      ..LibraryState::default()
    });
    cc
  }

  fn binary() -> CcModule {
    let mut cc = CcModule::new(CcKind::Binary);
    cc.clang = true;
    cc
  }

  /// Runs the flag layer and returns the flags and error messages.
  fn flags_for(name: &str, os: OsType, arch: ArchType, cc: CcModule) -> (Flags, Vec<String>) {
    let config = testing::config();
    let shared = testing::shared();
    let module = testing::module(name, "system/foo", os, arch, cc.clone());
    let mut ctx = ModuleCtx::new(&config, &shared, &module, &cc).unwrap().unwrap();
    let mut flags = Flags::new(cc.clang);
    linker_flags(&mut ctx, &mut flags);
    let errors = ctx.take_errors().into_iter().map(|e| e.message).collect();
    (flags, errors)
  }

  fn has(flags: &[String], flag: &str) -> bool {
    flags.iter().any(|f| f == flag)
  }

  mod flags {
    use super::*;

    #[test]
    fn shared_libraries_get_a_soname() {
      let (flags, errors) = flags_for("libfoo", OsType::Android, ArchType::Arm64, shared_lib());
      assert!(errors.is_empty());
      assert_eq!(
        &flags.ld_flags[..4],
        &["-nostdlib", "-Wl,--gc-sections", "-shared", "-Wl,-soname,libfoo.so"]
      );
      assert!(has(&flags.ld_flags, "-Wl,--no-undefined"));
    }

    #[test]
    fn unique_host_sonames() {
      let mut cc = shared_lib();
      cc.props.unique_host_soname = true;
      let (flags, _) = flags_for("libfoo", OsType::LinuxGlibc, ArchType::X86_64, cc);
      assert!(has(&flags.ld_flags, "-Wl,-soname,libfoo-host.so"));
    }

    #[test]
    fn host_binaries_find_libraries_next_to_them() {
      let (flags, _) = flags_for("tool", OsType::LinuxGlibc, ArchType::X86_64, binary());
      assert!(has(&flags.ld_flags, r"-Wl,-rpath,\$$ORIGIN/../lib64"));
      assert!(has(&flags.ld_flags, "-pie"));
      assert!(has(&flags.ld_flags, "-lrt"));
      assert!(has(&flags.c_flags, "-fpie"));

      let (flags, _) = flags_for("tool", OsType::Darwin, ArchType::X86_64, binary());
      assert!(has(&flags.ld_flags, "-Wl,-rpath,@loader_path/../lib64"));
      assert!(has(&flags.ld_flags, "-Wl,-headerpad_max_install_names"));
      assert!(!has(&flags.ld_flags, "-lrt"));
    }

    #[test]
    fn device_binaries_pick_the_dynamic_linker() {
      let (flags, _) = flags_for("sh", OsType::Android, ArchType::Arm64, binary());
      assert_eq!(flags.dynamic_linker, "/system/bin/linker64");
      assert!(has(&flags.ld_flags, "-Wl,-z,nocopyreloc"));

      let (flags, _) = flags_for("sh", OsType::Android, ArchType::Arm, binary());
      assert_eq!(flags.dynamic_linker, "/system/bin/linker");
    }

    #[test]
    fn static_executables_link_statically() {
      let mut cc = binary();
      cc.props.static_executable = Some(true);
      let (flags, _) = flags_for("init", OsType::Android, ArchType::Arm64, cc);
      assert!(has(&flags.ld_flags, "-static"));
      assert!(has(&flags.ld_flags, "-Bstatic"));
      assert!(flags.dynamic_linker.is_empty());
    }

    #[test]
    fn bad_ldflags_are_reported() {
      let mut cc = binary();
      cc.props.ldflags = vec!["-lfoo".into()];
      let (_, errors) = flags_for("sh", OsType::Android, ArchType::Arm64, cc);
      assert_eq!(errors, vec!["Bad flag: `-lfoo`, use shared_libs or host_ldlibs instead"]);
    }

    #[test]
    fn sdk_variants_hash_both_ways() {
      let mut cc = binary();
      cc.sdk_version = "21".into();
      let (flags, _) = flags_for("app", OsType::Android, ArchType::Arm, cc.clone());
      assert!(has(&flags.ld_flags, "-Wl,--hash-style=both"));
      let (flags, _) = flags_for("app", OsType::Android, ArchType::Mips, cc);
      assert!(!has(&flags.ld_flags, "-Wl,--hash-style=both"));
    }
  }

  mod links {
    use super::*;

    #[test]
    fn shared_link_strips_and_writes_a_toc() {
      let config = testing::config();
      let shared = testing::shared();
      let cc = shared_lib();
      let module = testing::module("libfoo", "system/foo", OsType::Android, ArchType::Arm64, cc.clone());
      let mut ctx = ModuleCtx::new(&config, &shared, &module, &cc).unwrap().unwrap();
      let objs = Objects {
        obj_files: vec!["a.o".into()],
        ..Objects::default()
      };
      let linked = link(&mut ctx, &Flags::new(true), &PathDeps::default(), &objs, None);

      let output = linked.output.unwrap();
      assert!(output.ends_with("/libfoo.so"));
      assert_eq!(linked.toc, Some(format!("{output}.toc")));
      let unstripped = linked.unstripped.unwrap();
      assert!(unstripped.ends_with("/unstripped/libfoo.so"));
      let rules: Vec<Rule> = ctx.edges.iter().map(|e| e.rule).collect();
      assert_eq!(rules, vec![Rule::Toc, Rule::Strip, Rule::Ld]);
      assert_eq!(ctx.edges[2].outputs, vec![unstripped]);
    }

    #[test]
    fn symbol_lists_are_darwin_only() {
      let config = testing::config();
      let shared = testing::shared();
      let mut cc = shared_lib();
      cc.props.unexported_symbols_list = Some("unexported.txt".into());
      let module = testing::module("libfoo", "system/foo", OsType::LinuxGlibc, ArchType::X86_64, cc.clone());
      let mut ctx = ModuleCtx::new(&config, &shared, &module, &cc).unwrap().unwrap();
      link(&mut ctx, &Flags::new(true), &PathDeps::default(), &Objects::default(), None);
      let errors = ctx.take_errors();
      assert_eq!(errors[0].property.as_deref(), Some("unexported_symbols_list"));
      assert_eq!(errors[0].message, "Only supported on Darwin");
    }

    #[test]
    fn static_archives_carry_whole_static_objects() {
      let config = testing::config();
      let shared = testing::shared();
      let cc = static_lib();
      let module = testing::module("libfoo", "system/foo", OsType::Android, ArchType::Arm64, cc.clone());
      let mut ctx = ModuleCtx::new(&config, &shared, &module, &cc).unwrap().unwrap();
      let deps = PathDeps {
        whole_static_lib_objs: Objects {
          obj_files: vec!["whole.o".into()],
          ..Objects::default()
        },
        ..PathDeps::default()
      };
      let objs = Objects {
        obj_files: vec!["own.o".into()],
        ..Objects::default()
      };
      let linked = link(&mut ctx, &Flags::new(true), &deps, &objs, None);
      assert!(linked.output.unwrap().ends_with("/libfoo.a"));
      assert_eq!(linked.objs.obj_files, vec!["whole.o", "own.o"]);
      assert_eq!(ctx.edges[0].rule, Rule::Ar);
    }

    #[test]
    fn a_single_object_is_its_own_output() {
      let config = testing::config();
      let shared = testing::shared();
      let cc = CcModule::new(CcKind::Object);
      let module = testing::module("crt", "bionic", OsType::Android, ArchType::Arm64, cc.clone());
      let mut ctx = ModuleCtx::new(&config, &shared, &module, &cc).unwrap().unwrap();
      let objs = Objects {
        obj_files: vec!["crt.o".into()],
        ..Objects::default()
      };
      let linked = link(&mut ctx, &Flags::new(true), &PathDeps::default(), &objs, None);
      assert_eq!(linked.output.as_deref(), Some("crt.o"));
      assert!(ctx.edges.is_empty());
    }

    #[test]
    fn toolchain_libraries_need_gcc() {
      let config = testing::config();
      let shared = testing::shared();
      let mut cc = CcModule::new(CcKind::ToolchainLibrary);
      cc.library = Some(LibraryState {
        build_static: true,
        linkage: Some(Linkage::Static),
        ..LibraryState::default()
      });
      let module = testing::module("libgcc", "prebuilts", OsType::Android, ArchType::Arm, cc.clone());
      let mut ctx = ModuleCtx::new(&config, &shared, &module, &cc).unwrap().unwrap();
      link(&mut ctx, &Flags::new(true), &PathDeps::default(), &Objects::default(), None);
      let errors = ctx.take_errors();
      assert_eq!(errors[0].message, "toolchain_library must use GCC, not Clang");
    }
  }

  mod installs {
    use super::*;

    #[test]
    fn binaries_and_tests() {
      let config = testing::config();
      let shared = testing::shared();
      let cc = binary();
      let module = testing::module("sh", "system/sh", OsType::Android, ArchType::Arm64, cc.clone());
      let mut ctx = ModuleCtx::new(&config, &shared, &module, &cc).unwrap().unwrap();
      let installed = install(&mut ctx, "out/x/sh").unwrap();
      assert!(installed.ends_with("/system/bin/sh"));
      assert_eq!(ctx.edges[0].rule, Rule::Cp);

      let cc = CcModule::new(CcKind::Test);
      let module = testing::module("sh_test", "system/sh", OsType::Android, ArchType::Arm64, cc.clone());
      let mut ctx = ModuleCtx::new(&config, &shared, &module, &cc).unwrap().unwrap();
      let installed = install(&mut ctx, "out/x/sh_test").unwrap();
      assert!(installed.ends_with("/data/nativetest64/sh_test/sh_test"));
    }

    #[test]
    fn static_libraries_do_not_install() {
      let config = testing::config();
      let shared = testing::shared();
      let cc = static_lib();
      let module = testing::module("libfoo", "system/foo", OsType::Android, ArchType::Arm64, cc.clone());
      let mut ctx = ModuleCtx::new(&config, &shared, &module, &cc).unwrap().unwrap();
      assert_eq!(install(&mut ctx, "out/libfoo.a"), None);
      assert!(ctx.edges.is_empty());
    }
  }
}
