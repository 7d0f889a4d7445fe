//! Sanitizers: per-module selection, the `asan`/`tsan` variant split and
//! the flags a sanitized variant compiles and links with.

use tracing::debug;

use super::props::SanitizeProps;
use super::toolchain::CLANG_BIN;
use super::{CcKind, CcModule, Deps, Flags};
use crate::arch::{ArchType, OsType, Target};
use crate::config::Config;
use crate::module::{Axis, Module};
use crate::mutator::{Mutator, Phase};
use crate::util::lists::remove_from_list;

const ASAN_CFLAGS: &[&str] = &["-fno-omit-frame-pointer"];
const ASAN_LDFLAGS: &[&str] = &["-Wl,-u,__asan_preinit"];
const ASAN_HOST_LDFLAGS: &[&str] = &["-lm", "-lpthread", "-Wl,--no-as-needed"];

const CFI_CFLAGS: &[&str] = &[
  "-flto",
  "-fsanitize-cfi-cross-dso",
  "-fvisibility=default",
  "-fsanitize-blacklist=external/compiler-rt/lib/cfi/cfi_blacklist.txt",
];
const CFI_LDFLAGS: &[&str] = &["-flto", "-fsanitize-cfi-cross-dso", "-fsanitize=cfi", "-Wl,-plugin-opt,O1"];

const UNDEFINED_CHECKS: &[&str] = &[
  "bool",
  "integer-divide-by-zero",
  "return",
  "returns-nonnull-attribute",
  "shift-exponent",
  "unreachable",
  "vla-bound",
];

/// The sanitizers that get their own variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sanitizer {
  Address,
  Thread,
}

impl Sanitizer {
  /// The variant name on the sanitize axis.
  pub fn variant(&self) -> &'static str {
    match self {
      Sanitizer::Address => "asan",
      Sanitizer::Thread => "tsan",
    }
  }
}

/// Sanitizer selection of one variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SanitizeState {
  /// The module's `sanitize` block after global defaults and platform
  /// restrictions.
  pub props: SanitizeProps,
  pub enabled: bool,
  /// Installed under the sanitizer data directory.
  pub in_sanitizer_dir: bool,
  /// A dependent needs an address-sanitized variant.
  pub asan_dep: bool,
  pub tsan_dep: bool,
}

impl SanitizeState {
  pub fn is_enabled(&self, t: Sanitizer) -> bool {
    match t {
      Sanitizer::Address => self.props.address == Some(true),
      Sanitizer::Thread => self.props.thread == Some(true),
    }
  }

  pub fn dep(&self, t: Sanitizer) -> bool {
    match t {
      Sanitizer::Address => self.asan_dep,
      Sanitizer::Thread => self.tsan_dep,
    }
  }

  fn set_dep(&mut self, t: Sanitizer, value: bool) {
    match t {
      Sanitizer::Address => self.asan_dep = value,
      Sanitizer::Thread => self.tsan_dep = value,
    }
  }

  /// Turns `t` on or off, keeping `enabled` in step. Coverage needs the
  /// address runtime, so turning address off drops it too.
  pub fn set(&mut self, t: Sanitizer, on: bool) {
    let value = on.then_some(true);
    match t {
      Sanitizer::Address => {
        self.props.address = value;
        if !on {
          self.props.coverage = None;
        }
      }
      Sanitizer::Thread => self.props.thread = value,
    }
    if on {
      self.enabled = true;
    }
  }

  fn any(&self) -> bool {
    let s = &self.props;
    [s.all_undefined, s.undefined, s.address, s.thread, s.coverage, s.safestack, s.cfi]
      .iter()
      .any(|v| *v == Some(true))
      || !s.misc_undefined.is_empty()
  }
}

/// Folds the global sanitizer lists into the module's `sanitize` block and
/// drops what the target cannot support. Returns module errors.
pub fn begin(cc: &mut CcModule, config: &Config, target: &Target, dir: &str) -> Vec<String> {
  let mut errors = Vec::new();
  let mut s = cc.props.sanitize.clone();
  let device = target.is_device();

  if cc.sdk(device) || !cc.kind.sanitizable() {
    s.never = true;
  }
  if s.never {
    cc.sanitize = SanitizeState {
      props: s,
      ..SanitizeState::default()
    };
    return errors;
  }

  let (mut global, mut global_diag): (Vec<String>, Vec<String>) = if !cc.clang {
    (Vec::new(), Vec::new())
  } else if device {
    (config.sanitize_device().to_vec(), config.sanitize_device_diag().to_vec())
  } else {
    (config.sanitize_host.clone(), Vec::new())
  };

  if !global.is_empty() {
    if remove_from_list("undefined", &mut global) && s.all_undefined.is_none() {
      s.all_undefined = Some(true);
    }
    if remove_from_list("default-ub", &mut global) && s.undefined.is_none() {
      s.undefined = Some(true);
    }
    if remove_from_list("address", &mut global) {
      match s.address {
        None => s.address = Some(true),
        Some(false) => {
          remove_from_list("coverage", &mut global);
        }
        Some(true) => {}
      }
    }
    if remove_from_list("thread", &mut global) && s.thread.is_none() {
      s.thread = Some(true);
    }
    if remove_from_list("coverage", &mut global) && s.coverage.is_none() {
      s.coverage = Some(true);
    }
    if remove_from_list("safe-stack", &mut global) && s.safestack.is_none() {
      s.safestack = Some(true);
    }
    if remove_from_list("cfi", &mut global) && s.cfi.is_none() && !config.cfi_disabled_for_path(dir) {
      s.cfi = Some(true);
    }
    if let Some(unknown) = global.first() {
      errors.push(format!("unknown global sanitizer option {unknown}"));
    }
  }

  if !global_diag.is_empty() {
    if remove_from_list("cfi", &mut global_diag) && s.diag.cfi.is_none() && s.cfi == Some(true) {
      s.diag.cfi = Some(true);
    }
    if let Some(unknown) = global_diag.first() {
      errors.push(format!("unknown global sanitizer diagnostics option {unknown}"));
    }
  }

  if s.cfi.is_none() && config.cfi_enabled_for_path(dir) {
    s.cfi = Some(true);
    if config.sanitize_device_diag().iter().any(|d| d == "cfi") {
      s.diag.cfi = Some(true);
    }
  }

  let arch = target.arch.arch_type;
  if !config.enable_cfi()
    || matches!(arch, ArchType::Mips | ArchType::Mips64 | ArchType::Arm)
    || s.address == Some(true)
    || !device
  {
    s.cfi = None;
    s.diag.cfi = None;
  }

  if cc.static_binary() {
    s.address = None;
    s.coverage = None;
    s.thread = None;
  }
  if s.all_undefined == Some(true) {
    s.undefined = None;
  }
  if !arch.is_64bit() {
    s.thread = None;
    s.safestack = None;
  }

  let mut state = SanitizeState {
    props: s,
    ..SanitizeState::default()
  };
  state.enabled = target.os != OsType::Windows && state.any();
  if state.props.coverage == Some(true) && state.props.address != Some(true) {
    errors.push(r#"Use of "coverage" also requires "address""#.to_string());
  }
  cc.sanitize = state;
  errors
}

/// Dependencies a sanitized device variant needs at run time.
pub fn deps(state: &SanitizeState, device: bool, deps: &mut Deps) {
  if !state.enabled || !device {
    return;
  }
  if state.is_enabled(Sanitizer::Address) || state.is_enabled(Sanitizer::Thread) {
    deps.shared_libs.push("libdl".to_string());
  }
}

fn strs(list: &[&str]) -> Vec<String> {
  list.iter().map(|s| s.to_string()).collect()
}

/// What [`flags`] decided beyond the flag sets.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SanitizeFlags {
  /// The runtime library linked ahead of everything else.
  pub runtime_library: Option<String>,
  pub errors: Vec<String>,
}

/// Adds the compile and link flags of the enabled sanitizers.
pub fn flags(
  state: &SanitizeState,
  target: &Target,
  shlib_suffix: &str,
  runtime: impl Fn(&str) -> Option<String>,
  flags: &mut Flags,
) -> SanitizeFlags {
  let mut out = SanitizeFlags::default();
  if !state.enabled {
    return out;
  }
  if !flags.clang {
    out.errors.push("Use of sanitizers requires clang".to_string());
  }
  let s = &state.props;
  let host = target.is_host();
  let arch = target.arch.arch_type;

  let mut sanitizers: Vec<String> = Vec::new();
  let mut diag: Vec<String> = Vec::new();

  if s.all_undefined == Some(true) {
    sanitizers.push("undefined".to_string());
  } else {
    if s.undefined == Some(true) {
      sanitizers.extend(strs(UNDEFINED_CHECKS));
    }
    sanitizers.extend(s.misc_undefined.iter().cloned());
  }
  if s.diag.undefined == Some(true) {
    diag.push("undefined".to_string());
  }
  diag.extend(s.diag.misc_undefined.iter().cloned());

  if s.address == Some(true) {
    if arch == ArchType::Arm {
      flags.required_instruction_set = "arm".to_string();
    }
    flags.c_flags.extend(strs(ASAN_CFLAGS));
    flags.ld_flags.extend(strs(ASAN_LDFLAGS));
    if host {
      flags.ld_flags.extend(strs(ASAN_HOST_LDFLAGS));
    } else {
      flags.c_flags.extend(strs(&["-mllvm", "-asan-globals=0"]));
      flags.dynamic_linker = "/system/bin/linker_asan".to_string();
      if arch.is_64bit() {
        flags.dynamic_linker.push_str("64");
      }
    }
    sanitizers.push("address".to_string());
    diag.push("address".to_string());
  }
  if s.thread == Some(true) {
    sanitizers.push("thread".to_string());
  }
  if s.coverage == Some(true) {
    flags.c_flags.push("-fsanitize-coverage=trace-pc-guard".to_string());
  }
  if s.safestack == Some(true) {
    sanitizers.push("safe-stack".to_string());
  }
  if s.cfi == Some(true) {
    sanitizers.push("cfi".to_string());
    flags.c_flags.extend(strs(CFI_CFLAGS));
    flags.ld_flags.extend(strs(CFI_LDFLAGS));
    flags.ar_flags.push(format!("--plugin {CLANG_BIN}/../lib64/LLVMgold.so"));
    if s.diag.cfi == Some(true) {
      diag.push("cfi".to_string());
    }
  }

  if !sanitizers.is_empty() {
    let arg = format!("-fsanitize={}", sanitizers.join(","));
    flags.c_flags.push(arg.clone());
    if host {
      flags.c_flags.push("-fno-sanitize-recover=all".to_string());
      flags.ld_flags.push(arg);
      remove_from_list("-Wl,--no-undefined", &mut flags.ld_flags);
    } else {
      flags.c_flags.push("-fsanitize-trap=all".to_string());
      flags.c_flags.push("-ftrap-function=abort".to_string());
    }
  }
  if !diag.is_empty() {
    flags.c_flags.push(format!("-fno-sanitize-trap={}", diag.join(",")));
  }

  let runtime_library = if s.address == Some(true) {
    runtime("asan")
  } else if s.thread == Some(true) {
    runtime("tsan")
  } else if !diag.is_empty() {
    runtime("ubsan_standalone")
  } else {
    None
  };
  if let Some(lib) = &runtime_library {
    flags
      .lib_flags
      .insert(0, format!("{CLANG_BIN}/../lib64/clang/5.0/lib/linux/{lib}{shlib_suffix}"));
  }
  out.runtime_library = runtime_library;
  out
}

fn cc_deps_sanitizable(module: &Module) -> bool {
  module.cc().is_some_and(|cc| cc.kind.sanitizable() && !cc.sanitize.props.never)
}

/// Marks every dependency of a module that needs `t` so it builds a `t`
/// variant as well. Runs top-down, so the mark reaches transitive
/// dependencies.
pub fn sanitizer_deps_mutator(t: Sanitizer) -> Mutator {
  let name = format!("{}_deps", t.variant());
  Mutator::new(&name, Phase::SanitizerProp, move |ctx| {
    let Some(cc) = ctx.module().cc() else {
      return;
    };
    if !cc.sanitize.is_enabled(t) && !cc.sanitize.dep(t) {
      return;
    }
    let targets: Vec<_> = ctx
      .direct_deps()
      .into_iter()
      .filter(|(tag, _, dep)| tag.kind.is_library() && cc_deps_sanitizable(dep))
      .map(|(_, r, _)| r)
      .collect();
    for r in targets {
      ctx.mark(r, move |m| {
        if let Some(cc) = m.cc_mut()
          && !cc.sanitize.props.never
        {
          cc.sanitize.set_dep(t, true);
        }
      });
    }
  })
}

fn set_sanitizer(module: &mut Module, t: Sanitizer, on: bool) {
  if let Some(cc) = module.cc_mut() {
    cc.sanitize.set(t, on);
    cc.sanitize.set_dep(t, false);
  }
}

/// Creates the sanitized variants of modules that need them.
///
/// Executables and tests with `t` enabled are built only sanitized.
/// Other modules get an unsanitized and a sanitized variant; only one of
/// the two is installed and seen by the legacy emitter.
pub fn sanitizer_mutator(t: Sanitizer) -> Mutator {
  Mutator::new(t.variant(), Phase::SanitizerSplit, move |ctx| {
    let module = ctx.module();
    let Some(cc) = module.cc() else {
      return;
    };
    if t == Sanitizer::Thread && !module.variations.get(Axis::Sanitize).is_empty() {
      return;
    }
    let enabled = cc.sanitize.is_enabled(t);
    let root = matches!(cc.kind, CcKind::Binary | CcKind::Test);
    let device = module.is_device();
    let name = module.name.clone();

    if root && enabled {
      debug!(module = %name, sanitizer = t.variant(), "sanitized executable");
      let variants = ctx.create_variations(Axis::Sanitize, &[t.variant()]);
      set_sanitizer(&mut variants[0], t, true);
      if device
        && t == Sanitizer::Address
        && let Some(cc) = variants[0].cc_mut()
      {
        cc.sanitize.in_sanitizer_dir = true;
      }
      return;
    }
    if !enabled && !cc.sanitize.dep(t) {
      return;
    }

    debug!(module = %name, sanitizer = t.variant(), "splitting sanitized variant");
    let variants = ctx.create_variations(Axis::Sanitize, &["", t.variant()]);
    set_sanitizer(&mut variants[0], t, false);
    set_sanitizer(&mut variants[1], t, true);
    if let Some(cc) = variants[0].cc_mut() {
      cc.sanitize.enabled = cc.sanitize.any();
    }

    if device {
      if t == Sanitizer::Address
        && let Some(cc) = variants[1].cc_mut()
      {
        cc.sanitize.in_sanitizer_dir = true;
        cc.sanitize.props.cfi = None;
        cc.sanitize.props.diag.cfi = None;
      }
      if enabled {
        variants[0].prevent_install = true;
      } else {
        variants[1].prevent_install = true;
      }
    } else {
      variants[0].prevent_install = true;
    }

    if enabled {
      variants[0].hidden_from_legacy = true;
    } else {
      variants[1].hidden_from_legacy = true;
    }
  })
}
