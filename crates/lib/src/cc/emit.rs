//! Emission of a final C/C++ variant: resolve dependency paths, assemble
//! flags, compile, link and install.

use tracing::{debug, trace};

use super::compiler::{self, Compiled};
use super::context::{EmitError, ModuleCtx};
use super::deps::{self, module_error};
use super::flags::{Flags, Objects, PathDeps};
use super::linker::{self, Linked};
use super::resolve::{self, Consumer};
use super::{CcModule, coverage, ndk, sabi, sanitize, test};
use crate::config::Config;
use crate::module::{DependencyTag, Module, ModuleLogic};
use crate::mutator::{Mutator, Phase, SharedTables};
use crate::ninja::BuildEdge;

/// Everything emitting one variant produced, applied to the module once
/// the borrow of the module table ends.
#[derive(Debug)]
pub struct Emitted {
  pub cc: CcModule,
  pub edges: Vec<BuildEdge>,
  pub output_file: Option<String>,
  pub install_file: Option<String>,
  /// Dependencies reported missing instead of failing the build.
  pub missing: Vec<String>,
  pub errors: Vec<EmitError>,
}

struct Built {
  compiled: Compiled,
  linked: Linked,
  installed: Option<String>,
  sanitizer_runtime: Option<String>,
  exported_flags: Vec<String>,
}

/// Assembles the variant's flags in command-line order.
fn assemble_flags(ctx: &mut ModuleCtx<'_>, deps: &PathDeps) -> (Flags, Option<String>) {
  let cc = ctx.cc;
  let mut flags = Flags::new(cc.clang);
  compiler::compiler_flags(ctx, &mut flags);
  compiler::library_compiler_flags(ctx, &mut flags);
  linker::linker_flags(ctx, &mut flags);
  test::flags(cc, ctx.os(), &mut flags);

  let tc = ctx.toolchain.clone();
  let sanitized = sanitize::flags(
    &cc.sanitize,
    ctx.target,
    tc.shlib_suffix(),
    |s| tc.sanitizer_runtime_library(s),
    &mut flags,
  );
  for err in sanitized.errors {
    ctx.module_error(err);
  }
  coverage::flags(cc, &mut flags);
  compiler::tidy_flags(ctx, &mut flags);
  if ctx.create_vndk_source_abi_dump() {
    flags.sabi_dump = true;
    flags.sabi_flags = sabi::source_abi_flags(ctx);
  }
  compiler::filter_illegal_flags(&mut flags);
  flags.global_flags.extend(deps.flags.iter().cloned());
  (flags, sanitized.runtime_library)
}

fn build(ctx: &mut ModuleCtx<'_>, deps: &PathDeps, install: bool) -> Option<Built> {
  let cc = ctx.cc;
  let (flags, sanitizer_runtime) = assemble_flags(ctx, deps);
  if ctx.failed() {
    return None;
  }

  let (compiled, stub_script) = if cc.kind.is_stub() {
    let (objs, script) = ndk::compile_stub(ctx, &flags);
    let script = ndk::stub_uses_version_script(cc).then_some(script);
    (
      Compiled {
        objs,
        reusable: Objects::default(),
      },
      script,
    )
  } else {
    (compiler::compile(ctx, &flags, deps), None)
  };
  if ctx.failed() {
    return None;
  }

  let linked = linker::link(ctx, &flags, deps, &compiled.objs, stub_script.as_deref());
  if ctx.failed() {
    return None;
  }
  let installed = match &linked.output {
    Some(output) if install => linker::install(ctx, output),
    _ => None,
  };

  let mut exported_flags = Vec::new();
  if cc.is_library() {
    exported_flags = compiler::exported_include_flags(ctx);
    exported_flags.extend(deps.reexported_flags.iter().cloned());
  }
  Some(Built {
    compiled,
    linked,
    installed,
    sanitizer_runtime,
    exported_flags,
  })
}

/// Emits one variant. Returns `None` for modules without a target.
pub fn emit(
  config: &Config,
  shared: &SharedTables,
  module: &Module,
  mut cc: CcModule,
  deps: &[(DependencyTag, &Module)],
) -> Option<Emitted> {
  let target = module.target.as_ref()?;
  let consumer = Consumer {
    name: &module.name,
    os: target.os,
    arch: target.arch.arch_type,
    cc: &cc,
    allow_missing: config.allow_missing,
  };
  let resolved = resolve::deps_to_paths(&consumer, deps, shared);
  cc.sabi.reexported_include_flags = resolved.reexported_include_flags;
  cc.coverage.link_coverage = coverage::link_coverage(&cc, &resolved.dep_coverage);
  cc.out.legacy_shared_libs = resolved.legacy_shared_libs;
  let paths = resolved.paths;

  let mut emitted = Emitted {
    cc: cc.clone(),
    edges: Vec::new(),
    output_file: None,
    install_file: None,
    missing: resolved.missing,
    errors: resolved.errors,
  };
  if !emitted.errors.is_empty() {
    return Some(emitted);
  }

  let install = !module.skip_install && !module.prevent_install;
  let mut ctx = match ModuleCtx::new(config, shared, module, &cc)? {
    Ok(ctx) => ctx,
    Err(err) => {
      emitted.errors.push(module_error(err.to_string()));
      return Some(emitted);
    }
  };
  let built = build(&mut ctx, &paths, install);
  emitted.errors = ctx.take_errors();
  emitted.edges = std::mem::take(&mut ctx.edges);
  let Some(built) = built else {
    emitted.edges.clear();
    return Some(emitted);
  };

  let out = &mut emitted.cc.out;
  out.exported_flags = built.exported_flags;
  out.exported_flags_deps = paths.reexported_flags_deps.clone();
  if cc.is_static_library() {
    out.reuse_objs = built.compiled.reusable;
    out.reuse_flags = out.exported_flags.clone();
    out.reuse_flags_deps = out.exported_flags_deps.clone();
  }
  out.objs = built.linked.objs;
  out.toc = built.linked.toc;
  out.unstripped = built.linked.unstripped;
  out.sabi_dump = built.linked.sabi_dump;
  out.sabi_diff = built.linked.sabi_diff;
  out.sanitizer_runtime = built.sanitizer_runtime;
  emitted.output_file = built.linked.output;
  emitted.install_file = built.installed;
  Some(emitted)
}

/// Emits every enabled C/C++ variant. Runs bottom-up, so dependencies
/// have published their outputs before their dependents resolve them.
pub fn emit_mutator() -> Mutator {
  Mutator::new("cc_emit", Phase::Emit, |ctx| {
    let module = ctx.module();
    if !module.enabled {
      return;
    }
    let Some(cc) = module.cc() else {
      return;
    };
    let direct: Vec<(DependencyTag, &Module)> = ctx.direct_deps().into_iter().map(|(tag, _, dep)| (tag, dep)).collect();
    let Some(emitted) = emit(ctx.config(), ctx.shared(), module, cc.clone(), &direct) else {
      trace!(module = %module.name, "no target, nothing to emit");
      return;
    };

    ctx.add_missing_dependencies(&emitted.missing);
    deps::report(ctx, emitted.errors);

    let module = ctx.module_mut();
    debug!(
      module = %module.name,
      variant = %module.variant(),
      edges = emitted.edges.len(),
      "emitted cc variant"
    );
    let mut cc = emitted.cc;
    if cc.is_static_library() {
      cc.out.whole_static_missing_deps = module.missing_deps.clone();
    }
    module.edges.extend(emitted.edges);
    if let Some(output) = &emitted.output_file {
      module.check_build_files.push(output.clone());
    }
    module.output_file = emitted.output_file;
    module.install_files.extend(emitted.install_file);
    module.logic = ModuleLogic::Cc(Box::new(cc));
  })
}
