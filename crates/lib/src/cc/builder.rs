//! Edge builders for compiling, archiving and linking C/C++ outputs.

use super::context::ModuleCtx;
use super::flags::{Flags, Objects, join};
use super::global::{NO_OVERRIDE_CLANG_GLOBAL_CFLAGS, NO_OVERRIDE_GLOBAL_CFLAGS};
use super::toolchain::{CLANG_BIN, gcc_cmd};
use crate::consts::DARWIN_AR_ARG_LIMIT;
use crate::ninja::{BuildEdge, Rule};
use crate::paths::{self, base};
use crate::util::lists::split_list_for_size;

const STRIP_PATH: &str = "build/knit/scripts/strip.sh";
const TOC_PATH: &str = "build/knit/scripts/toc.sh";
const MAC_AR: &str = "ar";
const MAC_STRIP: &str = "strip";
const YASM_CMD: &str = "prebuilts/misc/linux-x86/yasm/yasm";
const ABI_TOOLS: &str = "prebuilts/clang-tools/linux-x86/bin";

/// Flags libtooling based tools reject.
const TOOLING_UNKNOWN_PREFIXES: &[&str] = &["-flto", "-fsanitize"];

fn tooling(flags: &[String]) -> Vec<String> {
  flags
    .iter()
    .filter(|f| !TOOLING_UNKNOWN_PREFIXES.iter().any(|p| f.starts_with(p)))
    .cloned()
    .collect()
}

fn cat(parts: &[&[String]]) -> Vec<String> {
  parts.iter().flat_map(|p| p.iter().cloned()).collect()
}

fn no_override(clang: bool) -> Vec<String> {
  let list = if clang { NO_OVERRIDE_CLANG_GLOBAL_CFLAGS } else { NO_OVERRIDE_GLOBAL_CFLAGS };
  list.iter().map(|f| f.to_string()).collect()
}

pub fn clang_cmd(tool: &str) -> String {
  format!("{CLANG_BIN}/{tool}")
}

/// Compiles `srcs` into objects under `obj/<subdir>`, with tidy, coverage and
/// ABI dump side outputs where enabled. `deps` are order-only inputs of
/// every compile.
pub fn compile_objs(ctx: &mut ModuleCtx<'_>, flags: &Flags, subdir: &str, srcs: &[String], deps: &[String]) -> Objects {
  let tail = no_override(flags.clang);
  let tooling_c = tooling(&flags.c_flags);
  let cflags = cat(&[&flags.global_flags, &flags.system_include_flags, &flags.c_flags, &flags.conly_flags, &tail]);
  let cppflags = cat(&[&flags.global_flags, &flags.system_include_flags, &flags.c_flags, &flags.cpp_flags, &tail]);
  let tooling_cflags = cat(&[&flags.global_flags, &flags.system_include_flags, &tooling_c, &flags.conly_flags]);
  let tooling_cppflags = cat(&[&flags.global_flags, &flags.system_include_flags, &tooling_c, &flags.cpp_flags]);
  let asflags = cat(&[&flags.global_flags, &flags.system_include_flags, &flags.as_flags]);

  let mut objs = Objects::default();
  for src in srcs {
    let obj = ctx.obj_path(subdir, src, ".o");
    let rel = ctx.rel(src);
    objs.obj_files.push(obj.clone());
    let ext = paths::ext(src);

    if ext == ".asm" {
      ctx.build(
        BuildEdge::new(Rule::Yasm)
          .description(format!("yasm {rel}"))
          .output(&obj)
          .input(src)
          .order_only(deps)
          .arg("yasmCmd", YASM_CMD)
          .arg("asFlags", join(&flags.yasm_flags)),
      );
      continue;
    }

    let mut tidy = flags.tidy && flags.clang;
    let mut coverage = flags.coverage;
    let mut dump = flags.sabi_dump && flags.clang;
    let (tool, module_flags, tooling_flags) = match ext {
      ".S" | ".s" => {
        tidy = false;
        coverage = false;
        dump = false;
        ("gcc", &asflags, &asflags)
      }
      ".c" => ("gcc", &cflags, &tooling_cflags),
      ".cpp" | ".cc" | ".mm" => ("g++", &cppflags, &tooling_cppflags),
      _ => {
        ctx.module_error(format!("File {src} has unknown extension"));
        continue;
      }
    };
    let cc_cmd = if flags.clang {
      clang_cmd(if tool == "gcc" { "clang" } else { "clang++" })
    } else {
      gcc_cmd(ctx.toolchain.as_ref(), tool)
    };

    let mut edge = BuildEdge::new(Rule::Cc)
      .description(format!("cc {rel}"))
      .output(&obj)
      .input(src)
      .order_only(deps)
      .arg("ccCmd", cc_cmd)
      .arg("cFlags", join(module_flags));
    if coverage {
      let gcno = ctx.obj_path(subdir, src, ".gcno");
      objs.coverage_files.push(gcno.clone());
      edge = edge.implicit_output(gcno);
    }
    ctx.build(edge);

    if tidy {
      let tidy_file = ctx.obj_path(subdir, src, ".tidy");
      objs.tidy_files.push(tidy_file.clone());
      ctx.build(
        BuildEdge::new(Rule::ClangTidy)
          .description(format!("clang-tidy {rel}"))
          .output(tidy_file)
          .input(src)
          .implicits([&obj])
          .arg("tidyCmd", clang_cmd("clang-tidy"))
          .arg("tidyFlags", join(&flags.tidy_flags))
          .arg("cFlags", join(tooling_flags)),
      );
    }

    if dump {
      let dump_file = ctx.obj_path(subdir, src, ".sdump");
      objs.sabi_dump_files.push(dump_file.clone());
      ctx.build(
        BuildEdge::new(Rule::SAbiDump)
          .description(format!("header-abi-dumper {rel}"))
          .output(dump_file)
          .input(src)
          .implicits([&obj])
          .arg("sAbiDumper", format!("{ABI_TOOLS}/header-abi-dumper"))
          .arg("exportDirs", join(&flags.sabi_flags))
          .arg("cFlags", join(tooling_flags)),
      );
    }
  }
  objs
}

/// Archives `objs` into `output`.
pub fn static_lib(ctx: &mut ModuleCtx<'_>, flags: &Flags, objs: &[String], output: &str, deps: &[String]) {
  if ctx.darwin() {
    darwin_static_lib(ctx, objs, output, deps);
    return;
  }
  let mut ar_flags = "crsPD".to_string();
  if !flags.ar_flags.is_empty() {
    ar_flags = format!("{ar_flags} {}", join(&flags.ar_flags));
  }
  let ar_cmd = gcc_cmd(ctx.toolchain.as_ref(), "ar");
  ctx.build(
    BuildEdge::new(Rule::Ar)
      .description(format!("static link {}", base(output)))
      .output(output)
      .inputs(objs)
      .implicits(deps)
      .arg("arCmd", ar_cmd)
      .arg("arFlags", ar_flags),
  );
}

/// Darwin's ar cannot take a response file, so long object lists are
/// archived in batches that each append to the previous archive.
fn darwin_static_lib(ctx: &mut ModuleCtx<'_>, objs: &[String], output: &str, deps: &[String]) {
  const AR_FLAGS: &str = "cqs";

  if objs.is_empty() {
    let dummy = ctx.out("dummy.o");
    let dummy_ar = ctx.out("dummy.a");
    ctx.build(
      BuildEdge::new(Rule::EmptyFile)
        .description("empty object file")
        .output(&dummy)
        .implicits(deps),
    );
    ctx.build(
      BuildEdge::new(Rule::DarwinAr)
        .description("empty static archive")
        .output(&dummy_ar)
        .input(&dummy)
        .arg("arCmd", MAC_AR)
        .arg("arFlags", AR_FLAGS),
    );
    ctx.build(
      BuildEdge::new(Rule::DarwinAppendAr)
        .description(format!("static link {}", base(output)))
        .output(output)
        .input(&dummy)
        .arg("arCmd", MAC_AR)
        .arg("arFlags", "d")
        .arg("inAr", dummy_ar),
    );
    return;
  }

  let batches = match split_list_for_size(objs, DARWIN_AR_ARG_LIMIT) {
    Ok(batches) => batches,
    Err(err) => {
      ctx.module_error(err.to_string());
      return;
    }
  };
  let last = batches.len() - 1;
  let mut previous: Option<String> = None;
  for (i, batch) in batches.iter().enumerate() {
    let out = if i == last {
      output.to_string()
    } else {
      ctx.out(&format!("{}{i}", base(output)))
    };
    let mut edge = BuildEdge::new(Rule::DarwinAr)
      .description(format!("static link {}", base(&out)))
      .output(&out)
      .inputs(batch)
      .implicits(deps)
      .arg("arCmd", MAC_AR)
      .arg("arFlags", AR_FLAGS);
    if let Some(in_ar) = previous.take() {
      edge.rule = Rule::DarwinAppendAr;
      edge = edge.arg("inAr", in_ar);
    }
    ctx.build(edge);
    previous = Some(out);
  }
}

/// Everything a final link reads.
#[derive(Debug, Default)]
pub struct LinkInputs<'a> {
  pub objs: &'a [String],
  pub shared_libs: &'a [String],
  pub static_libs: &'a [String],
  pub late_static_libs: &'a [String],
  pub whole_static_libs: &'a [String],
  pub deps: &'a [String],
  pub crt_begin: Option<&'a str>,
  pub crt_end: Option<&'a str>,
  /// Group late static libraries on their own; only binaries do.
  pub group_late: bool,
}

/// Links a shared library or executable.
pub fn link(ctx: &mut ModuleCtx<'_>, flags: &Flags, inputs: &LinkInputs<'_>, output: &str) {
  let ld_cmd = if flags.clang {
    clang_cmd("clang++")
  } else {
    gcc_cmd(ctx.toolchain.as_ref(), "g++")
  };
  let darwin = ctx.darwin();

  let mut lib_flags: Vec<String> = flags.lib_flags.clone();
  if !inputs.whole_static_libs.is_empty() {
    if darwin {
      for lib in inputs.whole_static_libs {
        lib_flags.push(format!("-force_load {lib}"));
      }
    } else {
      lib_flags.push("-Wl,--whole-archive".to_string());
      lib_flags.extend(inputs.whole_static_libs.iter().cloned());
      lib_flags.push("-Wl,--no-whole-archive".to_string());
    }
  }
  if flags.group_static_libs && !darwin && !inputs.static_libs.is_empty() {
    lib_flags.push("-Wl,--start-group".to_string());
  }
  lib_flags.extend(inputs.static_libs.iter().cloned());
  if flags.group_static_libs && !darwin && !inputs.static_libs.is_empty() {
    lib_flags.push("-Wl,--end-group".to_string());
  }
  if !inputs.late_static_libs.is_empty() {
    if inputs.group_late && !darwin {
      lib_flags.push("-Wl,--start-group".to_string());
      lib_flags.extend(inputs.late_static_libs.iter().cloned());
      lib_flags.push("-Wl,--end-group".to_string());
    } else {
      lib_flags.extend(inputs.late_static_libs.iter().cloned());
    }
  }
  lib_flags.extend(inputs.shared_libs.iter().cloned());

  let mut implicits: Vec<String> = inputs.deps.to_vec();
  implicits.extend(inputs.whole_static_libs.iter().cloned());
  implicits.extend(inputs.static_libs.iter().cloned());
  implicits.extend(inputs.late_static_libs.iter().cloned());
  implicits.extend(inputs.crt_begin.map(str::to_string));
  implicits.extend(inputs.crt_end.map(str::to_string));

  ctx.build(
    BuildEdge::new(Rule::Ld)
      .description(format!("link {}", base(output)))
      .output(output)
      .inputs(inputs.objs)
      .implicits(implicits)
      .arg("ldCmd", ld_cmd)
      .arg("crtBegin", inputs.crt_begin.unwrap_or_default())
      .arg("libFlags", join(&lib_flags))
      .arg("crtEnd", inputs.crt_end.unwrap_or_default())
      .arg("ldFlags", join(&flags.ld_flags)),
  );
}

/// Combines objects into one relocatable object.
pub fn partial_link(ctx: &mut ModuleCtx<'_>, flags: &Flags, objs: &[String], output: &str) {
  let ld_cmd = if flags.clang {
    clang_cmd("clang++")
  } else {
    gcc_cmd(ctx.toolchain.as_ref(), "g++")
  };
  ctx.build(
    BuildEdge::new(Rule::PartialLd)
      .description(format!("link {}", base(output)))
      .output(output)
      .inputs(objs)
      .arg("ldCmd", ld_cmd)
      .arg("ldFlags", join(&flags.ld_flags)),
  );
}

/// Extracts the exported symbol table of a shared library.
pub fn toc(ctx: &mut ModuleCtx<'_>, input: &str, output: &str) {
  let cross = ctx.toolchain.cross_compile();
  ctx.build(
    BuildEdge::new(Rule::Toc)
      .description(format!("generate toc {}", base(input)))
      .output(output)
      .input(input)
      .arg("crossCompile", cross)
      .arg("tocPath", TOC_PATH),
  );
}

pub fn strip(ctx: &mut ModuleCtx<'_>, input: &str, output: &str, keep_symbols: bool, keep_mini_debug_info: bool) {
  if ctx.darwin() {
    ctx.build(
      BuildEdge::new(Rule::DarwinStrip)
        .description(format!("strip {}", base(output)))
        .output(output)
        .input(input)
        .arg("stripCmd", MAC_STRIP),
    );
    return;
  }
  let mut args = Vec::new();
  if keep_symbols {
    args.push("--keep-symbols");
  }
  if keep_mini_debug_info {
    args.push("--keep-mini-debug-info");
  }
  args.push("--add-gnu-debuglink");
  let cross = ctx.toolchain.cross_compile();
  ctx.build(
    BuildEdge::new(Rule::Strip)
      .description(format!("strip {}", base(output)))
      .output(output)
      .input(input)
      .arg("crossCompile", cross)
      .arg("stripPath", STRIP_PATH)
      .arg("args", args.join(" ")),
  );
}

pub fn prefix_symbols(ctx: &mut ModuleCtx<'_>, prefix: &str, input: &str, output: &str) {
  let objcopy = gcc_cmd(ctx.toolchain.as_ref(), "objcopy");
  ctx.build(
    BuildEdge::new(Rule::PrefixSymbols)
      .description(format!("prefix symbols {}", base(output)))
      .output(output)
      .input(input)
      .arg("objcopyCmd", objcopy)
      .arg("prefix", prefix),
  );
}

/// Copies a library shipped with the gcc toolchain.
pub fn copy_gcc_lib(ctx: &mut ModuleCtx<'_>, flags: &Flags, lib_name: &str, output: &str) {
  let cc_cmd = gcc_cmd(ctx.toolchain.as_ref(), "gcc");
  ctx.build(
    BuildEdge::new(Rule::CopyGccLib)
      .description(format!("copy gcc library {lib_name}"))
      .output(output)
      .arg("ccCmd", cc_cmd)
      .arg("cFlags", join(&flags.global_flags))
      .arg("libName", lib_name),
  );
}

/// Merges per-source ABI dumps of a library into one linked dump.
pub fn sabi_link(
  ctx: &mut ModuleCtx<'_>,
  dumps: &[String],
  implicits: &[String],
  output: &str,
  symbol_filter: &str,
  exported_header_flags: &str,
) {
  let arch = ctx.arch().name();
  ctx.build(
    BuildEdge::new(Rule::SAbiLink)
      .description(format!("header-abi-linker {}", base(output)))
      .output(output)
      .inputs(dumps)
      .implicits(implicits)
      .arg("sAbiLinker", format!("{ABI_TOOLS}/header-abi-linker"))
      .arg("symbolFilter", symbol_filter)
      .arg("arch", arch)
      .arg("exportedHeaderFlags", exported_header_flags),
  );
}

pub fn unzip_ref_dump(ctx: &mut ModuleCtx<'_>, reference: &str, output: &str) {
  ctx.build(
    BuildEdge::new(Rule::UnzipRefSAbiDump)
      .description(format!("gunzip {}", base(reference)))
      .output(output)
      .input(reference),
  );
}

pub fn sabi_diff(ctx: &mut ModuleCtx<'_>, dump: &str, reference: &str, lib_name: &str, output: &str) {
  let arch = ctx.arch().name();
  ctx.build(
    BuildEdge::new(Rule::SAbiDiff)
      .description(format!("header-abi-diff {}", base(output)))
      .output(output)
      .input(dump)
      .implicits([reference])
      .arg("sAbiDiffer", format!("{ABI_TOOLS}/header-abi-diff"))
      .arg("allowFlags", "")
      .arg("libName", lib_name)
      .arg("arch", arch)
      .arg("referenceDump", reference),
  );
}

pub fn copy(ctx: &mut ModuleCtx<'_>, description: &str, input: &str, output: &str) {
  ctx.build(
    BuildEdge::new(Rule::Cp)
      .description(format!("{description} {}", base(output)))
      .output(output)
      .input(input),
  );
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tooling_flags_drop_lto_and_sanitizers() {
    let flags: Vec<String> = ["-O2", "-flto", "-fsanitize=cfi", "-Wall"].iter().map(|s| s.to_string()).collect();
    assert_eq!(tooling(&flags), vec!["-O2", "-Wall"]);
  }

  #[test]
  fn no_override_flags_depend_on_compiler() {
    assert!(no_override(true).contains(&"-Werror=null-dereference".to_string()));
    assert!(!no_override(false).contains(&"-Werror=null-dereference".to_string()));
  }
}
