//! Source generation: yacc, lex, aidl, protobuf and RenderScript inputs
//! are turned into C/C++ sources before compiling.

use super::context::ModuleCtx;
use super::flags::{Flags, join};
use crate::ninja::{BuildEdge, Rule};
use crate::paths;

const YACC_CMD: &str = "prebuilts/misc/linux-x86/bison/bison";
const LEX_CMD: &str = "prebuilts/misc/linux-x86/flex/flex-2.5.39";
const AIDL_CMD: &str = "out/host/linux-x86/bin/aidl-cpp";
const PROTOC_CMD: &str = "out/host/linux-x86/bin/aprotoc";
const RS_CMD: &str = "prebuilts/sdk/tools/linux/bin/llvm-rs-cc";

/// Sources after generation, plus the generated headers and stamps every
/// compile must wait for.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Generated {
  pub srcs: Vec<String>,
  pub deps: Vec<String>,
}

fn yacc(ctx: &mut ModuleCtx<'_>, src: &str, out: &str, flags: &Flags) -> String {
  let header = ctx.gen_path("yacc", src, ".h");
  let rel = ctx.rel(src);
  ctx.build(
    BuildEdge::new(Rule::Yacc)
      .description(format!("yacc {rel}"))
      .output(out)
      .output(&header)
      .input(src)
      .arg("yaccCmd", YACC_CMD)
      .arg("yaccFlags", join(&flags.yacc_flags))
      .arg("hFile", &header),
  );
  header
}

fn lex(ctx: &mut ModuleCtx<'_>, src: &str, out: &str) {
  let rel = ctx.rel(src);
  ctx.build(
    BuildEdge::new(Rule::Lex)
      .description(format!("lex {rel}"))
      .output(out)
      .input(src)
      .arg("lexCmd", LEX_CMD),
  );
}

fn aidl(ctx: &mut ModuleCtx<'_>, src: &str, out: &str, flags: &Flags) {
  let rel = ctx.rel(src);
  let out_dir = paths::join(&[&ctx.gen_dir(), "aidl"]);
  ctx.build(
    BuildEdge::new(Rule::Aidl)
      .description(format!("aidl {rel}"))
      .output(out)
      .input(src)
      .arg("aidlCmd", AIDL_CMD)
      .arg("aidlFlags", join(&flags.aidl_flags))
      .arg("outDir", out_dir),
  );
}

/// Returns the generated source and header.
fn proto(ctx: &mut ModuleCtx<'_>, src: &str, flags: &Flags) -> (String, String) {
  let out_dir = paths::join(&[&ctx.gen_dir(), "proto"]);
  let stem = paths::stem(src);
  let cc_file = paths::join(&[&out_dir, ctx.dir(), &format!("{stem}.pb.cc")]);
  let header = paths::join(&[&out_dir, ctx.dir(), &format!("{stem}.pb.h")]);
  let rel = ctx.rel(src);
  ctx.build(
    BuildEdge::new(Rule::Proto)
      .description(format!("protoc {rel}"))
      .output(&cc_file)
      .output(&header)
      .input(src)
      .arg("protocCmd", PROTOC_CMD)
      .arg("protoFlags", join(&flags.proto_flags))
      .arg("outDir", out_dir),
  );
  (cc_file, header)
}

fn rs_gen_dir(ctx: &ModuleCtx<'_>) -> String {
  paths::join(&[&ctx.gen_dir(), "rs"])
}

fn rs_cpp_file(ctx: &ModuleCtx<'_>, src: &str) -> String {
  paths::join(&[&rs_gen_dir(ctx), &format!("ScriptC_{}.cpp", paths::stem(src))])
}

/// All RenderScript sources of a module compile in one step that
/// produces a stamp.
fn rs_cpp(ctx: &mut ModuleCtx<'_>, srcs: &[String], flags: &Flags) -> String {
  let out_dir = rs_gen_dir(ctx);
  let stamp = paths::join(&[&out_dir, "rs.stamp"]);
  let mut edge = BuildEdge::new(Rule::RsCpp)
    .description("llvm-rs-cc")
    .output(&stamp)
    .inputs(srcs)
    .arg("rsCmd", RS_CMD)
    .arg("rsFlags", join(&flags.rs_flags))
    .arg("outDir", &out_dir);
  for src in srcs {
    let stem = paths::stem(src);
    edge = edge
      .implicit_output(rs_cpp_file(ctx, src))
      .implicit_output(paths::join(&[&out_dir, &format!("ScriptC_{stem}.h")]));
  }
  ctx.build(edge);
  stamp
}

/// Replaces each generator input in `srcs` by the source it produces and
/// emits the generating edges.
pub fn gen_sources(ctx: &mut ModuleCtx<'_>, srcs: &[String], flags: &Flags) -> Generated {
  let mut out = Generated::default();
  let mut rs_srcs = Vec::new();
  for src in srcs {
    let generated = match paths::ext(src) {
      ".y" | ".yy" => {
        let ext = if paths::ext(src) == ".y" { ".c" } else { ".cpp" };
        let file = ctx.gen_path("yacc", src, ext);
        let header = yacc(ctx, src, &file, flags);
        out.deps.push(header);
        file
      }
      ".l" | ".ll" => {
        let ext = if paths::ext(src) == ".l" { ".c" } else { ".cpp" };
        let file = ctx.gen_path("lex", src, ext);
        lex(ctx, src, &file);
        file
      }
      ".proto" => {
        let (file, header) = proto(ctx, src, flags);
        out.deps.push(header);
        file
      }
      ".aidl" => {
        let file = ctx.gen_path("aidl", src, ".cpp");
        aidl(ctx, src, &file, flags);
        out.deps.push(file.clone());
        file
      }
      ".rs" | ".fs" => {
        rs_srcs.push(src.clone());
        rs_cpp_file(ctx, src)
      }
      _ => src.clone(),
    };
    out.srcs.push(generated);
  }
  if !rs_srcs.is_empty() {
    let stamp = rs_cpp(ctx, &rs_srcs, flags);
    out.deps.push(stamp);
  }
  out
}
