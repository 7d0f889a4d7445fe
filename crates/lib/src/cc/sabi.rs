//! Source-based ABI dumps of VNDK and LL-NDK libraries.

use super::builder;
use super::context::ModuleCtx;
use super::flags::Objects;
use crate::module::DepKind;
use crate::mutator::{Mutator, Phase};
use crate::paths::join;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SabiState {
  /// A dependent dumps its ABI, so this library dumps its sources too.
  pub create_dumps: bool,
  /// Include flags re-exported from static and header dependencies.
  pub reexported_include_flags: Vec<String>,
}

/// Only the `-I` entries of exported flags.
pub fn include_flags(flags: &[String]) -> Vec<String> {
  flags.iter().filter(|f| f.starts_with("-I")).cloned().collect()
}

/// The header flags passed to the dumper and the linker.
pub fn source_abi_flags(ctx: &ModuleCtx<'_>) -> Vec<String> {
  let mut flags: Vec<String> = ctx
    .cc
    .props
    .export_include_dirs
    .iter()
    .map(|dir| format!("-I{}", ctx.src(dir)))
    .collect();
  flags.extend(include_flags(&ctx.cc.sabi.reexported_include_flags));
  flags
}

/// Propagates dump creation from modules whose ABI is tracked to the
/// libraries they compile in.
pub fn sabi_deps_mutator() -> Mutator {
  Mutator::new("vndk_deps", Phase::AbiDep, |ctx| {
    let module = ctx.module();
    let Some(cc) = module.cc() else {
      return;
    };
    let base = crate::prebuilt::base_name(&module.name);
    let tracked = (cc.is_vndk() && cc.use_vndk) || ctx.shared().is_llndk(base) || cc.sabi.create_dumps;
    if !tracked {
      return;
    }
    let targets: Vec<_> = ctx
      .direct_deps()
      .into_iter()
      .filter(|(tag, _, dep)| {
        tag.kind.is_library()
          && !matches!(tag.kind.required_link(), Some("shared"))
          && tag.kind != DepKind::Header
          && dep.cc().is_some()
      })
      .map(|(_, r, _)| r)
      .collect();
    for r in targets {
      ctx.mark(r, |m| {
        if let Some(cc) = m.cc_mut() {
          cc.sabi.create_dumps = true;
        }
      });
    }
  })
}

/// Where the checked-in reference dump of `file_name` lives.
fn reference_dump(ctx: &ModuleCtx<'_>, file_name: &str) -> String {
  let arch = &ctx.target.arch;
  let arch_dir = if arch.arch_variant.is_empty() {
    arch.arch_type.name().to_string()
  } else {
    format!("{}_{}", arch.arch_type.name(), arch.arch_variant)
  };
  let tree = if ctx.shared.is_llndk(ctx.base_name()) { "ndk" } else { "vndk" };
  join(&[
    "prebuilts/abi-dumps",
    tree,
    "current",
    &arch_dir,
    "source-based",
    &format!("{file_name}.lsdump.gz"),
  ])
}

/// Links the per-source dumps of a shared library and diffs the result
/// against the reference dump when one is checked in. Returns the linked
/// dump and the diff report.
pub fn link_dumps(
  ctx: &mut ModuleCtx<'_>,
  objs: &Objects,
  file_name: &str,
  so_file: &str,
) -> (Option<String>, Option<String>) {
  if objs.sabi_dump_files.is_empty() || !ctx.create_vndk_source_abi_dump() {
    return (None, None);
  }
  let (filter, filter_dep) = match &ctx.cc.props.version_script {
    Some(script) => {
      let path = ctx.src(script);
      (format!("-v {path}"), path)
    }
    None => (format!("-so {so_file}"), so_file.to_string()),
  };
  let header_flags = source_abi_flags(ctx).join(" ");
  let dump = ctx.out(&format!("{file_name}.lsdump"));
  builder::sabi_link(ctx, &objs.sabi_dump_files, &[filter_dep], &dump, &filter, &header_flags);

  let reference = reference_dump(ctx, file_name);
  if !ctx.config.paths.exists(&reference) {
    return (Some(dump), None);
  }
  let unzipped = ctx.out(&format!("{file_name}_ref.lsdump"));
  builder::unzip_ref_dump(ctx, &reference, &unzipped);
  let diff = ctx.out(&format!("{file_name}.abidiff"));
  builder::sabi_diff(ctx, &dump, &unzipped, file_name, &diff);
  (Some(dump), Some(diff))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_include_flags_are_kept() {
    let flags = vec!["-Ia/include".to_string(), "-DFOO".to_string(), "-Ib".to_string()];
    assert_eq!(include_flags(&flags), vec!["-Ia/include", "-Ib"]);
  }
}
