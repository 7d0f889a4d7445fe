//! Resolved dependency edges turned into the paths a variant consumes.

use super::context::EmitError;
use super::deps::{module_error, property_error};
use super::{CcKind, CcModule, PathDeps};
use crate::arch::OsType;
use crate::consts::{LLNDK_LIBRARY_SUFFIX, PREBUILT_PREFIX, VENDOR_SUFFIX};
use crate::genrule::GenruleModule;
use crate::module::{DepKind, DependencyTag, Module};
use crate::mutator::SharedTables;
use crate::util::lists::first_unique;

/// Everything gathered from the direct dependencies of a variant.
#[derive(Debug, Default)]
pub struct Resolved {
  pub paths: PathDeps,
  /// Dependencies reported missing instead of failing the build.
  pub missing: Vec<String>,
  /// Shared libraries as the legacy emitter names them.
  pub legacy_shared_libs: Vec<String>,
  /// Kind and link-coverage state of each static library dependency.
  pub dep_coverage: Vec<(DepKind, bool)>,
  /// Include flags re-exported from static, header and generated-header
  /// dependencies, for the ABI dumper.
  pub reexported_include_flags: Vec<String>,
  pub errors: Vec<EmitError>,
}

/// The variant being resolved.
pub struct Consumer<'a> {
  pub name: &'a str,
  pub os: OsType,
  pub arch: crate::arch::ArchType,
  pub cc: &'a CcModule,
  pub allow_missing: bool,
}

fn include_dirs_to_flags(dirs: &[String]) -> String {
  dirs.iter().map(|d| format!("-I{d}")).collect::<Vec<_>>().join(" ")
}

fn generated(out: &mut Resolved, tag: DependencyTag, name: &str, genrule: Option<&GenruleModule>) {
  let Some(genrule) = genrule else {
    let message = if tag.kind == DepKind::GeneratedSource {
      format!("module {name:?} is not a gensrcs or genrule")
    } else {
      format!("module {name:?} is not a genrule")
    };
    out.errors.push(module_error(message));
    return;
  };
  if tag.kind == DepKind::GeneratedSource {
    out
      .paths
      .generated_sources
      .extend(genrule.generated_source_files().iter().cloned());
  }
  out
    .paths
    .generated_headers
    .extend(genrule.generated_source_files().iter().cloned());
  let flags = include_dirs_to_flags(genrule.generated_header_dirs());
  out.paths.flags.push(flags.clone());
  if tag.reexport {
    out.paths.reexported_flags.push(flags.clone());
    out
      .paths
      .reexported_flags_deps
      .extend(genrule.generated_source_files().iter().cloned());
    out.reexported_include_flags.push(flags);
  }
}

/// The type name a VNDK link error reports for a vendor module.
fn vndk_type_name(cc: &CcModule) -> &'static str {
  if !cc.is_vndk() {
    "native:vendor"
  } else if !cc.is_vndk_sp() {
    "native:vendor:vndk"
  } else {
    "native:vendor:vndksp"
  }
}

fn vndk_check_link_type(from: &CcModule, to_name: &str, to: &CcModule, errors: &mut Vec<EmitError>) {
  if to.kind != CcKind::Library || !to.is_shared_library() {
    return;
  }
  if !to.use_vndk {
    errors.push(module_error(format!(
      "({}) should not link to {to_name:?} which is not a vendor-available library",
      vndk_type_name(from)
    )));
    return;
  }
  if (from.is_vndk() && !to.is_vndk()) || (from.is_vndk_sp() && !to.is_vndk_sp()) {
    errors.push(module_error(format!(
      "({}) should not link to {to_name:?}({})",
      vndk_type_name(from),
      vndk_type_name(to)
    )));
  }
}

/// Checks that `from` may link `to`: vendor variants against the VNDK, SDK
/// variants against NDK libraries of an API level no newer than theirs.
pub fn check_link_type(from: &Consumer<'_>, to_name: &str, to: &CcModule) -> Vec<EmitError> {
  let mut errors = Vec::new();
  if from.os != OsType::Android {
    return errors;
  }
  if from.cc.use_vndk {
    vndk_check_link_type(from.cc, to_name, to, &mut errors);
    return errors;
  }
  let from_sdk = from.cc.sdk_version.as_str();
  if from_sdk.is_empty() || to.kind == CcKind::ToolchainLibrary || to.kind.is_stub() {
    return errors;
  }
  let to_sdk = to.sdk_version.as_str();
  if to_sdk.is_empty() {
    errors.push(module_error(format!("depends on non-NDK-built library {to_name:?}")));
  }
  if from_sdk == "current" {
    return errors;
  }
  if to_sdk == "current" {
    errors.push(module_error(format!(
      "links {to_name:?} built against newer API version {:?}",
      "current"
    )));
  }
  let parse = |version: &str, errors: &mut Vec<EmitError>| match version.parse::<i64>() {
    Ok(v) => Some(v),
    Err(_) => {
      errors.push(property_error(
        "sdk_version",
        format!("Invalid sdk_version value (must be int): {version:?}"),
      ));
      None
    }
  };
  let from_api = parse(from_sdk, &mut errors);
  let to_api = parse(to_sdk, &mut errors);
  if let (Some(from_api), Some(to_api)) = (from_api, to_api)
    && to_api > from_api
  {
    errors.push(module_error(format!(
      "links {to_name:?} built against newer API version {to_sdk:?}"
    )));
  }
  errors
}

fn legacy_shared_lib_name(from: &Consumer<'_>, name: &str, to: &CcModule, shared: &SharedTables) -> String {
  let name = name.strip_suffix(LLNDK_LIBRARY_SUFFIX).unwrap_or(name);
  let name = name.strip_prefix(PREBUILT_PREFIX).unwrap_or(name);
  if from.cc.use_vndk && (to.vendor_available() == Some(true) || shared.is_llndk(name)) {
    format!("{name}{VENDOR_SUFFIX}")
  } else {
    name.to_string()
  }
}

/// Gathers the paths, flags and checks of every direct dependency.
pub fn deps_to_paths(from: &Consumer<'_>, deps: &[(DependencyTag, &Module)], shared: &SharedTables) -> Resolved {
  let mut out = Resolved::default();
  for (tag, dep) in deps {
    let name = dep.name.as_str();
    if matches!(
      tag.kind,
      DepKind::Defaults | DepKind::SourceFiles | DepKind::PrebuiltTwin
    ) {
      continue;
    }
    let Some(cc) = dep.cc() else {
      match tag.kind {
        DepKind::GeneratedSource | DepKind::GeneratedHeader => {
          generated(&mut out, *tag, name, dep.logic.genrule());
        }
        _ => out
          .errors
          .push(module_error(format!("depends on non-cc module {name:?}"))),
      }
      continue;
    };

    if !dep.enabled {
      if from.allow_missing {
        out.missing.push(name.to_string());
      } else {
        out
          .errors
          .push(module_error(format!("depends on disabled module {name:?}")));
      }
      continue;
    }
    let Some(target) = dep.target.as_ref() else {
      out
        .errors
        .push(module_error(format!("OS mismatch between {:?} and {name:?}", from.name)));
      continue;
    };
    if target.os != from.os {
      out
        .errors
        .push(module_error(format!("OS mismatch between {:?} and {name:?}", from.name)));
      continue;
    }
    if target.arch.arch_type != from.arch {
      out
        .errors
        .push(module_error(format!("Arch mismatch between {:?} and {name:?}", from.name)));
      continue;
    }

    if tag.kind == DepKind::ReuseObjects && cc.is_library() {
      out.paths.objs.append(&cc.out.reuse_objs);
      out.paths.reexported_flags.extend(cc.out.reuse_flags.iter().cloned());
      out
        .paths
        .reexported_flags_deps
        .extend(cc.out.reuse_flags_deps.iter().cloned());
      continue;
    }

    if tag.kind.is_library() {
      let flags = &cc.out.exported_flags;
      let flags_deps = &cc.out.exported_flags_deps;
      out.paths.flags.extend(flags.iter().cloned());
      out.paths.generated_headers.extend(flags_deps.iter().cloned());
      if tag.reexport {
        out.paths.reexported_flags.extend(flags.iter().cloned());
        out.paths.reexported_flags_deps.extend(flags_deps.iter().cloned());
        if matches!(tag.kind, DepKind::Static | DepKind::Header) {
          out.reexported_include_flags.extend(flags.iter().cloned());
        }
      }
      out.errors.extend(check_link_type(from, name, cc));
    }

    let link_file = dep.output_file.clone();
    let toc = || cc.out.toc.clone().or_else(|| link_file.clone());
    let missing_output = |out: &mut Resolved| {
      out
        .errors
        .push(module_error(format!("module {name:?} missing output file")));
    };

    let is_static_lib_dep = matches!(tag.kind, DepKind::Static | DepKind::LateStatic | DepKind::WholeStatic);
    if is_static_lib_dep && !cc.is_static_library() {
      out
        .errors
        .push(module_error(format!("module {name:?} not a static library")));
      continue;
    }

    match tag.kind {
      DepKind::Shared | DepKind::NdkStub | DepKind::LateShared | DepKind::NdkLateStub => {
        let Some(file) = link_file.clone() else {
          missing_output(&mut out);
          continue;
        };
        let dep_file = toc().unwrap_or_else(|| file.clone());
        if matches!(tag.kind, DepKind::Shared | DepKind::NdkStub) {
          out.paths.shared_libs.push(file);
          out.paths.shared_libs_deps.push(dep_file);
        } else {
          out.paths.late_shared_libs.push(file);
          out.paths.late_shared_libs_deps.push(dep_file);
        }
      }
      DepKind::Static | DepKind::LateStatic | DepKind::WholeStatic => {
        let Some(file) = link_file.clone() else {
          missing_output(&mut out);
          continue;
        };
        match tag.kind {
          DepKind::Static => out.paths.static_libs.push(file),
          DepKind::LateStatic => out.paths.late_static_libs.push(file),
          _ => {
            out.paths.whole_static_libs.push(file);
            let postfix = format!(" (required by {name})");
            out.missing.extend(
              cc.out
                .whole_static_missing_deps
                .iter()
                .map(|missing| format!("{missing}{postfix}")),
            );
            out.paths.whole_static_lib_objs.append(&cc.out.objs);
          }
        }
        if tag.kind != DepKind::WholeStatic {
          out
            .paths
            .static_lib_objs
            .coverage_files
            .extend(cc.out.objs.coverage_files.iter().cloned());
          out
            .paths
            .static_lib_objs
            .sabi_dump_files
            .extend(cc.out.objs.sabi_dump_files.iter().cloned());
        }
        out.dep_coverage.push((tag.kind, cc.coverage.link_coverage));
      }
      DepKind::Object | DepKind::CrtBegin | DepKind::CrtEnd => {
        let Some(file) = link_file.clone() else {
          missing_output(&mut out);
          continue;
        };
        match tag.kind {
          DepKind::Object => out.paths.objs.obj_files.push(file),
          DepKind::CrtBegin => out.paths.crt_begin = Some(file),
          _ => out.paths.crt_end = Some(file),
        }
      }
      _ => {}
    }

    if matches!(tag.kind, DepKind::Shared | DepKind::LateShared) {
      out
        .legacy_shared_libs
        .push(legacy_shared_lib_name(from, name, cc, shared));
    }
  }
  out.paths.flags = first_unique(&out.paths.flags);
  out
}
