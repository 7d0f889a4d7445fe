//! Sanitizer and coverage variants: which modules split, what reaches their
//! dependencies, and the flags each variant is built with.

use knit_lib::BuildResult;
use knit_lib::cc::sanitize::{SanitizeState, Sanitizer};
use knit_lib::config::ProductVariables;
use knit_lib::module::{Axis, Module};
use knit_lib::ninja::Rule;

use super::common::{config, device_variables, edges, module, run_ok, variants};

fn sanitize(m: &Module) -> &SanitizeState {
  &m.cc().unwrap().sanitize
}

/// Joined `cFlags` of every compile edge of `m`.
fn compile_flags(m: &Module) -> String {
  edges(m, Rule::Cc)
    .iter()
    .map(|e| e.args["cFlags"].as_str())
    .collect::<Vec<_>>()
    .join(" ")
}

/// The variant `from` links for `dep`.
fn linked<'a>(result: &'a BuildResult, from: &Module, dep: &str) -> &'a Module {
  from
    .deps
    .iter()
    .map(|d| result.table.get(d.to).unwrap())
    .find(|m| m.name == dep)
    .unwrap_or_else(|| panic!("{} {} does not depend on {dep}", from.name, from.variant()))
}

fn global_device(list: &[&str]) -> ProductVariables {
  ProductVariables {
    sanitize_device: Some(list.iter().map(|s| s.to_string()).collect()),
    ..device_variables()
  }
}

mod address {
  use super::*;

  const SANITIZED_TOOL: &str = r#"
cc_library_static {
  name = "libdeep",
  srcs = { "deep.c" },
}

cc_library_static {
  name = "libutil",
  srcs = { "util.c" },
  static_libs = { "libdeep" },
}

cc_library {
  name = "libshared",
  srcs = { "shared.c" },
}

cc_binary {
  name = "tool",
  srcs = { "main.c" },
  static_libs = { "libutil" },
  shared_libs = { "libshared" },
  sanitize = { address = true },
}
"#;

  #[test]
  fn sanitized_executables_are_built_only_sanitized() {
    let result = run_ok(config(device_variables()), SANITIZED_TOOL);
    let tools = result.variants("tool");
    assert!(!tools.is_empty());
    for tool in tools {
      assert_eq!(tool.variations.get(Axis::Sanitize), "asan", "{}", tool.variant());
      assert!(sanitize(tool).in_sanitizer_dir);
    }

    let tool = module(&result, "tool", "android_arm64_asan");
    assert!(compile_flags(tool).contains("-fsanitize=address"));
    let link = edges(tool, Rule::Ld);
    assert!(link[0].args["ldFlags"].contains("-Wl,-u,__asan_preinit"));
    assert!(link[0].args["libFlags"].contains("libclang_rt.asan-aarch64-android"));
  }

  #[test]
  fn dependencies_get_a_sanitized_twin() {
    let result = run_ok(config(device_variables()), SANITIZED_TOOL);
    for name in ["libutil", "libdeep"] {
      let tags = variants(&result, name);
      assert!(tags.contains(&"android_arm64_static".to_string()), "{name}: {tags:?}");
      assert!(tags.contains(&"android_arm64_static_asan".to_string()), "{name}: {tags:?}");
    }

    let plain = module(&result, "libutil", "android_arm64_static");
    let asan = module(&result, "libutil", "android_arm64_static_asan");
    assert!(!sanitize(plain).is_enabled(Sanitizer::Address));
    assert!(!compile_flags(plain).contains("-fsanitize=address"));
    assert!(compile_flags(asan).contains("-fsanitize=address"));
    assert!(asan.prevent_install);
    assert!(asan.hidden_from_legacy);
    assert!(!plain.hidden_from_legacy);
  }

  #[test]
  fn sanitized_variants_link_sanitized_libraries() {
    let result = run_ok(config(device_variables()), SANITIZED_TOOL);
    let tool = module(&result, "tool", "android_arm64_asan");
    assert_eq!(linked(&result, tool, "libutil").variant(), "android_arm64_static_asan");
    assert_eq!(linked(&result, tool, "libshared").variant(), "android_arm64_shared_asan");

    let util = linked(&result, tool, "libutil");
    assert_eq!(linked(&result, util, "libdeep").variant(), "android_arm64_static_asan");
  }

  #[test]
  fn never_sanitized_libraries_keep_one_variant() {
    let result = run_ok(config(device_variables()), SANITIZED_TOOL);
    let tool = module(&result, "tool", "android_arm64_asan");
    let libdl = linked(&result, tool, "libdl");
    assert_eq!(libdl.variations.get(Axis::Sanitize), "");
    assert!(variants(&result, "libdl").iter().all(|tag| !tag.ends_with("_asan")));
  }

  #[test]
  fn objects_are_not_split_by_a_global_sanitizer() {
    let source = r#"
cc_library { name = "libon", srcs = { "on.c" } }
cc_binary { name = "tool", srcs = { "main.c" }, shared_libs = { "libon" } }
"#;
    let result = run_ok(config(global_device(&["address"])), source);
    for name in ["crtbegin_so", "crtend_so", "crtbegin_dynamic", "crtend_android"] {
      let tags = variants(&result, name);
      assert!(tags.iter().all(|tag| !tag.ends_with("_asan")), "{name}: {tags:?}");
    }
    let tool = module(&result, "tool", "android_arm64_asan");
    assert_eq!(linked(&result, tool, "libon").variant(), "android_arm64_shared_asan");
  }
}

mod global_coverage {
  use super::*;

  const LIBRARIES: &str = r#"
cc_library {
  name = "libon",
  srcs = { "on.c" },
}

cc_library {
  name = "liboff",
  srcs = { "off.c" },
  sanitize = { address = false },
}
"#;

  const TRACE: &str = "-fsanitize-coverage=trace-pc-guard";

  #[test]
  fn only_address_sanitized_variants_trace_coverage() {
    let result = run_ok(config(global_device(&["address", "coverage"])), LIBRARIES);
    let on = result.variants("libon");
    assert!(on.iter().any(|m| m.variations.get(Axis::Sanitize) == "asan"));
    for m in on {
      let state = sanitize(m);
      if m.variations.get(Axis::Sanitize) == "asan" {
        assert_eq!(state.props.coverage, Some(true), "{}", m.variant());
      } else {
        assert_eq!(state.props.coverage, None, "{}", m.variant());
        assert_ne!(state.props.address, Some(true), "{}", m.variant());
      }
    }

    let plain = module(&result, "libon", "android_arm64_static");
    assert!(!compile_flags(plain).contains(TRACE), "{}", compile_flags(plain));
    assert!(!compile_flags(plain).contains("-fsanitize=address"));
    let asan = module(&result, "libon", "android_arm64_static_asan");
    assert!(compile_flags(asan).contains(TRACE));
  }

  #[test]
  fn opting_out_of_address_drops_global_coverage() {
    let result = run_ok(config(global_device(&["address", "coverage"])), LIBRARIES);
    for m in result.variants("liboff") {
      assert_eq!(m.variations.get(Axis::Sanitize), "", "{}", m.variant());
      assert_eq!(sanitize(m).props.coverage, None, "{}", m.variant());
      assert!(!compile_flags(m).contains(TRACE), "{}", m.variant());
    }
  }
}

mod native_coverage {
  use super::*;

  fn coverage_variables() -> ProductVariables {
    ProductVariables {
      native_coverage: Some(true),
      coverage_paths: Some(vec!["*".to_string()]),
      coverage_exclude_paths: Some(vec!["bionic".to_string()]),
      ..device_variables()
    }
  }

  const COVERED: &str = r#"
cc_library_static {
  name = "libcov",
  srcs = { "cov.c" },
}

cc_library_static {
  name = "libplain",
  srcs = { "plain.c" },
  native_coverage = false,
}

cc_binary {
  name = "tool",
  srcs = { "main.c" },
  static_libs = { "libcov" },
  native_coverage = false,
}
"#;

  #[test]
  fn instrumented_modules_have_one_cov_variant() {
    let result = run_ok(config(coverage_variables()), COVERED);
    let covered = result.variants("libcov");
    assert!(!covered.is_empty());
    for m in covered {
      assert_eq!(m.variations.get(Axis::Coverage), "cov", "{}", m.variant());
    }
    let lib = module(&result, "libcov", "android_arm64_static_cov");
    assert!(compile_flags(lib).contains("--coverage"));
    assert!(edges(lib, Rule::Cc)[0].implicit_outputs.iter().any(|o| o.ends_with(".gcno")));

    for m in result.variants("libplain") {
      assert_eq!(m.variations.get(Axis::Coverage), "", "{}", m.variant());
      assert!(!compile_flags(m).contains("--coverage"));
    }
  }

  #[test]
  fn static_dependencies_bring_the_coverage_runtime() {
    let result = run_ok(config(coverage_variables()), COVERED);
    let tool = module(&result, "tool", "android_arm64");
    assert!(!compile_flags(tool).contains("--coverage"));
    assert_eq!(linked(&result, tool, "libcov").variant(), "android_arm64_static_cov");
    let link = edges(tool, Rule::Ld);
    assert!(link[0].args["ldFlags"].contains("--coverage"), "{}", link[0].args["ldFlags"]);
  }

  #[test]
  fn disabled_globally_nothing_is_instrumented() {
    let result = run_ok(config(device_variables()), COVERED);
    assert!(variants(&result, "libcov").iter().all(|tag| !tag.ends_with("_cov")));
    let tool = module(&result, "tool", "android_arm64");
    assert!(!edges(tool, Rule::Ld)[0].args["ldFlags"].contains("--coverage"));
  }
}
