//! Dependency resolution: variant selection, linkage agreement, vendor
//! isolation and SDK link checks.

use knit_lib::cc::CcKind;
use knit_lib::module::{Axis, DepKind};
use knit_lib::ninja::Rule;

use super::common::{config, device_variables, edges, module, run, run_ok, vndk_variables};

const LINKED: &str = r#"
cc_library {
  name = "libbase",
  srcs = { "base.c" },
  vendor_available = true,
}

cc_library_static {
  name = "libutil",
  srcs = { "util.c" },
  vendor_available = true,
}

cc_library {
  name = "libfoo",
  srcs = { "a.c", "b.c" },
  vendor_available = true,
  shared_libs = { "libbase" },
  static_libs = { "libutil" },
}

cc_binary {
  name = "tool",
  srcs = { "main.c" },
  shared_libs = { "libfoo" },
}
"#;

#[test]
fn shared_reuses_static_objects() {
  let result = run_ok(config(device_variables()), LINKED);
  let statik = module(&result, "libfoo", "android_arm64_static");
  let shared = module(&result, "libfoo", "android_arm64_shared");

  let reuse: Vec<_> = shared.deps.iter().filter(|d| d.tag.kind == DepKind::ReuseObjects).collect();
  assert_eq!(reuse.len(), 1);
  assert_eq!(result.table.get(reuse[0].to).unwrap().variant(), "android_arm64_static");

  assert!(edges(shared, Rule::Cc).is_empty());
  let objects: Vec<String> = edges(statik, Rule::Cc).iter().flat_map(|e| e.outputs.clone()).collect();
  assert_eq!(objects.len(), 2);
  assert_eq!(edges(shared, Rule::Ld)[0].inputs, objects);
}

#[test]
fn library_edges_agree_on_linkage() {
  for vars in [device_variables(), vndk_variables()] {
    let result = run_ok(config(vars), LINKED);
    for (_, from) in result.table.iter() {
      for dep in &from.deps {
        let Some(link) = dep.tag.kind.required_link() else {
          continue;
        };
        let to = result.table.get(dep.to).unwrap();
        assert_eq!(
          to.variations.get(Axis::Link),
          link,
          "{} {} -> {} {} ({})",
          from.name,
          from.variant(),
          to.name,
          to.variant(),
          dep.tag.kind
        );
      }
    }
  }
}

#[test]
fn dependencies_share_the_arch_variant() {
  let result = run_ok(config(device_variables()), LINKED);
  let tool = module(&result, "tool", "android_arm64");
  let libfoo = tool
    .deps
    .iter()
    .map(|d| result.table.get(d.to).unwrap())
    .find(|m| m.name == "libfoo")
    .unwrap();
  assert_eq!(libfoo.variant(), "android_arm64_shared");
}

#[test]
fn vendor_variants_only_reach_vendor_code() {
  let result = run_ok(config(vndk_variables()), LINKED);
  let mut checked = 0;
  for (_, from) in result.table.iter() {
    if from.variations.get(Axis::Image) != "vendor" {
      continue;
    }
    for dep in &from.deps {
      let to = result.table.get(dep.to).unwrap();
      let llndk = to.cc().is_some_and(|cc| cc.kind == CcKind::LlndkStub);
      assert!(
        to.variations.get(Axis::Image) == "vendor" || llndk,
        "{} {} -> {} {}",
        from.name,
        from.variant(),
        to.name,
        to.variant()
      );
      checked += 1;
    }
  }
  assert!(checked > 0);
}

#[test]
fn vendor_variants_link_llndk_stubs() {
  let result = run_ok(config(vndk_variables()), LINKED);
  let vendor = module(&result, "libfoo", "android_arm64_vendor_shared");
  let names: Vec<&str> = vendor
    .deps
    .iter()
    .map(|d| result.table.get(d.to).unwrap().name.as_str())
    .collect();
  assert!(names.contains(&"libc.llndk"), "{names:?}");
  assert!(!names.contains(&"libc"), "{names:?}");
}

#[test]
fn undefined_dependencies_are_errors() {
  let source = r#"cc_library { name = "libfoo", srcs = { "a.c" }, shared_libs = { "libnope" } }"#;
  let err = run(config(device_variables()), source).unwrap_err();
  assert!(err.to_string().contains("depends on undefined module \"libnope\""), "{err}");
}

mod sdk {
  use super::*;

  fn sdk_pair(from: &str, to: &str) -> String {
    format!(
      r#"
cc_library_static {{
  name = "libapp",
  srcs = {{ "app.c" }},
  sdk_version = "{from}",
  static_libs = {{ "libndk" }},
}}

cc_library_static {{
  name = "libndk",
  srcs = {{ "ndk.c" }},
  sdk_version = "{to}",
}}
"#
    )
  }

  #[test]
  fn newer_api_levels_are_rejected() {
    let err = run(config(device_variables()), &sdk_pair("21", "23")).unwrap_err();
    assert!(
      err.to_string().contains(r#"links "libndk" built against newer API version "23""#),
      "{err}"
    );
  }

  #[test]
  fn older_api_levels_link() {
    run_ok(config(device_variables()), &sdk_pair("23", "21"));
  }

  #[test]
  fn numbered_levels_cannot_link_current() {
    let err = run(config(device_variables()), &sdk_pair("21", "current")).unwrap_err();
    assert!(err.to_string().contains(r#"newer API version "current""#), "{err}");
  }

  /// API levels of the `libc.ndk` variants built for `arch`, sorted.
  fn stub_levels(result: &knit_lib::BuildResult, arch: &str) -> Vec<String> {
    let mut levels: Vec<String> = result
      .variants("libc.ndk")
      .iter()
      .filter(|m| m.variations.get(Axis::Arch) == arch)
      .map(|m| m.variations.get(Axis::ApiLevel).to_string())
      .collect();
    levels.sort();
    levels
  }

  fn expected_levels(first: i64) -> Vec<String> {
    let mut levels: Vec<String> = (first..=27).map(|v| v.to_string()).collect();
    levels.push("current".to_string());
    levels.sort();
    levels
  }

  #[test]
  fn stubs_cover_every_level_the_arch_supports() {
    let result = run_ok(config(device_variables()), "");
    assert_eq!(stub_levels(&result, "android_arm"), expected_levels(9));
    assert_eq!(stub_levels(&result, "android_arm64"), expected_levels(21));
  }

  #[test]
  fn sdk_libraries_link_the_stub_for_their_level() {
    let result = run_ok(config(device_variables()), &sdk_pair("23", "21"));
    let app = module(&result, "libapp", "android_arm64_static");
    let stub = app
      .deps
      .iter()
      .map(|d| result.table.get(d.to).unwrap())
      .find(|m| m.name == "libc.ndk")
      .unwrap();
    assert_eq!(stub.variations.get(Axis::ApiLevel), "23");
  }

  #[test]
  fn platform_libraries_are_not_ndk_built() {
    let source = r#"
cc_library_static { name = "libapp", srcs = { "app.c" }, sdk_version = "21", static_libs = { "libplatform" } }
cc_library_static { name = "libplatform", srcs = { "p.c" } }
"#;
    let err = run(config(device_variables()), source).unwrap_err();
    assert!(err.to_string().contains("depends on non-NDK-built library \"libplatform\""), "{err}");
    assert!(!err.module_errors().is_empty());
  }
}
