//! Emitted build edges: ABI dumps, Darwin archive batching, and stable
//! output across runs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use knit_lib::arch::OsType;
use knit_lib::config::{Config, ProductVariables};
use knit_lib::consts::DARWIN_AR_ARG_LIMIT;
use knit_lib::env::EnvRegistry;
use knit_lib::ninja::Rule;
use knit_lib::paths::MockFs;
use tempfile::TempDir;

use super::common::{config, device_variables, edges, module, run_ok, vndk_variables};

mod abi_dumps {
  use super::*;

  const VNDK_LIB: &str = r#"
cc_library {
  name = "libvndk",
  srcs = { "a.c", "b.c" },
  vendor_available = true,
  vndk = { enabled = true },
}
"#;

  const REFERENCE: &str = "prebuilts/abi-dumps/vndk/current/arm64/source-based/libvndk.lsdump.gz";

  fn with_reference() -> Config {
    let base = config(vndk_variables());
    let reference = base.paths.src_dir().join(REFERENCE);
    base.with_fs(Arc::new(MockFs::new([reference])))
  }

  #[test]
  fn every_source_is_dumped_and_linked() {
    let result = run_ok(config(vndk_variables()), VNDK_LIB);
    let statik = module(&result, "libvndk", "android_arm64_static");
    let dumps = edges(statik, Rule::SAbiDump);
    assert_eq!(dumps.len(), 2);

    let shared = module(&result, "libvndk", "android_arm64_shared");
    let links = edges(shared, Rule::SAbiLink);
    assert_eq!(links.len(), 1);
    assert!(links[0].outputs[0].ends_with("/libvndk.lsdump"), "{:?}", links[0].outputs);
    let dumped: Vec<String> = dumps.iter().flat_map(|e| e.outputs.clone()).collect();
    assert_eq!(links[0].inputs, dumped);
  }

  #[test]
  fn reference_dumps_are_diffed() {
    let result = run_ok(with_reference(), VNDK_LIB);
    let shared = module(&result, "libvndk", "android_arm64_shared");
    assert_eq!(edges(shared, Rule::UnzipRefSAbiDump).len(), 1);
    let diffs = edges(shared, Rule::SAbiDiff);
    assert_eq!(diffs.len(), 1);
    assert!(diffs[0].outputs[0].ends_with("/libvndk.abidiff"));

    let secondary = module(&result, "libvndk", "android_arm_shared");
    assert!(edges(secondary, Rule::SAbiDiff).is_empty());
    assert_eq!(edges(secondary, Rule::SAbiLink).len(), 1);
  }

  #[test]
  fn without_a_reference_there_is_nothing_to_diff() {
    let result = run_ok(config(vndk_variables()), VNDK_LIB);
    let shared = module(&result, "libvndk", "android_arm64_shared");
    assert!(edges(shared, Rule::SAbiDiff).is_empty());
  }

  #[test]
  fn plain_libraries_are_not_dumped() {
    let source = r#"cc_library { name = "libplain", srcs = { "a.c" } }"#;
    let result = run_ok(config(vndk_variables()), source);
    for m in result.variants("libplain") {
      assert!(edges(m, Rule::SAbiDump).is_empty(), "{}", m.variant());
      assert!(edges(m, Rule::SAbiLink).is_empty(), "{}", m.variant());
    }
  }
}

mod darwin {
  use super::*;

  fn darwin_config() -> Config {
    let vars = ProductVariables {
      host_arch: Some("x86_64".to_string()),
      host_secondary_arch: None,
      ..ProductVariables::defaults()
    };
    Config::new(
      vars,
      OsType::Darwin,
      Arc::new(EnvRegistry::from_map(BTreeMap::new())),
      PathBuf::from("."),
    )
    .unwrap()
  }

  const MANY_SOURCES: &str = r#"
local srcs = {}
for i = 1, 1500 do
  srcs[#srcs + 1] = "generated/" .. string.rep("x", 100) .. i .. ".c"
end

cc_library_host_static {
  name = "libbig",
  srcs = srcs,
}
"#;

  #[test]
  fn long_archives_are_split_into_batches() {
    let result = run_ok(darwin_config(), MANY_SOURCES);
    let lib = module(&result, "libbig", "darwin_x86_64_static");
    let objects: Vec<String> = edges(lib, Rule::Cc).iter().flat_map(|e| e.outputs.clone()).collect();
    assert_eq!(objects.len(), 1500);

    let batches: Vec<_> = lib
      .edges
      .iter()
      .filter(|e| matches!(e.rule, Rule::DarwinAr | Rule::DarwinAppendAr))
      .collect();
    assert!(batches.len() >= 2, "{} batches", batches.len());
    assert_eq!(batches[0].rule, Rule::DarwinAr);
    assert!(batches[1..].iter().all(|e| e.rule == Rule::DarwinAppendAr));

    for batch in &batches {
      assert!(batch.inputs.join(" ").len() <= DARWIN_AR_ARG_LIMIT);
    }
    let archived: Vec<String> = batches.iter().flat_map(|e| e.inputs.clone()).collect();
    assert_eq!(archived, objects);

    let last = batches.last().unwrap();
    assert_eq!(Some(&last.outputs[0]), lib.output_file.as_ref());
    for pair in batches.windows(2) {
      assert_eq!(pair[1].args["inAr"], pair[0].outputs[0]);
    }
  }

  #[test]
  fn short_archives_use_one_batch() {
    let source = r#"cc_library_host_static { name = "libsmall", srcs = { "a.c", "b.c" } }"#;
    let result = run_ok(darwin_config(), source);
    let lib = module(&result, "libsmall", "darwin_x86_64_static");
    assert_eq!(edges(lib, Rule::DarwinAr).len(), 1);
    assert!(edges(lib, Rule::DarwinAppendAr).is_empty());
    assert!(edges(lib, Rule::Ar).is_empty());
  }
}

mod determinism {
  use super::*;

  const TREE: &str = r#"
cc_library {
  name = "libfoo",
  srcs = { "a.c", "b.cpp" },
  host_supported = true,
  shared_libs = { "libbar" },
}

cc_library {
  name = "libbar",
  srcs = { "bar.c" },
  host_supported = true,
  export_include_dirs = { "include" },
}

cc_binary {
  name = "tool",
  srcs = { "main.c" },
  host_supported = true,
  shared_libs = { "libfoo" },
}
"#;

  #[test]
  fn repeated_runs_emit_identical_graphs() {
    let first = run_ok(config(device_variables()), TREE);
    let second = run_ok(config(device_variables()), TREE);
    assert_eq!(first.plan.ninja(), second.plan.ninja());
    assert_eq!(first.plan.hash, second.plan.hash);
    assert_eq!(first.legacy_table(), second.legacy_table());
  }

  #[test]
  fn rewriting_identical_outputs_is_a_no_op() {
    let out = TempDir::new().unwrap();
    let first = run_ok(config(device_variables()), TREE).write(out.path()).unwrap();
    assert!(first.ninja.1);
    assert!(first.legacy.1);

    let second = run_ok(config(device_variables()), TREE).write(out.path()).unwrap();
    assert!(!second.ninja.1);
    assert!(!second.environment.1);
    assert!(!second.legacy.1);
  }

  #[test]
  fn different_definitions_change_the_hash() {
    let first = run_ok(config(device_variables()), TREE);
    let edited = TREE.replace("\"bar.c\"", "\"bar.c\", \"extra.c\"");
    let second = run_ok(config(device_variables()), &edited);
    assert_ne!(first.plan.hash, second.plan.hash);
  }
}
