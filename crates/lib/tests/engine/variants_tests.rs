//! Variant creation across the arch, image and linkage axes.

use std::collections::BTreeSet;

use knit_lib::arch::{HostOrDeviceSupported, OsClass, decode_multilib};
use knit_lib::config::ProductVariables;
use knit_lib::legacy::legacy_name;
use knit_lib::module::Axis;
use knit_lib::ninja::Rule;

use super::common::{config, device_variables, edges, module, run_ok, variants, vndk_variables};

mod linkage {
  use super::*;

  const LIBFOO: &str = r#"
cc_library {
  name = "libfoo",
  srcs = { "a.c" },
  host_supported = true,
}
"#;

  #[test]
  fn library_splits_into_eight_variants() {
    let result = run_ok(config(device_variables()), LIBFOO);
    assert_eq!(
      variants(&result, "libfoo"),
      [
        "android_arm64_shared",
        "android_arm64_static",
        "android_arm_shared",
        "android_arm_static",
        "linux_glibc_x86_64_shared",
        "linux_glibc_x86_64_static",
        "linux_glibc_x86_shared",
        "linux_glibc_x86_static",
      ]
    );
  }

  #[test]
  fn static_variants_compile_and_archive() {
    let result = run_ok(config(device_variables()), LIBFOO);
    for arch in ["android_arm64", "android_arm", "linux_glibc_x86_64", "linux_glibc_x86"] {
      let lib = module(&result, "libfoo", &format!("{arch}_static"));
      let compiles = edges(lib, Rule::Cc);
      assert_eq!(compiles.len(), 1, "{arch}");
      assert!(compiles[0].outputs[0].ends_with("/a.o"), "{:?}", compiles[0].outputs);

      let archives = edges(lib, Rule::Ar);
      assert_eq!(archives.len(), 1, "{arch}");
      assert_eq!(archives[0].inputs, compiles[0].outputs);
      assert!(lib.output_file.as_deref().is_some_and(|f| f.ends_with("libfoo.a")));
    }
  }

  #[test]
  fn shared_variants_link_the_static_objects() {
    let result = run_ok(config(device_variables()), LIBFOO);
    for arch in ["android_arm64", "android_arm", "linux_glibc_x86_64", "linux_glibc_x86"] {
      let shared = module(&result, "libfoo", &format!("{arch}_shared"));
      let objects = &edges(module(&result, "libfoo", &format!("{arch}_static")), Rule::Cc)[0].outputs;

      assert!(edges(shared, Rule::Cc).is_empty(), "{arch} recompiled");
      let links = edges(shared, Rule::Ld);
      assert_eq!(links.len(), 1, "{arch}");
      assert_eq!(&links[0].inputs, objects);
      assert!(shared.output_file.as_deref().is_some_and(|f| f.ends_with("libfoo.so")));
    }
  }

  #[test]
  fn per_linkage_cflags_compile_twice() {
    let source = r#"
cc_library {
  name = "libfoo",
  srcs = { "a.c" },
  shared = { cflags = { "-DSHARED" } },
}
"#;
    let result = run_ok(config(device_variables()), source);
    let shared = module(&result, "libfoo", "android_arm64_shared");
    let compiles = edges(shared, Rule::Cc);
    assert_eq!(compiles.len(), 1);
    assert!(compiles[0].args["cFlags"].contains("-DSHARED"));
  }
}

mod targets {
  use super::*;

  const MIXED: &str = r#"
cc_library { name = "libboth", srcs = { "a.c" }, host_supported = true }
cc_library { name = "lib32", srcs = { "a.c" }, host_supported = true, compile_multilib = "32" }
cc_library { name = "libdevice", srcs = { "a.c" } }
cc_binary { name = "tool", srcs = { "main.c" }, host_supported = true }
cc_binary { name = "tool64", srcs = { "main.c" }, compile_multilib = "64" }
"#;

  #[test]
  fn one_variant_per_selected_target() {
    let cfg = config(device_variables());
    let expected_targets = |multilib: &str, host: bool| -> BTreeSet<String> {
      let mut classes = vec![OsClass::Device];
      if host {
        classes.push(OsClass::Host);
      }
      classes
        .into_iter()
        .flat_map(|class| decode_multilib(multilib, cfg.targets_for(class), false).unwrap())
        .map(|t| t.to_string())
        .collect()
    };
    let cases = [
      ("libboth", "both", true),
      ("lib32", "32", true),
      ("libdevice", "both", false),
      ("tool", "first", true),
      ("tool64", "64", false),
    ];
    let result = run_ok(config(device_variables()), MIXED);

    for (name, multilib, host) in cases {
      let found = result.variants(name);
      assert!(found.iter().all(|m| m.hod == HostOrDeviceSupported::HostAndDeviceSupported));
      let arches: BTreeSet<String> = found
        .iter()
        .filter(|m| m.enabled)
        .map(|m| m.variations.get(Axis::Arch).to_string())
        .collect();
      assert_eq!(arches, expected_targets(multilib, host), "{name}");
    }
  }

  #[test]
  fn binaries_have_no_linkage_axis() {
    let result = run_ok(config(device_variables()), MIXED);
    assert_eq!(variants(&result, "tool"), ["android_arm64", "linux_glibc_x86_64"]);
    assert!(module(&result, "tool", "android_arm64").primary);
  }

  #[test]
  fn first_target_of_each_class_is_primary() {
    let result = run_ok(config(device_variables()), MIXED);
    assert!(module(&result, "libboth", "android_arm64_static").primary);
    assert!(!module(&result, "libboth", "android_arm_static").primary);
    assert!(module(&result, "libboth", "linux_glibc_x86_64_static").primary);
  }

  #[test]
  fn host_only_configurations_disable_device_modules() {
    let source = "cc_object { name = \"crt\", srcs = { \"crt.c\" } }\n";
    let result = run_ok(config(ProductVariables::defaults()), source);
    let crt = result.variants("crt");
    assert_eq!(crt.len(), 1);
    assert!(!crt[0].enabled);
  }
}

mod images {
  use super::*;

  const VENDOR_AVAILABLE: &str = r#"
cc_library {
  name = "libfoo",
  vendor_available = true,
  srcs = { "a.c" },
}
"#;

  #[test]
  fn vendor_available_adds_vendor_variants() {
    let result = run_ok(config(vndk_variables()), VENDOR_AVAILABLE);
    let found = variants(&result, "libfoo");
    for tag in [
      "android_arm64_shared",
      "android_arm64_vendor_shared",
      "android_arm_vendor_shared",
      "android_arm64_vendor_static",
    ] {
      assert!(found.contains(&tag.to_string()), "{tag} missing from {found:?}");
    }
    assert_eq!(found.len(), 8);
  }

  #[test]
  fn vendor_variants_are_renamed_and_defined() {
    let result = run_ok(config(vndk_variables()), VENDOR_AVAILABLE);

    let vendor = module(&result, "libfoo", "android_arm64_vendor_shared");
    assert_eq!(legacy_name(vendor, vendor.cc().unwrap()), "libfoo.vendor");
    let core = module(&result, "libfoo", "android_arm64_shared");
    assert_eq!(legacy_name(core, core.cc().unwrap()), "libfoo");

    let vendor_flags = &edges(module(&result, "libfoo", "android_arm64_vendor_static"), Rule::Cc)[0].args["cFlags"];
    assert!(vendor_flags.contains("-D__ANDROID_VNDK__"));
    let core_flags = &edges(module(&result, "libfoo", "android_arm64_static"), Rule::Cc)[0].args["cFlags"];
    assert!(!core_flags.contains("-D__ANDROID_VNDK__"));
  }

  #[test]
  fn no_vndk_version_means_no_image_split() {
    let result = run_ok(config(device_variables()), VENDOR_AVAILABLE);
    assert!(variants(&result, "libfoo").iter().all(|v| !v.contains("vendor")));
  }
}
