//! Property composition: arch, multilib and OS blocks, defaults and
//! product variables.

use std::path::Path;

use knit_lib::{BuildResult, Context};
use knit_lib::arch::{Arch, ArchType, OsType, Target};
use knit_lib::config::ProductVariables;
use knit_lib::lua;
use knit_lib::ninja::Rule;
use knit_lib::props::{Properties, compose_arch, compose_product_variables, get_list};

use super::common::{config, device_variables, module, run, run_ok};

const LAYERED: &str = r#"
cc_library {
  name = "libfoo",
  srcs = { "a.c" },
  cflags = { "-A" },
  arch = { arm = { cflags = { "-B" } } },
  target = { android = { cflags = { "-C" } } },
  multilib = { lib32 = { cflags = { "-D" } } },
}
"#;

fn cflags(result: &BuildResult, variant: &str) -> Vec<String> {
  get_list(&module(result, "libfoo", variant).props, "cflags").to_vec()
}

mod arch_blocks {
  use super::*;

  #[test]
  fn arch_then_multilib_then_target() {
    let result = run_ok(config(device_variables()), LAYERED);
    assert_eq!(cflags(&result, "android_arm_static"), ["-A", "-B", "-D", "-C"]);
    assert_eq!(cflags(&result, "android_arm64_static"), ["-A", "-C"]);
  }

  #[test]
  fn composed_flags_reach_the_compiler_in_order() {
    let result = run_ok(config(device_variables()), LAYERED);
    let lib = module(&result, "libfoo", "android_arm_static");
    let compile = lib.edges.iter().find(|e| e.rule == Rule::Cc).unwrap();
    let flags: Vec<&str> = compile.args["cFlags"].split_whitespace().collect();
    let at = |flag: &str| flags.iter().position(|f| *f == flag).unwrap();
    assert!(at("-A") < at("-B"));
    assert!(at("-B") < at("-D"));
    assert!(at("-D") < at("-C"));
  }

  #[test]
  fn composition_is_idempotent() {
    let ctx = Context::new(config(device_variables()));
    let defs = lua::load_str(Path::new("."), "Blueprints.lua", LAYERED, ctx.types()).unwrap();
    let schema = ctx.types().schema("cc_library").unwrap();
    let target = Target::new(OsType::Android, Arch::new(ArchType::Arm));

    let mut once: Properties = defs[0].properties.clone();
    compose_arch(&mut once, &schema, &target, false).unwrap();
    let mut twice = once.clone();
    compose_arch(&mut twice, &schema, &target, false).unwrap();
    assert_eq!(once, twice);

    compose_product_variables(&mut twice, &schema, &ProductVariables::defaults().active_blocks()).unwrap();
    assert_eq!(once, twice);
  }

  #[test]
  fn variant_only_properties_are_rejected_in_blocks() {
    let source = r#"
cc_library {
  name = "libfoo",
  srcs = { "a.c" },
  arch = { arm = { vendor_available = true } },
}
"#;
    let err = run(config(device_variables()), source).unwrap_err();
    assert!(err.to_string().contains("arch.arm.vendor_available"), "{err}");
  }
}

mod defaults {
  use super::*;

  #[test]
  fn defaults_come_before_module_values() {
    let source = r#"
cc_defaults {
  name = "base_defaults",
  cflags = { "-DBASE" },
}

cc_defaults {
  name = "warn_defaults",
  defaults = { "base_defaults" },
  cflags = { "-Wall" },
  arch = { arm = { cflags = { "-DARM" } } },
}

cc_library {
  name = "libfoo",
  defaults = { "warn_defaults" },
  srcs = { "a.c" },
  cflags = { "-A" },
}
"#;
    let result = run_ok(config(device_variables()), source);
    assert_eq!(cflags(&result, "android_arm_static"), ["-DBASE", "-Wall", "-A", "-DARM"]);
    assert_eq!(cflags(&result, "android_arm64_static"), ["-DBASE", "-Wall", "-A"]);
  }

  #[test]
  fn defaults_must_name_defaults_modules() {
    let source = r#"
cc_library { name = "libbase", srcs = { "a.c" } }
cc_library { name = "libfoo", defaults = { "libbase" }, srcs = { "a.c" } }
"#;
    let err = run(config(device_variables()), source).unwrap_err();
    assert!(err.to_string().contains("is not a defaults module"), "{err}");
  }
}

mod product_variables {
  use super::*;

  #[test]
  fn active_variables_extend_properties() {
    let source = r#"
cc_library {
  name = "libfoo",
  srcs = { "a.c" },
  product_variables = {
    debuggable = { cflags = { "-DDEBUGGABLE" } },
    eng = { cflags = { "-DENG" } },
    platform_sdk_version = { cflags = { "-DSDK=%d" } },
  },
}
"#;
    let vars = ProductVariables {
      debuggable: Some(true),
      platform_sdk_version: Some(27),
      ..device_variables()
    };
    let result = run_ok(config(vars), source);
    assert_eq!(cflags(&result, "android_arm64_static"), ["-DSDK=27", "-DDEBUGGABLE"]);
  }
}
