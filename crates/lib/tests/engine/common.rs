//! Shared fixtures for engine tests.

use std::path::Path;

use knit_lib::config::{Config, ProductVariables};
use knit_lib::module::Module;
use knit_lib::ninja::{BuildEdge, Rule};
use knit_lib::{BuildResult, Context, EngineError, lua};

/// The bionic runtime every device link pulls in: system libraries with
/// their NDK and LLNDK stubs, CRT objects and toolchain archives. Everything
/// is vendor-available so VNDK builds resolve too.
pub const BIONIC: &str = r#"
for _, name in ipairs({ "libc", "libm", "libdl" }) do
  cc_library {
    name = name,
    srcs = { name .. ".c" },
    nocrt = true,
    system_shared_libs = {},
    sanitize = { never = true },
  }
  ndk_library {
    name = name,
    symbol_file = name .. ".map.txt",
    first_version = "9",
  }
  llndk_library {
    name = name,
    symbol_file = name .. ".map.txt",
  }
end

for _, name in ipairs({ "crtbegin_so", "crtend_so", "crtbegin_dynamic", "crtbegin_static", "crtend_android" }) do
  cc_object {
    name = name,
    srcs = { name .. ".c" },
    vendor_available = true,
  }
end

for _, name in ipairs({ "libgcc", "libatomic", "libcompiler_rt-extras" }) do
  toolchain_library {
    name = name,
    vendor_available = true,
  }
end
"#;

/// x86_64/x86 host with an arm64/arm device, no arch variants.
pub fn device_variables() -> ProductVariables {
  ProductVariables {
    host_arch: Some("x86_64".to_string()),
    host_secondary_arch: Some("x86".to_string()),
    device_arch: Some("arm64".to_string()),
    device_secondary_arch: Some("arm".to_string()),
    ..ProductVariables::defaults()
  }
}

/// [`device_variables`] with vendor images enabled.
pub fn vndk_variables() -> ProductVariables {
  ProductVariables {
    device_vndk_version: Some("current".to_string()),
    ..device_variables()
  }
}

pub fn config(variables: ProductVariables) -> Config {
  Config::for_testing(variables).unwrap()
}

/// A context holding the bionic fixture plus `source` as the top-level file.
pub fn context(config: Config, source: &str) -> Context {
  let mut ctx = Context::new(config);
  let bionic = lua::load_str(Path::new("."), "bionic/Blueprints.lua", BIONIC, ctx.types()).unwrap();
  let defs = lua::load_str(Path::new("."), "Blueprints.lua", source, ctx.types()).unwrap();
  ctx.add_definitions(bionic);
  ctx.add_definitions(defs);
  ctx
}

pub fn run(config: Config, source: &str) -> Result<BuildResult, EngineError> {
  context(config, source).run()
}

pub fn run_ok(config: Config, source: &str) -> BuildResult {
  match run(config, source) {
    Ok(result) => result,
    Err(err) => panic!("build configuration failed: {err}"),
  }
}

/// Variant tags of `name`, sorted.
pub fn variants(result: &BuildResult, name: &str) -> Vec<String> {
  let mut tags: Vec<String> = result.variants(name).iter().map(|m| m.variant()).collect();
  tags.sort();
  tags
}

pub fn module<'a>(result: &'a BuildResult, name: &str, variant: &str) -> &'a Module {
  result
    .module(name, variant)
    .unwrap_or_else(|| panic!("no variant {variant:?} of {name:?}; have {:?}", variants(result, name)))
}

pub fn edges(module: &Module, rule: Rule) -> Vec<&BuildEdge> {
  module.edges.iter().filter(|e| e.rule == rule).collect()
}
