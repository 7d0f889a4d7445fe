//! Implementation of the `knit variants` command.

use std::path::Path;

use anyhow::{Context, Result};

use crate::output::{print_info, print_json};

pub fn cmd_variants(defs: &Path, variables: &Path, json: bool) -> Result<()> {
  let ctx = super::load_context(defs, variables, false)?;
  let result = ctx.run().context("Build configuration failed")?;

  if json {
    return print_json(&result.plan.modules);
  }
  if result.plan.modules.is_empty() {
    print_info("No modules defined.");
    return Ok(());
  }
  for module in &result.plan.modules {
    let mut flags = Vec::new();
    if module.primary {
      flags.push("primary");
    }
    if !module.enabled {
      flags.push("disabled");
    }
    if flags.is_empty() {
      println!("{} {}", module.name, module.variant);
    } else {
      println!("{} {} [{}]", module.name, module.variant, flags.join(", "));
    }
  }
  Ok(())
}
