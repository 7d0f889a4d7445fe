//! Implementation of the `knit targets` command.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use knit_lib::arch::Target;

use crate::output::{print_info, print_json};

#[derive(Serialize)]
struct TargetRow<'a> {
  class: &'static str,
  os: &'static str,
  arch: &'static str,
  arch_variant: &'a str,
  cpu_variant: &'a str,
  abi: &'a [String],
  primary: bool,
}

impl<'a> TargetRow<'a> {
  fn new(target: &'a Target, primary: bool) -> Self {
    Self {
      class: target.class().as_str(),
      os: target.os.name(),
      arch: target.arch.arch_type.name(),
      arch_variant: &target.arch.arch_variant,
      cpu_variant: &target.arch.cpu_variant,
      abi: &target.arch.abi,
      primary,
    }
  }
}

pub fn cmd_targets(variables: &Path, json: bool) -> Result<()> {
  let src_dir = std::env::current_dir().context("Failed to read current directory")?;
  let config = super::load_config(variables, src_dir)?;

  let rows: Vec<TargetRow<'_>> = config
    .targets
    .values()
    .flat_map(|targets| targets.iter().enumerate().map(|(i, t)| TargetRow::new(t, i == 0)))
    .collect();
  if json {
    return print_json(&rows);
  }
  if rows.is_empty() {
    print_info("No targets configured.");
    return Ok(());
  }

  let mut class = "";
  for row in &rows {
    if row.class != class {
      class = row.class;
      println!("{class}:");
    }
    let detail: Vec<&str> = [row.arch_variant, row.cpu_variant]
      .into_iter()
      .filter(|s| !s.is_empty())
      .collect();
    let mut line = format!("  {} {}", row.os, row.arch);
    if !detail.is_empty() {
      line.push_str(&format!(" ({})", detail.join(", ")));
    }
    if row.primary {
      line.push_str(" [primary]");
    }
    println!("{line}");
  }
  Ok(())
}
