//! Implementation of the `knit gen` command.
//!
//! Runs the pipeline over the loaded definitions and writes the Ninja file,
//! the recorded environment and the legacy make table.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::output::{format_elapsed, print_output, print_stat, print_success, print_warning, truncate_hash};

pub struct GenOptions {
  pub defs: PathBuf,
  pub variables: PathBuf,
  pub out: Option<PathBuf>,
  pub allow_missing: bool,
}

pub fn cmd_gen(opts: &GenOptions) -> Result<()> {
  let start = Instant::now();
  let ctx = super::load_context(&opts.defs, &opts.variables, opts.allow_missing)?;
  let config = ctx.config().clone();
  let result = ctx.run().context("Build configuration failed")?;

  let out_dir = match &opts.out {
    Some(dir) => dir.clone(),
    None => config.src_dir.join(&config.out_dir),
  };
  let files = result
    .write(&out_dir)
    .with_context(|| format!("Failed to write outputs to {}", out_dir.display()))?;

  let deferred = result
    .modules()
    .into_iter()
    .filter(|m| m.enabled && !m.missing_deps.is_empty())
    .count();
  if deferred > 0 {
    print_warning(&format!(
      "{deferred} variant(s) have missing dependencies and will fail when built"
    ));
  }

  print_success(&format!(
    "Generated {} variant(s), {} edge(s) in {}",
    result.plan.modules.len(),
    result.plan.edge_count(),
    format_elapsed(start.elapsed())
  ));
  print_stat("Plan", truncate_hash(&result.plan.hash));
  print_output("Ninja", &files.ninja.0, files.ninja.1);
  print_output("Environment", &files.environment.0, files.environment.1);
  print_output("Legacy", &files.legacy.0, files.legacy.1);
  Ok(())
}
