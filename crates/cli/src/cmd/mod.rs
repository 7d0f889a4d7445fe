mod env_check;
mod generate;
mod targets;
mod variants;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow};

use knit_lib::Context;
use knit_lib::arch;
use knit_lib::config::{Config, ProductVariables};
use knit_lib::env::EnvRegistry;
use knit_lib::lua;

pub use env_check::cmd_env_check;
pub use generate::{GenOptions, cmd_gen};
pub use targets::cmd_targets;
pub use variants::cmd_variants;

/// The source root holding `defs`, and the file name within it.
fn source_root(defs: &Path) -> Result<(PathBuf, String)> {
  let parent = match defs.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  };
  let root =
    dunce::canonicalize(parent).with_context(|| format!("Failed to resolve source root: {}", parent.display()))?;
  let file = defs
    .file_name()
    .and_then(|f| f.to_str())
    .ok_or_else(|| anyhow!("Invalid definitions file: {}", defs.display()))?;
  Ok((root, file.to_string()))
}

fn load_config(variables: &Path, src_dir: PathBuf) -> Result<Config> {
  let vars = ProductVariables::load(variables)
    .with_context(|| format!("Failed to load product variables: {}", variables.display()))?;
  Config::new(vars, arch::build_os(), Arc::new(EnvRegistry::from_process()), src_dir)
    .context("Failed to decode configuration")
}

/// Loads the configuration and every definition reachable from `defs`.
fn load_context(defs: &Path, variables: &Path, allow_missing: bool) -> Result<Context> {
  let (root, file) = source_root(defs)?;
  let mut config = load_config(variables, root.clone())?;
  config.allow_missing |= allow_missing;

  let mut ctx = Context::new(config);
  let definitions = lua::load_definitions(&root, &file, ctx.types())
    .map_err(|e| anyhow!("{e}"))
    .with_context(|| format!("Failed to load definitions: {}", defs.display()))?;
  ctx.add_definitions(definitions);
  Ok(ctx)
}
