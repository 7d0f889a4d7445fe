//! Implementation of the `knit env-check` command.
//!
//! Compares the environment recorded by the last `gen` against the live
//! one. Any difference means the build graph must be regenerated.

use std::path::Path;

use anyhow::{Context, Result, bail};

use knit_lib::consts::ENV_FILE;
use knit_lib::env::stale_process_env;

use crate::output::{print_success, print_warning};

pub fn cmd_env_check(out: &Path) -> Result<()> {
  let path = out.join(ENV_FILE);
  let stale = stale_process_env(&path).with_context(|| format!("Failed to check environment: {}", path.display()))?;
  match stale {
    None => bail!("No recorded environment at {}; run `knit gen` first", path.display()),
    Some(keys) if keys.is_empty() => {
      print_success("Environment up to date");
      Ok(())
    }
    Some(keys) => {
      for key in &keys {
        print_warning(&format!("{key} changed"));
      }
      bail!("Environment changed since the last generation: {}", keys.join(", "))
    }
  }
}
