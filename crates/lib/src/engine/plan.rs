//! The outcome of a run: per-variant edges in a stable order, the
//! recorded environment and the module summary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::consts::{ENV_FILE, NINJA_FILE};
use crate::env::EnvSnapshot;
use crate::legacy;
use crate::module::{Module, ModuleTable};
use crate::ninja::{BuildEdge, EdgeBlock, WriteError, render};
use crate::util::fs::write_if_changed;
use crate::util::hash::{HashError, Hashable, PlanHash};

/// The edges of one final variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleEdges {
  pub name: String,
  pub variant: String,
  pub edges: Vec<BuildEdge>,
}

/// One final variant, as listed by `variants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSummary {
  pub name: String,
  pub variant: String,
  pub module_type: String,
  pub enabled: bool,
  pub primary: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output_file: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub install_files: Vec<String>,
}

impl ModuleSummary {
  fn new(module: &Module) -> Self {
    Self {
      name: module.name.clone(),
      variant: module.variant(),
      module_type: module.module_type.clone(),
      enabled: module.enabled,
      primary: module.primary,
      output_file: module.output_file.clone(),
      install_files: module.install_files.clone(),
    }
  }
}

#[derive(Serialize)]
struct PlanContent<'a> {
  blocks: &'a [ModuleEdges],
  env: &'a EnvSnapshot,
}

impl Hashable for PlanContent<'_> {}

/// Everything handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
  /// Per-variant edges sorted by `(name, variant)`.
  pub blocks: Vec<ModuleEdges>,
  pub env: EnvSnapshot,
  pub modules: Vec<ModuleSummary>,
  pub hash: String,
}

/// Replaces the edges of a variant with unresolved dependencies by edges
/// that fail when built.
fn defer_missing(module: &Module) -> Vec<BuildEdge> {
  if module.missing_deps.is_empty() {
    return module.edges.clone();
  }
  let message = format!(
    "module {} missing dependencies: {}",
    module.name,
    module.missing_deps.join(", ")
  );
  module.edges.iter().cloned().map(|e| e.into_error(&message)).collect()
}

impl BuildPlan {
  fn new<'a>(modules: impl IntoIterator<Item = &'a Module>, env: EnvSnapshot) -> Self {
    let mut blocks = Vec::new();
    let mut summary = Vec::new();
    for module in modules {
      summary.push(ModuleSummary::new(module));
      if !module.enabled {
        continue;
      }
      blocks.push(ModuleEdges {
        name: module.name.clone(),
        variant: module.variant(),
        edges: defer_missing(module),
      });
    }
    let hash = match (PlanContent {
      blocks: &blocks,
      env: &env,
    })
    .compute_hash()
    {
      Ok(PlanHash(hash)) => hash,
      Err(err) => {
        debug!(error = %err, "plan not hashable");
        String::new()
      }
    };
    Self {
      blocks,
      env,
      modules: summary,
      hash,
    }
  }

  pub fn edge_count(&self) -> usize {
    self.blocks.iter().map(|b| b.edges.len()).sum()
  }

  /// The Ninja file for this plan.
  pub fn ninja(&self) -> String {
    let blocks: Vec<EdgeBlock<'_>> = self
      .blocks
      .iter()
      .map(|b| EdgeBlock {
        name: &b.name,
        variant: &b.variant,
        edges: &b.edges,
      })
      .collect();
    render(&blocks)
  }

  pub fn to_json(&self) -> Result<String, HashError> {
    serde_json::to_string_pretty(self)
  }
}

/// The files `BuildResult::write` produced and whether each changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
  pub ninja: (PathBuf, bool),
  pub environment: (PathBuf, bool),
  pub legacy: (PathBuf, bool),
}

/// The final module table of a run and the plan derived from it.
#[derive(Debug)]
pub struct BuildResult {
  pub plan: BuildPlan,
  pub table: ModuleTable,
  config: Arc<Config>,
}

impl BuildResult {
  pub(super) fn new(table: ModuleTable, config: Arc<Config>) -> Self {
    let plan = BuildPlan::new(table.sorted().into_iter().map(|(_, m)| m), config.env.snapshot());
    Self { plan, table, config }
  }

  /// Final variants in `(name, variant)` order.
  pub fn modules(&self) -> Vec<&Module> {
    self.table.sorted().into_iter().map(|(_, m)| m).collect()
  }

  pub fn module(&self, name: &str, variant: &str) -> Option<&Module> {
    self.table.find(name, variant).and_then(|r| self.table.get(r))
  }

  /// Variants of `name`, in creation order.
  pub fn variants(&self, name: &str) -> Vec<&Module> {
    self.table.group(name).iter().filter_map(|r| self.table.get(*r)).collect()
  }

  pub fn legacy_table(&self) -> String {
    legacy::render(self.modules())
  }

  /// Name of the legacy make table for the configured product.
  pub fn legacy_file_name(&self) -> String {
    format!("Android-{}.mk", self.config.product())
  }

  /// Writes the Ninja file, the recorded environment and the legacy table
  /// into `out_dir`. Unchanged files are left untouched.
  pub fn write(&self, out_dir: &Path) -> Result<OutputFiles, WriteError> {
    let ninja_path = out_dir.join(NINJA_FILE);
    let ninja = write_if_changed(&ninja_path, &self.plan.ninja())?;
    let env_path = out_dir.join(ENV_FILE);
    let environment = write_if_changed(&env_path, &self.plan.env.to_json())?;
    let legacy_path = out_dir.join(self.legacy_file_name());
    let legacy = legacy::write(&legacy_path, &self.legacy_table())?;
    info!(
      out_dir = %out_dir.display(),
      ninja,
      environment,
      legacy,
      "outputs written"
    );
    Ok(OutputFiles {
      ninja: (ninja_path, ninja),
      environment: (env_path, environment),
      legacy: (legacy_path, legacy),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::arch::{ArchType, OsType};
  use crate::cc::{CcKind, CcModule, testing};
  use crate::env::EnvEntry;
  use crate::ninja::Rule;

  fn binary(name: &str) -> Module {
    let cc = CcModule::new(CcKind::Binary);
    let mut module = testing::module(name, "system/core", OsType::Android, ArchType::Arm64, cc);
    module.edges.push(
      BuildEdge::new(Rule::Ld)
        .output(format!("out/{name}"))
        .input(format!("out/{name}.o"))
        .description(format!("link {name}")),
    );
    module
  }

  fn env() -> EnvSnapshot {
    EnvSnapshot {
      vars: vec![EnvEntry {
        key: "WITH_TIDY".to_string(),
        value: String::new(),
      }],
    }
  }

  mod plans {
    use super::*;

    #[test]
    fn missing_dependencies_become_error_edges() {
      let mut module = binary("app");
      module.missing_deps = vec!["libmissing".to_string()];
      let plan = BuildPlan::new([&module], env());

      let edge = &plan.blocks[0].edges[0];
      assert_eq!(edge.rule, Rule::Error);
      assert_eq!(edge.outputs, vec!["out/app"]);
      assert_eq!(edge.args["error"], "module app missing dependencies: libmissing");
    }

    #[test]
    fn disabled_variants_are_summarised_but_emit_nothing() {
      let mut module = binary("app");
      module.enabled = false;
      let plan = BuildPlan::new([&module], env());
      assert!(plan.blocks.is_empty());
      assert_eq!(plan.modules.len(), 1);
      assert!(!plan.modules[0].enabled);
    }

    #[test]
    fn hash_follows_content() {
      let a = BuildPlan::new([&binary("a")], env());
      let again = BuildPlan::new([&binary("a")], env());
      let b = BuildPlan::new([&binary("b")], env());
      assert_eq!(a.hash.len(), crate::consts::PLAN_HASH_PREFIX_LEN);
      assert_eq!(a.hash, again.hash);
      assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn ninja_groups_edges_per_variant() {
      let plan = BuildPlan::new([&binary("a"), &binary("b")], env());
      let ninja = plan.ninja();
      let a = ninja.find("# module: a variant: ").unwrap();
      let b = ninja.find("# module: b variant: ").unwrap();
      assert!(a < b);
      assert!(ninja.contains("build out/a: ld out/a.o\n"));
    }
  }
}
