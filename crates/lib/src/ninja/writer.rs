//! Renders build edges as a Ninja file.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::types::{BuildEdge, Rule};

#[derive(Debug, Error)]
pub enum WriteError {
  #[error("failed to write {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to serialize {what}: {source}")]
  Serialize {
    what: String,
    #[source]
    source: serde_json::Error,
  },
}

/// The edges of one module variant.
#[derive(Debug, Clone, Copy)]
pub struct EdgeBlock<'a> {
  pub name: &'a str,
  pub variant: &'a str,
  pub edges: &'a [BuildEdge],
}

/// Escapes a path for use in a build line.
pub fn escape_path(path: &str) -> String {
  let mut out = String::with_capacity(path.len());
  for c in path.chars() {
    match c {
      '$' => out.push_str("$$"),
      ' ' => out.push_str("$ "),
      ':' => out.push_str("$:"),
      '\n' => out.push_str("$\n"),
      c => out.push(c),
    }
  }
  out
}

fn paths(list: &[String]) -> String {
  list.iter().map(|p| escape_path(p)).collect::<Vec<_>>().join(" ")
}

/// Rule declarations for every rule used, in name order, then each block in
/// the given order.
struct NinjaFile<'a, 'b>(&'a [EdgeBlock<'b>]);

impl fmt::Display for NinjaFile<'_, '_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "# Generated by knit. Do not edit.")?;
    writeln!(f)?;
    writeln!(f, "ninja_required_version = 1.7.0")?;
    writeln!(f)?;

    let mut rules: Vec<Rule> = self
      .0
      .iter()
      .flat_map(|b| b.edges.iter().map(|e| e.rule))
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();
    rules.sort_by_key(|r| r.name());
    for rule in rules {
      write_rule(f, rule)?;
    }

    let mut defaults = Vec::new();
    for block in self.0 {
      if block.edges.is_empty() {
        continue;
      }
      writeln!(f, "# module: {} variant: {}", block.name, block.variant)?;
      for edge in block.edges {
        write_edge(f, edge)?;
        if !edge.optional {
          defaults.extend(edge.outputs.iter().cloned());
        }
      }
      writeln!(f)?;
    }

    if !defaults.is_empty() {
      writeln!(f, "default {}", paths(&defaults))?;
    }
    Ok(())
  }
}

/// Renders `blocks` as a complete Ninja file.
pub fn render(blocks: &[EdgeBlock<'_>]) -> String {
  NinjaFile(blocks).to_string()
}

fn write_rule(f: &mut fmt::Formatter<'_>, rule: Rule) -> fmt::Result {
  let def = rule.definition();
  writeln!(f, "rule {}", rule.name())?;
  writeln!(f, "  command = {}", def.command)?;
  if let Some(depfile) = def.depfile {
    writeln!(f, "  depfile = {depfile}")?;
  }
  if def.deps_gcc {
    writeln!(f, "  deps = gcc")?;
  }
  if let Some(rspfile) = def.rspfile {
    writeln!(f, "  rspfile = {rspfile}")?;
  }
  if let Some(content) = def.rspfile_content {
    writeln!(f, "  rspfile_content = {content}")?;
  }
  if def.restat {
    writeln!(f, "  restat = true")?;
  }
  writeln!(f, "  description = ${{description}}")?;
  writeln!(f)
}

fn write_edge(f: &mut fmt::Formatter<'_>, edge: &BuildEdge) -> fmt::Result {
  write!(f, "build {}", paths(&edge.outputs))?;
  if !edge.implicit_outputs.is_empty() {
    write!(f, " | {}", paths(&edge.implicit_outputs))?;
  }
  write!(f, ": {}", edge.rule.name())?;
  if !edge.inputs.is_empty() {
    write!(f, " {}", paths(&edge.inputs))?;
  }
  if !edge.implicits.is_empty() {
    write!(f, " | {}", paths(&edge.implicits))?;
  }
  if !edge.order_only.is_empty() {
    write!(f, " || {}", paths(&edge.order_only))?;
  }
  writeln!(f)?;

  match &edge.description {
    Some(description) => writeln!(f, "  description = {description}")?,
    None => writeln!(f, "  description = {} {}", edge.rule.name(), edge.outputs.join(" "))?,
  }
  if let Some(depfile) = &edge.depfile {
    writeln!(f, "  depfile = {}", escape_path(depfile))?;
  }
  for (key, value) in &edge.args {
    writeln!(f, "  {key} = {value}")?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn compile() -> BuildEdge {
    BuildEdge::new(Rule::Cc)
      .output("out/obj/a.o")
      .input("src/a.c")
      .implicits(["out/gen/a.h"])
      .order_only(["out/gen/stamp"])
      .arg("ccCmd", "clang")
      .arg("cFlags", "-O2")
  }

  #[test]
  fn escapes_special_characters() {
    assert_eq!(escape_path("a b:c$d"), "a$ b$:c$$d");
  }

  #[test]
  fn renders_rules_blocks_and_defaults() {
    let edges = vec![compile(), BuildEdge::new(Rule::Ar).output("out/libfoo.a").input("out/obj/a.o")];
    let text = render(&[EdgeBlock {
      name: "libfoo",
      variant: "android_arm64_static",
      edges: &edges,
    }]);
    let ar = text.find("rule ar\n").unwrap();
    let cc = text.find("rule cc\n").unwrap();
    assert!(ar < cc);
    assert!(text.contains("# module: libfoo variant: android_arm64_static\n"));
    assert!(text.contains("build out/obj/a.o: cc src/a.c | out/gen/a.h || out/gen/stamp\n"));
    assert!(text.contains("  cFlags = -O2\n  ccCmd = clang\n"));
    assert!(text.contains("  deps = gcc\n"));
    assert!(text.ends_with("default out/obj/a.o out/libfoo.a\n"));
  }

  #[test]
  fn edges_without_a_description_name_their_rule_and_outputs() {
    let edges = vec![
      BuildEdge::new(Rule::Cc)
        .output("out/obj/a b.o")
        .implicit_output("out/obj/a.gcno")
        .input("src/a.c")
        .with_depfile("out/obj/a.o.d"),
    ];
    let text = render(&[EdgeBlock {
      name: "a",
      variant: "",
      edges: &edges,
    }]);
    assert!(text.contains("build out/obj/a$ b.o | out/obj/a.gcno: cc src/a.c\n"));
    assert!(text.contains("  description = cc out/obj/a b.o\n  depfile = out/obj/a.o.d\n"));
  }

  #[test]
  fn optional_edges_are_not_default() {
    let edges = vec![compile().optional()];
    let text = render(&[EdgeBlock {
      name: "a",
      variant: "",
      edges: &edges,
    }]);
    assert!(!text.contains("default "));
  }

  #[test]
  fn rendering_is_deterministic() {
    let edges = vec![compile()];
    let blocks = [EdgeBlock {
      name: "a",
      variant: "x86",
      edges: &edges,
    }];
    assert_eq!(render(&blocks), render(&blocks));
  }
}
