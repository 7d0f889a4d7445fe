//! `genrule`: a module that runs a command template over its sources.
//!
//! The command may reference `$(in)`, `$(out)`, `$(genDir)` and
//! `$(location)`. Outputs land in the module's generated-files directory
//! and are consumed by C/C++ modules through `generated_sources` and
//! `generated_headers`.

use tracing::debug;

use crate::arch::{HostOrDeviceSupported, OsClass};
use crate::consts::INTERMEDIATES_DIR;
use crate::expand::{ExpandError, expand};
use crate::module::{Axis, DepKind, DependencyTag, ModuleLogic, ModuleType, ModuleTypeRegistry};
use crate::mutator::{Mutator, MutatorRegistry, Phase};
use crate::ninja::{BuildEdge, Rule};
use crate::paths;
use crate::props::{FieldSpec, Schema, get_list, get_str};

const TOOL: DependencyTag = DependencyTag::new(DepKind::Tool);
const SOURCE_FILES: DependencyTag = DependencyTag::new(DepKind::SourceFiles);

/// What a finished genrule offers to its dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenruleModule {
  outputs: Vec<String>,
  header_dirs: Vec<String>,
}

impl GenruleModule {
  pub fn generated_source_files(&self) -> &[String] {
    &self.outputs
  }

  pub fn generated_header_dirs(&self) -> &[String] {
    &self.header_dirs
  }
}

fn schema() -> Schema {
  Schema::new()
    .with("cmd", FieldSpec::string())
    .with("srcs", FieldSpec::list())
    .with("out", FieldSpec::list())
    .with("tools", FieldSpec::list())
    .with("tool_files", FieldSpec::list())
    .with("export_include_dirs", FieldSpec::list())
}

pub fn register_types(registry: &mut ModuleTypeRegistry) {
  registry.register(ModuleType {
    name: "genrule",
    schema: schema(),
    hod: HostOrDeviceSupported::NeitherHostNorDevice,
    default_multilib: "",
    factory: |_| ModuleLogic::Genrule(Box::default()),
  });
}

pub fn register_mutators(registry: &mut MutatorRegistry) {
  registry.register(Phase::DepResolve, genrule_deps_mutator());
  registry.register(Phase::Emit, genrule_mutator());
}

/// Module references in `srcs` are written `:name`.
fn module_reference(src: &str) -> Option<&str> {
  src.strip_prefix(':')
}

/// Requests the host variant of each tool and the producers of
/// referenced sources.
pub fn genrule_deps_mutator() -> Mutator {
  Mutator::new("genrule_deps", Phase::DepResolve, |ctx| {
    let module = ctx.module();
    if module.logic.genrule().is_none() {
      return;
    }
    let tools = get_list(&module.props, "tools").to_vec();
    let refs: Vec<String> = get_list(&module.props, "srcs")
      .iter()
      .filter_map(|s| module_reference(s))
      .map(str::to_string)
      .collect();

    if !tools.is_empty() {
      match ctx.config().targets_for(OsClass::Host).first() {
        Some(host) => {
          let host = host.to_string();
          for tool in &tools {
            ctx.add_far_variation_dependencies(&[(Axis::Arch, &host)], TOOL, tool);
          }
        }
        None => ctx.property_error("tools", "no host targets are configured"),
      }
    }
    for name in &refs {
      ctx.add_dependency(SOURCE_FILES, name);
    }
  })
}

/// The values a command template may reference.
struct Template<'a> {
  srcs: &'a [String],
  outputs: &'a [String],
  gen_dir: &'a str,
  location: Option<&'a str>,
}

impl Template<'_> {
  fn expand(&self, cmd: &str) -> Result<String, ExpandError> {
    expand(cmd, |name| match name {
      "in" => Ok(self.srcs.join(" ")),
      "out" => Ok(self.outputs.join(" ")),
      "genDir" => Ok(self.gen_dir.to_string()),
      "location" => self.location.map(str::to_string).ok_or_else(|| {
        ExpandError::Mapping("at least one `tools` or `tool_files` is required if $(location) is used".to_string())
      }),
      other => Err(ExpandError::UnknownVariable(other.to_string())),
    })
  }
}

/// Where a tool dependency runs from: its install path when installed.
fn tool_path(module: &crate::module::Module) -> Option<String> {
  module.install_files.first().cloned().or_else(|| module.output_file.clone())
}

/// Expands the command and emits the edge producing the declared outputs.
pub fn genrule_mutator() -> Mutator {
  Mutator::new("genrule", Phase::Emit, |ctx| {
    let module = ctx.module();
    if module.logic.genrule().is_none() || !module.enabled {
      return;
    }
    let dir = module.dir.clone();
    let name = module.name.clone();
    let props = module.props.clone();
    let gen_dir = paths::join(&[&ctx.config().out_dir, INTERMEDIATES_DIR, &dir, &name, "gen"]);

    let mut tools = Vec::new();
    let mut referenced = Vec::new();
    let mut errors = Vec::new();
    for (tag, _, dep) in ctx.direct_deps() {
      match tag.kind {
        DepKind::Tool => {
          if !dep.enabled {
            errors.push(format!("depends on disabled module {:?}", dep.name));
            continue;
          }
          match dep.cc().filter(|cc| cc.kind.is_binary()).and(tool_path(dep)) {
            Some(path) => tools.push(path),
            None => errors.push(format!("{:?} is not a host tool provider", dep.name)),
          }
        }
        DepKind::SourceFiles => match dep.logic.genrule() {
          Some(g) => referenced.extend(g.generated_source_files().iter().cloned()),
          None => errors.push(format!("module {:?} is not a source file producer", dep.name)),
        },
        _ => {}
      }
    }
    for message in errors {
      ctx.module_error(message);
    }

    let tool_files: Vec<String> = get_list(&props, "tool_files")
      .iter()
      .map(|f| paths::module_src(&dir, f))
      .collect();
    let mut srcs: Vec<String> = get_list(&props, "srcs")
      .iter()
      .filter(|s| module_reference(s).is_none())
      .map(|s| paths::module_src(&dir, s))
      .collect();
    srcs.extend(referenced);
    let outputs: Vec<String> = get_list(&props, "out").iter().map(|o| paths::join(&[&gen_dir, o])).collect();
    if outputs.is_empty() {
      ctx.property_error("out", "at least one output is required");
      return;
    }

    let template = Template {
      srcs: &srcs,
      outputs: &outputs,
      gen_dir: &gen_dir,
      location: tools.first().or(tool_files.first()).map(String::as_str),
    };
    let cmd = match template.expand(get_str(&props, "cmd").unwrap_or_default()) {
      Ok(cmd) => cmd,
      Err(err) => {
        ctx.property_error("cmd", err.to_string());
        return;
      }
    };

    let export_dirs = get_list(&props, "export_include_dirs");
    let header_dirs = if export_dirs.is_empty() {
      vec![gen_dir.clone()]
    } else {
      export_dirs.iter().map(|d| paths::join(&[&gen_dir, d])).collect()
    };

    debug!(module = %name, outputs = outputs.len(), "emitting genrule");
    let mut edge = BuildEdge::new(Rule::Genrule)
      .description("generate")
      .inputs(&srcs)
      .implicits(tools.iter().chain(&tool_files))
      .arg("cmd", cmd);
    for out in &outputs {
      edge = edge.output(out);
    }

    let module = ctx.module_mut();
    module.edges.push(edge);
    module.logic = ModuleLogic::Genrule(Box::new(GenruleModule { outputs, header_dirs }));
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn template<'a>(srcs: &'a [String], outputs: &'a [String], location: Option<&'a str>) -> Template<'a> {
    Template {
      srcs,
      outputs,
      gen_dir: "out/.intermediates/gen/parser/gen",
      location,
    }
  }

  mod commands {
    use super::*;

    #[test]
    fn expands_inputs_outputs_and_tool() {
      let srcs = vec!["gen/a.txt".to_string(), "gen/b.txt".to_string()];
      let outputs = vec!["out/x.h".to_string()];
      let t = template(&srcs, &outputs, Some("out/host/linux-x86/bin/gen"));
      assert_eq!(
        t.expand("$(location) -o $(out) $(in) -d $(genDir)").unwrap(),
        "out/host/linux-x86/bin/gen -o out/x.h gen/a.txt gen/b.txt -d out/.intermediates/gen/parser/gen"
      );
    }

    #[test]
    fn location_needs_a_tool() {
      let t = template(&[], &[], None);
      let err = t.expand("$(location) x").unwrap_err();
      assert_eq!(
        err.to_string(),
        "at least one `tools` or `tool_files` is required if $(location) is used"
      );
    }

    #[test]
    fn unknown_variables_are_rejected() {
      let t = template(&[], &[], None);
      assert_eq!(t.expand("$(srcDir)").unwrap_err().to_string(), "unknown variable 'srcDir'");
    }

    #[test]
    fn escaped_dollars_reach_the_shell() {
      let t = template(&[], &[], None);
      assert_eq!(t.expand("echo $$HOME").unwrap(), "echo $$HOME");
    }
  }

  mod sources {
    use super::*;

    #[test]
    fn module_references() {
      assert_eq!(module_reference(":other_gen"), Some("other_gen"));
      assert_eq!(module_reference("a.txt"), None);
    }

    #[test]
    fn fresh_genrules_offer_nothing() {
      let g = GenruleModule::default();
      assert!(g.generated_source_files().is_empty());
      assert!(g.generated_header_dirs().is_empty());
    }
  }
}
