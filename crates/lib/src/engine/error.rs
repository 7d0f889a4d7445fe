//! Engine errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::module::{ModuleError, SourceLocation};
use crate::props::ExtendPropertyError;

/// An error that stops the pipeline immediately.
#[derive(Debug, Error)]
pub enum FatalError {
  #[error("{location}: unrecognized module type {module_type:?}")]
  UnknownModuleType {
    module_type: String,
    location: SourceLocation,
  },

  #[error("{location}: module {name:?} variant {variant:?} already defined")]
  DuplicateModule {
    name: String,
    variant: String,
    location: SourceLocation,
  },

  #[error("dependency cycle among modules: {}", modules.join(", "))]
  DependencyCycle { modules: Vec<String> },

  #[error("{location}: module {name:?}: {error}")]
  MalformedProperty {
    name: String,
    location: SourceLocation,
    error: ExtendPropertyError,
  },

  #[error("{location}: module {name:?}: {message}")]
  ImpossibleVariant {
    name: String,
    location: SourceLocation,
    message: String,
  },

  #[error(transparent)]
  Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum EngineError {
  #[error(transparent)]
  Fatal(#[from] FatalError),

  #[error("{} error(s) in phase {phase}:\n{}", errors.len(), render(errors))]
  Module { phase: String, errors: Vec<ModuleError> },
}

fn render(errors: &[ModuleError]) -> String {
  errors.iter().map(|e| format!("  {e}")).collect::<Vec<_>>().join("\n")
}

impl EngineError {
  /// Module errors, if this is a phase-boundary failure.
  pub fn module_errors(&self) -> &[ModuleError] {
    match self {
      EngineError::Module { errors, .. } => errors,
      EngineError::Fatal(_) => &[],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn module_errors_render_one_per_line() {
    let err = EngineError::Module {
      phase: "begin".to_string(),
      errors: vec![ModuleError {
        name: "libfoo".to_string(),
        variant: "linux_glibc_x86_64_shared".to_string(),
        location: SourceLocation::new("Blueprints.lua", 3),
        property: None,
        message: "boom".to_string(),
      }],
    };
    assert_eq!(
      err.to_string(),
      "1 error(s) in phase begin:\n  Blueprints.lua:3: module \"libfoo\" variant \"linux_glibc_x86_64_shared\": boom"
    );
  }

  #[test]
  fn cycle_lists_modules() {
    let err = FatalError::DependencyCycle {
      modules: vec!["a".to_string(), "b".to_string()],
    };
    assert_eq!(err.to_string(), "dependency cycle among modules: a, b");
  }
}
