use std::fmt;

use serde::Serialize;

use super::types::SourceLocation;

/// An error attached to one module variant, optionally at a property path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ModuleError {
  pub name: String,
  pub variant: String,
  pub location: SourceLocation,
  pub property: Option<String>,
  pub message: String,
}

impl fmt::Display for ModuleError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: module {:?} variant {:?}: ", self.location, self.name, self.variant)?;
    if let Some(property) = &self.property {
      write!(f, "{property}: ")?;
    }
    f.write_str(&self.message)
  }
}

impl std::error::Error for ModuleError {}
