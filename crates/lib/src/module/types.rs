//! Module definitions and module-table entries.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ModuleError;
use super::tags::DependencyTag;
use super::variant::Variations;
use crate::arch::{HostOrDeviceSupported, OsType, Target};
use crate::cc::CcModule;
use crate::genrule::GenruleModule;
use crate::ninja::BuildEdge;
use crate::props::{Properties, get_bool, get_str};

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
  pub file: String,
  pub line: u32,
}

impl SourceLocation {
  pub fn new(file: &str, line: u32) -> Self {
    Self {
      file: file.to_string(),
      line,
    }
  }
}

impl fmt::Display for SourceLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.file, self.line)
  }
}

/// One parsed module declaration, before any variant splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDefinition {
  pub module_type: String,
  pub properties: Properties,
  pub location: SourceLocation,
  /// Directory of the definitions file, relative to the source root.
  pub dir: String,
}

impl ModuleDefinition {
  pub fn name(&self) -> Option<&str> {
    get_str(&self.properties, "name")
  }
}

/// Index of a module in the module table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModuleRef(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepEdge {
  pub tag: DependencyTag,
  pub to: ModuleRef,
}

/// Type-specific state carried by a module.
#[derive(Debug, Clone)]
pub enum ModuleLogic {
  Cc(Box<CcModule>),
  Genrule(Box<GenruleModule>),
  Defaults,
}

impl ModuleLogic {
  pub fn cc(&self) -> Option<&CcModule> {
    match self {
      ModuleLogic::Cc(cc) => Some(cc),
      _ => None,
    }
  }

  pub fn cc_mut(&mut self) -> Option<&mut CcModule> {
    match self {
      ModuleLogic::Cc(cc) => Some(cc),
      _ => None,
    }
  }

  pub fn genrule(&self) -> Option<&GenruleModule> {
    match self {
      ModuleLogic::Genrule(g) => Some(g),
      _ => None,
    }
  }
}

/// One `(name, variant)` entry in the module table.
#[derive(Debug, Clone)]
pub struct Module {
  pub name: String,
  pub module_type: String,
  pub dir: String,
  pub location: SourceLocation,
  pub hod: HostOrDeviceSupported,
  pub default_multilib: &'static str,
  pub variations: Variations,
  pub props: Properties,
  pub target: Option<Target>,
  pub primary: bool,
  pub enabled: bool,
  pub skip_install: bool,
  pub hidden_from_legacy: bool,
  pub prevent_install: bool,
  pub output_file: Option<String>,
  pub install_files: Vec<String>,
  pub check_build_files: Vec<String>,
  pub edges: Vec<BuildEdge>,
  pub deps: Vec<DepEdge>,
  pub missing_deps: Vec<String>,
  pub logic: ModuleLogic,
}

impl Module {
  pub fn new(
    def: &ModuleDefinition,
    name: &str,
    hod: HostOrDeviceSupported,
    default_multilib: &'static str,
    logic: ModuleLogic,
  ) -> Self {
    Self {
      name: name.to_string(),
      module_type: def.module_type.clone(),
      dir: def.dir.clone(),
      location: def.location.clone(),
      hod,
      default_multilib,
      variations: Variations::new(),
      props: def.properties.clone(),
      target: None,
      primary: false,
      enabled: true,
      skip_install: false,
      hidden_from_legacy: false,
      prevent_install: false,
      output_file: None,
      install_files: Vec::new(),
      check_build_files: Vec::new(),
      edges: Vec::new(),
      deps: Vec::new(),
      missing_deps: Vec::new(),
      logic,
    }
  }

  pub fn variant(&self) -> String {
    self.variations.tag()
  }

  pub fn os(&self) -> Option<OsType> {
    self.target.as_ref().map(|t| t.os)
  }

  pub fn is_device(&self) -> bool {
    self.target.as_ref().is_some_and(Target::is_device)
  }

  pub fn is_host(&self) -> bool {
    self.target.as_ref().is_some_and(Target::is_host)
  }

  pub fn cc(&self) -> Option<&CcModule> {
    self.logic.cc()
  }

  pub fn cc_mut(&mut self) -> Option<&mut CcModule> {
    self.logic.cc_mut()
  }

  /// Reads `enabled` from the composed properties, defaulting by OS.
  pub fn enabled_property(&self) -> bool {
    let default = self.os().is_none_or(|os| !os.default_disabled());
    get_bool(&self.props, "enabled").unwrap_or(default)
  }

  pub fn error(&self, property: Option<&str>, message: impl Into<String>) -> ModuleError {
    ModuleError {
      name: self.name.clone(),
      variant: self.variant(),
      location: self.location.clone(),
      property: property.map(str::to_string),
      message: message.into(),
    }
  }
}
