//! Dependency tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a dependency edge is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepKind {
  Shared,
  LateShared,
  Static,
  LateStatic,
  WholeStatic,
  Header,
  NdkStub,
  NdkLateStub,
  ReuseObjects,
  Object,
  CrtBegin,
  CrtEnd,
  GeneratedSource,
  GeneratedHeader,
  PrebuiltTwin,
  Defaults,
  SourceFiles,
  Runtime,
  Tool,
}

impl DepKind {
  pub fn name(&self) -> &'static str {
    match self {
      DepKind::Shared => "shared",
      DepKind::LateShared => "late-shared",
      DepKind::Static => "static",
      DepKind::LateStatic => "late-static",
      DepKind::WholeStatic => "whole-static",
      DepKind::Header => "header",
      DepKind::NdkStub => "ndk-stub",
      DepKind::NdkLateStub => "ndk-late-stub",
      DepKind::ReuseObjects => "reuse-objects",
      DepKind::Object => "object",
      DepKind::CrtBegin => "crt-begin",
      DepKind::CrtEnd => "crt-end",
      DepKind::GeneratedSource => "generated-source",
      DepKind::GeneratedHeader => "generated-header",
      DepKind::PrebuiltTwin => "prebuilt-twin",
      DepKind::Defaults => "defaults",
      DepKind::SourceFiles => "source-files",
      DepKind::Runtime => "runtime",
      DepKind::Tool => "tool",
    }
  }

  /// Library edges export include flags and are subject to link-type checks.
  pub fn is_library(&self) -> bool {
    matches!(
      self,
      DepKind::Shared
        | DepKind::LateShared
        | DepKind::Static
        | DepKind::LateStatic
        | DepKind::WholeStatic
        | DepKind::Header
        | DepKind::NdkStub
        | DepKind::NdkLateStub
        | DepKind::Runtime
    )
  }

  /// The linkage variant an edge of this kind must resolve to.
  pub fn required_link(&self) -> Option<&'static str> {
    match self {
      DepKind::Shared | DepKind::LateShared | DepKind::NdkStub | DepKind::NdkLateStub | DepKind::Runtime => {
        Some("shared")
      }
      DepKind::Static | DepKind::LateStatic | DepKind::WholeStatic => Some("static"),
      _ => None,
    }
  }
}

impl fmt::Display for DepKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// A dependency tag: the edge kind plus whether the dependency's exported
/// header flags are re-exported to this module's dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyTag {
  pub kind: DepKind,
  pub reexport: bool,
}

impl DependencyTag {
  pub const fn new(kind: DepKind) -> Self {
    Self { kind, reexport: false }
  }

  pub const fn reexported(kind: DepKind) -> Self {
    Self { kind, reexport: true }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn required_linkage() {
    assert_eq!(DepKind::WholeStatic.required_link(), Some("static"));
    assert_eq!(DepKind::LateShared.required_link(), Some("shared"));
    assert_eq!(DepKind::Header.required_link(), None);
  }

  #[test]
  fn library_kinds() {
    assert!(DepKind::Header.is_library());
    assert!(!DepKind::GeneratedHeader.is_library());
    assert!(DependencyTag::reexported(DepKind::WholeStatic).reexport);
  }
}
