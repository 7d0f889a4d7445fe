//! Native code coverage.

use super::{CcModule, Flags};
use crate::arch::Target;
use crate::config::Config;
use crate::module::{Axis, DepKind};
use crate::mutator::{Mutator, Phase};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageState {
  /// Compiled with coverage instrumentation.
  pub enabled: bool,
  /// Linked with the coverage runtime, because of its own objects or those
  /// of a static dependency.
  pub link_coverage: bool,
}

/// Decides whether a variant is instrumented.
pub fn begin(cc: &mut CcModule, config: &Config, target: &Target, dir: &str) {
  cc.coverage.enabled = if !config.native_coverage || target.is_host() {
    false
  } else if let Some(explicit) = cc.props.native_coverage {
    explicit
  } else {
    config.coverage_enabled_for_path(dir)
  };
}

/// Whether the variant links the coverage runtime. `dep_coverage` lists the
/// dependency kind and coverage state of each resolved library dependency.
pub fn link_coverage(cc: &CcModule, dep_coverage: &[(DepKind, bool)]) -> bool {
  if cc.coverage.enabled {
    return true;
  }
  let whole_only = cc.is_static_library();
  dep_coverage.iter().any(|(kind, covered)| {
    *covered
      && if whole_only {
        *kind == DepKind::WholeStatic
      } else {
        matches!(kind, DepKind::Static | DepKind::LateStatic | DepKind::WholeStatic)
      }
  })
}

/// Adds the coverage flags.
pub fn flags(cc: &CcModule, flags: &mut Flags) {
  if cc.coverage.enabled {
    flags.coverage = true;
    flags.global_flags.push("--coverage".to_string());
    flags.global_flags.push("-O0".to_string());
  }
  if cc.coverage.link_coverage {
    flags.ld_flags.push("--coverage".to_string());
  }
}

/// Gives instrumented modules a `cov` variant of their own.
pub fn coverage_mutator() -> Mutator {
  Mutator::new("coverage", Phase::CoverageSplit, |ctx| {
    if ctx.module().cc().is_some_and(|cc| cc.coverage.enabled) {
      ctx.create_local_variations(Axis::Coverage, &["cov"]);
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cc::{CcKind, Linkage};

  #[test]
  fn instrumented_variants_compile_with_coverage() {
    let mut cc = CcModule::new(CcKind::Binary);
    cc.coverage.enabled = true;
    cc.coverage.link_coverage = link_coverage(&cc, &[]);
    let mut flags = Flags::new(true);
    super::flags(&cc, &mut flags);
    assert!(flags.coverage);
    assert_eq!(flags.global_flags, vec!["--coverage", "-O0"]);
    assert_eq!(flags.ld_flags, vec!["--coverage"]);
  }

  #[test]
  fn static_libraries_only_inherit_from_whole_archives() {
    let mut lib = CcModule::library(true, false);
    if let Some(state) = lib.library.as_mut() {
      state.linkage = Some(Linkage::Static);
    }
    assert!(!link_coverage(&lib, &[(DepKind::Static, true)]));
    assert!(link_coverage(&lib, &[(DepKind::WholeStatic, true)]));
  }

  #[test]
  fn binaries_inherit_from_static_dependencies() {
    let mut cc = CcModule::new(CcKind::Binary);
    cc.coverage.link_coverage = link_coverage(&cc, &[(DepKind::Static, true), (DepKind::Shared, false)]);
    assert!(cc.coverage.link_coverage);
    let mut flags = Flags::new(true);
    super::flags(&cc, &mut flags);
    assert!(!flags.coverage);
    assert_eq!(flags.ld_flags, vec!["--coverage"]);
  }
}
