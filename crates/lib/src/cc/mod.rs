//! C/C++ module types.
//!
//! A C/C++ module carries a [`CcModule`] through the pipeline. The split
//! mutators (linkage, image, API level, per-source tests, sanitizers and
//! coverage) fork it into final variants; `begin` reads each variant's
//! composed properties into [`CcProps`]; `deps` requests its dependencies;
//! `emit` assembles flags and derives the variant's build edges.

pub mod builder;
pub mod check;
pub mod compiler;
pub mod context;
pub mod coverage;
pub mod deps;
pub mod emit;
pub mod flags;
pub mod generate;
pub mod global;
pub mod image;
pub mod linkage;
pub mod linker;
pub mod ndk;
pub mod props;
pub mod resolve;
pub mod sabi;
pub mod sanitize;
#[cfg(test)]
pub(crate) mod testing;
pub mod toolchain;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arch::HostOrDeviceSupported;
use crate::consts::{LLNDK_LIBRARY_SUFFIX, NDK_LIBRARY_SUFFIX};
use crate::module::{ModuleDefinition, ModuleLogic, ModuleType, ModuleTypeRegistry};
use crate::mutator::{MutatorRegistry, Phase};
use crate::prebuilt::{self, Prebuilt};

pub use flags::{Deps, Flags, Objects, PathDeps};
pub use props::CcProps;

use coverage::CoverageState;
use sabi::SabiState;
use sanitize::SanitizeState;

/// The family a C/C++ module type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CcKind {
  Library,
  Binary,
  Test,
  Object,
  NdkStub,
  LlndkStub,
  PrebuiltShared,
  PrebuiltStatic,
  ToolchainLibrary,
}

impl CcKind {
  /// The table name of a module declared as `name`.
  pub fn module_name(&self, name: &str) -> String {
    match self {
      CcKind::NdkStub => format!("{name}{NDK_LIBRARY_SUFFIX}"),
      CcKind::LlndkStub => format!("{name}{LLNDK_LIBRARY_SUFFIX}"),
      CcKind::PrebuiltShared | CcKind::PrebuiltStatic => prebuilt::prebuilt_name(name),
      _ => name.to_string(),
    }
  }

  pub fn is_stub(&self) -> bool {
    matches!(self, CcKind::NdkStub | CcKind::LlndkStub)
  }

  pub fn is_prebuilt(&self) -> bool {
    matches!(self, CcKind::PrebuiltShared | CcKind::PrebuiltStatic)
  }

  pub fn is_binary(&self) -> bool {
    matches!(self, CcKind::Binary | CcKind::Test)
  }

  /// Sanitizers never apply to objects, stubs and toolchain libraries.
  pub fn sanitizable(&self) -> bool {
    !matches!(self, CcKind::Object | CcKind::NdkStub | CcKind::LlndkStub | CcKind::ToolchainLibrary)
  }
}

impl fmt::Display for CcKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      CcKind::Library => "library",
      CcKind::Binary => "binary",
      CcKind::Test => "test",
      CcKind::Object => "object",
      CcKind::NdkStub => "ndk_library",
      CcKind::LlndkStub => "llndk_library",
      CcKind::PrebuiltShared => "prebuilt_shared",
      CcKind::PrebuiltStatic => "prebuilt_static",
      CcKind::ToolchainLibrary => "toolchain_library",
    };
    f.write_str(name)
  }
}

/// The link form of one library variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
  Static,
  Shared,
}

impl Linkage {
  pub fn as_str(&self) -> &'static str {
    match self {
      Linkage::Static => "static",
      Linkage::Shared => "shared",
    }
  }
}

/// Which link forms a library builds, and which one this variant is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryState {
  pub build_static: bool,
  pub build_shared: bool,
  pub linkage: Option<Linkage>,
  /// The shared variant compiles nothing and links the static variant's
  /// objects.
  pub reuse_objects: bool,
}

impl LibraryState {
  fn new(build_static: bool, build_shared: bool) -> Self {
    Self {
      build_static,
      build_shared,
      ..Self::default()
    }
  }

  pub fn is_static(&self) -> bool {
    self.linkage == Some(Linkage::Static)
  }

  pub fn is_shared(&self) -> bool {
    self.linkage == Some(Linkage::Shared)
  }

  pub fn header_only(&self) -> bool {
    !self.build_static && !self.build_shared
  }
}

/// What a finished variant offers to its dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CcOutputs {
  pub exported_flags: Vec<String>,
  pub exported_flags_deps: Vec<String>,
  pub toc: Option<String>,
  /// Objects archived into a static library.
  pub objs: Objects,
  /// Objects, flags and deps a shared twin links instead of compiling.
  pub reuse_objs: Objects,
  pub reuse_flags: Vec<String>,
  pub reuse_flags_deps: Vec<String>,
  pub whole_static_missing_deps: Vec<String>,
  /// Shared libraries as the legacy emitter names them.
  pub legacy_shared_libs: Vec<String>,
  pub sanitizer_runtime: Option<String>,
  pub sabi_dump: Option<String>,
  pub sabi_diff: Option<String>,
  pub unstripped: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CcModule {
  pub kind: CcKind,
  /// The typed view of the composed properties, read by `begin`.
  pub props: CcProps,
  pub library: Option<LibraryState>,
  /// Built for the vendor image against the VNDK.
  pub use_vndk: bool,
  /// The normalized `sdk_version` of device variants.
  pub sdk_version: String,
  pub clang: bool,
  /// API level of a stub variant.
  pub api_level: Option<String>,
  pub sanitize: SanitizeState,
  pub coverage: CoverageState,
  pub sabi: SabiState,
  pub prebuilt: Option<Prebuilt>,
  pub out: CcOutputs,
}

impl CcModule {
  pub fn new(kind: CcKind) -> Self {
    let library = match kind {
      CcKind::NdkStub | CcKind::LlndkStub | CcKind::PrebuiltShared => Some(LibraryState::new(false, true)),
      CcKind::PrebuiltStatic | CcKind::ToolchainLibrary => Some(LibraryState::new(true, false)),
      CcKind::Library => Some(LibraryState::new(true, true)),
      CcKind::Binary | CcKind::Test | CcKind::Object => None,
    };
    Self {
      kind,
      props: CcProps::default(),
      library,
      use_vndk: false,
      sdk_version: String::new(),
      clang: false,
      api_level: None,
      sanitize: SanitizeState::default(),
      coverage: CoverageState::default(),
      sabi: SabiState::default(),
      prebuilt: kind.is_prebuilt().then(Prebuilt::default),
      out: CcOutputs::default(),
    }
  }

  pub fn library(build_static: bool, build_shared: bool) -> Self {
    let mut module = Self::new(CcKind::Library);
    module.library = Some(LibraryState::new(build_static, build_shared));
    module
  }

  pub fn is_library(&self) -> bool {
    self.library.is_some()
  }

  pub fn is_static_library(&self) -> bool {
    self.library.as_ref().is_some_and(LibraryState::is_static)
  }

  pub fn is_shared_library(&self) -> bool {
    self.library.as_ref().is_some_and(LibraryState::is_shared)
  }

  pub fn is_header_library(&self) -> bool {
    self.library.as_ref().is_some_and(LibraryState::header_only)
  }

  pub fn static_binary(&self) -> bool {
    self.kind.is_binary() && self.props.static_executable.unwrap_or(false)
  }

  /// Static libraries and static executables link no shared libraries.
  pub fn is_static(&self) -> bool {
    self.is_static_library() || self.static_binary()
  }

  /// Declared part of the VNDK.
  pub fn is_vndk(&self) -> bool {
    self.props.is_vndk()
  }

  pub fn is_vndk_sp(&self) -> bool {
    self.props.is_vndk() && self.props.is_vndk_sp()
  }

  /// Built against an NDK API level rather than the platform.
  pub fn sdk(&self, device: bool) -> bool {
    device && !self.use_vndk && !self.sdk_version.is_empty()
  }

  /// The API level the variant compiles against: `current` for vendor
  /// variants.
  pub fn sdk_version_for(&self, device: bool) -> &str {
    if self.use_vndk {
      "current"
    } else if device {
      &self.sdk_version
    } else {
      ""
    }
  }

  pub fn vendor_available(&self) -> Option<bool> {
    self.props.vendor_available
  }
}

struct CcType {
  name: &'static str,
  kind: CcKind,
  hod: HostOrDeviceSupported,
  multilib: &'static str,
  factory: fn(&ModuleDefinition) -> ModuleLogic,
}

fn cc(module: CcModule) -> ModuleLogic {
  ModuleLogic::Cc(Box::new(module))
}

const CC_TYPES: &[CcType] = &[
  CcType {
    name: "cc_library",
    kind: CcKind::Library,
    hod: HostOrDeviceSupported::HostAndDeviceSupported,
    multilib: "both",
    factory: |_| cc(CcModule::library(true, true)),
  },
  CcType {
    name: "cc_library_static",
    kind: CcKind::Library,
    hod: HostOrDeviceSupported::HostAndDeviceSupported,
    multilib: "both",
    factory: |_| cc(CcModule::library(true, false)),
  },
  CcType {
    name: "cc_library_shared",
    kind: CcKind::Library,
    hod: HostOrDeviceSupported::HostAndDeviceSupported,
    multilib: "both",
    factory: |_| cc(CcModule::library(false, true)),
  },
  CcType {
    name: "cc_library_headers",
    kind: CcKind::Library,
    hod: HostOrDeviceSupported::HostAndDeviceSupported,
    multilib: "both",
    factory: |_| cc(CcModule::library(false, false)),
  },
  CcType {
    name: "cc_library_host_static",
    kind: CcKind::Library,
    hod: HostOrDeviceSupported::HostSupported,
    multilib: "both",
    factory: |_| cc(CcModule::library(true, false)),
  },
  CcType {
    name: "cc_library_host_shared",
    kind: CcKind::Library,
    hod: HostOrDeviceSupported::HostSupported,
    multilib: "both",
    factory: |_| cc(CcModule::library(false, true)),
  },
  CcType {
    name: "cc_binary",
    kind: CcKind::Binary,
    hod: HostOrDeviceSupported::HostAndDeviceSupported,
    multilib: "first",
    factory: |_| cc(CcModule::new(CcKind::Binary)),
  },
  CcType {
    name: "cc_binary_host",
    kind: CcKind::Binary,
    hod: HostOrDeviceSupported::HostSupported,
    multilib: "first",
    factory: |_| cc(CcModule::new(CcKind::Binary)),
  },
  CcType {
    name: "cc_test",
    kind: CcKind::Test,
    hod: HostOrDeviceSupported::HostAndDeviceSupported,
    multilib: "both",
    factory: |_| cc(CcModule::new(CcKind::Test)),
  },
  CcType {
    name: "cc_test_host",
    kind: CcKind::Test,
    hod: HostOrDeviceSupported::HostSupported,
    multilib: "both",
    factory: |_| cc(CcModule::new(CcKind::Test)),
  },
  CcType {
    name: "cc_object",
    kind: CcKind::Object,
    hod: HostOrDeviceSupported::DeviceSupported,
    multilib: "both",
    factory: |_| cc(CcModule::new(CcKind::Object)),
  },
  CcType {
    name: "ndk_library",
    kind: CcKind::NdkStub,
    hod: HostOrDeviceSupported::DeviceSupported,
    multilib: "both",
    factory: |_| cc(CcModule::new(CcKind::NdkStub)),
  },
  CcType {
    name: "llndk_library",
    kind: CcKind::LlndkStub,
    hod: HostOrDeviceSupported::DeviceSupported,
    multilib: "both",
    factory: |_| cc(CcModule::new(CcKind::LlndkStub)),
  },
  CcType {
    name: "cc_prebuilt_library_shared",
    kind: CcKind::PrebuiltShared,
    hod: HostOrDeviceSupported::HostAndDeviceSupported,
    multilib: "both",
    factory: |_| cc(CcModule::new(CcKind::PrebuiltShared)),
  },
  CcType {
    name: "cc_prebuilt_library_static",
    kind: CcKind::PrebuiltStatic,
    hod: HostOrDeviceSupported::HostAndDeviceSupported,
    multilib: "both",
    factory: |_| cc(CcModule::new(CcKind::PrebuiltStatic)),
  },
  CcType {
    name: "toolchain_library",
    kind: CcKind::ToolchainLibrary,
    hod: HostOrDeviceSupported::DeviceSupported,
    multilib: "both",
    factory: |_| cc(CcModule::new(CcKind::ToolchainLibrary)),
  },
];

/// The C/C++ kind a registered type name builds.
pub fn kind_of(module_type: &str) -> Option<CcKind> {
  CC_TYPES.iter().find(|t| t.name == module_type).map(|t| t.kind)
}

pub fn register_types(registry: &mut ModuleTypeRegistry) {
  for t in CC_TYPES {
    registry.register(ModuleType {
      name: t.name,
      schema: props::schema_for(t.kind),
      hod: t.hod,
      default_multilib: t.multilib,
      factory: t.factory,
    });
  }
  registry.register(ModuleType {
    name: "cc_defaults",
    schema: props::defaults_schema(),
    hod: HostOrDeviceSupported::NeitherHostNorDevice,
    default_multilib: "",
    factory: |_| ModuleLogic::Defaults,
  });
}

/// Registers the C/C++ mutators in pipeline order.
pub fn register_mutators(registry: &mut MutatorRegistry) {
  registry.register(Phase::LinkageSplit, linkage::linkage_mutator());
  registry.register(Phase::ImageSplit, image::vndk_mutator());
  registry.register(Phase::ImageSplit, image::image_mutator());
  registry.register(Phase::ApiLevelSplit, ndk::ndk_api_mutator());
  registry.register(Phase::PerSource, test::test_per_src_mutator());
  registry.register(Phase::Begin, deps::begin_mutator());
  registry.register(Phase::DepResolve, deps::deps_mutator());
  registry.register(Phase::SanitizerProp, sanitize::sanitizer_deps_mutator(sanitize::Sanitizer::Address));
  registry.register(Phase::SanitizerSplit, sanitize::sanitizer_mutator(sanitize::Sanitizer::Address));
  registry.register(Phase::SanitizerProp, sanitize::sanitizer_deps_mutator(sanitize::Sanitizer::Thread));
  registry.register(Phase::SanitizerSplit, sanitize::sanitizer_mutator(sanitize::Sanitizer::Thread));
  registry.register(Phase::CoverageSplit, coverage::coverage_mutator());
  registry.register(Phase::AbiDep, sabi::sabi_deps_mutator());
  registry.register(Phase::Emit, emit::emit_mutator());
}
