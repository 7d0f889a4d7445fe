//! Flag sets and resolved dependency paths carried through a C/C++ emit.

/// Compile and link flags assembled for one variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flags {
  /// Flags for every source type, including assembly.
  pub global_flags: Vec<String>,
  pub ar_flags: Vec<String>,
  pub as_flags: Vec<String>,
  /// Flags for C and C++ sources.
  pub c_flags: Vec<String>,
  pub conly_flags: Vec<String>,
  pub cpp_flags: Vec<String>,
  pub yacc_flags: Vec<String>,
  pub aidl_flags: Vec<String>,
  pub proto_flags: Vec<String>,
  pub rs_flags: Vec<String>,
  pub ld_flags: Vec<String>,
  /// Flags placed before the libraries on the link line.
  pub lib_flags: Vec<String>,
  pub tidy_flags: Vec<String>,
  pub sabi_flags: Vec<String>,
  pub yasm_flags: Vec<String>,
  pub system_include_flags: Vec<String>,
  pub cflags_deps: Vec<String>,

  pub clang: bool,
  pub tidy: bool,
  pub coverage: bool,
  pub sabi_dump: bool,
  pub group_static_libs: bool,

  pub required_instruction_set: String,
  pub dynamic_linker: String,
}

impl Flags {
  pub fn new(clang: bool) -> Self {
    Self {
      clang,
      ..Self::default()
    }
  }
}

/// Compiled objects and their side outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Objects {
  pub obj_files: Vec<String>,
  pub tidy_files: Vec<String>,
  pub coverage_files: Vec<String>,
  pub sabi_dump_files: Vec<String>,
}

impl Objects {
  pub fn append(&mut self, other: &Objects) {
    self.obj_files.extend(other.obj_files.iter().cloned());
    self.tidy_files.extend(other.tidy_files.iter().cloned());
    self.coverage_files.extend(other.coverage_files.iter().cloned());
    self.sabi_dump_files.extend(other.sabi_dump_files.iter().cloned());
  }

  pub fn is_empty(&self) -> bool {
    self.obj_files.is_empty()
  }
}

/// Dependency names a variant requests, before resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deps {
  pub shared_libs: Vec<String>,
  pub late_shared_libs: Vec<String>,
  pub static_libs: Vec<String>,
  pub late_static_libs: Vec<String>,
  pub whole_static_libs: Vec<String>,
  pub header_libs: Vec<String>,

  pub reexport_shared_lib_headers: Vec<String>,
  pub reexport_static_lib_headers: Vec<String>,
  pub reexport_header_lib_headers: Vec<String>,
  pub reexport_generated_headers: Vec<String>,

  pub obj_files: Vec<String>,
  pub generated_sources: Vec<String>,
  pub generated_headers: Vec<String>,

  pub crt_begin: Option<String>,
  pub crt_end: Option<String>,
}

/// Paths a variant's compile and link consume, gathered from its resolved
/// dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathDeps {
  pub shared_libs: Vec<String>,
  pub shared_libs_deps: Vec<String>,
  pub late_shared_libs: Vec<String>,
  pub late_shared_libs_deps: Vec<String>,
  pub static_libs: Vec<String>,
  pub late_static_libs: Vec<String>,
  pub whole_static_libs: Vec<String>,

  pub objs: Objects,
  pub static_lib_objs: Objects,
  pub whole_static_lib_objs: Objects,

  pub generated_sources: Vec<String>,
  pub generated_headers: Vec<String>,

  /// Include flags exported by dependencies.
  pub flags: Vec<String>,
  pub reexported_flags: Vec<String>,
  pub reexported_flags_deps: Vec<String>,

  pub crt_begin: Option<String>,
  pub crt_end: Option<String>,
}

/// Joins flags the way they appear in a ninja variable.
pub fn join(flags: &[String]) -> String {
  flags.join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn objects_append_every_list() {
    let mut a = Objects {
      obj_files: vec!["a.o".into()],
      ..Objects::default()
    };
    let b = Objects {
      obj_files: vec!["b.o".into()],
      tidy_files: vec!["b.tidy".into()],
      coverage_files: vec!["b.gcno".into()],
      sabi_dump_files: vec!["b.sdump".into()],
    };
    a.append(&b);
    assert_eq!(a.obj_files, vec!["a.o", "b.o"]);
    assert_eq!(a.tidy_files, vec!["b.tidy"]);
    assert_eq!(a.coverage_files, vec!["b.gcno"]);
    assert_eq!(a.sabi_dump_files, vec!["b.sdump"]);
  }

  #[test]
  fn new_flags_only_set_clang() {
    let flags = Flags::new(true);
    assert!(flags.clang);
    assert!(flags.global_flags.is_empty());
    assert!(!flags.tidy);
  }
}
