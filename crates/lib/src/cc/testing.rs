//! Fixtures for emitting single variants in unit tests.

use super::CcModule;
use crate::arch::{Arch, ArchType, HostOrDeviceSupported, OsType, Target};
use crate::config::{Config, ProductVariables};
use crate::module::{Module, ModuleDefinition, ModuleLogic, SourceLocation};
use crate::mutator::SharedTables;
use crate::props::Properties;

pub fn config() -> Config {
  Config::for_testing(ProductVariables::defaults()).unwrap()
}

pub fn module(name: &str, dir: &str, os: OsType, arch: ArchType, cc: CcModule) -> Module {
  let def = ModuleDefinition {
    module_type: "cc_library".to_string(),
    properties: Properties::new(),
    location: SourceLocation::new(&format!("{dir}/Blueprints.lua"), 1),
    dir: dir.to_string(),
  };
  let mut module = Module::new(
    &def,
    name,
    HostOrDeviceSupported::HostAndDeviceSupported,
    "both",
    ModuleLogic::Cc(Box::new(cc)),
  );
  module.target = Some(Target::new(os, Arch::new(arch)));
  module
}

pub fn shared() -> SharedTables {
  SharedTables::default()
}
