//! Tables shared between modules.
//!
//! Mutators never write these directly. They send [`SharedRecord`]s over a
//! channel; the scheduler folds the records after each mutator and later
//! visits read the resulting snapshot.

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedRecord {
  Llndk(String),
  VndkCore(String),
  VndkSp(String),
  VndkPrivate(String),
  NdkMigrated(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedTables {
  pub llndk_libraries: BTreeSet<String>,
  pub vndk_core_libraries: BTreeSet<String>,
  pub vndk_sp_libraries: BTreeSet<String>,
  pub vndk_private_libraries: BTreeSet<String>,
  pub ndk_migrated_libraries: BTreeSet<String>,
}

impl SharedTables {
  pub fn record(&mut self, record: SharedRecord) {
    match record {
      SharedRecord::Llndk(name) => self.llndk_libraries.insert(name),
      SharedRecord::VndkCore(name) => self.vndk_core_libraries.insert(name),
      SharedRecord::VndkSp(name) => self.vndk_sp_libraries.insert(name),
      SharedRecord::VndkPrivate(name) => self.vndk_private_libraries.insert(name),
      SharedRecord::NdkMigrated(name) => self.ndk_migrated_libraries.insert(name),
    };
  }

  pub fn is_llndk(&self, name: &str) -> bool {
    self.llndk_libraries.contains(name)
  }

  pub fn is_vndk(&self, name: &str) -> bool {
    self.vndk_core_libraries.contains(name) || self.vndk_sp_libraries.contains(name)
  }

  pub fn is_vndk_sp(&self, name: &str) -> bool {
    self.vndk_sp_libraries.contains(name)
  }

  pub fn is_ndk_migrated(&self, name: &str) -> bool {
    self.ndk_migrated_libraries.contains(name)
  }
}
