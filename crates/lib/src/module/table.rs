//! The module table.
//!
//! Modules live in an arena indexed by [`ModuleRef`]. A split removes the
//! original entry for good and appends its variants, so a reference never
//! changes meaning. Each base name keeps its variants in creation order.

use std::collections::BTreeMap;

use super::types::{Module, ModuleRef};

#[derive(Debug, Default)]
pub struct ModuleTable {
  slots: Vec<Option<Module>>,
  groups: BTreeMap<String, Vec<ModuleRef>>,
}

impl ModuleTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends a module; returns `None` when its `(name, variant)` already exists.
  pub fn add(&mut self, module: Module) -> Option<ModuleRef> {
    if self.find(&module.name, &module.variant()).is_some() {
      return None;
    }
    let r = ModuleRef(self.slots.len());
    self.groups.entry(module.name.clone()).or_default().push(r);
    self.slots.push(Some(module));
    Some(r)
  }

  pub fn get(&self, r: ModuleRef) -> Option<&Module> {
    self.slots.get(r.0).and_then(Option::as_ref)
  }

  pub fn get_mut(&mut self, r: ModuleRef) -> Option<&mut Module> {
    self.slots.get_mut(r.0).and_then(Option::as_mut)
  }

  /// Temporarily removes a module so it can be mutated alongside shared
  /// reads of the rest of the table.
  pub fn take(&mut self, r: ModuleRef) -> Option<Module> {
    self.slots.get_mut(r.0).and_then(Option::take)
  }

  pub fn put(&mut self, r: ModuleRef, module: Module) {
    if let Some(slot) = self.slots.get_mut(r.0) {
      *slot = Some(module);
    }
  }

  /// Replaces `r` by `variants`, which take its place in its group.
  pub fn replace(&mut self, r: ModuleRef, variants: Vec<Module>) -> Vec<ModuleRef> {
    let Some(name) = self.get(r).map(|m| m.name.clone()) else {
      return Vec::new();
    };
    self.slots[r.0] = None;

    let mut refs = Vec::with_capacity(variants.len());
    for module in variants {
      refs.push(ModuleRef(self.slots.len()));
      self.slots.push(Some(module));
    }
    if let Some(group) = self.groups.get_mut(&name)
      && let Some(pos) = group.iter().position(|g| *g == r)
    {
      group.splice(pos..=pos, refs.iter().copied());
    }
    refs
  }

  /// Moves every variant of `from` to the name `to`. Fails when `to` is taken.
  pub fn rename(&mut self, from: &str, to: &str) -> bool {
    if self.contains_name(to) {
      return false;
    }
    let Some(group) = self.groups.remove(from) else {
      return false;
    };
    for r in &group {
      if let Some(m) = self.get_mut(*r) {
        m.name = to.to_string();
      }
    }
    self.groups.insert(to.to_string(), group);
    true
  }

  /// Variants of `name`, in creation order.
  pub fn group(&self, name: &str) -> &[ModuleRef] {
    self.groups.get(name).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn contains_name(&self, name: &str) -> bool {
    self.groups.get(name).is_some_and(|g| !g.is_empty())
  }

  pub fn find(&self, name: &str, variant: &str) -> Option<ModuleRef> {
    self
      .group(name)
      .iter()
      .copied()
      .find(|r| self.get(*r).is_some_and(|m| m.variant() == variant))
  }

  /// Every live module, grouped by name in name order.
  pub fn iter(&self) -> impl Iterator<Item = (ModuleRef, &Module)> {
    self
      .groups
      .values()
      .flatten()
      .filter_map(|r| self.get(*r).map(|m| (*r, m)))
  }

  pub fn refs(&self) -> Vec<ModuleRef> {
    self.iter().map(|(r, _)| r).collect()
  }

  /// Live modules sorted by `(name, variant)`.
  pub fn sorted(&self) -> Vec<(ModuleRef, &Module)> {
    let mut modules: Vec<(ModuleRef, &Module)> = self.iter().collect();
    modules.sort_by_cached_key(|(_, m)| (m.name.clone(), m.variant()));
    modules
  }

  pub fn len(&self) -> usize {
    self.iter().count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn names(&self) -> impl Iterator<Item = &String> {
    self.groups.keys()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::arch::HostOrDeviceSupported;
  use crate::module::{Axis, ModuleDefinition, ModuleLogic, SourceLocation};
  use crate::props::Properties;

  fn module(name: &str) -> Module {
    let def = ModuleDefinition {
      module_type: "cc_defaults".to_string(),
      properties: Properties::new(),
      location: SourceLocation::new("Blueprints.lua", 1),
      dir: String::new(),
    };
    Module::new(&def, name, HostOrDeviceSupported::NeitherHostNorDevice, "", ModuleLogic::Defaults)
  }

  fn variant(name: &str, arch: &str) -> Module {
    let mut m = module(name);
    m.variations.set(Axis::Arch, arch);
    m
  }

  #[test]
  fn duplicate_identity_is_rejected() {
    let mut table = ModuleTable::new();
    assert!(table.add(module("a")).is_some());
    assert!(table.add(module("a")).is_none());
  }

  #[test]
  fn replace_keeps_group_order() {
    let mut table = ModuleTable::new();
    let a = table.add(module("a")).unwrap();
    let refs = table.replace(a, vec![variant("a", "x86_64"), variant("a", "x86")]);
    assert_eq!(table.group("a"), refs.as_slice());
    assert!(table.get(a).is_none());
    assert_eq!(table.find("a", "x86").map(|r| table.get(r).unwrap().variant()), Some("x86".to_string()));
    assert_eq!(table.len(), 2);
  }

  #[test]
  fn sorted_orders_by_name_then_variant() {
    let mut table = ModuleTable::new();
    table.add(variant("b", "x86"));
    table.add(variant("a", "x86_64"));
    table.add(variant("a", "x86"));
    let order: Vec<String> = table
      .sorted()
      .into_iter()
      .map(|(_, m)| format!("{}:{}", m.name, m.variant()))
      .collect();
    assert_eq!(order, vec!["a:x86", "a:x86_64", "b:x86"]);
  }

  #[test]
  fn rename_moves_group() {
    let mut table = ModuleTable::new();
    let a = table.add(module("prebuilt_a")).unwrap();
    assert!(table.rename("prebuilt_a", "a"));
    assert_eq!(table.get(a).unwrap().name, "a");
    assert!(!table.contains_name("prebuilt_a"));
    table.add(module("b"));
    assert!(!table.rename("a", "b"));
  }

  #[test]
  fn take_and_put() {
    let mut table = ModuleTable::new();
    let a = table.add(module("a")).unwrap();
    let m = table.take(a).unwrap();
    assert!(table.get(a).is_none());
    table.put(a, m);
    assert!(table.get(a).is_some());
  }
}
