//! Variant axes and variation vectors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One axis of the variant matrix, in tag order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
  Arch,
  Image,
  Link,
  ApiLevel,
  Sanitize,
  Coverage,
  PerSource,
}

impl Axis {
  pub fn name(&self) -> &'static str {
    match self {
      Axis::Arch => "arch",
      Axis::Image => "image",
      Axis::Link => "link",
      Axis::ApiLevel => "ndk_api",
      Axis::Sanitize => "sanitize",
      Axis::Coverage => "coverage",
      Axis::PerSource => "test_per_src",
    }
  }

  /// Local axes are not inherited by dependency requests: a dependent
  /// selects them explicitly or matches their empty value.
  pub fn is_local(&self) -> bool {
    matches!(self, Axis::Link | Axis::Coverage | Axis::PerSource)
  }
}

impl fmt::Display for Axis {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// The variation vector of a module: one value per axis it was split on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variations(BTreeMap<Axis, String>);

impl Variations {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, axis: Axis) -> &str {
    self.0.get(&axis).map(String::as_str).unwrap_or_default()
  }

  pub fn has(&self, axis: Axis) -> bool {
    self.0.contains_key(&axis)
  }

  pub fn set(&mut self, axis: Axis, value: &str) {
    self.0.insert(axis, value.to_string());
  }

  pub fn with(mut self, axis: Axis, value: &str) -> Self {
    self.set(axis, value);
    self
  }

  pub fn iter(&self) -> impl Iterator<Item = (&Axis, &String)> {
    self.0.iter()
  }

  /// The variant tag: non-empty values joined with `_` in axis order.
  pub fn tag(&self) -> String {
    self
      .0
      .values()
      .filter(|v| !v.is_empty())
      .cloned()
      .collect::<Vec<_>>()
      .join("_")
  }

  /// The variations a dependency request inherits.
  pub fn dependency_variations(&self) -> Variations {
    Variations(
      self
        .0
        .iter()
        .filter(|(axis, _)| !axis.is_local())
        .map(|(axis, value)| (*axis, value.clone()))
        .collect(),
    )
  }

  /// Whether every axis of either side has the same value, with an absent
  /// axis reading as empty.
  pub fn matches_exactly(&self, other: &Variations) -> bool {
    self.0.keys().chain(other.0.keys()).all(|axis| self.get(*axis) == other.get(*axis))
  }

  /// Whether each non-empty value of `self` appears in `wanted`.
  pub fn is_subset_of(&self, wanted: &Variations) -> bool {
    self
      .0
      .iter()
      .filter(|(_, value)| !value.is_empty())
      .all(|(axis, value)| wanted.get(*axis) == value)
  }

  /// Human-readable form used in error messages, e.g. `arch:android_arm,link:shared`.
  pub fn describe(&self) -> String {
    self
      .0
      .iter()
      .map(|(axis, value)| format!("{axis}:{value}"))
      .collect::<Vec<_>>()
      .join(",")
  }
}
