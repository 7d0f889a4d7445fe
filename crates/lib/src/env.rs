//! Environment registry.
//!
//! Every environment variable the engine consults is read through an
//! [`EnvRegistry`], which remembers the value it saw. The recorded set is
//! written next to the build graph; a later run compares it against the
//! live environment to decide whether the graph is still up to date.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EnvError {
  #[error("failed to read environment file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write environment file {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed environment file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Debug, Clone)]
enum EnvSource {
  Process,
  Fixed(BTreeMap<String, String>),
}

/// Records every environment lookup made during a run.
#[derive(Debug)]
pub struct EnvRegistry {
  source: EnvSource,
  seen: Mutex<BTreeMap<String, String>>,
}

impl Default for EnvRegistry {
  fn default() -> Self {
    Self::from_process()
  }
}

impl EnvRegistry {
  /// Reads from the process environment.
  pub fn from_process() -> Self {
    Self {
      source: EnvSource::Process,
      seen: Mutex::new(BTreeMap::new()),
    }
  }

  /// Reads from a fixed map; unset keys read as empty.
  pub fn from_map(vars: BTreeMap<String, String>) -> Self {
    Self {
      source: EnvSource::Fixed(vars),
      seen: Mutex::new(BTreeMap::new()),
    }
  }

  fn lookup(&self, key: &str) -> String {
    match &self.source {
      EnvSource::Process => std::env::var(key).unwrap_or_default(),
      EnvSource::Fixed(vars) => vars.get(key).cloned().unwrap_or_default(),
    }
  }

  /// Returns the value of `key` (empty when unset) and records the lookup.
  pub fn get(&self, key: &str) -> String {
    let value = self.lookup(key);
    let mut seen = match self.seen.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    if !seen.contains_key(key) {
      debug!(key, value = %value, "environment lookup");
      seen.insert(key.to_string(), value.clone());
    }
    value
  }

  pub fn is_true(&self, key: &str) -> bool {
    let value = self.get(key);
    value == "1" || value == "y" || value == "yes" || value == "on" || value == "true"
  }

  pub fn is_false(&self, key: &str) -> bool {
    let value = self.get(key);
    value == "0" || value == "n" || value == "no" || value == "off" || value == "false"
  }

  /// The lookups recorded so far.
  pub fn snapshot(&self) -> EnvSnapshot {
    let seen = match self.seen.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    EnvSnapshot {
      vars: seen.iter().map(|(key, value)| EnvEntry::new(key, value)).collect(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvEntry {
  pub key: String,
  pub value: String,
}

impl EnvEntry {
  fn new(key: &str, value: &str) -> Self {
    Self {
      key: key.to_string(),
      value: value.to_string(),
    }
  }
}

/// The recorded environment, sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvSnapshot {
  pub vars: Vec<EnvEntry>,
}

impl EnvSnapshot {
  pub fn to_json(&self) -> String {
    // A Vec of plain string pairs always serialises.
    serde_json::to_string_pretty(&self.vars).unwrap_or_default() + "\n"
  }

  /// Writes the snapshot to `path`.
  pub fn write(&self, path: &Path) -> Result<(), EnvError> {
    fs::write(path, self.to_json()).map_err(|source| EnvError::Write {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn read(path: &Path) -> Result<Self, EnvError> {
    let data = fs::read_to_string(path).map_err(|source| EnvError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let vars = serde_json::from_str(&data).map_err(|source| EnvError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(Self { vars })
  }

  /// Keys whose recorded value differs from what `current` returns now.
  pub fn stale_keys(&self, current: impl Fn(&str) -> String) -> Vec<String> {
    self
      .vars
      .iter()
      .filter(|entry| current(&entry.key) != entry.value)
      .map(|entry| entry.key.clone())
      .collect()
  }
}

/// Returns the keys recorded in `path` whose value changed in the process environment.
///
/// A missing file counts as stale with no specific key.
pub fn stale_process_env(path: &Path) -> Result<Option<Vec<String>>, EnvError> {
  if !path.exists() {
    return Ok(None);
  }
  let snapshot = EnvSnapshot::read(path)?;
  Ok(Some(snapshot.stale_keys(|key| std::env::var(key).unwrap_or_default())))
}
