//! Keyed lazy values computed at most once.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, OnceLock};

/// Maps a key to a lazily computed value.
///
/// Concurrent callers asking for the same key block on a single computation;
/// callers with different keys proceed independently because the map lock is
/// released before the value is computed.
pub struct OncePer<K, V> {
  slots: Mutex<HashMap<K, Arc<OnceLock<V>>>>,
}

impl<K, V> std::fmt::Debug for OncePer<K, V> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OncePer").finish_non_exhaustive()
  }
}

impl<K, V> Default for OncePer<K, V> {
  fn default() -> Self {
    Self {
      slots: Mutex::new(HashMap::new()),
    }
  }
}

impl<K: Eq + Hash + Clone, V: Clone> OncePer<K, V> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the value for `key`, computing it with `init` on first use.
  pub fn get_or_init(&self, key: &K, init: impl FnOnce() -> V) -> V {
    let slot = {
      let mut slots = match self.slots.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
      };
      slots.entry(key.clone()).or_default().clone()
    };
    slot.get_or_init(init).clone()
  }

  /// Returns the value for `key` if it has already been computed.
  pub fn peek(&self, key: &K) -> Option<V> {
    let slots = match self.slots.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    slots.get(key).and_then(|slot| slot.get().cloned())
  }

  pub fn len(&self) -> usize {
    match self.slots.lock() {
      Ok(guard) => guard.len(),
      Err(poisoned) => poisoned.into_inner().len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
