//! Hashing utilities for build plans.
//!
//! A plan hash is a truncated SHA-256 of the JSON serialisation of a value,
//! so two runs over identical inputs produce the same identifier.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::PLAN_HASH_PREFIX_LEN;

pub type HashError = serde_json::Error;

/// A content hash identifying a build plan.
///
/// The hash is a 20-character truncated SHA-256 of the JSON-serialized value,
/// lowercase hexadecimal, e.g. `"a1b2c3d4e5f6789012ab"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlanHash(pub String);

impl std::fmt::Display for PlanHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub trait Hashable: Serialize {
  fn compute_hash(&self) -> Result<PlanHash, HashError> {
    let serialized = serde_json::to_string(self)?;
    Ok(PlanHash(hash_str(&serialized)))
  }
}

/// Full lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(data);
  hex::encode(hasher.finalize())
}

fn hash_str(data: &str) -> String {
  let full = hash_bytes(data.as_bytes());
  full[..PLAN_HASH_PREFIX_LEN].to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Serialize)]
  struct Sample {
    name: String,
    edges: Vec<String>,
  }

  impl Hashable for Sample {}

  #[test]
  fn hash_is_truncated_hex() {
    let sample = Sample {
      name: "libfoo".to_string(),
      edges: vec!["a.o".to_string()],
    };
    let hash = sample.compute_hash().unwrap();
    assert_eq!(hash.0.len(), PLAN_HASH_PREFIX_LEN);
    assert!(hash.0.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
  }

  #[test]
  fn hash_is_deterministic() {
    let a = Sample {
      name: "libfoo".to_string(),
      edges: vec!["a.o".to_string(), "b.o".to_string()],
    };
    let b = Sample {
      name: "libfoo".to_string(),
      edges: vec!["a.o".to_string(), "b.o".to_string()],
    };
    assert_eq!(a.compute_hash().unwrap(), b.compute_hash().unwrap());
  }

  #[test]
  fn hash_changes_with_content() {
    let a = Sample {
      name: "libfoo".to_string(),
      edges: vec![],
    };
    let b = Sample {
      name: "libbar".to_string(),
      edges: vec![],
    };
    assert_ne!(a.compute_hash().unwrap(), b.compute_hash().unwrap());
  }

  #[test]
  fn hash_bytes_is_full_length() {
    assert_eq!(hash_bytes(b"knit").len(), 64);
  }
}
