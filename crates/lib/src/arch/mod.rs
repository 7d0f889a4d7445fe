//! Architectures, operating systems and target decoding.

mod decode;
pub mod registry;
mod split;
mod types;

use thiserror::Error;

pub use decode::{Targets, decode_arch, decode_multilib, decode_targets, encode_targets};
pub use split::{arch_mutator, product_variables_mutator};
pub use types::{Arch, ArchType, HostOrDeviceSupported, Multilib, OsClass, OsType, Target};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchError {
  #[error("No host primary architecture set")]
  NoHostPrimaryArch,

  #[error("Unknown cross host OS {0:?}")]
  UnknownCrossHostOs(String),

  #[error("No cross-host primary architecture set")]
  NoCrossHostPrimaryArch,

  #[error("unknown arch {0:?}")]
  UnknownArch(String),

  #[error(r#"compile_multilib must be "both", "first", "32", "64", "prefer32" or "common", found {0:?}"#)]
  BadCompileMultilib(String),
}

/// The OS the engine itself runs on.
pub fn build_os() -> OsType {
  match std::env::consts::OS {
    "macos" => OsType::Darwin,
    _ => OsType::LinuxGlibc,
  }
}
