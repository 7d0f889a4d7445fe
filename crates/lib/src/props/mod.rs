//! Property trees, schemas and variant composition.

mod compose;
mod extend;
mod printf;
mod schema;
mod value;

use thiserror::Error;

pub use compose::{arch_blocks, compose_arch, compose_image, compose_product_variables};
pub use extend::{ExtendMode, extend_matching, extend_properties};
pub use printf::{PrintfError, printf_into, printf_string};
pub use schema::{FieldKind, FieldSpec, Order, Schema};
pub use value::{PropValue, Properties, get_bool, get_list, get_str, lookup, set, to_json};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtendErrorKind {
  #[error("unrecognized property")]
  Unknown,

  #[error("expected {expected}, found {found}")]
  TypeMismatch { expected: &'static str, found: &'static str },

  #[error("cannot be set in a module definition")]
  Mutated,

  #[error("{0}")]
  Printf(PrintfError),
}

/// A failure while validating or merging properties, at a dotted property path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{property}: {kind}")]
pub struct ExtendPropertyError {
  pub property: String,
  pub kind: ExtendErrorKind,
}

impl ExtendPropertyError {
  pub fn new(property: &str, kind: ExtendErrorKind) -> Self {
    Self {
      property: property.to_string(),
      kind,
    }
  }
}
