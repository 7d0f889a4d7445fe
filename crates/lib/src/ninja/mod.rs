//! Build edges and the Ninja writer.

mod types;
mod writer;

pub use types::{BuildEdge, Rule, RuleDef};
pub use writer::{EdgeBlock, WriteError, escape_path, render};
