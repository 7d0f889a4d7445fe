//! The definitions loader.
//!
//! A definitions file is a Lua chunk. Every registered module type is a
//! global function taking a property table:
//!
//! ```lua
//! cc_library {
//!   name = "libfoo",
//!   srcs = { "foo.c" },
//!   arch = { arm = { cflags = { "-DARM" } } },
//! }
//!
//! subdir "tools"
//! ```
//!
//! Each call records a [`ModuleDefinition`](crate::module::ModuleDefinition)
//! with the file and line it came from. `subdir` loads
//! `<dir>/Blueprints.lua` relative to the calling file.
//!
//! # Submodules
//!
//! - [`convert`] - Lua values to property trees
//! - [`runtime`] - Lua VM set-up and file evaluation

pub mod convert;
pub mod runtime;

use std::path::PathBuf;

use thiserror::Error;

use crate::module::SourceLocation;

pub use runtime::{load_definitions, load_str};

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("failed to read definitions file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{location}: unrecognized module type {module_type:?}")]
  UnknownModuleType {
    module_type: String,
    location: SourceLocation,
  },

  #[error("{location}: {message}")]
  Definition { location: SourceLocation, message: String },

  #[error("{file}: {source}")]
  Lua {
    file: String,
    #[source]
    source: mlua::Error,
  },
}
