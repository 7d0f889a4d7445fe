//! knit-lib: the module configuration pipeline of the knit build generator.
//!
//! The crate turns declarative module definitions into a concrete build
//! graph:
//! - `arch`: architectures, operating systems, targets and multilib selection
//! - `props`: property schemas, composition across variant axes and printf
//!   substitution of product variables
//! - `mutator`: the phased mutator framework that splits modules into
//!   variants and wires dependencies
//! - `cc`: the C/C++ module types, flag assembly and build-edge derivation
//! - `ninja` and `legacy`: writers for the finished module table
//! - `engine`: the `Context` that registers everything and runs a build

pub mod arch;
pub mod cc;
pub mod config;
pub mod consts;
pub mod defaults;
pub mod engine;
pub mod env;
pub mod expand;
pub mod genrule;
pub mod hooks;
pub mod legacy;
pub mod lua;
pub mod module;
pub mod mutator;
pub mod ninja;
pub mod paths;
pub mod prebuilt;
pub mod props;
pub mod util;

pub use engine::{BuildPlan, BuildResult, Context, EngineError, FatalError};
