//! Modules, variants, dependency tags and the module table.

mod error;
mod registry;
mod table;
mod tags;
mod types;
mod variant;

pub use error::ModuleError;
pub use registry::{ModuleFactory, ModuleType, ModuleTypeRegistry, common_schema};
pub use table::ModuleTable;
pub use tags::{DepKind, DependencyTag};
pub use types::{DepEdge, Module, ModuleDefinition, ModuleLogic, ModuleRef, SourceLocation};
pub use variant::{Axis, Variations};
