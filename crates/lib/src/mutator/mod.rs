//! The phased mutator framework.
//!
//! A build runs eighteen fixed phases over the module table. Each phase
//! holds the mutators registered for it, executed in registration order.
//! A mutator visits every live module once, in dependency order: bottom-up
//! mutators see a module after all of its dependencies, top-down mutators
//! see it before them.

mod context;
mod registry;
mod scheduler;
mod shared;

pub use context::{Mark, MutatorContext};
pub use registry::{Direction, Mutator, MutatorFn, MutatorRegistry, Phase, Scope};
pub use scheduler::{Pipeline, compute_waves};
pub use shared::{SharedRecord, SharedTables};
