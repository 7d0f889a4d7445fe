//! Shared utilities.
//!
//! File output, plan hashing, ordered list helpers and the `OncePer` memoisation cache.

pub mod fs;
pub mod hash;
pub mod lists;
pub mod once;
