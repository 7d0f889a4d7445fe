//! End-to-end tests of the engine: definitions in, variants and edges out.

mod common;

mod composition_tests;
mod deps_tests;
mod emission_tests;
mod expand_tests;
mod sanitize_tests;
mod targets_tests;
mod variants_tests;
