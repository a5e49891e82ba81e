//! Core devfile logic: types, parsing, sources, parent resolution, merging
//! and configurable parameters.

pub mod configurables;
pub mod error;
pub mod overriding;
pub mod parser;
pub mod resolver;
pub mod source;
pub mod types;
