//! Trellis: devfile resolution and command execution.
//!
//! Resolves a devfile's parent chain into one flat document, then turns its
//! commands into validated models that drive a caller-supplied handler.

pub mod cli;
pub mod core;
pub mod engine;
pub mod handlers;
