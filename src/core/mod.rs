// LogLens - core/mod.rs
//
// Core business logic layer.
// Dependencies: regex, chrono, serde/toml (profile documents), tracing.
// Must NOT depend on: app or platform. Reads sources but never writes files.

pub mod filter;
pub mod holder;
pub mod level;
pub mod model;
pub mod parser;
pub mod profile;
