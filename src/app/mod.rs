// LogLens - app/mod.rs
//
// Application layer: profile persistence, background loading and the
// host-facing workspace.
// Dependencies: core, platform.

pub mod loader;
pub mod profile_mgr;
pub mod workspace;
