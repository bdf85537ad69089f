// LogLens - lib.rs
//
// Library entry point. Parses structured, multi-line log text into entries
// using user-editable format profiles, and serves filtered, row-addressable
// views over the result.
//
// Layers:
//   - `core`: profiles, parsing, entry store, filters (no filesystem writes).
//   - `app`: profile persistence, background loading, `Workspace`.
//   - `platform`: directories, config.toml, file helpers.
//   - `util`: constants, errors, logging.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;

pub use crate::app::loader::{LoadManager, LoadOptions, LoadOutcome};
pub use crate::app::profile_mgr::ProfileStore;
pub use crate::app::workspace::Workspace;
pub use crate::core::filter::LogFilter;
pub use crate::core::holder::LogHolder;
pub use crate::core::model::{LogEntry, LogSource};
pub use crate::core::profile::{LogProfile, ProfileSet};
pub use crate::util::error::{LogLensError, Result};
