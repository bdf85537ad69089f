// LogLens - util/logging.rs
//
// Structured logging with runtime-selectable debug mode.
//
// Activation:
//   - Environment variable: RUST_LOG=debug (or trace)
//   - Host flag: `debug_flag = true`
//   - Config file: [logging] level = "debug"
//
// Output: stderr. The library only emits `tracing` events; installing the
// subscriber is left to the host, which may call `init` once at startup.

use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Initialise the logging subsystem.
///
/// Priority: RUST_LOG env var > debug flag > config level > default "info".
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(debug_flag: bool, config_level: Option<&str>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else if let Some(level) = config_level {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(super::constants::DEFAULT_LOG_LEVEL)
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            app = super::constants::APP_NAME,
            version = super::constants::APP_VERSION,
            "Logging initialised"
        );
    }
}

/// Measures a named block and logs its duration at debug level when dropped.
pub struct BlockTimer {
    name: &'static str,
    start: Instant,
}

impl BlockTimer {
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for BlockTimer {
    fn drop(&mut self) {
        tracing::debug!(
            block = self.name,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            "Block finished"
        );
    }
}

/// Shorten a log line for inclusion in debug output.
pub fn preview(line: &str) -> &str {
    match line.char_indices().nth(super::constants::DEBUG_MAX_LINE_PREVIEW) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
