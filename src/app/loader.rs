// LogLens - app/loader.rs
//
// Log loading off the caller's thread.
//
//   - `LoadManager` owns one background load; the caller polls it.
//   - `load_many` parses several sources on a rayon pool.
//   - Every load works against an immutable `ProfileSet` snapshot.
//
// A finished holder already carries a pass-all projection, so row
// addressing works without a separate `filter` call.

use crate::core::holder::LogHolder;
use crate::core::model::LogSource;
use crate::core::profile::{LogProfile, ProfileSet};
use crate::platform::config::AppConfig;
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::{LoadError, ParseError};
use crate::util::logging::BlockTimer;
use rayon::prelude::*;
use std::path::Path;
use std::sync::{mpsc, Arc};

/// Tunables for a load, taken from `config.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Files above this size are memory-mapped.
    pub large_file_threshold: u64,
    /// Worker threads for `load_many` (0 = auto).
    pub worker_threads: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            large_file_threshold: constants::DEFAULT_LARGE_FILE_THRESHOLD,
            worker_threads: constants::DEFAULT_WORKER_THREADS,
        }
    }
}

impl From<&AppConfig> for LoadOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            large_file_threshold: config.large_file_threshold,
            worker_threads: config.worker_threads,
        }
    }
}

/// Result of a background load.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Box<LogHolder>),
    Failed(LoadError),
}

impl LoadOutcome {
    pub fn into_result(self) -> Result<LogHolder, LoadError> {
        match self {
            LoadOutcome::Loaded(holder) => Ok(*holder),
            LoadOutcome::Failed(e) => Err(e),
        }
    }
}

// =============================================================================
// LoadManager
// =============================================================================

/// Runs a single load on a background thread.
#[derive(Debug, Default)]
pub struct LoadManager {
    rx: Option<mpsc::Receiver<LoadOutcome>>,
}

impl LoadManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start loading `source`. A load still in flight is abandoned; its
    /// result is discarded.
    pub fn start(&mut self, source: LogSource, profiles: Arc<ProfileSet>, options: LoadOptions) {
        self.cancel();

        let (tx, rx) = mpsc::channel();
        self.rx = Some(rx);

        tracing::info!(source = %source, "Starting background load");
        std::thread::spawn(move || {
            let outcome = match load_holder(&source, &profiles, options) {
                Ok(holder) => LoadOutcome::Loaded(Box::new(holder)),
                Err(e) => LoadOutcome::Failed(e),
            };
            // Receiver gone means the load was abandoned.
            let _ = tx.send(outcome);
        });
    }

    /// Drop the pending load, if any.
    pub fn cancel(&mut self) {
        if self.rx.take().is_some() {
            tracing::debug!("Pending load abandoned");
        }
    }

    pub fn is_running(&self) -> bool {
        self.rx.is_some()
    }

    /// Non-blocking check for the result.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(outcome) => {
                self.rx = None;
                Some(outcome)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.rx = None;
                Some(LoadOutcome::Failed(LoadError::WorkerLost))
            }
        }
    }

    /// Block until the pending load finishes. `None` when nothing is running.
    pub fn wait(&mut self) -> Option<LoadOutcome> {
        let rx = self.rx.take()?;
        Some(
            rx.recv()
                .unwrap_or(LoadOutcome::Failed(LoadError::WorkerLost)),
        )
    }
}

// =============================================================================
// Synchronous loading
// =============================================================================

/// Load one source into a holder with a pass-all projection.
pub fn load_holder(
    source: &LogSource,
    profiles: &ProfileSet,
    options: LoadOptions,
) -> Result<LogHolder, LoadError> {
    let _timer = BlockTimer::start("load_holder");
    let mut holder = LogHolder::new();

    match source {
        LogSource::Path(path) => {
            let size = fs::file_size(path).map_err(|e| unavailable(path, e))?;
            if size > options.large_file_threshold {
                let text = fs::read_log_file(path, options.large_file_threshold)
                    .map_err(|e| unavailable(path, e))?;
                holder.load_text(&text, profiles);
            } else {
                holder.load(source, profiles)?;
            }
        }
        LogSource::Text(text) => holder.load_text(text, profiles),
    }

    holder.filter(|_| true);
    tracing::info!(
        source = %source,
        entries = holder.len(),
        profile = %holder.profile().map_or("", |p| p.name()),
        "Log loaded"
    );
    Ok(holder)
}

/// Load several sources in parallel. Results keep the input order; one
/// failing source does not affect the others.
pub fn load_many(
    sources: &[LogSource],
    profiles: &ProfileSet,
    options: LoadOptions,
) -> Result<Vec<Result<LogHolder, LoadError>>, LoadError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.worker_threads)
        .build()
        .map_err(|e| LoadError::ThreadPool {
            reason: e.to_string(),
        })?;

    tracing::debug!(
        sources = sources.len(),
        threads = pool.current_num_threads(),
        "Batch load started"
    );
    Ok(pool.install(|| {
        sources
            .par_iter()
            .map(|source| load_holder(source, profiles, options))
            .collect()
    }))
}

/// Pick the profile for a file from its first lines without parsing it.
pub fn detect_profile(path: &Path, profiles: &ProfileSet) -> Result<Arc<LogProfile>, ParseError> {
    let head = fs::read_first_lines(path, profiles.max_detection_lines())
        .map_err(|e| unavailable(path, e))?;
    Ok(profiles.find_matching_profile(head.as_slice()))
}

fn unavailable(path: &Path, source: std::io::Error) -> ParseError {
    ParseError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    }
}
