// LogLens - core/model.rs
//
// Core data model types. Pure data definitions with no I/O.
//
// A `LogEntry` is built once by the parser and never mutated afterwards,
// except for the timing deltas filled in by the holder's preprocessing pass.

use crate::core::level::LogLevel;
use chrono::{Duration, NaiveDateTime};
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;

// =============================================================================
// Components
// =============================================================================

/// Named text components of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogComponent {
    OriginalMessage,
    Date,
    Time,
    Thread,
    Subsystem,
    Message,
    Where,
}

impl LogComponent {
    /// The extracted components, in the order their ranges are stored.
    pub const EXTRACTED: [LogComponent; 6] = [
        LogComponent::Date,
        LogComponent::Time,
        LogComponent::Thread,
        LogComponent::Subsystem,
        LogComponent::Message,
        LogComponent::Where,
    ];

    /// Capture group name used by entry regexes, `None` for the raw text.
    pub fn group_name(self) -> Option<&'static str> {
        match self {
            LogComponent::OriginalMessage => None,
            LogComponent::Date => Some("date"),
            LogComponent::Time => Some("time"),
            LogComponent::Thread => Some("thread"),
            LogComponent::Subsystem => Some("subsys"),
            LogComponent::Message => Some("message"),
            LogComponent::Where => Some("where"),
        }
    }

    fn slot(self) -> Option<usize> {
        match self {
            LogComponent::OriginalMessage => None,
            LogComponent::Date => Some(0),
            LogComponent::Time => Some(1),
            LogComponent::Thread => Some(2),
            LogComponent::Subsystem => Some(3),
            LogComponent::Message => Some(4),
            LogComponent::Where => Some(5),
        }
    }
}

/// Byte ranges of the six extracted components inside the original message.
pub type ComponentRanges = [Range<usize>; 6];

// =============================================================================
// Log Entry
// =============================================================================

/// One logical log record, possibly spanning several physical lines.
///
/// Extracted components are views into `original_message`; nothing is
/// copied per field.
#[derive(Debug, Clone)]
pub struct LogEntry {
    entry_number: u64,
    line_number: u64,
    end_line_number: u64,
    timestamp: Option<NaiveDateTime>,
    level: Arc<LogLevel>,
    original_message: String,
    ranges: ComponentRanges,
    since_start: Duration,
    since_previous: Duration,
}

impl LogEntry {
    /// Entry whose text matched the entry regex.
    pub(crate) fn matched(
        entry_number: u64,
        lines: (u64, u64),
        original_message: String,
        level: Arc<LogLevel>,
        ranges: ComponentRanges,
        timestamp: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            entry_number,
            line_number: lines.0,
            end_line_number: lines.1,
            timestamp,
            level,
            original_message,
            ranges,
            since_start: Duration::zero(),
            since_previous: Duration::zero(),
        }
    }

    /// Entry whose text did not match: the message is the whole raw text.
    pub(crate) fn unmatched(
        entry_number: u64,
        lines: (u64, u64),
        original_message: String,
        level: Arc<LogLevel>,
    ) -> Self {
        let len = original_message.len();
        let mut ranges = ComponentRanges::default();
        ranges[4] = 0..len;
        Self::matched(entry_number, lines, original_message, level, ranges, None)
    }

    pub(crate) fn set_deltas(&mut self, since_start: Duration, since_previous: Duration) {
        self.since_start = since_start;
        self.since_previous = since_previous;
    }

    /// 1-based position in the parsed sequence.
    pub fn entry_number(&self) -> u64 {
        self.entry_number
    }

    /// 1-based physical line on which the entry starts.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// 1-based physical line on which the entry ends.
    pub fn end_line_number(&self) -> u64 {
        self.end_line_number
    }

    /// Number of physical lines the entry spans; always at least 1.
    pub fn line_count(&self) -> u64 {
        self.end_line_number - self.line_number + 1
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    pub fn level(&self) -> &Arc<LogLevel> {
        &self.level
    }

    pub fn since_start(&self) -> Duration {
        self.since_start
    }

    pub fn since_previous(&self) -> Duration {
        self.since_previous
    }

    /// Text of one component. Components a profile does not capture are empty.
    pub fn component(&self, component: LogComponent) -> &str {
        match component.slot() {
            None => &self.original_message,
            Some(slot) => &self.original_message[self.ranges[slot].clone()],
        }
    }

    pub fn original_message(&self) -> &str {
        &self.original_message
    }

    pub fn date(&self) -> &str {
        self.component(LogComponent::Date)
    }

    pub fn time(&self) -> &str {
        self.component(LogComponent::Time)
    }

    pub fn thread(&self) -> &str {
        self.component(LogComponent::Thread)
    }

    pub fn subsystem(&self) -> &str {
        self.component(LogComponent::Subsystem)
    }

    pub fn message(&self) -> &str {
        self.component(LogComponent::Message)
    }

    pub fn location(&self) -> &str {
        self.component(LogComponent::Where)
    }
}

// =============================================================================
// Log source
// =============================================================================

/// Where the raw text of a log comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    /// A file on disk.
    Path(PathBuf),
    /// In-memory text, typically pasted or produced by tests.
    Text(String),
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::Path(path) => write!(f, "{}", path.display()),
            LogSource::Text(text) => write!(f, "<text, {} bytes>", text.len()),
        }
    }
}

impl From<PathBuf> for LogSource {
    fn from(path: PathBuf) -> Self {
        LogSource::Path(path)
    }
}

impl From<String> for LogSource {
    fn from(text: String) -> Self {
        LogSource::Text(text)
    }
}
