// LogLens - core/parser.rs
//
// Stream-oriented log parsing using format profiles.
// Core layer: reads from any `BufRead`; the only filesystem access is
// opening the file behind a `LogSource::Path`.
//
// One pass: detect the profile from the leading lines, coalesce physical
// lines into logical entries, extract fields, and collect environment
// metadata from the first entries.

use crate::core::level::{LevelRegistry, LogLevel};
use crate::core::model::{ComponentRanges, LogComponent, LogEntry, LogSource};
use crate::core::profile::{LogProfile, ProfileSet};
use crate::util::constants;
use crate::util::error::ParseError;
use crate::util::logging::{preview, BlockTimer};
use chrono::NaiveDateTime;
use std::convert::Infallible;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

/// Timestamp layout after the century prefix has been applied.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// =============================================================================
// Output
// =============================================================================

/// Version, device and OS strings found near the top of a log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    pub version: Option<String>,
    pub device: Option<String>,
    pub os: Option<String>,
}

impl SystemInfo {
    pub fn is_empty(&self) -> bool {
        self.version.is_none() && self.device.is_none() && self.os.is_none()
    }

    fn is_complete(&self) -> bool {
        self.version.is_some() && self.device.is_some() && self.os.is_some()
    }
}

/// Tab-separated `Version: X`, `Device: Y`, `OS: Z`; absent parts are left out.
impl fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            ("Version", &self.version),
            ("Device", &self.device),
            ("OS", &self.os),
        ];
        let mut first = true;
        for (label, value) in parts {
            if let Some(value) = value {
                if !first {
                    f.write_str("\t")?;
                }
                write!(f, "{label}: {value}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Everything a single parse produces.
#[derive(Debug)]
pub struct ParseOutput {
    pub entries: Vec<LogEntry>,
    pub system_info: SystemInfo,
    pub profile: Arc<LogProfile>,
    /// Distinct levels in first-seen order.
    pub levels: Vec<Arc<LogLevel>>,
}

// =============================================================================
// Parser
// =============================================================================

/// Parses log text against a set of profiles.
///
/// The parser only reads the profile set, so one set can serve any number of
/// concurrent parses.
#[derive(Debug, Clone, Copy)]
pub struct LogParser<'p> {
    profiles: &'p ProfileSet,
}

impl<'p> LogParser<'p> {
    pub fn new(profiles: &'p ProfileSet) -> Self {
        Self { profiles }
    }

    /// Parse a file or in-memory text.
    pub fn parse(&self, source: &LogSource) -> Result<ParseOutput, ParseError> {
        match source {
            LogSource::Text(text) => Ok(self.parse_text(text)),
            LogSource::Path(path) => {
                let file = File::open(path).map_err(|e| ParseError::SourceUnavailable {
                    path: path.clone(),
                    source: e,
                })?;
                tracing::debug!(file = %path.display(), "Opened log source");
                self.parse_reader(BufReader::new(file))
            }
        }
    }

    /// Parse from any buffered reader. Bytes that are not valid UTF-8 are
    /// replaced rather than rejected.
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<ParseOutput, ParseError> {
        self.parse_lines(ReaderLines::new(reader))
    }

    /// Parse in-memory text. Cannot fail.
    pub fn parse_text(&self, text: &str) -> ParseOutput {
        let lines = text.lines().map(|l| Ok::<_, Infallible>(l.to_string()));
        match self.parse_lines(lines) {
            Ok(output) => output,
            Err(never) => match never {},
        }
    }

    fn parse_lines<E, I>(&self, mut lines: I) -> Result<ParseOutput, E>
    where
        I: Iterator<Item = Result<String, E>>,
    {
        let _timer = BlockTimer::start("parse");

        // Buffer just enough leading lines for detection, then replay them.
        let wanted = self.profiles.max_detection_lines();
        let mut head = Vec::with_capacity(wanted);
        while head.len() < wanted {
            match lines.next() {
                Some(line) => head.push(line?),
                None => break,
            }
        }
        let profile = self.profiles.find_matching_profile(head.as_slice());

        let mut session = ParseSession::new(Arc::clone(&profile));
        for line in head.into_iter().map(Ok).chain(lines) {
            session.push_line(line?);
        }
        let output = session.finish();

        tracing::info!(
            profile = %output.profile.name(),
            entries = output.entries.len(),
            levels = output.levels.len(),
            system_info = %output.system_info,
            "Parse complete"
        );
        Ok(output)
    }
}

// =============================================================================
// Line source
// =============================================================================

/// Lines of a reader with `\n` / `\r\n` stripped and lossy UTF-8 decoding.
struct ReaderLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> ReaderLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for ReaderLines<R> {
    type Item = Result<String, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(ParseError::Read { source: e })),
        }
    }
}

// =============================================================================
// Parse session
// =============================================================================

/// A logical entry still receiving continuation lines.
struct PendingEntry {
    text: String,
    first_line: u64,
    last_line: u64,
    /// Blank lines seen since the last non-blank line of this entry.
    blank_run: u64,
}

/// Mutable state of one parse pass.
struct ParseSession {
    profile: Arc<LogProfile>,
    registry: LevelRegistry,
    entries: Vec<LogEntry>,
    pending: Option<PendingEntry>,
    line_number: u64,
    entry_count: u64,
    system_info: SystemInfo,
}

impl ParseSession {
    fn new(profile: Arc<LogProfile>) -> Self {
        Self {
            registry: LevelRegistry::new(profile.log_levels()),
            profile,
            entries: Vec::with_capacity(constants::ENTRY_VEC_INITIAL_CAPACITY),
            pending: None,
            line_number: 0,
            entry_count: 0,
            system_info: SystemInfo::default(),
        }
    }

    fn starts_entry(&self, line: &str) -> bool {
        !line.is_empty() && self.profile.new_entry_start_regex().is_match(line)
    }

    /// Feed one physical line.
    fn push_line(&mut self, line: String) {
        self.line_number += 1;
        let line_number = self.line_number;

        if self.starts_entry(&line) {
            if let Some(done) = self.pending.take() {
                self.emit(done);
            }
            self.pending = Some(PendingEntry {
                text: line,
                first_line: line_number,
                last_line: line_number,
                blank_run: 0,
            });
            return;
        }

        match self.pending.as_mut() {
            // Text before the first entry start still forms an entry;
            // leading blank lines do not.
            None if line.is_empty() => {}
            None => {
                self.pending = Some(PendingEntry {
                    text: line,
                    first_line: line_number,
                    last_line: line_number,
                    blank_run: 0,
                });
            }
            Some(pending) if line.is_empty() => pending.blank_run += 1,
            Some(pending) => {
                // Interior blank lines become empty segments.
                for _ in 0..=pending.blank_run {
                    pending.text.push(constants::SOFT_LINE_BREAK);
                }
                pending.text.push_str(&line);
                pending.last_line = line_number;
                pending.blank_run = 0;
            }
        }
    }

    fn emit(&mut self, pending: PendingEntry) {
        self.entry_count += 1;
        if self.entry_count <= self.profile.system_info_lines_to_check()
            && !self.system_info.is_complete()
        {
            self.extract_environment(&pending.text);
        }

        let fields = match self.profile.entry_regex().captures(&pending.text) {
            Some(caps) => {
                let mut ranges = ComponentRanges::default();
                for (slot, component) in LogComponent::EXTRACTED.iter().enumerate() {
                    if let Some(m) = component.group_name().and_then(|g| caps.name(g)) {
                        ranges[slot] = m.range();
                    }
                }
                let level_name = caps.name("level").map_or("", |m| m.as_str());
                let level = self.registry.get_or_create(level_name);
                let date = caps.name("date").map_or("", |m| m.as_str());
                let time = caps.name("time").map_or("", |m| m.as_str());
                Some((ranges, level, parse_timestamp(date, time)))
            }
            None => None,
        };

        let lines = (pending.first_line, pending.last_line);
        let entry = match fields {
            Some((ranges, level, timestamp)) => LogEntry::matched(
                self.entry_count,
                lines,
                pending.text,
                level,
                ranges,
                timestamp,
            ),
            None => {
                tracing::trace!(
                    entry = self.entry_count,
                    line = pending.first_line,
                    text = preview(&pending.text),
                    "Entry regex did not match; keeping raw text"
                );
                let level = self.registry.get_or_create("");
                LogEntry::unmatched(self.entry_count, lines, pending.text, level)
            }
        };
        self.entries.push(entry);
    }

    /// First match of each of version, device and OS wins.
    fn extract_environment(&mut self, text: &str) {
        let profile = &self.profile;
        let info = &mut self.system_info;

        if info.version.is_none() {
            if let Some(caps) = profile.version_regex().captures(text) {
                let group = |name| caps.name(name).map_or("", |m| m.as_str());
                let mut version = format!("{}{}", group("version"), group("tags"));
                let build = group("buildnr");
                if !build.is_empty() {
                    version.push_str(&format!(" ({build})"));
                }
                if !version.is_empty() {
                    info.version = Some(version);
                }
            }
        }

        if info.device.is_none() {
            info.device = capture_non_empty(profile.device_regex(), text, "device");
        }

        if info.os.is_none() {
            info.os = capture_non_empty(profile.os_regex(), text, "os");
        }
    }

    fn finish(mut self) -> ParseOutput {
        if let Some(done) = self.pending.take() {
            self.emit(done);
        }
        ParseOutput {
            entries: self.entries,
            system_info: self.system_info,
            profile: self.profile,
            levels: self.registry.into_levels(),
        }
    }
}

fn capture_non_empty(regex: &regex::Regex, text: &str, group: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.name(group))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

/// Build a timestamp from a two-digit-year date and a time of day.
///
/// Returns `None` when the pieces do not form a valid date time.
pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    if date.is_empty() || time.is_empty() {
        return None;
    }
    let joined = format!("{}{date} {time}", constants::TIMESTAMP_CENTURY_PREFIX);
    NaiveDateTime::parse_from_str(&joined, TIMESTAMP_FORMAT).ok()
}
