// LogLens - core/holder.rs
//
// Owns the parsed entries of one log and the filtered projection over them.
// Entries are immutable once stored; the projection is a list of indices
// rebuilt wholesale by every `filter` call.

use crate::core::level::LogLevel;
use crate::core::model::{LogEntry, LogSource};
use crate::core::parser::{LogParser, ParseOutput, SystemInfo};
use crate::core::profile::{LogProfile, ProfileSet};
use crate::util::error::ParseError;
use crate::util::logging::BlockTimer;
use chrono::Duration;
use std::io::BufRead;
use std::sync::Arc;

/// Entry store with a filtered, row-addressable view.
#[derive(Debug, Default)]
pub struct LogHolder {
    entries: Vec<LogEntry>,
    /// Indices into `entries`, in order.
    filtered: Vec<usize>,
    /// First display row of each filtered entry, plus the total as last element.
    row_starts: Vec<u64>,
    system_info: SystemInfo,
    levels: Vec<Arc<LogLevel>>,
    profile: Option<Arc<LogProfile>>,
}

impl LogHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a holder from a finished parse. The projection starts empty.
    pub fn from_output(output: ParseOutput) -> Self {
        let mut holder = Self::default();
        holder.store(output);
        holder
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Parse `source` and replace the current contents.
    ///
    /// On error the holder is left empty.
    pub fn load(&mut self, source: &LogSource, profiles: &ProfileSet) -> Result<(), ParseError> {
        self.clear();
        let output = LogParser::new(profiles).parse(source).map_err(|e| {
            tracing::warn!(source = %source, error = %e, "Log source could not be loaded");
            e
        })?;
        self.store(output);
        Ok(())
    }

    /// Parse from a reader and replace the current contents.
    pub fn load_reader<R: BufRead>(
        &mut self,
        reader: R,
        profiles: &ProfileSet,
    ) -> Result<(), ParseError> {
        self.clear();
        let output = LogParser::new(profiles).parse_reader(reader)?;
        self.store(output);
        Ok(())
    }

    /// Parse in-memory text and replace the current contents.
    pub fn load_text(&mut self, text: &str, profiles: &ProfileSet) {
        self.clear();
        let output = LogParser::new(profiles).parse_text(text);
        self.store(output);
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn store(&mut self, output: ParseOutput) {
        self.entries = output.entries;
        self.system_info = output.system_info;
        self.levels = output.levels;
        self.profile = Some(output.profile);
        self.filtered.clear();
        self.row_starts = vec![0];
        self.compute_deltas();
    }

    /// Fill `since_start` and `since_previous` from the timestamps.
    /// Either delta stays zero when one of its two timestamps is missing.
    fn compute_deltas(&mut self) {
        let first = self.entries.first().and_then(LogEntry::timestamp);
        let mut previous = first;
        for entry in &mut self.entries {
            let current = entry.timestamp();
            let since = |reference: Option<_>| match (current, reference) {
                (Some(ts), Some(r)) => ts - r,
                _ => Duration::zero(),
            };
            entry.set_deltas(since(first), since(previous));
            previous = current;
        }
    }

    // -------------------------------------------------------------------------
    // Filtering
    // -------------------------------------------------------------------------

    /// Rebuild the projection from every entry accepted by `predicate`.
    pub fn filter<F>(&mut self, predicate: F)
    where
        F: Fn(&LogEntry) -> bool,
    {
        let _timer = BlockTimer::start("filter");

        let mut filtered = Vec::with_capacity(self.entries.len());
        let mut row_starts = Vec::with_capacity(self.entries.len() + 1);
        let mut rows = 0u64;
        for (idx, entry) in self.entries.iter().enumerate() {
            if predicate(entry) {
                filtered.push(idx);
                row_starts.push(rows);
                rows += entry.line_count();
            }
        }
        row_starts.push(rows);

        tracing::debug!(
            total = self.entries.len(),
            shown = filtered.len(),
            rows,
            "Filter applied"
        );
        self.filtered = filtered;
        self.row_starts = row_starts;
    }

    /// All entries matching `predicate`, ignoring the projection.
    pub fn find<F>(&self, predicate: F) -> Vec<&LogEntry>
    where
        F: Fn(&LogEntry) -> bool,
    {
        self.entries.iter().filter(|e| predicate(e)).collect()
    }

    /// Entries of the current projection matching `predicate`.
    pub fn find_filtered<F>(&self, predicate: F) -> Vec<&LogEntry>
    where
        F: Fn(&LogEntry) -> bool,
    {
        self.filtered_entries().filter(|e| predicate(e)).collect()
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The current projection, in order.
    pub fn filtered_entries(&self) -> impl ExactSizeIterator<Item = &LogEntry> + '_ {
        self.filtered.iter().map(|&idx| &self.entries[idx])
    }

    /// Indices of the projection into `entries()`.
    pub fn filtered_indices(&self) -> &[usize] {
        &self.filtered
    }

    pub fn system_info(&self) -> &SystemInfo {
        &self.system_info
    }

    /// Distinct levels of the loaded log, in first-seen order.
    pub fn levels(&self) -> &[Arc<LogLevel>] {
        &self.levels
    }

    /// Profile used for the last successful load.
    pub fn profile(&self) -> Option<&Arc<LogProfile>> {
        self.profile.as_ref()
    }

    /// Last physical line covered by the log, 0 when nothing is loaded.
    pub fn max_line_number(&self) -> u64 {
        self.entries.last().map_or(0, |e| e.end_line_number())
    }

    // -------------------------------------------------------------------------
    // Display rows
    // -------------------------------------------------------------------------

    /// Number of display rows of the projection; a multi-line entry takes
    /// one row per physical line.
    pub fn filtered_line_count(&self) -> u64 {
        self.row_starts.last().copied().unwrap_or(0)
    }

    /// The filtered entry that owns display row `row` (0-based).
    pub fn entry_at_row(&self, row: u64) -> Option<&LogEntry> {
        if row >= self.filtered_line_count() {
            return None;
        }
        // Last start that is <= row. Starts are strictly increasing because
        // every entry spans at least one row.
        let pos = self.row_starts.partition_point(|&start| start <= row) - 1;
        self.filtered.get(pos).map(|&idx| &self.entries[idx])
    }

    /// Source line number of the entry at display row `row`.
    pub fn filtered_line_number(&self, row: u64) -> Option<u64> {
        self.entry_at_row(row).map(LogEntry::line_number)
    }

    /// Entry number of the entry at display row `row`.
    pub fn filtered_entry_number(&self, row: u64) -> Option<u64> {
        self.entry_at_row(row).map(LogEntry::entry_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ENTRIES: &str = "23-01-15 10:00:00.000 INFO first in a() function at line 1\n\
                               23-01-15 10:00:01.000 DEBUG second in b() function at line 2\n";

    const MIXED: &str = "23-01-15 10:00:00 INFO one in f() function at line 1\n\
                         23-01-15 10:00:05 ERROR two in f() function at line 2\n\
                         trace a\n\
                         trace b\n\
                         23-01-15 10:00:07 WARN three in f() function at line 3\n\
                         23-01-15 10:00:09 INFO four in f() function at line 4\n";

    fn holder(text: &str) -> LogHolder {
        let mut holder = LogHolder::new();
        holder.load_text(text, &ProfileSet::default());
        holder
    }

    #[test]
    fn test_holder_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LogHolder>();
    }

    #[test]
    fn test_deltas_for_two_entries() {
        let h = holder(TWO_ENTRIES);
        assert_eq!(h.len(), 2);
        assert_eq!(h.entries()[0].since_start(), Duration::zero());
        assert_eq!(h.entries()[0].since_previous(), Duration::zero());
        assert_eq!(h.entries()[1].since_start(), Duration::seconds(1));
        assert!(h.entries()[1].since_previous() > Duration::zero());
    }

    #[test]
    fn test_deltas_skip_missing_timestamps() {
        let text = "preamble without time\n\
                    23-01-15 10:00:00 INFO a in f() function at line 1\n\
                    23-01-15 10:00:03 INFO b in f() function at line 2\n";
        let h = holder(text);
        assert_eq!(h.len(), 3);
        // No valid first timestamp: since_start stays zero everywhere.
        assert!(h.entries().iter().all(|e| e.since_start() == Duration::zero()));
        assert_eq!(h.entries()[1].since_previous(), Duration::zero());
        assert_eq!(h.entries()[2].since_previous(), Duration::seconds(3));
    }

    #[test]
    fn test_projection_starts_empty_until_filtered() {
        let mut h = holder(MIXED);
        assert_eq!(h.filtered_entries().len(), 0);
        h.filter(|_| true);
        assert_eq!(h.filtered_entries().len(), h.len());
    }

    #[test]
    fn test_filter_is_repeatable_and_order_preserving() {
        let mut h = holder(MIXED);
        let not_info = |e: &LogEntry| e.level().name() != "INFO";
        h.filter(not_info);
        let first: Vec<usize> = h.filtered_indices().to_vec();
        h.filter(not_info);
        assert_eq!(h.filtered_indices(), first.as_slice());
        assert_eq!(first, vec![1, 2]);
    }

    #[test]
    fn test_row_addressing_with_multiline_entries() {
        let mut h = holder(MIXED);
        h.filter(|_| true);
        // Rows: 0 -> entry 1, 1..=3 -> entry 2, 4 -> entry 3, 5 -> entry 4.
        assert_eq!(h.filtered_line_count(), 6);
        assert_eq!(h.filtered_entry_number(0), Some(1));
        assert_eq!(h.filtered_entry_number(1), Some(2));
        assert_eq!(h.filtered_entry_number(3), Some(2));
        assert_eq!(h.filtered_entry_number(4), Some(3));
        assert_eq!(h.filtered_line_number(4), Some(5));
        assert_eq!(h.filtered_entry_number(5), Some(4));
        assert_eq!(h.filtered_entry_number(6), None);
        assert!(h.entry_at_row(100).is_none());
    }

    #[test]
    fn test_row_addressing_follows_projection() {
        let mut h = holder(MIXED);
        h.filter(|e| e.level().name() == "ERROR" || e.level().name() == "INFO");
        assert_eq!(h.filtered_line_count(), 5);
        assert_eq!(h.filtered_entry_number(4), Some(4));
        assert_eq!(h.filtered_line_number(4), Some(6));
    }

    #[test]
    fn test_find_scans_store_and_projection() {
        let mut h = holder(MIXED);
        h.filter(|e| e.level().name() == "INFO");
        let all_with_f = h.find(|e| e.location().contains("f()"));
        assert_eq!(all_with_f.len(), 4);
        let filtered = h.find_filtered(|e| e.message() == "four");
        assert_eq!(filtered.len(), 1);
        assert!(h.find_filtered(|e| e.message() == "two").is_empty());
    }

    #[test]
    fn test_empty_holder() {
        let h = LogHolder::new();
        assert_eq!(h.max_line_number(), 0);
        assert_eq!(h.filtered_line_count(), 0);
        assert!(h.entry_at_row(0).is_none());
        assert!(h.profile().is_none());
    }

    #[test]
    fn test_failed_load_leaves_holder_empty() {
        let profiles = ProfileSet::default();
        let mut h = holder(MIXED);
        h.filter(|_| true);
        let missing = LogSource::Path("/no/such/dir/app.log".into());
        assert!(h.load(&missing, &profiles).is_err());
        assert!(h.is_empty());
        assert_eq!(h.filtered_line_count(), 0);
        assert!(h.system_info().is_empty());
    }

    #[test]
    fn test_max_line_number_is_last_physical_line() {
        let h = holder(MIXED);
        assert_eq!(h.max_line_number(), 6);
        assert_eq!(h.levels().len(), 3);
    }
}
