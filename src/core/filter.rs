// LogLens - core/filter.rs
//
// Entry predicates: level inclusion/exclusion plus a text pattern.
// Core layer: pure logic, no I/O.

use crate::core::model::LogEntry;
use crate::util::error::FilterError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

// =============================================================================
// Modes
// =============================================================================

/// Whether matching entries are shown or hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    Include,
    Exclude,
}

/// How the search text is turned into a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatchMode {
    #[default]
    Contains,
    StartsWith,
    EndsWith,
    ExactMatch,
    Regex,
}

/// Build the search pattern for `text` under `mode`.
///
/// Returns `Ok(None)` for empty text (no text criterion).
pub fn compile_pattern(
    mode: TextMatchMode,
    text: &str,
    case_sensitive: bool,
) -> Result<Option<Regex>, FilterError> {
    if text.is_empty() {
        return Ok(None);
    }

    let pattern = match mode {
        TextMatchMode::Contains => regex::escape(text),
        TextMatchMode::StartsWith => format!("^{}", regex::escape(text)),
        TextMatchMode::EndsWith => format!("{}$", regex::escape(text)),
        TextMatchMode::ExactMatch => format!("^{}$", regex::escape(text)),
        TextMatchMode::Regex => text.to_string(),
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map(Some)
        .map_err(|e| FilterError::InvalidRegex {
            pattern: text.to_string(),
            source: e,
        })
}

// =============================================================================
// Persisted form
// =============================================================================

fn default_enabled() -> bool {
    true
}

/// A filter as stored in a profile document's `[[filter_presets]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub name: String,
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub included_levels: Vec<String>,
    #[serde(default)]
    pub excluded_levels: Vec<String>,
    #[serde(default)]
    pub search_text: String,
    #[serde(default)]
    pub text_match_mode: TextMatchMode,
    #[serde(default)]
    pub case_sensitive: bool,
}

// =============================================================================
// LogFilter
// =============================================================================

#[derive(Debug, Clone, Default)]
enum PatternState {
    #[default]
    Empty,
    Valid(Regex),
    Invalid(FilterError),
}

/// A named, toggleable predicate over single entries.
///
/// The text pattern is recompiled whenever the search text, match mode or
/// case sensitivity changes. An invalid pattern is kept as an error and
/// treated as "no text criterion" during evaluation.
#[derive(Debug, Clone)]
pub struct LogFilter {
    name: String,
    mode: FilterMode,
    enabled: bool,
    included_levels: Vec<String>,
    excluded_levels: Vec<String>,
    search_text: String,
    text_match_mode: TextMatchMode,
    case_sensitive: bool,
    pattern: PatternState,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self::new("")
    }
}

impl LogFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: FilterMode::Include,
            enabled: true,
            included_levels: Vec::new(),
            excluded_levels: Vec::new(),
            search_text: String::new(),
            text_match_mode: TextMatchMode::Contains,
            case_sensitive: false,
            pattern: PatternState::Empty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        self.mode = mode;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    // -------------------------------------------------------------------------
    // Level criteria
    // -------------------------------------------------------------------------

    pub fn included_levels(&self) -> &[String] {
        &self.included_levels
    }

    pub fn excluded_levels(&self) -> &[String] {
        &self.excluded_levels
    }

    pub fn set_included_levels<I, S>(&mut self, levels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.included_levels.clear();
        for level in levels {
            self.include_level(level);
        }
    }

    pub fn set_excluded_levels<I, S>(&mut self, levels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_levels.clear();
        for level in levels {
            self.exclude_level(level);
        }
    }

    pub fn include_level(&mut self, level: impl Into<String>) {
        push_unique(&mut self.included_levels, level.into());
    }

    pub fn exclude_level(&mut self, level: impl Into<String>) {
        push_unique(&mut self.excluded_levels, level.into());
    }

    // -------------------------------------------------------------------------
    // Text criterion
    // -------------------------------------------------------------------------

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn text_match_mode(&self) -> TextMatchMode {
        self.text_match_mode
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
        self.recompile();
    }

    pub fn set_text_match_mode(&mut self, mode: TextMatchMode) {
        self.text_match_mode = mode;
        self.recompile();
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
        self.recompile();
    }

    /// The compile error of the current search text, if any.
    pub fn pattern_error(&self) -> Option<&FilterError> {
        match &self.pattern {
            PatternState::Invalid(e) => Some(e),
            _ => None,
        }
    }

    fn recompile(&mut self) {
        self.pattern = match compile_pattern(
            self.text_match_mode,
            &self.search_text,
            self.case_sensitive,
        ) {
            Ok(Some(regex)) => PatternState::Valid(regex),
            Ok(None) => PatternState::Empty,
            Err(e) => {
                tracing::debug!(filter = %self.name, error = %e, "Filter pattern rejected");
                PatternState::Invalid(e)
            }
        };
    }

    // -------------------------------------------------------------------------
    // Evaluation
    // -------------------------------------------------------------------------

    /// Level criterion. Excluded levels win over included ones.
    pub fn matches_level(&self, entry: &LogEntry) -> bool {
        let name = entry.level().name();
        if name.is_empty() {
            return self.included_levels.is_empty()
                || self.included_levels.iter().any(|l| l.is_empty());
        }
        if self.excluded_levels.iter().any(|l| l == name) {
            return false;
        }
        self.included_levels.is_empty() || self.included_levels.iter().any(|l| l == name)
    }

    /// Text criterion against the message and the raw text.
    pub fn matches_text(&self, entry: &LogEntry) -> bool {
        match &self.pattern {
            PatternState::Valid(regex) => {
                regex.is_match(entry.message()) || regex.is_match(entry.original_message())
            }
            PatternState::Empty | PatternState::Invalid(_) => true,
        }
    }

    /// Whether `entry` is visible under this filter.
    pub fn show_entry(&self, entry: &LogEntry) -> bool {
        if !self.enabled {
            return true;
        }
        let matches = self.matches_level(entry) && self.matches_text(entry);
        match self.mode {
            FilterMode::Include => matches,
            FilterMode::Exclude => !matches,
        }
    }

    /// Borrowing predicate suitable for `LogHolder::filter`.
    pub fn predicate(&self) -> impl Fn(&LogEntry) -> bool + '_ {
        move |entry| self.show_entry(entry)
    }

    // -------------------------------------------------------------------------
    // Presets
    // -------------------------------------------------------------------------

    pub fn to_preset(&self) -> FilterPreset {
        FilterPreset {
            name: self.name.clone(),
            mode: self.mode,
            enabled: self.enabled,
            included_levels: self.included_levels.clone(),
            excluded_levels: self.excluded_levels.clone(),
            search_text: self.search_text.clone(),
            text_match_mode: self.text_match_mode,
            case_sensitive: self.case_sensitive,
        }
    }

    pub fn from_preset(preset: &FilterPreset) -> Self {
        let mut filter = Self::new(preset.name.clone());
        filter.mode = preset.mode;
        filter.enabled = preset.enabled;
        filter.set_included_levels(preset.included_levels.iter().cloned());
        filter.set_excluded_levels(preset.excluded_levels.iter().cloned());
        filter.search_text = preset.search_text.clone();
        filter.text_match_mode = preset.text_match_mode;
        filter.case_sensitive = preset.case_sensitive;
        filter.recompile();
        filter
    }
}

fn push_unique(levels: &mut Vec<String>, level: String) {
    if !levels.contains(&level) {
        levels.push(level);
    }
}
