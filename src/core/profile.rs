// LogLens - core/profile.rs
//
// Format profile documents, validation, and auto-detection.
// Core layer: accepts TOML strings, never touches the filesystem.
// I/O is handled by app::profile_mgr which feeds content here.

use crate::core::filter::FilterPreset;
use crate::core::level::LogLevel;
use crate::util::constants;
use crate::util::error::ProfileError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// Built-in default patterns
// =============================================================================

pub const DEFAULT_DETECTION_REGEX: &str = ".*";

pub const DEFAULT_ENTRY_REGEX: &str = r"^(?P<date>\d\d-\d\d-\d\d(\d\d)?)\s+(?P<time>\d\d:\d\d:\d\d(\.\d+)?):?\s+(?P<level>\w+)\s*:?\s+((?P<subsys>(\[\s*\w+\s*\]|\w+\s?:|UI\s*:\s*\w+\s*))\s*:)?\s*(?P<message>.*)\s+(?P<where>in\s+~?\w+(\([^\s]*\))*\s+function\s+at\s+line\s+\d+)";

pub const DEFAULT_NEW_ENTRY_START_REGEX: &str = r"^(\d\d)?\d\d-\d\d-\d\d";

pub const DEFAULT_VERSION_REGEX: &str = r"Version\s*(:|=)?\s*([vV]?(?P<version>\d+(\.\d+)*)(?P<tags>(-[^-\s]+)*))\s*(\((?P<buildnr>\d+)\))?";

pub const DEFAULT_DEVICE_REGEX: &str = r"Device\s*[:=]\s*(?P<device>[\w ,-]+(\([\w ,]+\))?)";

pub const DEFAULT_OS_REGEX: &str = r"(OS|Operating\s*System)\s*[:=]\s*(?P<os>(Windows|Android|iOS) [\d\.]+(\s*,\s*SDK\s*\d+)?)";

// =============================================================================
// TOML document structures (raw input)
// =============================================================================

/// Raw TOML profile document. Every field is optional; absent values fall
/// back to the built-in default profile when compiled.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(default)]
    pub profile: ProfileMeta,
    #[serde(default)]
    pub detection: DetectionDef,
    #[serde(default)]
    pub entries: EntriesDef,
    #[serde(default)]
    pub system_info: SystemInfoDef,
    #[serde(default)]
    pub log_levels: Vec<LogLevel>,
    #[serde(default)]
    pub filter_presets: Vec<FilterPreset>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProfileMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DetectionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EntriesDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_entry_start_regex: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SystemInfoDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_to_check: Option<u64>,
}

// =============================================================================
// Names
// =============================================================================

/// Sanitise a profile name: keep at most 40 characters, then strip the
/// characters that are hostile to file names.
pub fn filter_name(name: &str) -> String {
    name.chars()
        .take(constants::MAX_PROFILE_NAME_LENGTH)
        .filter(|c| !constants::PROFILE_NAME_FORBIDDEN_CHARS.contains(c))
        .collect()
}

/// Document file name for a sanitised profile name.
pub fn document_file_name(name: &str) -> String {
    format!("{name}.{}", constants::PROFILE_FILE_EXTENSION)
}

// =============================================================================
// Compiled profile
// =============================================================================

/// A compiled log format description.
///
/// Every regex is validated when the profile is built; the parse loop never
/// sees a compile error.
#[derive(Debug, Clone)]
pub struct LogProfile {
    name: String,
    priority: i32,
    icon: Option<String>,
    detection_regex: Regex,
    detection_range: usize,
    entry_regex: Regex,
    new_entry_start_regex: Regex,
    version_regex: Regex,
    device_regex: Regex,
    os_regex: Regex,
    system_info_lines_to_check: u64,
    log_levels: Vec<LogLevel>,
    filter_presets: Vec<FilterPreset>,
    read_only: bool,
    path: Option<PathBuf>,
}

impl LogProfile {
    /// The terminal fallback profile. Read-only and never persisted.
    pub fn builtin_default() -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("built-in pattern is valid");
        Self {
            name: constants::DEFAULT_PROFILE_NAME.to_string(),
            priority: 0,
            icon: None,
            detection_regex: compile(DEFAULT_DETECTION_REGEX),
            detection_range: 0,
            entry_regex: compile(DEFAULT_ENTRY_REGEX),
            new_entry_start_regex: compile(DEFAULT_NEW_ENTRY_START_REGEX),
            version_regex: compile(DEFAULT_VERSION_REGEX),
            device_regex: compile(DEFAULT_DEVICE_REGEX),
            os_regex: compile(DEFAULT_OS_REGEX),
            system_info_lines_to_check: constants::DEFAULT_SYSTEM_INFO_LINES_TO_CHECK,
            log_levels: Vec::new(),
            filter_presets: Vec::new(),
            read_only: true,
            path: None,
        }
    }

    /// A new writable profile using the default grammar, with its own
    /// detection rule. It has no backing document until one is assigned.
    pub fn new(
        name: &str,
        detection_regex: &str,
        detection_range: usize,
    ) -> Result<Self, ProfileError> {
        let name = filter_name(name);
        let detection_regex = compile_regex(&name, "detection.regex", detection_regex)?;
        Ok(Self {
            name,
            priority: constants::DEFAULT_DOCUMENT_PRIORITY,
            detection_regex,
            detection_range,
            read_only: false,
            ..Self::builtin_default()
        })
    }

    // -------------------------------------------------------------------------
    // Detection
    // -------------------------------------------------------------------------

    /// Whether `line`, found at 1-based `line_index`, identifies this format.
    pub fn is_profile(&self, line: &str, line_index: usize) -> bool {
        if line_index > self.detection_range {
            return false;
        }
        self.detection_regex.is_match(line)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn detection_regex(&self) -> &Regex {
        &self.detection_regex
    }

    pub fn detection_range(&self) -> usize {
        self.detection_range
    }

    pub fn entry_regex(&self) -> &Regex {
        &self.entry_regex
    }

    pub fn new_entry_start_regex(&self) -> &Regex {
        &self.new_entry_start_regex
    }

    pub fn version_regex(&self) -> &Regex {
        &self.version_regex
    }

    pub fn device_regex(&self) -> &Regex {
        &self.device_regex
    }

    pub fn os_regex(&self) -> &Regex {
        &self.os_regex
    }

    pub fn system_info_lines_to_check(&self) -> u64 {
        self.system_info_lines_to_check
    }

    pub fn log_levels(&self) -> &[LogLevel] {
        &self.log_levels
    }

    pub fn filter_presets(&self) -> &[FilterPreset] {
        &self.filter_presets
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // -------------------------------------------------------------------------
    // Edits (persistence is the caller's job)
    // -------------------------------------------------------------------------

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn set_icon(&mut self, icon: Option<String>) {
        self.icon = icon;
    }

    pub fn set_detection(&mut self, regex: &str, range: usize) -> Result<(), ProfileError> {
        self.detection_regex = compile_regex(&self.name, "detection.regex", regex)?;
        self.detection_range = range;
        Ok(())
    }

    pub fn set_entry_regex(&mut self, regex: &str) -> Result<(), ProfileError> {
        self.entry_regex = compile_regex(&self.name, "entries.regex", regex)?;
        Ok(())
    }

    pub fn set_new_entry_start_regex(&mut self, regex: &str) -> Result<(), ProfileError> {
        self.new_entry_start_regex =
            compile_regex(&self.name, "entries.new_entry_start_regex", regex)?;
        Ok(())
    }

    pub fn set_version_regex(&mut self, regex: &str) -> Result<(), ProfileError> {
        self.version_regex = compile_regex(&self.name, "system_info.version_regex", regex)?;
        Ok(())
    }

    pub fn set_device_regex(&mut self, regex: &str) -> Result<(), ProfileError> {
        self.device_regex = compile_regex(&self.name, "system_info.device_regex", regex)?;
        Ok(())
    }

    pub fn set_os_regex(&mut self, regex: &str) -> Result<(), ProfileError> {
        self.os_regex = compile_regex(&self.name, "system_info.os_regex", regex)?;
        Ok(())
    }

    pub fn set_system_info_lines_to_check(&mut self, lines: u64) {
        self.system_info_lines_to_check = lines;
    }

    pub fn set_log_levels(&mut self, levels: Vec<LogLevel>) {
        self.log_levels = levels;
    }

    pub fn add_filter_preset(&mut self, preset: FilterPreset) {
        self.filter_presets.push(preset);
    }

    /// Remove every preset with the given name. Returns how many were removed.
    pub fn remove_filter_preset(&mut self, name: &str) -> usize {
        let before = self.filter_presets.len();
        self.filter_presets.retain(|p| p.name != name);
        before - self.filter_presets.len()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
    }

    pub(crate) fn mark_read_only(&mut self) {
        self.read_only = true;
    }

    // -------------------------------------------------------------------------
    // Documents
    // -------------------------------------------------------------------------

    /// Full document form; every field is written explicitly.
    pub fn to_document(&self) -> ProfileDocument {
        ProfileDocument {
            profile: ProfileMeta {
                name: Some(self.name.clone()),
                priority: Some(self.priority),
                icon: self.icon.clone(),
            },
            detection: DetectionDef {
                regex: Some(self.detection_regex.as_str().to_string()),
                range: Some(self.detection_range),
            },
            entries: EntriesDef {
                regex: Some(self.entry_regex.as_str().to_string()),
                new_entry_start_regex: Some(self.new_entry_start_regex.as_str().to_string()),
            },
            system_info: SystemInfoDef {
                version_regex: Some(self.version_regex.as_str().to_string()),
                device_regex: Some(self.device_regex.as_str().to_string()),
                os_regex: Some(self.os_regex.as_str().to_string()),
                lines_to_check: Some(self.system_info_lines_to_check),
            },
            log_levels: self.log_levels.clone(),
            filter_presets: self.filter_presets.clone(),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ProfileError> {
        toml::to_string(&self.to_document()).map_err(|e| ProfileError::TomlSerialize {
            profile: self.name.clone(),
            source: e,
        })
    }
}

// =============================================================================
// Profile validation and compilation
// =============================================================================

/// Parse a TOML string into a `ProfileDocument`.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_profile_toml(
    toml_content: &str,
    source_path: &Path,
) -> Result<ProfileDocument, ProfileError> {
    toml::from_str(toml_content).map_err(|e| ProfileError::TomlParse {
        path: source_path.to_path_buf(),
        source: e,
    })
}

/// Validate a `ProfileDocument` and compile it into a writable `LogProfile`
/// backed by `source_path`.
///
/// Missing fields fall back to the built-in default profile. A missing name
/// falls back to the document's file stem.
pub fn validate_and_compile(
    doc: ProfileDocument,
    source_path: &Path,
) -> Result<LogProfile, ProfileError> {
    let raw_name = doc.profile.name.unwrap_or_else(|| {
        source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let mut name = filter_name(&raw_name);
    if name.is_empty() {
        name = constants::UNNAMED_PROFILE_NAME.to_string();
    }

    let base = LogProfile::builtin_default();
    let compile_or = |field: &'static str, pattern: Option<String>, fallback: &Regex| {
        match pattern {
            Some(p) => compile_regex(&name, field, &p),
            None => Ok(fallback.clone()),
        }
    };

    let detection_regex = compile_or("detection.regex", doc.detection.regex, &base.detection_regex)?;
    let entry_regex = compile_or("entries.regex", doc.entries.regex, &base.entry_regex)?;
    let new_entry_start_regex = compile_or(
        "entries.new_entry_start_regex",
        doc.entries.new_entry_start_regex,
        &base.new_entry_start_regex,
    )?;
    let version_regex = compile_or(
        "system_info.version_regex",
        doc.system_info.version_regex,
        &base.version_regex,
    )?;
    let device_regex = compile_or(
        "system_info.device_regex",
        doc.system_info.device_regex,
        &base.device_regex,
    )?;
    let os_regex = compile_or("system_info.os_regex", doc.system_info.os_regex, &base.os_regex)?;

    if !entry_regex.capture_names().flatten().any(|n| n == "message") {
        tracing::warn!(
            profile = %name,
            source = %source_path.display(),
            "Profile entry regex has no 'message' capture group; \
             matched entries will have an empty message"
        );
    }

    Ok(LogProfile {
        name,
        priority: doc
            .profile
            .priority
            .unwrap_or(constants::DEFAULT_DOCUMENT_PRIORITY),
        icon: doc.profile.icon,
        detection_regex,
        detection_range: doc
            .detection
            .range
            .unwrap_or(constants::DEFAULT_DETECTION_RANGE),
        entry_regex,
        new_entry_start_regex,
        version_regex,
        device_regex,
        os_regex,
        system_info_lines_to_check: doc
            .system_info
            .lines_to_check
            .unwrap_or(constants::DEFAULT_SYSTEM_INFO_LINES_TO_CHECK),
        log_levels: doc.log_levels,
        filter_presets: doc.filter_presets,
        read_only: false,
        path: Some(source_path.to_path_buf()),
    })
}

/// Parse and compile in one step.
pub fn profile_from_toml(content: &str, source_path: &Path) -> Result<LogProfile, ProfileError> {
    parse_profile_toml(content, source_path).and_then(|doc| validate_and_compile(doc, source_path))
}

/// Compile a regex pattern with length validation to prevent ReDoS.
fn compile_regex(profile: &str, field: &'static str, pattern: &str) -> Result<Regex, ProfileError> {
    if pattern.len() > constants::MAX_REGEX_PATTERN_LENGTH {
        return Err(ProfileError::RegexTooLong {
            profile: profile.to_string(),
            field,
            length: pattern.len(),
            max_length: constants::MAX_REGEX_PATTERN_LENGTH,
        });
    }

    Regex::new(pattern).map_err(|e| ProfileError::InvalidRegex {
        profile: profile.to_string(),
        field,
        pattern: pattern.to_string(),
        source: e,
    })
}

// =============================================================================
// Profile set and auto-detection
// =============================================================================

/// The loaded profiles, ordered by descending priority, plus the built-in
/// default used when nothing matches.
///
/// Profiles are shared through `Arc`; editing one through `edit` clones it
/// if a parse result still holds the previous version.
#[derive(Debug, Clone)]
pub struct ProfileSet {
    profiles: Vec<Arc<LogProfile>>,
    default: Arc<LogProfile>,
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self {
            profiles: Vec::new(),
            default: Arc::new(LogProfile::builtin_default()),
        }
    }
}

impl ProfileSet {
    pub fn new(profiles: Vec<LogProfile>) -> Self {
        let mut set = Self {
            profiles: profiles.into_iter().map(Arc::new).collect(),
            ..Self::default()
        };
        set.sort();
        set
    }

    /// Stable sort by descending priority.
    pub fn sort(&mut self) {
        self.profiles.sort_by_key(|p| std::cmp::Reverse(p.priority()));
    }

    /// Insert keeping the priority order; equal priorities keep insertion order.
    pub fn insert(&mut self, profile: LogProfile) {
        let at = self
            .profiles
            .iter()
            .position(|p| p.priority() < profile.priority())
            .unwrap_or(self.profiles.len());
        self.profiles.insert(at, Arc::new(profile));
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<LogProfile>> {
        let idx = self.profiles.iter().position(|p| p.name() == name)?;
        Some(self.profiles.remove(idx))
    }

    /// Look up a loaded profile or the default by name.
    pub fn get(&self, name: &str) -> Option<&Arc<LogProfile>> {
        self.profiles
            .iter()
            .find(|p| p.name() == name)
            .or_else(|| (self.default.name() == name).then_some(&self.default))
    }

    /// Edit a loaded profile in place, then restore priority order.
    /// Returns `None` for unknown names; the default is not reachable here.
    pub fn edit<R>(&mut self, name: &str, edit: impl FnOnce(&mut LogProfile) -> R) -> Option<R> {
        let slot = self.profiles.iter_mut().find(|p| p.name() == name)?;
        let result = edit(Arc::make_mut(slot));
        self.sort();
        Some(result)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Loaded profiles in detection order (the default is not included).
    pub fn iter(&self) -> impl Iterator<Item = &Arc<LogProfile>> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn default_profile(&self) -> &Arc<LogProfile> {
        &self.default
    }

    /// Number of leading lines any profile wants to inspect.
    pub fn max_detection_lines(&self) -> usize {
        self.profiles
            .iter()
            .map(|p| p.detection_range())
            .max()
            .unwrap_or(0)
    }

    /// Select the profile for a log by testing its first lines.
    ///
    /// Profiles are tried in priority order; each checks its own first
    /// `detection_range` lines. The first profile with any hit wins.
    pub fn find_matching_profile<S: AsRef<str>>(&self, first_lines: &[S]) -> Arc<LogProfile> {
        for profile in &self.profiles {
            let hit = first_lines
                .iter()
                .take(profile.detection_range())
                .enumerate()
                .any(|(idx, line)| profile.is_profile(line.as_ref(), idx + 1));
            if hit {
                tracing::debug!(
                    profile = %profile.name(),
                    priority = profile.priority(),
                    "Profile detected"
                );
                return Arc::clone(profile);
            }
        }

        tracing::debug!(
            candidates = self.profiles.len(),
            "No profile matched; using default"
        );
        Arc::clone(&self.default)
    }
}

// =============================================================================
// Tests
// =============================================================================
