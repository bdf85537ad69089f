// LogLens - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogLens";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogLens";

/// Current library version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Parsing
// =============================================================================

/// Marker inserted between the physical lines of a coalesced multi-line entry.
///
/// A printable return symbol rather than `\n`, so one logical entry stays a
/// single addressable line of text for display collaborators.
pub const SOFT_LINE_BREAK: char = '\u{23CE}';

/// Century prepended to the two-digit year captured by entry regexes.
pub const TIMESTAMP_CENTURY_PREFIX: &str = "20";

/// Initial capacity reserved for the entry vector of a parse.
pub const ENTRY_VEC_INITIAL_CAPACITY: usize = 4_096;

/// File size threshold in bytes above which a log file is memory-mapped
/// instead of read into a heap buffer.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 64 * 1024 * 1024; // 64 MB

/// Smallest accepted large-file threshold.
pub const MIN_LARGE_FILE_THRESHOLD: u64 = 1024 * 1024; // 1 MB

/// Default number of worker threads for batch loading.
/// 0 means auto-detect (use available CPU cores).
pub const DEFAULT_WORKER_THREADS: usize = 0;

/// Hard upper bound on configured worker threads.
pub const MAX_WORKER_THREADS: usize = 64;

// =============================================================================
// Profiles
// =============================================================================

/// Maximum length of a sanitised profile name, in characters.
pub const MAX_PROFILE_NAME_LENGTH: usize = 40;

/// Characters stripped from profile names because they are hostile to file paths.
pub const PROFILE_NAME_FORBIDDEN_CHARS: &[char] = &['¥', '/', '.', '?', '*', '|', '<', '>', ':'];

/// File extension reserved for profile documents.
pub const PROFILE_FILE_EXTENSION: &str = "toml";

/// Suffix appended to a profile document when copy-on-write keeps a backup.
pub const PROFILE_BACKUP_SUFFIX: &str = ".back";

/// Whether profile saves keep a backup of the previous document by default.
pub const DEFAULT_COPY_ON_WRITE: bool = false;

/// Maximum number of profiles loaded from the profiles directory.
pub const MAX_PROFILES: usize = 100;

/// Maximum size of a single profile document in bytes.
pub const MAX_PROFILE_FILE_SIZE: u64 = 256 * 1024; // 256 KB

/// Maximum length of any regex pattern in a profile or filter.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4_096;

/// Name of the built-in fallback profile.
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// Name given to a profile document whose name is empty after sanitising.
pub const UNNAMED_PROFILE_NAME: &str = "Unnamed";

/// Detection range used when a profile document omits it.
pub const DEFAULT_DETECTION_RANGE: usize = 10;

/// Priority used when a profile document omits it.
pub const DEFAULT_DOCUMENT_PRIORITY: i32 = 1;

/// Number of leading entries searched for version/device/OS information.
pub const DEFAULT_SYSTEM_INFO_LINES_TO_CHECK: u64 = 100;

// =============================================================================
// Logging
// =============================================================================

/// Default log level when neither RUST_LOG, a debug flag nor config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum characters of a log line included in debug log previews.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// File names
// =============================================================================

/// Name of the application configuration file.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Name of the profiles directory below the application data directory.
pub const PROFILES_DIR_NAME: &str = "profiles";
