// LogLens - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Per-line and per-field problems never become errors; they are absorbed
// into field-level fallbacks by the parser. Only source-unavailable and
// profile-validation failures surface to callers.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LogLens operations.
#[derive(Debug)]
pub enum LogLensError {
    /// Profile loading, validation or persistence failed.
    Profile(ProfileError),

    /// Log source could not be read.
    Parse(ParseError),

    /// Filter pattern could not be compiled.
    Filter(FilterError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// Background load failed.
    Load(LoadError),
}

impl fmt::Display for LogLensError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile(e) => write!(f, "Profile error: {e}"),
            Self::Parse(e) => write!(f, "Parse error: {e}"),
            Self::Filter(e) => write!(f, "Filter error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Load(e) => write!(f, "Load error: {e}"),
        }
    }
}

impl std::error::Error for LogLensError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Profile(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Filter(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Load(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Profile errors
// ---------------------------------------------------------------------------

/// Errors related to profile documents and their validation.
#[derive(Debug)]
pub enum ProfileError {
    /// TOML document could not be parsed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Profile could not be serialised back to TOML.
    TomlSerialize {
        profile: String,
        source: toml::ser::Error,
    },

    /// Profile document exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// A regex pattern in the profile is invalid.
    InvalidRegex {
        profile: String,
        field: &'static str,
        pattern: String,
        source: regex::Error,
    },

    /// A regex pattern exceeds the maximum allowed length.
    RegexTooLong {
        profile: String,
        field: &'static str,
        length: usize,
        max_length: usize,
    },

    /// The profile is read-only (built-in or deleted) and cannot be changed.
    ReadOnly { profile: String },

    /// No profile with the given name is loaded.
    NotFound { profile: String },

    /// Another loaded profile already uses this name.
    DuplicateName { profile: String },

    /// Maximum number of profiles exceeded.
    TooManyProfiles { count: usize, max: usize },

    /// I/O error reading, writing or removing a profile document.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Failed to parse profile '{}': {source}", path.display())
            }
            Self::TomlSerialize { profile, source } => {
                write!(f, "Failed to serialise profile '{profile}': {source}")
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Profile '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::InvalidRegex {
                profile,
                field,
                pattern,
                source,
            } => write!(
                f,
                "Profile '{profile}': invalid regex in '{field}' ('{pattern}'): {source}"
            ),
            Self::RegexTooLong {
                profile,
                field,
                length,
                max_length,
            } => write!(
                f,
                "Profile '{profile}': regex in '{field}' is {length} chars, \
                 exceeds maximum of {max_length}"
            ),
            Self::ReadOnly { profile } => write!(f, "Profile '{profile}' is read-only"),
            Self::NotFound { profile } => write!(f, "Profile '{profile}' not found"),
            Self::DuplicateName { profile } => {
                write!(f, "A profile named '{profile}' already exists")
            }
            Self::TooManyProfiles { count, max } => {
                write!(f, "Too many profiles loaded ({count}), maximum is {max}")
            }
            Self::Io { path, source } => {
                write!(f, "I/O error on profile '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ProfileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::TomlSerialize { source, .. } => Some(source),
            Self::InvalidRegex { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ProfileError> for LogLensError {
    fn from(e: ProfileError) -> Self {
        Self::Profile(e)
    }
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Errors related to reading a log source.
#[derive(Debug)]
pub enum ParseError {
    /// The log file could not be opened.
    SourceUnavailable { path: PathBuf, source: io::Error },

    /// Reading from an already-open source failed part-way.
    Read { source: io::Error },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable { path, source } => {
                write!(f, "cannot open '{}': {source}", path.display())
            }
            Self::Read { source } => write!(f, "read failed: {source}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SourceUnavailable { source, .. } => Some(source),
            Self::Read { source } => Some(source),
        }
    }
}

impl From<ParseError> for LogLensError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Filter errors
// ---------------------------------------------------------------------------

/// Errors related to filter text patterns.
#[derive(Debug, Clone)]
pub enum FilterError {
    /// User-provided regex is invalid.
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegex { pattern, source } => {
                write!(f, "Invalid filter regex '{pattern}': {source}")
            }
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRegex { source, .. } => Some(source),
        }
    }
}

impl From<FilterError> for LogLensError {
    fn from(e: FilterError) -> Self {
        Self::Filter(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LogLensError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Load errors
// ---------------------------------------------------------------------------

/// Errors delivered by a background load.
#[derive(Debug)]
pub enum LoadError {
    /// The source could not be read.
    Parse(ParseError),

    /// The worker thread exited without reporting a result.
    WorkerLost,

    /// The batch worker pool could not be built.
    ThreadPool { reason: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::WorkerLost => write!(f, "load worker exited without a result"),
            Self::ThreadPool { reason } => write!(f, "cannot start worker pool: {reason}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for LoadError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<LoadError> for LogLensError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

/// Convenience type alias for LogLens results.
pub type Result<T> = std::result::Result<T, LogLensError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_load_error_chain_reaches_io_error() {
        let parse = ParseError::SourceUnavailable {
            path: PathBuf::from("/var/log/app.log"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        let top: LogLensError = LoadError::from(parse).into();

        assert!(top.to_string().starts_with("Load error: cannot open '/var/log/app.log'"));
        let parse = top.source().and_then(|e| e.source()).unwrap();
        assert!(parse.source().unwrap().to_string().contains("missing"));
    }

    #[test]
    fn test_profile_error_messages_name_the_profile() {
        let e: LogLensError = ProfileError::ReadOnly {
            profile: "Default".to_string(),
        }
        .into();
        assert_eq!(e.to_string(), "Profile error: Profile 'Default' is read-only");
        assert!(e.source().unwrap().source().is_none());
    }
}
