// LogLens - platform/config.rs
//
// Platform directory resolution and config.toml loading with startup
// validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LogLens configuration and profiles.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/loglens/ or %APPDATA%\LogLens\config\)
    pub config_dir: PathBuf,

    /// Profile document directory (e.g. ~/.local/share/loglens/profiles/ or
    /// %APPDATA%\LogLens\data\profiles\)
    pub profiles_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let profiles_dir = proj_dirs.data_dir().join(constants::PROFILES_DIR_NAME);

            tracing::debug!(
                config = %config_dir.display(),
                profiles = %profiles_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                profiles_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                profiles_dir: fallback.join(constants::PROFILES_DIR_NAME),
                config_dir: fallback,
            }
        }
    }

    /// Profiles directory, honouring a `[profiles] directory` override.
    pub fn effective_profiles_dir(&self, config: &AppConfig) -> PathBuf {
        config
            .profiles_dir
            .clone()
            .unwrap_or_else(|| self.profiles_dir.clone())
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so a newer config file still loads.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub profiles: ProfilesSection,
    pub parsing: ParsingSection,
    pub logging: LoggingSection,
}

/// `[profiles]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ProfilesSection {
    /// Profile directory override.
    pub directory: Option<String>,
    /// Keep a `.back` copy of a profile document before overwriting it.
    pub copy_on_write: Option<bool>,
}

/// `[parsing]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ParsingSection {
    /// Files above this size are memory-mapped.
    pub large_file_threshold_bytes: Option<u64>,
    /// Number of worker threads for batch loading (0 = auto).
    pub worker_threads: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated configuration derived from `config.toml`.
///
/// Invalid values are reported and replaced by their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub profiles_dir: Option<PathBuf>,
    pub copy_on_write: bool,
    pub large_file_threshold: u64,
    pub worker_threads: usize,
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profiles_dir: None,
            copy_on_write: constants::DEFAULT_COPY_ON_WRITE,
            large_file_threshold: constants::DEFAULT_LARGE_FILE_THRESHOLD,
            worker_threads: constants::DEFAULT_WORKER_THREADS,
            log_level: None,
        }
    }
}

/// Load and validate `config.toml` from `config_dir`.
///
/// A missing file yields defaults and no warnings. An unreadable or
/// unparseable file yields defaults plus the error; startup continues.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<ConfigError>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %config_path.display(), error = %e, "Could not read config file");
            return (
                AppConfig::default(),
                vec![ConfigError::Io {
                    path: config_path,
                    source: e,
                }],
            );
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(path = %config_path.display(), error = %e, "Failed to parse config file");
            return (
                AppConfig::default(),
                vec![ConfigError::TomlParse {
                    path: config_path,
                    source: e,
                }],
            );
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");
    validate(raw)
}

/// Validate each field against named constants, accumulating all problems.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<ConfigError>) {
    let mut config = AppConfig::default();
    let mut warnings = Vec::new();

    // -- Profiles --
    if let Some(dir) = raw.profiles.directory {
        if dir.trim().is_empty() {
            warnings.push(ConfigError::ValueOutOfRange {
                field: "profiles.directory".to_string(),
                value: dir,
                expected: "a non-empty path".to_string(),
            });
        } else {
            config.profiles_dir = Some(PathBuf::from(dir));
        }
    }
    if let Some(cow) = raw.profiles.copy_on_write {
        config.copy_on_write = cow;
    }

    // -- Parsing: large_file_threshold_bytes --
    if let Some(threshold) = raw.parsing.large_file_threshold_bytes {
        if threshold >= constants::MIN_LARGE_FILE_THRESHOLD {
            config.large_file_threshold = threshold;
        } else {
            warnings.push(ConfigError::ValueOutOfRange {
                field: "parsing.large_file_threshold_bytes".to_string(),
                value: threshold.to_string(),
                expected: format!(">= {}", constants::MIN_LARGE_FILE_THRESHOLD),
            });
        }
    }

    // -- Parsing: worker_threads --
    if let Some(threads) = raw.parsing.worker_threads {
        if threads <= constants::MAX_WORKER_THREADS {
            config.worker_threads = threads;
        } else {
            warnings.push(ConfigError::ValueOutOfRange {
                field: "parsing.worker_threads".to_string(),
                value: threads.to_string(),
                expected: format!("0-{} (0 = auto)", constants::MAX_WORKER_THREADS),
            });
        }
    }

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(ConfigError::ValueOutOfRange {
                field: "logging.level".to_string(),
                value: level,
                expected: "error, warn, info, debug or trace".to_string(),
            });
        }
    }

    for warning in &warnings {
        tracing::warn!(warning = %warning, "Config value rejected");
    }

    (config, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> (AppConfig, Vec<ConfigError>) {
        validate(toml::from_str(content).unwrap())
    }

    #[test]
    fn test_empty_config_gives_defaults() {
        let (config, warnings) = parse("");
        assert_eq!(config, AppConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_valid_values_are_applied() {
        let (config, warnings) = parse(
            r#"
[profiles]
directory = "/srv/profiles"
copy_on_write = true

[parsing]
large_file_threshold_bytes = 2097152
worker_threads = 4

[logging]
level = "DEBUG"
"#,
        );
        assert!(warnings.is_empty());
        assert_eq!(config.profiles_dir, Some(PathBuf::from("/srv/profiles")));
        assert!(config.copy_on_write);
        assert_eq!(config.large_file_threshold, 2_097_152);
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        let (config, warnings) = parse(
            r#"
[parsing]
large_file_threshold_bytes = 10
worker_threads = 1000

[logging]
level = "loud"
"#,
        );
        assert_eq!(warnings.len(), 3);
        assert!(warnings
            .iter()
            .all(|w| matches!(w, ConfigError::ValueOutOfRange { .. })));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let (config, warnings) = parse("[ui]\ntheme = \"dark\"\n");
        assert!(warnings.is_empty());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_config_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(dir.path());
        assert_eq!(config, AppConfig::default());
        assert!(warnings.is_empty());

        std::fs::write(dir.path().join(constants::CONFIG_FILE_NAME), "[parsing\n").unwrap();
        let (_, warnings) = load_config(dir.path());
        assert!(matches!(warnings[0], ConfigError::TomlParse { .. }));
    }

    #[test]
    fn test_profiles_dir_override() {
        let paths = PlatformPaths {
            config_dir: PathBuf::from("/cfg"),
            profiles_dir: PathBuf::from("/cfg/profiles"),
        };
        assert_eq!(
            paths.effective_profiles_dir(&AppConfig::default()),
            PathBuf::from("/cfg/profiles")
        );
        let config = AppConfig {
            profiles_dir: Some(PathBuf::from("/elsewhere")),
            ..AppConfig::default()
        };
        assert_eq!(
            paths.effective_profiles_dir(&config),
            PathBuf::from("/elsewhere")
        );
    }
}
