// LogLens - tests/e2e_parsing.rs
//
// End-to-end tests for the parse, filter and profile persistence pipeline.
//
// These run against real files: fixture logs in tests/fixtures, profile
// documents written to temporary directories, and background loads on real
// threads.

use loglens::app::loader::{self, LoadManager, LoadOptions, LoadOutcome};
use loglens::app::profile_mgr::{self, ProfileStore};
use loglens::core::filter::{FilterMode, LogFilter, TextMatchMode};
use loglens::core::holder::LogHolder;
use loglens::core::level::{Alignment, Color, LogLevel};
use loglens::core::model::{LogEntry, LogSource};
use loglens::core::profile::{self, ProfileSet};
use loglens::platform::config::{self, PlatformPaths};
use loglens::util::constants;
use std::path::PathBuf;
use std::sync::Arc;

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to the on-disk fixture files.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_text(text: &str) -> LogHolder {
    let mut holder = LogHolder::new();
    holder.load_text(text, &ProfileSet::default());
    holder.filter(|_| true);
    holder
}

/// A store in a fresh temp directory with the bracket fixture imported.
fn store_with_bracket_profile() -> (tempfile::TempDir, ProfileStore) {
    let dir = tempfile::tempdir().unwrap();
    let (mut store, errors) = ProfileStore::open(dir.path(), false);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    store
        .import(&fixture("profiles/bracket.toml"))
        .expect("fixture profile imports");
    (dir, store)
}

fn assert_sequential(entries: &[LogEntry]) {
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.entry_number(), i as u64 + 1);
    }
    assert!(entries
        .windows(2)
        .all(|w| w[0].line_number() <= w[1].line_number()));
}

// =============================================================================
// Parsing scenarios
// =============================================================================

#[test]
fn e2e_two_entries_with_levels_and_deltas() {
    let holder = load_text(
        "23-01-15 10:00:00.000 INFO first in a() function at line 1\n\
         23-01-15 10:00:01.000 DEBUG second in b() function at line 2\n",
    );
    let entries = holder.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].level().name(), "INFO");
    assert_eq!(entries[1].level().name(), "DEBUG");
    assert_eq!(entries[0].since_start(), chrono::Duration::zero());
    assert!(entries[1].since_previous() > chrono::Duration::zero());
    assert_sequential(entries);
}

#[test]
fn e2e_plain_text_is_one_unleveled_entry() {
    let holder = load_text("this is just plain text\n");
    assert_eq!(holder.len(), 1);
    let entry = &holder.entries()[0];
    assert_eq!(entry.message(), "this is just plain text");
    assert_eq!(entry.original_message(), "this is just plain text");
    assert_eq!(entry.level().name(), "");
    assert!(entry.timestamp().is_none());
}

#[test]
fn e2e_continuation_lines_coalesce() {
    let holder = load_text(
        "23-01-15 10:00:00 ERROR boom in f() function at line 1\n\
         first detail\n\
         second detail\n",
    );
    assert_eq!(holder.len(), 1);
    assert_eq!(holder.entries()[0].line_count(), 3);
    assert_eq!(holder.filtered_line_count(), 3);
    assert_eq!(holder.max_line_number(), 3);
}

#[test]
fn e2e_version_line_fills_system_info() {
    let holder = load_text(
        "Version: 4.0.0\n\
         23-01-15 10:00:00 INFO ready in main() function at line 1\n",
    );
    assert!(holder.system_info().to_string().contains("4.0.0"));
}

#[test]
fn e2e_include_filter_on_error_and_warn() {
    let mut holder = load_text(
        "23-01-15 10:00:00 INFO fine in f() function at line 1\n\
         23-01-15 10:00:01 WARN careful in f() function at line 2\n\
         23-01-15 10:00:02 ERROR broken in f() function at line 3\n\
         23-01-15 10:00:03 INFO ERROR in text only in f() function at line 4\n",
    );
    let mut filter = LogFilter::new("Problems");
    filter.set_included_levels(["ERROR", "WARN"]);
    holder.filter(filter.predicate());

    let levels: Vec<&str> = holder.filtered_entries().map(|e| e.level().name()).collect();
    assert_eq!(levels, vec!["WARN", "ERROR"]);
}

// =============================================================================
// Fixture files
// =============================================================================

#[test]
fn e2e_fixture_with_default_profile() {
    let holder = loader::load_holder(
        &LogSource::Path(fixture("app_sample.log")),
        &ProfileSet::default(),
        LoadOptions::default(),
    )
    .unwrap();

    assert_eq!(
        holder.profile().unwrap().name(),
        constants::DEFAULT_PROFILE_NAME
    );
    assert_eq!(holder.len(), 6);
    assert_eq!(holder.max_line_number(), 10);
    assert_sequential(holder.entries());

    // The preamble is one unmatched entry spanning three lines.
    let preamble = &holder.entries()[0];
    assert_eq!(preamble.line_count(), 3);
    assert_eq!(preamble.level().name(), "");

    let info = holder.system_info();
    assert_eq!(info.version.as_deref(), Some("4.0.0 (1234)"));
    assert_eq!(info.device.as_deref(), Some("Pixel 7"));
    assert_eq!(info.os.as_deref(), Some("Android 13, SDK 33"));

    let error = &holder.entries()[4];
    assert_eq!(error.level().name(), "ERROR");
    assert_eq!(error.message(), "request failed");
    assert_eq!(error.location(), "in fetch() function at line 95");
    assert_eq!(error.line_count(), 3);

    let debug = &holder.entries()[2];
    assert_eq!(debug.since_previous(), chrono::Duration::milliseconds(250));

    // Rows: 0..=2 preamble, 3 INFO, 4 DEBUG, 5 WARN, 6..=8 ERROR, 9 INFO.
    assert_eq!(holder.filtered_line_count(), 10);
    assert_eq!(holder.filtered_entry_number(7), Some(5));
    assert_eq!(holder.filtered_line_number(7), Some(7));
}

#[test]
fn e2e_filters_over_fixture() {
    let mut holder = loader::load_holder(
        &LogSource::Path(fixture("app_sample.log")),
        &ProfileSet::default(),
        LoadOptions::default(),
    )
    .unwrap();

    let mut exclude = LogFilter::new("hide fetch");
    exclude.set_mode(FilterMode::Exclude);
    exclude.set_search_text("fetch");
    holder.filter(exclude.predicate());
    // Exclude matches message or raw text; every fetch() line is hidden.
    assert_eq!(holder.filtered_entries().len(), 3);

    let mut regex = LogFilter::new("started or loaded");
    regex.set_text_match_mode(TextMatchMode::Regex);
    regex.set_search_text("^(app started|config loaded)$");
    holder.filter(regex.predicate());
    assert_eq!(holder.filtered_entries().len(), 2);

    let found = holder.find(|e| e.level().name() == "INFO");
    assert_eq!(found.len(), 2);
    assert!(holder.find_filtered(|e| e.level().name() == "WARN").is_empty());
}

#[test]
fn e2e_imported_profile_detects_and_styles_levels() {
    let (_dir, store) = store_with_bracket_profile();
    let profiles = store.snapshot();

    let holder = loader::load_holder(
        &LogSource::Path(fixture("bracket_sample.log")),
        &profiles,
        LoadOptions::default(),
    )
    .unwrap();

    assert_eq!(holder.profile().unwrap().name(), "Bracket Service");
    assert_eq!(holder.len(), 4);
    assert_sequential(holder.entries());

    let failed = &holder.entries()[2];
    assert_eq!(failed.thread(), "worker-1");
    assert_eq!(failed.line_count(), 2);
    assert!(failed.message().starts_with("job failed"));
    assert_eq!(failed.level().background_color(), Color::rgb(0xc0, 0x00, 0x00));
    assert_eq!(failed.level().alignment(), Alignment::Left);
    assert!(failed.timestamp().is_some());

    // The app log still falls back to the default profile.
    let head = profile_head(&fixture("app_sample.log"), &profiles);
    assert_eq!(head, constants::DEFAULT_PROFILE_NAME);
}

fn profile_head(path: &std::path::Path, profiles: &ProfileSet) -> String {
    loader::detect_profile(path, profiles)
        .unwrap()
        .name()
        .to_string()
}

#[test]
fn e2e_presets_from_profile_document() {
    let (_dir, store) = store_with_bracket_profile();
    let profiles = store.snapshot();
    let mut holder = loader::load_holder(
        &LogSource::Path(fixture("bracket_sample.log")),
        &profiles,
        LoadOptions::default(),
    )
    .unwrap();

    let presets = holder.profile().unwrap().filter_presets().to_vec();
    assert_eq!(presets.len(), 2);

    let problems = LogFilter::from_preset(&presets[0]);
    holder.filter(problems.predicate());
    let shown: Vec<&str> = holder.filtered_entries().map(|e| e.level().name()).collect();
    assert_eq!(shown, vec!["WARN", "ERROR"]);

    let no_retries = LogFilter::from_preset(&presets[1]);
    assert_eq!(no_retries.mode(), FilterMode::Exclude);
    holder.filter(no_retries.predicate());
    assert_eq!(holder.filtered_entries().len(), 3);
    assert!(holder
        .filtered_entries()
        .all(|e| !e.message().contains("retried")));
}

// =============================================================================
// Profile persistence
// =============================================================================

#[test]
fn e2e_profile_round_trip_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let (mut store, _) = ProfileStore::open(dir.path(), true);
    store.create("Round Trip", r"^RT\d", 4).unwrap();

    let edited = store
        .update("Round Trip", |p| {
            p.set_priority(9);
            p.set_icon(Some("rt.png".to_string()));
            p.set_entry_regex(r"^RT(?P<level>\d) (?P<message>.*)$")?;
            p.set_new_entry_start_regex(r"^RT\d")?;
            p.set_version_regex(r"v(?P<version>\d+)")?;
            p.set_device_regex(r"dev=(?P<device>\w+)")?;
            p.set_os_regex(r"os=(?P<os>\w+)")?;
            p.set_system_info_lines_to_check(7);
            p.set_log_levels(vec![LogLevel::with_style(
                "1",
                Color::rgb(1, 2, 3),
                Color::TRANSPARENT,
                Alignment::Right,
            )]);
            Ok(())
        })
        .unwrap();

    let mut filter = LogFilter::new("Ones");
    filter.set_included_levels(["1"]);
    filter.set_search_text("boot");
    filter.set_case_sensitive(true);
    let edited_with_preset = store.add_filter_preset("Round Trip", &filter).unwrap();
    assert_eq!(edited_with_preset.priority(), edited.priority());

    let (reloaded, errors) = profile_mgr::load_profile_dir(dir.path());
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    let back = reloaded.get("Round Trip").unwrap();
    assert_eq!(
        back.to_toml_string().unwrap(),
        edited_with_preset.to_toml_string().unwrap()
    );
    assert_eq!(back.filter_presets()[0], filter.to_preset());

    // The second save kept a copy of the first.
    assert!(dir.path().join("Round Trip.toml.back").exists());
}

#[test]
fn e2e_profile_name_sanitising() {
    let long = "a/b.c?d*e|f<g>h:i".repeat(5);
    let once = profile::filter_name(&long);
    assert!(once.chars().count() <= constants::MAX_PROFILE_NAME_LENGTH);
    assert_eq!(profile::filter_name(&once), once);
}

#[test]
fn e2e_store_from_config_file() {
    let config_dir = tempfile::tempdir().unwrap();
    let profiles_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        config_dir.path().join(constants::CONFIG_FILE_NAME),
        format!(
            "[profiles]\ndirectory = {:?}\ncopy_on_write = false\n",
            profiles_dir.path().display().to_string()
        ),
    )
    .unwrap();
    std::fs::copy(
        fixture("profiles/bracket.toml"),
        profiles_dir.path().join("bracket.toml"),
    )
    .unwrap();

    let (app_config, warnings) = config::load_config(config_dir.path());
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

    let paths = PlatformPaths {
        config_dir: config_dir.path().to_path_buf(),
        profiles_dir: config_dir.path().join(constants::PROFILES_DIR_NAME),
    };
    let (store, errors) = ProfileStore::from_config(&paths, &app_config);
    assert!(errors.is_empty());
    assert_eq!(store.dir(), profiles_dir.path());
    assert!(store.get("Bracket Service").is_some());
}

// =============================================================================
// Background loading
// =============================================================================

#[test]
fn e2e_background_load_of_fixture() {
    let (_dir, store) = store_with_bracket_profile();
    let mut manager = LoadManager::new();
    manager.start(
        LogSource::Path(fixture("bracket_sample.log")),
        store.snapshot(),
        LoadOptions::default(),
    );

    match manager.wait() {
        Some(LoadOutcome::Loaded(holder)) => {
            assert_eq!(holder.len(), 4);
            assert_eq!(holder.filtered_entries().len(), 4);
        }
        other => panic!("expected a loaded holder, got {other:?}"),
    }
}

#[test]
fn e2e_batch_load_mixed_sources() {
    let profiles = Arc::new(ProfileSet::default());
    let sources = vec![
        LogSource::Path(fixture("app_sample.log")),
        LogSource::Path(fixture("does_not_exist.log")),
        LogSource::Text("plain\n".to_string()),
    ];
    let results = loader::load_many(&sources, &profiles, LoadOptions::default()).unwrap();
    assert_eq!(results[0].as_ref().unwrap().len(), 6);
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().len(), 1);
}
