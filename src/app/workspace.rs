// LogLens - app/workspace.rs
//
// Host-facing entry point. Runs the startup sequence (config, logging,
// profiles) and exposes the calls a viewer makes, with every failure
// reported as a `LogLensError`.

use crate::app::loader::{self, LoadManager, LoadOptions, LoadOutcome};
use crate::app::profile_mgr::ProfileStore;
use crate::core::filter::LogFilter;
use crate::core::holder::LogHolder;
use crate::core::model::LogSource;
use crate::core::profile::{LogProfile, ProfileSet};
use crate::platform::config::{self, AppConfig, PlatformPaths};
use crate::util::constants;
use crate::util::error::{LogLensError, ProfileError, Result};
use crate::util::logging;
use std::path::Path;
use std::sync::Arc;

/// Configuration, profile store and background loader of one host.
#[derive(Debug)]
pub struct Workspace {
    paths: PlatformPaths,
    config: AppConfig,
    store: ProfileStore,
    loader: LoadManager,
}

impl Workspace {
    /// Load `config.toml`, initialise logging and open the profile store.
    ///
    /// Problems found on the way are non-fatal and returned as warnings.
    pub fn open(paths: PlatformPaths, debug_flag: bool) -> (Self, Vec<LogLensError>) {
        let (config, config_warnings) = config::load_config(&paths.config_dir);
        logging::init(debug_flag, config.log_level.as_deref());

        tracing::info!(
            version = constants::APP_VERSION,
            debug = debug_flag,
            "LogLens starting"
        );

        let (store, profile_errors) = ProfileStore::from_config(&paths, &config);
        for err in &profile_errors {
            tracing::warn!(error = %err, "Profile loading warning");
        }

        let warnings = config_warnings
            .into_iter()
            .map(LogLensError::from)
            .chain(profile_errors.into_iter().map(LogLensError::from))
            .collect();

        tracing::info!(profiles = store.profiles().len(), "Workspace ready");
        (
            Self {
                paths,
                config,
                store,
                loader: LoadManager::new(),
            },
            warnings,
        )
    }

    pub fn paths(&self) -> &PlatformPaths {
        &self.paths
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn profiles(&self) -> &ProfileSet {
        self.store.profiles()
    }

    fn options(&self) -> LoadOptions {
        LoadOptions::from(&self.config)
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Load a log on the calling thread.
    pub fn load(&self, source: &LogSource) -> Result<LogHolder> {
        Ok(loader::load_holder(source, self.profiles(), self.options())?)
    }

    /// Load several logs in parallel; one result per source, in order.
    pub fn load_many(&self, sources: &[LogSource]) -> Result<Vec<Result<LogHolder>>> {
        let results = loader::load_many(sources, self.profiles(), self.options())?;
        Ok(results
            .into_iter()
            .map(|r| r.map_err(LogLensError::from))
            .collect())
    }

    /// Start a background load, replacing any load still in flight.
    pub fn load_in_background(&mut self, source: LogSource) {
        let options = self.options();
        self.loader.start(source, self.store.snapshot(), options);
    }

    /// Result of the background load once it is finished.
    pub fn poll_load(&mut self) -> Option<Result<LogHolder>> {
        self.loader.poll().map(outcome_into_result)
    }

    /// Block until the background load finishes.
    pub fn wait_load(&mut self) -> Option<Result<LogHolder>> {
        self.loader.wait().map(outcome_into_result)
    }

    // -------------------------------------------------------------------------
    // Profiles
    // -------------------------------------------------------------------------

    pub fn create_profile(
        &mut self,
        name: &str,
        detection_regex: &str,
        detection_range: usize,
    ) -> Result<Arc<LogProfile>> {
        Ok(self.store.create(name, detection_regex, detection_range)?)
    }

    pub fn update_profile<F>(&mut self, name: &str, edit: F) -> Result<Arc<LogProfile>>
    where
        F: FnOnce(&mut LogProfile) -> std::result::Result<(), ProfileError>,
    {
        Ok(self.store.update(name, edit)?)
    }

    pub fn rename_profile(&mut self, old: &str, new: &str) -> Result<String> {
        Ok(self.store.rename(old, new)?)
    }

    pub fn delete_profile(&mut self, name: &str) -> Result<Arc<LogProfile>> {
        Ok(self.store.delete(name)?)
    }

    pub fn import_profile(&mut self, path: &Path) -> Result<Arc<LogProfile>> {
        Ok(self.store.import(path)?)
    }

    /// Store `filter` as a preset of `profile`. A filter whose text pattern
    /// does not compile is refused.
    pub fn save_filter(&mut self, profile: &str, filter: &LogFilter) -> Result<Arc<LogProfile>> {
        if let Some(e) = filter.pattern_error() {
            return Err(e.clone().into());
        }
        Ok(self.store.add_filter_preset(profile, filter)?)
    }
}

fn outcome_into_result(outcome: LoadOutcome) -> Result<LogHolder> {
    outcome.into_result().map_err(LogLensError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::TextMatchMode;
    use crate::util::error::{FilterError, LoadError};

    fn paths(root: &Path) -> PlatformPaths {
        PlatformPaths {
            config_dir: root.join("config"),
            profiles_dir: root.join("profiles"),
        }
    }

    #[test]
    fn test_open_reports_config_warnings() {
        let root = tempfile::tempdir().unwrap();
        let paths = paths(root.path());
        std::fs::create_dir_all(&paths.config_dir).unwrap();
        std::fs::write(
            paths.config_dir.join(constants::CONFIG_FILE_NAME),
            "[parsing]\nworker_threads = 1000\n",
        )
        .unwrap();

        let (workspace, warnings) = Workspace::open(paths, false);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], LogLensError::Config(_)));
        assert_eq!(
            workspace.config().worker_threads,
            constants::DEFAULT_WORKER_THREADS
        );
        assert!(workspace.paths().profiles_dir.is_dir());
    }

    #[test]
    fn test_load_and_missing_source() {
        let root = tempfile::tempdir().unwrap();
        let (workspace, _) = Workspace::open(paths(root.path()), false);

        let holder = workspace
            .load(&LogSource::Text(
                "23-01-15 10:00:00 INFO hi in f() function at line 1\n".to_string(),
            ))
            .unwrap();
        assert_eq!(holder.filtered_entries().len(), 1);

        let missing = workspace.load(&LogSource::Path(root.path().join("none.log")));
        assert!(matches!(missing, Err(LogLensError::Load(LoadError::Parse(_)))));
    }

    #[test]
    fn test_background_load_through_workspace() {
        let root = tempfile::tempdir().unwrap();
        let (mut workspace, _) = Workspace::open(paths(root.path()), false);
        workspace.load_in_background(LogSource::Text("plain\n".to_string()));
        let holder = workspace.wait_load().unwrap().unwrap();
        assert_eq!(holder.len(), 1);
        assert!(workspace.poll_load().is_none());
    }

    #[test]
    fn test_profile_errors_surface_as_crate_errors() {
        let root = tempfile::tempdir().unwrap();
        let (mut workspace, _) = Workspace::open(paths(root.path()), false);
        workspace.create_profile("Mine", "^M", 1).unwrap();

        let dup = workspace.create_profile("Mine", "^M", 1);
        assert!(matches!(
            dup,
            Err(LogLensError::Profile(ProfileError::DuplicateName { .. }))
        ));
        assert!(matches!(
            workspace.delete_profile(constants::DEFAULT_PROFILE_NAME),
            Err(LogLensError::Profile(ProfileError::ReadOnly { .. }))
        ));
        assert_eq!(workspace.rename_profile("Mine", "Yours").unwrap(), "Yours");
    }

    #[test]
    fn test_save_filter_refuses_invalid_pattern() {
        let root = tempfile::tempdir().unwrap();
        let (mut workspace, _) = Workspace::open(paths(root.path()), false);
        workspace.create_profile("P", "^P", 1).unwrap();

        let mut broken = LogFilter::new("broken");
        broken.set_text_match_mode(TextMatchMode::Regex);
        broken.set_search_text("(unclosed");
        assert!(matches!(
            workspace.save_filter("P", &broken),
            Err(LogLensError::Filter(FilterError::InvalidRegex { .. }))
        ));

        let mut fine = LogFilter::new("fine");
        fine.set_search_text("boot");
        let saved = workspace.save_filter("P", &fine).unwrap();
        assert_eq!(saved.filter_presets().len(), 1);
    }
}
