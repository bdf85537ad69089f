// LogLens - app/profile_mgr.rs
//
// Loads profile documents from the profiles directory and persists every
// change back to it. One TOML document per profile; the built-in default
// profile is never written.

use crate::core::filter::LogFilter;
use crate::core::profile::{self, LogProfile, ProfileSet};
use crate::platform::config::{AppConfig, PlatformPaths};
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::ProfileError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// Directory loading
// =============================================================================

/// Load every profile document in `dir`.
///
/// Invalid documents are logged and skipped (non-fatal); their errors are
/// returned alongside the set. A missing directory yields an empty set.
pub fn load_profile_dir(dir: &Path) -> (ProfileSet, Vec<ProfileError>) {
    let mut errors = Vec::new();

    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "Profile directory does not exist (skipping)");
        return (ProfileSet::default(), errors);
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(ProfileError::Io {
                path: dir.to_path_buf(),
                source: e,
            });
            return (ProfileSet::default(), errors);
        }
    };

    let mut paths = Vec::new();
    for entry_result in entries {
        match entry_result {
            Ok(entry) => {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str())
                    == Some(constants::PROFILE_FILE_EXTENSION)
                {
                    paths.push(path);
                }
            }
            Err(e) => errors.push(ProfileError::Io {
                path: dir.to_path_buf(),
                source: e,
            }),
        }
    }
    // Directory order is unspecified; keep equal-priority ties deterministic.
    paths.sort();

    let mut profiles: Vec<LogProfile> = Vec::new();
    for path in paths {
        match load_profile_file(&path) {
            Ok(p) if profiles.iter().any(|q| q.name() == p.name()) => {
                tracing::warn!(
                    profile = %p.name(),
                    file = %path.display(),
                    "Duplicate profile name; skipping document"
                );
                errors.push(ProfileError::DuplicateName {
                    profile: p.name().to_string(),
                });
            }
            Ok(p) => {
                tracing::debug!(profile = %p.name(), priority = p.priority(), "Loaded profile");
                profiles.push(p);
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Skipping invalid profile");
                errors.push(e);
            }
        }
    }

    // Enforce maximum profile count
    if profiles.len() > constants::MAX_PROFILES {
        tracing::warn!(
            count = profiles.len(),
            max = constants::MAX_PROFILES,
            "Too many profiles loaded, truncating"
        );
        errors.push(ProfileError::TooManyProfiles {
            count: profiles.len(),
            max: constants::MAX_PROFILES,
        });
        profiles.truncate(constants::MAX_PROFILES);
    }

    tracing::info!(total = profiles.len(), dir = %dir.display(), "Profile loading complete");
    (ProfileSet::new(profiles), errors)
}

/// Read, size-check and compile one profile document.
pub fn load_profile_file(path: &Path) -> Result<LogProfile, ProfileError> {
    let io_err = |e| ProfileError::Io {
        path: path.to_path_buf(),
        source: e,
    };

    let size = fs::file_size(path).map_err(io_err)?;
    if size > constants::MAX_PROFILE_FILE_SIZE {
        return Err(ProfileError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max_size: constants::MAX_PROFILE_FILE_SIZE,
        });
    }

    let content = std::fs::read_to_string(path).map_err(io_err)?;
    profile::profile_from_toml(&content, path)
}

// =============================================================================
// Profile store
// =============================================================================

/// The loaded profiles plus the directory they persist to.
///
/// Every successful change writes the whole document of the affected profile.
#[derive(Debug)]
pub struct ProfileStore {
    profiles: ProfileSet,
    dir: PathBuf,
    copy_on_write: bool,
}

impl ProfileStore {
    /// Load the profiles directory, creating it when missing.
    pub fn open(dir: impl Into<PathBuf>, copy_on_write: bool) -> (Self, Vec<ProfileError>) {
        let dir = dir.into();
        let mut errors = Vec::new();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            errors.push(ProfileError::Io {
                path: dir.clone(),
                source: e,
            });
        }
        let (profiles, load_errors) = load_profile_dir(&dir);
        errors.extend(load_errors);
        (
            Self {
                profiles,
                dir,
                copy_on_write,
            },
            errors,
        )
    }

    /// Open the store at the configured location.
    pub fn from_config(paths: &PlatformPaths, config: &AppConfig) -> (Self, Vec<ProfileError>) {
        Self::open(paths.effective_profiles_dir(config), config.copy_on_write)
    }

    pub fn profiles(&self) -> &ProfileSet {
        &self.profiles
    }

    /// An immutable copy for parsing threads. Profiles are shared, not cloned.
    pub fn snapshot(&self) -> Arc<ProfileSet> {
        Arc::new(self.profiles.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self, name: &str) -> Option<&Arc<LogProfile>> {
        self.profiles.get(name)
    }

    /// A document path for `stem` that neither a file on disk nor a loaded
    /// profile uses yet. Taken names get a numeric suffix.
    fn free_document_path(&self, stem: &str) -> PathBuf {
        let taken = |path: &Path| {
            path.exists() || self.profiles.iter().any(|p| p.path() == Some(path))
        };
        let first = self.dir.join(profile::document_file_name(stem));
        if !taken(first.as_path()) {
            return first;
        }
        (2u32..)
            .map(|n| self.dir.join(profile::document_file_name(&format!("{stem}-{n}"))))
            .find(|candidate| !taken(candidate.as_path()))
            .unwrap_or(first)
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut raw = path.as_os_str().to_os_string();
        raw.push(constants::PROFILE_BACKUP_SUFFIX);
        PathBuf::from(raw)
    }

    /// Sanitise `name` and make sure no other profile uses it.
    fn claim_name(&self, name: &str) -> Result<String, ProfileError> {
        let mut clean = profile::filter_name(name);
        if clean.is_empty() {
            clean = constants::UNNAMED_PROFILE_NAME.to_string();
        }
        if self.profiles.contains(&clean) {
            return Err(ProfileError::DuplicateName { profile: clean });
        }
        Ok(clean)
    }

    fn write_document(&self, profile: &LogProfile) -> Result<(), ProfileError> {
        let Some(path) = profile.path() else {
            return Ok(());
        };
        if profile.is_read_only() {
            return Ok(());
        }

        let content = profile.to_toml_string()?;
        let backup = self.copy_on_write.then(|| Self::backup_path(path));
        fs::write_with_backup(path, &content, backup.as_deref()).map_err(|e| ProfileError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::info!(profile = %profile.name(), file = %path.display(), "Profile saved");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Create and persist a new profile with the default grammar.
    pub fn create(
        &mut self,
        name: &str,
        detection_regex: &str,
        detection_range: usize,
    ) -> Result<Arc<LogProfile>, ProfileError> {
        if self.profiles.len() >= constants::MAX_PROFILES {
            return Err(ProfileError::TooManyProfiles {
                count: self.profiles.len() + 1,
                max: constants::MAX_PROFILES,
            });
        }
        let name = self.claim_name(name)?;
        let mut created = LogProfile::new(&name, detection_regex, detection_range)?;
        created.set_path(Some(self.free_document_path(&name)));

        self.write_document(&created)?;
        self.profiles.insert(created);
        tracing::info!(profile = %name, "Profile created");
        self.require(&name)
    }

    /// Persist a profile as it is. A no-op for read-only profiles and
    /// profiles without a backing document.
    pub fn save(&self, name: &str) -> Result<(), ProfileError> {
        let profile = self.require(name)?;
        if profile.is_read_only() || profile.path().is_none() {
            tracing::debug!(profile = %name, "Save skipped for read-only profile");
            return Ok(());
        }
        self.write_document(&profile)
    }

    /// Apply `edit` to a profile, then persist the whole document.
    ///
    /// The edit works on a draft; if it fails, the stored profile is unchanged.
    pub fn update<F>(&mut self, name: &str, edit: F) -> Result<Arc<LogProfile>, ProfileError>
    where
        F: FnOnce(&mut LogProfile) -> Result<(), ProfileError>,
    {
        let current = self.require(name)?;
        if current.is_read_only() {
            return Err(ProfileError::ReadOnly {
                profile: name.to_string(),
            });
        }

        let mut draft = (*current).clone();
        edit(&mut draft)?;
        self.write_document(&draft)?;

        self.profiles.edit(name, |slot| *slot = draft);
        self.require(name)
    }

    /// Store `filter` as a preset of profile `name`.
    pub fn add_filter_preset(
        &mut self,
        name: &str,
        filter: &LogFilter,
    ) -> Result<Arc<LogProfile>, ProfileError> {
        let preset = filter.to_preset();
        self.update(name, move |p| {
            p.add_filter_preset(preset);
            Ok(())
        })
    }

    /// Rename a profile. A new document is written and the old one removed;
    /// if the old one cannot be removed, the new one is rolled back.
    /// Returns the sanitised new name.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<String, ProfileError> {
        let current = self.require(old)?;
        if current.is_read_only() {
            return Err(ProfileError::ReadOnly {
                profile: old.to_string(),
            });
        }
        let new_name = self.claim_name(new)?;
        let new_path = self.free_document_path(&new_name);

        let mut draft = (*current).clone();
        draft.set_name(new_name.clone());
        draft.set_path(Some(new_path.clone()));
        self.write_document(&draft)?;

        if let Some(old_path) = current.path() {
            if let Err(e) = fs::remove_if_exists(old_path) {
                if let Err(undo) = fs::remove_if_exists(&new_path) {
                    tracing::warn!(file = %new_path.display(), error = %undo, "Could not roll back renamed document");
                }
                return Err(ProfileError::Io {
                    path: old_path.to_path_buf(),
                    source: e,
                });
            }
        }
        self.profiles.edit(old, |slot| *slot = draft);

        tracing::info!(from = %old, to = %new_name, "Profile renamed");
        Ok(new_name)
    }

    /// Remove a profile and its document. The returned profile is read-only.
    pub fn delete(&mut self, name: &str) -> Result<Arc<LogProfile>, ProfileError> {
        let current = self.require(name)?;
        if current.is_read_only() {
            return Err(ProfileError::ReadOnly {
                profile: name.to_string(),
            });
        }
        if let Some(path) = current.path() {
            fs::remove_if_exists(path).map_err(|e| ProfileError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let mut removed = self.profiles.remove(name).unwrap_or(current);
        Arc::make_mut(&mut removed).mark_read_only();
        tracing::info!(profile = %name, "Profile deleted");
        Ok(removed)
    }

    /// Copy an external profile document into the profiles directory and
    /// load it. Documents already inside the directory are loaded in place.
    ///
    /// The copy never replaces an existing file; a taken file name gets a
    /// numeric suffix. Only that fresh copy is removed on rejection.
    pub fn import(&mut self, source: &Path) -> Result<Arc<LogProfile>, ProfileError> {
        let io_err = |path: &Path, e| ProfileError::Io {
            path: path.to_path_buf(),
            source: e,
        };

        let inside = source.parent().is_some_and(|p| p == self.dir);
        let path = if inside {
            source.to_path_buf()
        } else {
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| constants::UNNAMED_PROFILE_NAME.to_string());
            std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
            let target = self.free_document_path(&stem);
            fs::copy_new(source, &target).map_err(|e| io_err(source, e))?;
            target
        };

        let discard_copy = |path: &Path| {
            if !inside {
                if let Err(e) = fs::remove_if_exists(path) {
                    tracing::warn!(file = %path.display(), error = %e, "Could not remove rejected import");
                }
            }
        };

        let imported = match load_profile_file(&path) {
            Ok(p) => p,
            Err(e) => {
                discard_copy(&path);
                return Err(e);
            }
        };
        if self.profiles.contains(imported.name()) {
            discard_copy(&path);
            return Err(ProfileError::DuplicateName {
                profile: imported.name().to_string(),
            });
        }

        let name = imported.name().to_string();
        self.profiles.insert(imported);
        tracing::info!(profile = %name, file = %path.display(), "Profile imported");
        self.require(&name)
    }

    fn require(&self, name: &str) -> Result<Arc<LogProfile>, ProfileError> {
        self.profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound {
                profile: name.to_string(),
            })
    }
}
