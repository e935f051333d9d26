//! Profile records and the on-disk/in-memory record store.
//!
//! A profile is a named set of boolean category flags persisted as
//! `profile.json` inside the profile's storage subdirectory. The
//! [`ProfileStore`] is the exclusive owner of the in-memory registry;
//! profiles are handed out by value so an edit in one place can never race
//! a synchronization reading the same record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::catalog::Category;
use crate::error::{Error, Result};
use crate::fs_utils::{ensure_dir, is_valid_path, remove_tree};

pub const PROFILE_FILE: &str = "profile.json";

/// One profile's persisted options. Wire names are camelCase to match the
/// `profile.json` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileOptions {
    /// Unique identifier; also the storage subdirectory name.
    pub name: String,
    /// Reconcile automatically while this profile is active.
    pub auto_sync: bool,
    pub appearance: bool,
    pub app: bool,
    pub bookmarks: bool,
    pub community_plugins: bool,
    pub core_plugins: bool,
    pub graph: bool,
    pub hotkeys: bool,
    pub snippets: bool,
    /// Advisory only; never consulted for conflict resolution.
    pub modified_at: DateTime<Utc>,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            auto_sync: false,
            appearance: false,
            app: false,
            bookmarks: false,
            community_plugins: false,
            core_plugins: false,
            graph: false,
            hotkeys: false,
            snippets: false,
            modified_at: Utc::now(),
        }
    }
}

impl ProfileOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        match category {
            Category::Appearance => self.appearance,
            Category::App => self.app,
            Category::Bookmarks => self.bookmarks,
            Category::CommunityPlugins => self.community_plugins,
            Category::CorePlugins => self.core_plugins,
            Category::Graph => self.graph,
            Category::Hotkeys => self.hotkeys,
            Category::Snippets => self.snippets,
        }
    }

    pub fn set_enabled(&mut self, category: Category, enabled: bool) {
        match category {
            Category::Appearance => self.appearance = enabled,
            Category::App => self.app = enabled,
            Category::Bookmarks => self.bookmarks = enabled,
            Category::CommunityPlugins => self.community_plugins = enabled,
            Category::CorePlugins => self.core_plugins = enabled,
            Category::Graph => self.graph = enabled,
            Category::Hotkeys => self.hotkeys = enabled,
            Category::Snippets => self.snippets = enabled,
        }
    }

    /// Every category whose flag is set. `name`, `autoSync` and `modifiedAt`
    /// are identity/control metadata and never appear here.
    pub fn enabled_categories(&self) -> Vec<Category> {
        Category::all()
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }
}

/// Validate a candidate profile name.
///
/// Only alphanumeric characters, hyphens and underscores are allowed, since
/// the name doubles as a directory name.
pub fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("profile name cannot be empty"));
    }

    if name.chars().count() > 64 {
        return Err(Error::validation(
            "profile name cannot be longer than 64 characters",
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::validation(format!(
            "invalid profile name '{}': only alphanumeric characters, hyphens and underscores are allowed",
            name
        )));
    }

    Ok(())
}

/// In-memory registry of every known profile, backed by the profiles root
/// on disk. Duplicate-name checks live here, not in the sync engine.
#[derive(Debug, Default)]
pub struct ProfileStore {
    profiles: Vec<ProfileOptions>,
}

impl ProfileStore {
    /// Scan every immediate subdirectory of `profiles_path` and parse its
    /// `profile.json`. Subdirectories without one are silently skipped;
    /// they may be unrelated directories. Unparsable records are skipped
    /// too (the doctor reports them).
    pub fn load(profiles_path: &Path) -> Result<Self> {
        let mut profiles = Vec::new();

        if profiles_path.exists() {
            for entry in fs::read_dir(profiles_path)? {
                let entry = entry?;
                let record = entry.path().join(PROFILE_FILE);
                if !entry.path().is_dir() || !record.is_file() {
                    continue;
                }
                let content = fs::read_to_string(&record)?;
                if let Ok(profile) = serde_json::from_str::<ProfileOptions>(&content) {
                    profiles.push(profile);
                }
            }
        }

        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { profiles })
    }

    /// Names of all registered profiles, sorted.
    pub fn names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }

    /// All registered profiles, by value.
    pub fn list(&self) -> Vec<ProfileOptions> {
        self.profiles.clone()
    }

    /// Look up a profile by exact name, by value.
    pub fn get(&self, name: &str) -> Option<ProfileOptions> {
        self.profiles.iter().find(|p| p.name == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.iter().any(|p| p.name == name)
    }

    /// Register a new profile. Fails with [`Error::DuplicateName`] if the
    /// name is already taken.
    pub fn register(&mut self, profile: ProfileOptions) -> Result<()> {
        validate_profile_name(&profile.name)?;
        if self.contains(&profile.name) {
            return Err(Error::DuplicateName(profile.name));
        }
        self.profiles.push(profile);
        self.profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(())
    }

    /// Persist one profile's record into its storage subdirectory,
    /// stamping `modifiedAt`, and update the registry entry.
    pub fn save(&mut self, profile: &ProfileOptions, profiles_path: &Path) -> Result<()> {
        validate_profile_name(&profile.name)?;
        if !is_valid_path(&[profiles_path, Path::new(&profile.name)]) {
            return Err(Error::validation("profiles path is not usable"));
        }

        let dir = profiles_path.join(&profile.name);
        ensure_dir(&dir)?;

        let mut stamped = profile.clone();
        stamped.modified_at = Utc::now();

        let content = serde_json::to_string_pretty(&stamped)
            .map_err(|e| Error::validation(format!("failed to serialize profile: {}", e)))?;
        fs::write(dir.join(PROFILE_FILE), content)?;

        match self.profiles.iter_mut().find(|p| p.name == stamped.name) {
            Some(existing) => *existing = stamped,
            None => {
                self.profiles.push(stamped);
                self.profiles.sort_by(|a, b| a.name.cmp(&b.name));
            }
        }
        Ok(())
    }

    /// Rename a profile and move its storage subdirectory as a unit.
    pub fn rename(&mut self, old_name: &str, new_name: &str, profiles_path: &Path) -> Result<()> {
        validate_profile_name(new_name)?;
        if self.contains(new_name) {
            return Err(Error::DuplicateName(new_name.to_string()));
        }

        let old_dir = profiles_path.join(old_name);
        if !old_dir.exists() {
            return Err(Error::not_found(old_dir));
        }
        fs::rename(&old_dir, profiles_path.join(new_name))?;

        let profile = self
            .profiles
            .iter_mut()
            .find(|p| p.name == old_name)
            .ok_or_else(|| Error::validation(format!("profile '{}' is not registered", old_name)))?;
        profile.name = new_name.to_string();

        // Re-persist so the stored record matches the directory name.
        let updated = profile.clone();
        self.save(&updated, profiles_path)?;
        self.profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(())
    }

    /// Delete a profile's entire storage subdirectory and drop its record.
    /// Irreversible; callers confirm before invoking.
    pub fn remove(&mut self, name: &str, profiles_path: &Path) -> Result<()> {
        remove_tree(&profiles_path.join(name))?;
        self.profiles.retain(|p| p.name != name);
        Ok(())
    }
}
