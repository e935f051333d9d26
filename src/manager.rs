//! Profile lifecycle orchestration.
//!
//! [`ProfileManager`] owns the tool settings, the profile record store and
//! the single "active profile" slot, and drives the synchronization engine.
//! UI layers call only into this module.
//!
//! In-process, `&mut self` serializes every operation; across processes,
//! mutations hold the fs2 lock on the settings file, so two invocations can
//! never interleave file moves for the same profile.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::catalog::Category;
use crate::error::Error;
use crate::fs_utils::{copy_tree, ensure_dir, is_valid_path, remove_tree};
use crate::paths::Paths;
use crate::profiles::{ProfileOptions, ProfileStore};
use crate::settings::{LockedSettings, Settings};
use crate::sync::{self, SyncContext, SyncReport};

/// Debounce timer for auto-sync. Scheduling again replaces the pending
/// deadline rather than stacking a second one.
#[derive(Debug)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Arm (or re-arm) the timer relative to `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// True once per armed deadline, after it has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

/// Owner of the active-profile slot and every profile operation the UI
/// layer is allowed to invoke.
pub struct ProfileManager {
    paths: Paths,
    settings: Settings,
    store: ProfileStore,
    auto_sync: Debounce,
}

impl ProfileManager {
    /// Load settings and the profile registry. Call once at startup.
    pub fn open(paths: Paths) -> Result<Self> {
        let settings = Settings::read(&paths.settings_file)?;
        let profiles_path = settings
            .profiles_path
            .clone()
            .unwrap_or_else(|| paths.default_profiles_dir.clone());
        ensure_dir(&profiles_path)
            .with_context(|| format!("Failed to create profiles root: {:?}", profiles_path))?;

        let store = ProfileStore::load(&profiles_path)?;
        let auto_sync = Debounce::new(Duration::from_millis(settings.profile_update_delay_ms));

        Ok(Self {
            paths,
            settings,
            store,
            auto_sync,
        })
    }

    pub fn get_profiles_path(&self) -> PathBuf {
        self.settings
            .profiles_path
            .clone()
            .unwrap_or_else(|| self.paths.default_profiles_dir.clone())
    }

    pub fn config_dir(&self) -> &Path {
        &self.paths.config_dir
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn ctx(&self) -> SyncContext<'_> {
        SyncContext::new(&self.paths.config_dir, self.settings_profiles_path())
    }

    fn settings_profiles_path(&self) -> &Path {
        self.settings
            .profiles_path
            .as_deref()
            .unwrap_or(&self.paths.default_profiles_dir)
    }

    // -------------------------------------------------------------------
    // Registry queries
    // -------------------------------------------------------------------

    pub fn get_profiles_list(&self) -> Vec<ProfileOptions> {
        self.store.list()
    }

    pub fn get_profile(&self, name: &str) -> Option<ProfileOptions> {
        self.store.get(name)
    }

    pub fn active_profile(&self) -> Option<&str> {
        self.settings.active_profile.as_deref()
    }

    /// True iff this profile occupies the active slot.
    pub fn is_enabled(&self, profile: &ProfileOptions) -> bool {
        self.settings.active_profile.as_deref() == Some(profile.name.as_str())
    }

    // -------------------------------------------------------------------
    // Lifecycle operations
    // -------------------------------------------------------------------

    /// Create a new profile and materialize its files from the current live
    /// config. The active slot is untouched.
    pub fn create_profile(&mut self, options: ProfileOptions) -> Result<SyncReport> {
        if self.store.contains(&options.name) {
            return Err(Error::DuplicateName(options.name).into());
        }

        let _guard = self.lock_settings()?;
        let profiles_path = self.get_profiles_path();
        let report = sync::save_profile(&self.ctx(), &options)?;
        self.store.save(&options, &profiles_path)?;
        Ok(report)
    }

    /// Load the named profile into the live config (full) and make it the
    /// active one. `None` empties the active slot without touching files.
    pub fn switch_profile(&mut self, name: Option<&str>) -> Result<Option<SyncReport>> {
        let mut locked = self.lock_settings()?;

        let report = match name {
            None => None,
            Some(name) => {
                let profile = self
                    .store
                    .get(name)
                    .ok_or_else(|| Error::validation(format!("profile '{}' does not exist", name)))?;
                Some(sync::load_profile(&self.ctx(), &profile, None)?)
            }
        };

        self.set_active(&mut locked, name.map(str::to_string))?;
        Ok(report)
    }

    /// Delete the profile's storage subdirectory and its record. If it was
    /// active, the slot becomes empty.
    pub fn remove_profile(&mut self, name: &str) -> Result<()> {
        if !self.store.contains(name) {
            bail!("Profile '{}' does not exist", name);
        }

        let mut locked = self.lock_settings()?;
        let profiles_path = self.get_profiles_path();
        self.store.remove(name, &profiles_path)?;

        if self.settings.active_profile.as_deref() == Some(name) {
            self.set_active(&mut locked, None)?;
        }
        Ok(())
    }

    /// Update a profile's flags, renaming its storage directory first when
    /// the name changed. Flag changes do not retroactively sync files.
    pub fn edit_profile(&mut self, prev_name: &str, options: ProfileOptions) -> Result<()> {
        let mut locked = self.lock_settings()?;
        let profiles_path = self.get_profiles_path();

        if prev_name != options.name {
            self.store.rename(prev_name, &options.name, &profiles_path)?;
            // Keep the active slot pointing at the renamed profile.
            if self.settings.active_profile.as_deref() == Some(prev_name) {
                self.set_active(&mut locked, Some(options.name.clone()))?;
            }
        }

        self.store.save(&options, &profiles_path)?;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Synchronization entry points
    // -------------------------------------------------------------------

    /// Live config -> profile storage for every enabled category, stamping
    /// the record's `modifiedAt`.
    pub fn save_profile_settings(&mut self, profile: &ProfileOptions) -> Result<SyncReport> {
        let _guard = self.lock_settings()?;
        let profiles_path = self.get_profiles_path();
        let report = sync::save_profile(&self.ctx(), profile)?;
        self.store.save(profile, &profiles_path)?;
        Ok(report)
    }

    /// Profile storage -> live config for every enabled category.
    pub fn load_profile_settings(&mut self, profile: &ProfileOptions) -> Result<SyncReport> {
        let _guard = self.lock_settings()?;
        Ok(sync::load_profile(&self.ctx(), profile, None)?)
    }

    /// Profile storage -> live config for exactly the given categories.
    pub fn load_partially_profile_settings(
        &mut self,
        profile: &ProfileOptions,
        categories: &[Category],
    ) -> Result<SyncReport> {
        let _guard = self.lock_settings()?;
        Ok(sync::load_profile(&self.ctx(), profile, Some(categories))?)
    }

    /// Bidirectional newest-wins reconcile for the profile.
    pub fn reconcile_profile_settings(&mut self, profile: &ProfileOptions) -> Result<SyncReport> {
        let _guard = self.lock_settings()?;
        Ok(sync::reconcile_profile(&self.ctx(), profile)?)
    }

    // -------------------------------------------------------------------
    // Auto-sync
    // -------------------------------------------------------------------

    /// Reconcile the active profile immediately if it opted in. Run at
    /// startup, before the user issues commands.
    pub fn startup_auto_sync(&mut self) -> Result<Option<SyncReport>> {
        match self.auto_sync_candidate() {
            Some(profile) => Ok(Some(self.reconcile_profile_settings(&profile)?)),
            None => Ok(None),
        }
    }

    /// Re-arm the debounce timer after a settings change.
    ///
    /// The one-shot CLI only ever reconciles via [`Self::startup_auto_sync`];
    /// this and [`Self::tick_auto_sync`] are the hooks for a long-lived
    /// embedding that drives the timer from its own event loop.
    pub fn schedule_auto_sync(&mut self, now: Instant) {
        self.auto_sync.schedule(now);
    }

    /// Run the debounced reconcile if its deadline passed. The timer
    /// disarms either way; only a new schedule re-arms it.
    pub fn tick_auto_sync(&mut self, now: Instant) -> Result<Option<SyncReport>> {
        if !self.auto_sync.fire_if_due(now) {
            return Ok(None);
        }
        match self.auto_sync_candidate() {
            Some(profile) => Ok(Some(self.reconcile_profile_settings(&profile)?)),
            None => Ok(None),
        }
    }

    fn auto_sync_candidate(&self) -> Option<ProfileOptions> {
        let name = self.settings.active_profile.as_deref()?;
        self.store.get(name).filter(|p| p.auto_sync)
    }

    // -------------------------------------------------------------------
    // Profiles root migration
    // -------------------------------------------------------------------

    /// Move the profiles root: copy every profile subdirectory to the new
    /// root, re-read the registry from there, then delete the old root.
    pub fn set_profiles_path(&mut self, new_path: &Path) -> Result<()> {
        if !is_valid_path(&[new_path]) {
            return Err(Error::validation("new profiles path must be non-empty").into());
        }

        let old_path = self.get_profiles_path();
        if old_path == new_path {
            return Ok(());
        }

        let mut locked = LockedSettings::lock(&self.paths.settings_file)?;
        ensure_dir(new_path)?;
        copy_tree(&old_path, new_path)?;

        self.store = ProfileStore::load(new_path)?;
        locked.update(|s| s.profiles_path = Some(new_path.to_path_buf()))?;
        self.settings = locked.settings().clone();
        drop(locked);

        remove_tree(&old_path)?;
        Ok(())
    }

    // -------------------------------------------------------------------

    /// Update the active slot through an already-held lock. Opening a
    /// second lock on the settings file would deadlock against our own
    /// guard, so mutating operations pass theirs down.
    fn set_active(&mut self, locked: &mut LockedSettings, name: Option<String>) -> Result<()> {
        locked.update(|s| s.active_profile = name)?;
        self.settings = locked.settings().clone();
        Ok(())
    }

    fn lock_settings(&self) -> Result<LockedSettings> {
        LockedSettings::lock(&self.paths.settings_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestVault;
    use std::fs;
    use tempfile::TempDir;

    fn manager_for(vault: &TestVault, temp: &TempDir) -> ProfileManager {
        let paths = Paths {
            base_dir: temp.path().join(".vaultprof"),
            settings_file: temp.path().join(".vaultprof/settings.json"),
            default_profiles_dir: vault.profiles_path().to_path_buf(),
            config_dir: vault.config_dir().to_path_buf(),
        };
        ProfileManager::open(paths).unwrap()
    }

    fn profile_with(name: &str, categories: &[Category]) -> ProfileOptions {
        let mut p = ProfileOptions::new(name);
        for c in categories {
            p.set_enabled(*c, true);
        }
        p
    }

    #[test]
    fn test_create_registers_and_materializes() {
        let vault = TestVault::new();
        let temp = TempDir::new().unwrap();
        let mut mgr = manager_for(&vault, &temp);

        vault.write_config("hotkeys.json", r#"{"a":1}"#);
        mgr.create_profile(profile_with("Work", &[Category::Hotkeys]))
            .unwrap();

        assert_eq!(
            vault.read_profile("Work", "hotkeys.json"),
            Some(r#"{"a":1}"#.to_string())
        );
        assert!(vault.profile_file("Work", "profile.json").is_some());
        // Creating does not activate.
        assert!(mgr.active_profile().is_none());
    }

    #[test]
    fn test_create_duplicate_fails_without_touching_disk() {
        let vault = TestVault::new();
        let temp = TempDir::new().unwrap();
        let mut mgr = manager_for(&vault, &temp);

        let mut b = profile_with("B", &[Category::Hotkeys]);
        mgr.create_profile(b.clone()).unwrap();

        // Mark the existing directory so we can tell it apart.
        vault.write_profile("B", "marker", "untouched");

        b.auto_sync = true;
        let err = mgr.create_profile(b).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::DuplicateName(_))
        ));
        assert_eq!(vault.read_profile("B", "marker"), Some("untouched".into()));
    }

    #[test]
    fn test_active_profile_singleton() {
        let vault = TestVault::new();
        let temp = TempDir::new().unwrap();
        let mut mgr = manager_for(&vault, &temp);

        let a = profile_with("a", &[]);
        let b = profile_with("b", &[]);
        mgr.create_profile(a.clone()).unwrap();
        mgr.create_profile(b.clone()).unwrap();

        mgr.switch_profile(Some("a")).unwrap();
        mgr.switch_profile(Some("b")).unwrap();

        let enabled: Vec<_> = mgr
            .get_profiles_list()
            .into_iter()
            .filter(|p| mgr.is_enabled(p))
            .collect();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "b");

        // Switching to none empties the slot.
        mgr.switch_profile(None).unwrap();
        assert!(mgr.active_profile().is_none());
    }

    #[test]
    fn test_switch_loads_files() {
        let vault = TestVault::new();
        let temp = TempDir::new().unwrap();
        let mut mgr = manager_for(&vault, &temp);

        vault.write_config("hotkeys.json", "work-keys");
        mgr.create_profile(profile_with("work", &[Category::Hotkeys]))
            .unwrap();

        vault.write_config("hotkeys.json", "scratch");
        mgr.switch_profile(Some("work")).unwrap();

        assert_eq!(vault.read_config("hotkeys.json"), Some("work-keys".into()));
        assert_eq!(mgr.active_profile(), Some("work"));
    }

    #[test]
    fn test_remove_active_profile_clears_slot() {
        let vault = TestVault::new();
        let temp = TempDir::new().unwrap();
        let mut mgr = manager_for(&vault, &temp);

        mgr.create_profile(profile_with("Work", &[])).unwrap();
        mgr.switch_profile(Some("Work")).unwrap();

        mgr.remove_profile("Work").unwrap();
        assert!(mgr.active_profile().is_none());
        assert!(!vault.profiles_path().join("Work").exists());
    }

    #[test]
    fn test_edit_renames_directory_and_active_slot() {
        let vault = TestVault::new();
        let temp = TempDir::new().unwrap();
        let mut mgr = manager_for(&vault, &temp);

        mgr.create_profile(profile_with("old", &[])).unwrap();
        mgr.switch_profile(Some("old")).unwrap();

        let mut renamed = mgr.get_profile("old").unwrap();
        renamed.name = "new".to_string();
        renamed.graph = true;
        mgr.edit_profile("old", renamed).unwrap();

        assert!(!vault.profiles_path().join("old").exists());
        assert!(vault.profiles_path().join("new").exists());
        assert_eq!(mgr.active_profile(), Some("new"));
        assert!(mgr.get_profile("new").unwrap().graph);
    }

    #[test]
    fn test_edit_does_not_sync_files() {
        let vault = TestVault::new();
        let temp = TempDir::new().unwrap();
        let mut mgr = manager_for(&vault, &temp);

        vault.write_config("graph.json", "g");
        mgr.create_profile(profile_with("p", &[])).unwrap();

        let mut edited = mgr.get_profile("p").unwrap();
        edited.graph = true;
        mgr.edit_profile("p", edited).unwrap();

        // Toggling the flag alone must not copy anything.
        assert!(vault.profile_file("p", "graph.json").is_none());
    }

    #[test]
    fn test_set_profiles_path_migrates_and_removes_old_root() {
        let vault = TestVault::new();
        let temp = TempDir::new().unwrap();
        let mut mgr = manager_for(&vault, &temp);

        vault.write_config("hotkeys.json", "h");
        mgr.create_profile(profile_with("work", &[Category::Hotkeys]))
            .unwrap();

        let new_root = temp.path().join("moved-profiles");
        mgr.set_profiles_path(&new_root).unwrap();

        assert!(new_root.join("work/profile.json").is_file());
        assert_eq!(
            fs::read_to_string(new_root.join("work/hotkeys.json")).unwrap(),
            "h"
        );
        assert!(!vault.profiles_path().exists());
        assert_eq!(mgr.get_profiles_path(), new_root);
        assert!(mgr.get_profile("work").is_some());
    }

    #[test]
    fn test_auto_sync_only_fires_for_opted_in_active_profile() {
        let vault = TestVault::new();
        let temp = TempDir::new().unwrap();
        let mut mgr = manager_for(&vault, &temp);

        vault.write_config("hotkeys.json", "live");
        let mut p = profile_with("p", &[Category::Hotkeys]);
        mgr.create_profile(p.clone()).unwrap();
        mgr.switch_profile(Some("p")).unwrap();

        // Not opted in: nothing happens.
        assert!(mgr.startup_auto_sync().unwrap().is_none());

        p.auto_sync = true;
        mgr.edit_profile("p", p).unwrap();
        vault.write_config("hotkeys.json", "edited-outside");
        vault.bump_config_mtime("hotkeys.json", 60);

        let report = mgr.startup_auto_sync().unwrap().unwrap();
        assert!(report.is_clean());
        assert_eq!(
            vault.read_profile("p", "hotkeys.json"),
            Some("edited-outside".into())
        );
    }

    #[test]
    fn test_switch_waits_for_settings_lock() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let vault = TestVault::new();
        let temp = TempDir::new().unwrap();
        let mut mgr = manager_for(&vault, &temp);
        mgr.create_profile(profile_with("work", &[])).unwrap();

        // Another holder of the settings lock stands in for a second
        // process mid-operation; flock conflicts between handles.
        let settings_file = temp.path().join(".vaultprof/settings.json");
        let locked = LockedSettings::lock(&settings_file).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let done_flag = done.clone();
        let handle = std::thread::spawn(move || {
            mgr.switch_profile(Some("work")).unwrap();
            done_flag.store(true, Ordering::SeqCst);
            mgr
        });

        // The switch must not start its file work while the lock is held.
        std::thread::sleep(Duration::from_millis(200));
        assert!(!done.load(Ordering::SeqCst));

        drop(locked);
        let mgr = handle.join().unwrap();
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(mgr.active_profile(), Some("work"));
    }

    #[test]
    fn test_debounce_replaces_pending_deadline() {
        let mut debounce = Debounce::new(Duration::from_millis(500));
        let t0 = Instant::now();

        debounce.schedule(t0);
        // Re-scheduling pushes the deadline out; the first one never fires.
        debounce.schedule(t0 + Duration::from_millis(400));
        assert!(!debounce.fire_if_due(t0 + Duration::from_millis(600)));
        assert!(debounce.fire_if_due(t0 + Duration::from_millis(901)));
        // Disarmed after firing.
        assert!(!debounce.fire_if_due(t0 + Duration::from_secs(10)));
        assert!(!debounce.is_armed());
    }

    #[test]
    fn test_tick_auto_sync_requires_due_timer() {
        let vault = TestVault::new();
        let temp = TempDir::new().unwrap();
        let mut mgr = manager_for(&vault, &temp);

        let mut p = profile_with("p", &[Category::Hotkeys]);
        p.auto_sync = true;
        vault.write_config("hotkeys.json", "live");
        mgr.create_profile(p).unwrap();
        mgr.switch_profile(Some("p")).unwrap();

        let t0 = Instant::now();
        assert!(mgr.tick_auto_sync(t0).unwrap().is_none());

        mgr.schedule_auto_sync(t0);
        let report = mgr.tick_auto_sync(t0 + Duration::from_secs(1)).unwrap();
        assert!(report.is_some());
    }
}
