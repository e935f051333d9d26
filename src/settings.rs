//! Process-wide tool settings, persisted in `settings.json`.
//!
//! This is the tool's own state, distinct from any profile's record: where
//! the profiles root lives, which profile is currently active, and the
//! auto-sync timing knobs. Writes are atomic (temp file + rename), and
//! [`LockedSettings`] provides an fs2 exclusive-lock handle so concurrent
//! invocations of the tool serialize their mutations.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Debounce delay before an auto-sync reconcile fires, in milliseconds.
pub const DEFAULT_UPDATE_DELAY_MS: u64 = 500;
/// How often interactive views re-read state, in milliseconds.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Root directory under which every profile's subdirectory lives.
    /// `None` means the built-in default location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles_path: Option<PathBuf>,

    /// Name of the profile currently loaded into the live config directory.
    /// At most one profile is active; `None` means none is tracked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_profile: Option<String>,

    /// Auto-sync debounce delay.
    pub profile_update_delay_ms: u64,

    /// UI refresh cadence. Operational tuning only.
    pub ui_refresh_interval_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profiles_path: None,
            active_profile: None,
            profile_update_delay_ms: DEFAULT_UPDATE_DELAY_MS,
            ui_refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            updated_at: None,
        }
    }
}

impl Settings {
    /// Read settings from file, returning defaults if the file is absent.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {:?}", path))
    }

    /// Write settings atomically: write a temp file, then rename over the
    /// target, so the file is never left corrupt.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory: {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("Failed to write temp settings file: {:?}", temp_path))?;

        std::fs::rename(&temp_path, path).with_context(|| {
            format!("Failed to rename settings file: {:?} -> {:?}", temp_path, path)
        })
    }
}

/// Exclusive-lock handle over the settings file.
///
/// The lock doubles as the cross-process mutex around profile mutations:
/// every operation that moves files holds one of these for its duration, so
/// two invocations can never overlap a synchronization for the same profile.
pub struct LockedSettings {
    file: File,
    settings: Settings,
    path: PathBuf,
}

impl LockedSettings {
    /// Open and exclusively lock the settings file, blocking until the lock
    /// is available.
    pub fn lock(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory: {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open settings file: {:?}", path))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to lock settings file: {:?}", path))?;

        let settings = Self::read_from_file(&file, path)?;

        Ok(Self {
            file,
            settings,
            path: path.to_path_buf(),
        })
    }

    fn read_from_file(mut file: &File, path: &Path) -> Result<Settings> {
        let mut content = String::new();
        file.read_to_string(&mut content)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {:?}", path))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Apply a mutation and persist it under the held lock.
    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Settings),
    {
        f(&mut self.settings);
        self.settings.updated_at = Some(Utc::now());
        self.save()
    }

    fn save(&mut self) -> Result<()> {
        let content =
            serde_json::to_string_pretty(&self.settings).context("Failed to serialize settings")?;

        self.file
            .set_len(0)
            .with_context(|| format!("Failed to truncate settings file: {:?}", self.path))?;
        self.file
            .seek(SeekFrom::Start(0))
            .with_context(|| format!("Failed to seek settings file: {:?}", self.path))?;
        self.file
            .write_all(content.as_bytes())
            .with_context(|| format!("Failed to write settings file: {:?}", self.path))?;
        self.file
            .sync_all()
            .with_context(|| format!("Failed to sync settings file: {:?}", self.path))?;

        Ok(())
    }
}

impl Drop for LockedSettings {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
