//! Test fixtures shared across test modules.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

use crate::sync::SyncContext;

/// A temporary vault: a live config directory plus a profiles root.
pub struct TestVault {
    _temp: TempDir,
    config_dir: PathBuf,
    profiles_path: PathBuf,
}

impl TestVault {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config_dir = temp.path().join(".vault");
        let profiles_path = temp.path().join("profiles");
        fs::create_dir_all(&config_dir).unwrap();
        fs::create_dir_all(&profiles_path).unwrap();
        Self {
            _temp: temp,
            config_dir,
            profiles_path,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn profiles_path(&self) -> &Path {
        &self.profiles_path
    }

    pub fn ctx(&self) -> SyncContext<'_> {
        SyncContext::new(&self.config_dir, &self.profiles_path)
    }

    pub fn write_config(&self, rel: &str, content: &str) {
        write_at(&self.config_dir.join(rel), content);
    }

    pub fn write_profile(&self, profile: &str, rel: &str, content: &str) {
        write_at(&self.profiles_path.join(profile).join(rel), content);
    }

    pub fn read_config(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.config_dir.join(rel)).ok()
    }

    pub fn read_profile(&self, profile: &str, rel: &str) -> Option<String> {
        fs::read_to_string(self.profiles_path.join(profile).join(rel)).ok()
    }

    /// Path of a stored file if it exists.
    pub fn profile_file(&self, profile: &str, rel: &str) -> Option<PathBuf> {
        let path = self.profiles_path.join(profile).join(rel);
        path.is_file().then_some(path)
    }

    /// Push a live file's mtime `secs` into the future, so it reads as
    /// newer than anything written since.
    pub fn bump_config_mtime(&self, rel: &str, secs: u64) {
        bump_mtime(&self.config_dir.join(rel), secs);
    }

    pub fn bump_profile_mtime(&self, profile: &str, rel: &str, secs: u64) {
        bump_mtime(&self.profiles_path.join(profile).join(rel), secs);
    }
}

fn write_at(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn bump_mtime(path: &Path, secs: u64) {
    let file = fs::File::options().append(true).open(path).unwrap();
    let when = SystemTime::now() + Duration::from_secs(secs);
    file.set_times(fs::FileTimes::new().set_modified(when))
        .unwrap();
}
