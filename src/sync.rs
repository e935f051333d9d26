//! The profile synchronization engine.
//!
//! Three operations, all driven by the same category expansion:
//! - [`save_profile`]: live config -> profile storage, one-directional,
//!   destructive on the profile side only.
//! - [`load_profile`]: profile storage -> live config, full or an explicit
//!   category subset, destructive on the live side only.
//! - [`reconcile_profile`]: per-file newest-wins in both directions; the
//!   only path where data can flow either way in a single call.
//!
//! Failure model: a bad profiles root or an invalid profile name aborts
//! before any file is touched. An individual file that cannot be copied is
//! recorded in the report and skipped; one unreadable file never aborts the
//! rest of the operation. Nothing is rolled back.

use std::path::{Path, PathBuf};

use crate::catalog::Category;
use crate::error::{Error, Result};
use crate::fs_utils::{copy_file_creating_parent, ensure_dir, is_valid_path, reconcile_newest};
use crate::profiles::{validate_profile_name, ProfileOptions};

/// The two directory roots a synchronization moves files between.
#[derive(Debug, Clone, Copy)]
pub struct SyncContext<'a> {
    /// The application's live configuration directory.
    pub config_dir: &'a Path,
    /// Root directory holding every profile's storage subdirectory.
    pub profiles_path: &'a Path,
}

impl<'a> SyncContext<'a> {
    pub fn new(config_dir: &'a Path, profiles_path: &'a Path) -> Self {
        Self {
            config_dir,
            profiles_path,
        }
    }

    fn profile_dir(&self, profile: &ProfileOptions) -> PathBuf {
        self.profiles_path.join(&profile.name)
    }

    /// Checks that must pass before any file is touched.
    fn preflight(&self, profile: &ProfileOptions) -> Result<PathBuf> {
        validate_profile_name(&profile.name)?;
        if !is_valid_path(&[self.profiles_path]) || !is_valid_path(&[self.config_dir]) {
            return Err(Error::validation("sync roots must be non-empty paths"));
        }
        if !self.profiles_path.is_dir() {
            return Err(Error::not_found(self.profiles_path));
        }
        Ok(self.profile_dir(profile))
    }
}

/// What a synchronization call actually did, file by file.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Relative paths successfully copied (either direction).
    pub copied: Vec<PathBuf>,
    /// Relative paths skipped because neither side had them.
    pub skipped: Vec<PathBuf>,
    /// Relative paths that failed, with the cause. Non-fatal.
    pub failed: Vec<(PathBuf, String)>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, rel: PathBuf, result: Result<()>) {
        match result {
            Ok(()) => self.copied.push(rel),
            Err(e) => self.failed.push((rel, e.to_string())),
        }
    }
}

/// Copy every file matched by the profile's enabled categories from the live
/// config directory into the profile's storage subdirectory, overwriting
/// whatever was stored before. Never reads profile content to decide
/// anything.
pub fn save_profile(ctx: &SyncContext, profile: &ProfileOptions) -> Result<SyncReport> {
    let profile_dir = ctx.preflight(profile)?;
    ensure_dir(&profile_dir)?;

    let mut report = SyncReport::default();
    for category in profile.enabled_categories() {
        // Expansion is re-run on every call; the installed plugin/theme set
        // may have changed since the last one.
        let matched = match category.expand(ctx.config_dir) {
            Ok(matched) => matched,
            Err(e) => {
                report
                    .failed
                    .push((PathBuf::from(category.key()), e.to_string()));
                continue;
            }
        };

        for rel in matched {
            let result = copy_file_creating_parent(
                &ctx.config_dir.join(&rel),
                &profile_dir.join(&rel),
            )
            .map(|_| ());
            report.record(rel, result);
        }
    }
    Ok(report)
}

/// Copy every file recorded in the profile's storage subdirectory for the
/// selected categories into the live config directory, overwriting the live
/// copies. `categories` of `None` means every enabled category; `Some`
/// applies exactly the given subset instead.
pub fn load_profile(
    ctx: &SyncContext,
    profile: &ProfileOptions,
    categories: Option<&[Category]>,
) -> Result<SyncReport> {
    let profile_dir = ctx.preflight(profile)?;
    if !profile_dir.is_dir() {
        return Err(Error::not_found(profile_dir));
    }

    let selected: Vec<Category> = match categories {
        Some(subset) => subset.to_vec(),
        None => profile.enabled_categories(),
    };

    let mut report = SyncReport::default();
    for category in selected {
        let matched = match category.expand(&profile_dir) {
            Ok(matched) => matched,
            Err(e) => {
                report
                    .failed
                    .push((PathBuf::from(category.key()), e.to_string()));
                continue;
            }
        };

        for rel in matched {
            let result = copy_file_creating_parent(
                &profile_dir.join(&rel),
                &ctx.config_dir.join(&rel),
            )
            .map(|_| ());
            report.record(rel, result);
        }
    }
    Ok(report)
}

/// Newest-wins reconciliation across both sides for every enabled category.
/// The live file is the source argument, so an exact timestamp tie keeps
/// the live content.
pub fn reconcile_profile(ctx: &SyncContext, profile: &ProfileOptions) -> Result<SyncReport> {
    let profile_dir = ctx.preflight(profile)?;
    if !profile_dir.is_dir() {
        return Err(Error::not_found(profile_dir));
    }

    let mut report = SyncReport::default();
    for category in profile.enabled_categories() {
        // A file may exist on either side only, so expand both trees and
        // take the union.
        let mut matched = match category.expand(ctx.config_dir) {
            Ok(matched) => matched,
            Err(e) => {
                report
                    .failed
                    .push((PathBuf::from(category.key()), e.to_string()));
                continue;
            }
        };
        match category.expand(&profile_dir) {
            Ok(stored) => matched.extend(stored),
            Err(e) => {
                report
                    .failed
                    .push((PathBuf::from(category.key()), e.to_string()));
                continue;
            }
        }
        matched.sort();
        matched.dedup();

        for rel in matched {
            match reconcile_newest(&ctx.config_dir.join(&rel), &profile_dir.join(&rel)) {
                Ok(crate::fs_utils::ReconcileOutcome::Skipped) => report.skipped.push(rel),
                Ok(_) => report.copied.push(rel),
                Err(e) => report.failed.push((rel, e.to_string())),
            }
        }
    }
    Ok(report)
}
