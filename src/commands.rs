//! Handler functions for each CLI subcommand.
//!
//! This is the coordination layer between `main.rs` and the library:
//! `crate::manager` for every profile operation, `crate::ui` for output,
//! inquire prompts for the confirmations that destructive operations
//! require. Save and load overwrite files with no rollback, so every
//! destructive command asks first unless `--yes` is passed.

use anstyle::AnsiColor;
use anyhow::{bail, Context, Result};
use inquire::{Confirm, MultiSelect};
use std::path::Path;

use crate::catalog::Category;
use crate::fs_utils::dir_size;
use crate::manager::ProfileManager;
use crate::profiles::ProfileOptions;
use crate::sync::SyncReport;
use crate::ui::Ui;

/// List all known profiles.
pub fn list(mgr: &ProfileManager, ui: &Ui) -> Result<()> {
    let profiles = mgr.get_profiles_list();

    if profiles.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println("Create one from the current vault config with:");
        ui.println(format!("  {} create <name>", ui.bold("vaultprof")));
        return Ok(());
    }

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Profile"),
        ui.header_cell("Categories"),
        ui.header_cell("Auto-sync"),
        ui.header_cell("Modified"),
    ]);

    for profile in &profiles {
        let active = mgr.is_enabled(profile);
        let icon = if active { ui.icon_ok() } else { " " };

        let mut codes: Vec<&str> = profile
            .enabled_categories()
            .iter()
            .map(|c| c.short_name())
            .collect();
        codes.sort();

        table.add_row(vec![
            ui.cell(icon),
            if active {
                ui.colored_cell(&profile.name, AnsiColor::Green)
            } else {
                ui.cell(&profile.name)
            },
            ui.cell(codes.join(",")),
            ui.cell(if profile.auto_sync { "on" } else { "off" }),
            ui.cell(profile.modified_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }

    ui.section("Profiles");
    ui.println(table.to_string());
    Ok(())
}

/// Show the active profile and the tool's paths.
pub fn current(mgr: &ProfileManager, ui: &Ui) -> Result<()> {
    ui.section("Current Profile");
    ui.newline();

    let mut table = ui.simple_table();
    match mgr.active_profile() {
        Some(name) => {
            table.add_row(vec![ui.cell("Active profile:"), ui.header_cell(name)]);
            if let Some(profile) = mgr.get_profile(name) {
                let categories: Vec<&str> = profile
                    .enabled_categories()
                    .iter()
                    .map(|c| c.display_name())
                    .collect();
                table.add_row(vec![ui.cell("Categories:"), ui.cell(categories.join(", "))]);
                table.add_row(vec![
                    ui.cell("Auto-sync:"),
                    ui.cell(if profile.auto_sync { "on" } else { "off" }),
                ]);
            } else {
                table.add_row(vec![
                    ui.cell(""),
                    ui.colored_cell("(profile record missing)", AnsiColor::Yellow),
                ]);
            }
        }
        None => {
            table.add_row(vec![ui.cell("Active profile:"), ui.cell("(none)")]);
        }
    }
    table.add_row(vec![
        ui.cell("Vault config:"),
        ui.cell(mgr.config_dir().display().to_string()),
    ]);
    table.add_row(vec![
        ui.cell("Profiles root:"),
        ui.cell(mgr.get_profiles_path().display().to_string()),
    ]);

    ui.println(table.to_string());
    Ok(())
}

/// Show one profile's stored files and sizes.
pub fn inspect(mgr: &ProfileManager, name: &str, ui: &Ui) -> Result<()> {
    let profile = require_profile(mgr, name)?;
    let dir = mgr.get_profiles_path().join(&profile.name);

    ui.section(format!("Profile: {}", profile.name));
    ui.newline();

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell("Category"),
        ui.header_cell("Patterns"),
        ui.header_cell("Stored"),
    ]);

    for category in profile.enabled_categories() {
        let stored = category.expand(&dir).unwrap_or_default();
        table.add_row(vec![
            ui.cell(category.display_name()),
            ui.cell(category.descriptor().files.join(", ")),
            ui.cell(format!("{} file(s)", stored.len())),
        ]);
    }

    ui.println(table.to_string());
    ui.newline();

    if dir.exists() {
        let size = dir_size(&dir).unwrap_or(0);
        ui.println(format!("Storage: {} ({})", dir.display(), format_bytes(size)));
    }
    ui.println(ui.dim(format!(
        "Modified: {}",
        profile.modified_at.format("%Y-%m-%d %H:%M:%S")
    )));
    Ok(())
}

/// Create a new profile from the current live config.
pub fn create(
    mgr: &mut ProfileManager,
    name: &str,
    categories_arg: Option<Vec<String>>,
    auto_sync: bool,
    ui: &Ui,
) -> Result<()> {
    let categories = match categories_arg {
        Some(keys) => parse_categories(&keys)?,
        None => select_categories()?,
    };

    let mut options = ProfileOptions::new(name);
    options.auto_sync = auto_sync;
    for category in &categories {
        options.set_enabled(*category, true);
    }

    let report = mgr.create_profile(options)?;
    print_report(&report, ui);

    ui.ok(format!("Created profile '{}'", name));
    ui.newline();
    ui.println("To activate it:");
    ui.println(format!("  vaultprof use {}", name));
    Ok(())
}

/// Switch the active profile; no name deactivates without touching files.
pub fn use_profile(mgr: &mut ProfileManager, name: Option<&str>, yes: bool, ui: &Ui) -> Result<()> {
    let Some(name) = name else {
        mgr.switch_profile(None)?;
        ui.ok("No profile active");
        return Ok(());
    };

    require_profile(mgr, name)?;
    confirm(
        yes,
        &format!(
            "Switching overwrites the live vault config with profile '{}'. Continue?",
            name
        ),
    )?;

    let spinner = ui.spinner(format!("Switching to profile '{}'...", name));
    match mgr.switch_profile(Some(name)) {
        Ok(report) => {
            ui.spinner_finish_ok(&spinner, format!("Active profile: {}", name));
            if let Some(report) = report {
                print_report(&report, ui);
            }
            Ok(())
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, format!("Failed to switch: {}", e));
            Err(e)
        }
    }
}

/// Remove a profile and its storage directory.
pub fn remove(mgr: &mut ProfileManager, name: &str, yes: bool, ui: &Ui) -> Result<()> {
    require_profile(mgr, name)?;
    confirm(
        yes,
        &format!(
            "Permanently delete profile '{}' and all its stored files?",
            name
        ),
    )?;

    mgr.remove_profile(name)?;
    ui.ok(format!("Removed profile '{}'", name));
    Ok(())
}

/// Edit a profile's name, categories or auto-sync flag. Only the fields
/// given on the command line change; everything else is carried over.
pub fn edit(
    mgr: &mut ProfileManager,
    name: &str,
    rename_to: Option<&str>,
    categories_arg: Option<Vec<String>>,
    auto_sync: Option<bool>,
    ui: &Ui,
) -> Result<()> {
    let mut options = require_profile(mgr, name)?;

    if let Some(new_name) = rename_to {
        options.name = new_name.to_string();
    }
    if let Some(keys) = categories_arg {
        let selected = parse_categories(&keys)?;
        for category in Category::all() {
            options.set_enabled(category, selected.contains(&category));
        }
    }
    if let Some(auto_sync) = auto_sync {
        options.auto_sync = auto_sync;
    }

    let new_name = options.name.clone();
    mgr.edit_profile(name, options)?;

    if name != new_name {
        ui.ok(format!("Renamed profile '{}' to '{}'", name, new_name));
    } else {
        ui.ok(format!("Updated profile '{}'", name));
    }
    ui.println(ui.dim(
        "Flag changes take effect on the next save/load; nothing was synchronized now.",
    ));
    Ok(())
}

/// Save the live config into a profile (overwrites the stored copies).
pub fn save(mgr: &mut ProfileManager, name: &str, yes: bool, ui: &Ui) -> Result<()> {
    let profile = require_profile(mgr, name)?;
    confirm(
        yes,
        &format!("Overwrite the files stored in profile '{}'?", name),
    )?;

    let report = mgr.save_profile_settings(&profile)?;
    print_report(&report, ui);
    ui.ok(format!("Saved vault config into profile '{}'", name));
    Ok(())
}

/// Load a profile into the live config, fully or for selected categories.
pub fn load(
    mgr: &mut ProfileManager,
    name: &str,
    categories_arg: Option<Vec<String>>,
    yes: bool,
    ui: &Ui,
) -> Result<()> {
    let profile = require_profile(mgr, name)?;
    confirm(
        yes,
        &format!(
            "Overwrite live vault config with the files stored in '{}'?",
            name
        ),
    )?;

    let report = match categories_arg {
        Some(keys) => {
            let categories = parse_categories(&keys)?;
            mgr.load_partially_profile_settings(&profile, &categories)?
        }
        None => mgr.load_profile_settings(&profile)?,
    };
    print_report(&report, ui);
    ui.ok(format!("Loaded profile '{}' into the vault config", name));
    Ok(())
}

/// Reconcile (newest-wins, both directions) a profile, defaulting to the
/// active one.
pub fn sync(mgr: &mut ProfileManager, name: Option<&str>, ui: &Ui) -> Result<()> {
    let name = match name {
        Some(name) => name.to_string(),
        None => mgr
            .active_profile()
            .map(str::to_string)
            .context("No profile is active; pass a profile name to sync")?,
    };
    let profile = require_profile(mgr, &name)?;

    let report = mgr.reconcile_profile_settings(&profile)?;
    print_report(&report, ui);
    ui.ok(format!("Reconciled profile '{}'", name));
    Ok(())
}

/// Show the profiles root, or migrate it to a new directory.
pub fn path(mgr: &mut ProfileManager, set: Option<&Path>, yes: bool, ui: &Ui) -> Result<()> {
    let Some(new_path) = set else {
        ui.println(mgr.get_profiles_path().display().to_string());
        return Ok(());
    };

    let old_path = mgr.get_profiles_path();
    confirm(
        yes,
        &format!(
            "Move all profiles from {} to {} and delete the old root?",
            old_path.display(),
            new_path.display()
        ),
    )?;

    let spinner = ui.spinner("Migrating profiles...");
    match mgr.set_profiles_path(new_path) {
        Ok(()) => {
            ui.spinner_finish_ok(
                &spinner,
                format!("Profiles root is now {}", new_path.display()),
            );
            Ok(())
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, format!("Migration failed: {}", e));
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------

fn require_profile(mgr: &ProfileManager, name: &str) -> Result<ProfileOptions> {
    mgr.get_profile(name).with_context(|| {
        format!(
            "Profile '{}' does not exist.\nHint: Use 'vaultprof list' to see available profiles.",
            name
        )
    })
}

fn parse_categories(keys: &[String]) -> Result<Vec<Category>> {
    let mut categories = Vec::new();
    for key in keys {
        let category: Category = key.parse().map_err(|_| {
            anyhow::anyhow!(
                "Invalid category: '{}'\nHint: Valid categories are {}",
                key,
                Category::all()
                    .iter()
                    .map(|c| c.key())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    Ok(categories)
}

/// Interactive category picker for `create` without `--categories`.
fn select_categories() -> Result<Vec<Category>> {
    let all = Category::all();
    let options: Vec<String> = all.iter().map(|c| c.display_name().to_string()).collect();

    let chosen = MultiSelect::new("Which categories should this profile include?", options.clone())
        .with_help_message("Space to select, Enter to confirm")
        .prompt()
        .context("Category selection cancelled")?;

    let selected: Vec<Category> = chosen
        .iter()
        .filter_map(|label| options.iter().position(|o| o == label).map(|i| all[i]))
        .collect();

    if selected.is_empty() {
        bail!("At least one category must be selected.");
    }
    Ok(selected)
}

fn confirm(yes: bool, prompt: &str) -> Result<()> {
    if yes {
        return Ok(());
    }
    let confirmed = Confirm::new(prompt)
        .with_default(false)
        .prompt()
        .context("Confirmation cancelled")?;
    if !confirmed {
        bail!("Aborted");
    }
    Ok(())
}

fn print_report(report: &SyncReport, ui: &Ui) {
    if !report.copied.is_empty() {
        ui.println(ui.dim(format!("{} file(s) synchronized", report.copied.len())));
    }
    for (rel, cause) in &report.failed {
        ui.warn(format!("skipped {}: {}", rel.display(), cause));
    }
}

/// Format bytes as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
