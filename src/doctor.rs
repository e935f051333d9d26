//! The `vaultprof doctor` diagnostics.
//!
//! Checks the directory roots, the settings file, active-profile
//! consistency, and every profile's record for problems a user can fix.

use std::fs;

use crate::paths::Paths;
use crate::profiles::{ProfileOptions, PROFILE_FILE};
use crate::settings::Settings;
use crate::ui::Ui;

pub fn run_doctor(paths: &Paths, ui: &Ui) {
    ui.section("vaultprof Doctor");
    ui.newline();

    let settings = Settings::read(&paths.settings_file).ok();
    let profiles_path = settings
        .as_ref()
        .and_then(|s| s.profiles_path.clone())
        .unwrap_or_else(|| paths.default_profiles_dir.clone());

    // 1. Roots
    check_step(ui, "Directories", || {
        let mut ok = true;
        if paths.config_dir.exists() {
            ui.println(format!(
                "  {} Vault config directory: {}",
                ui.icon_ok(),
                paths.config_dir.display()
            ));
        } else {
            ui.println(format!(
                "  {} Vault config directory missing: {}",
                ui.icon_err(),
                paths.config_dir.display()
            ));
            ok = false;
        }

        if profiles_path.exists() {
            ui.println(format!(
                "  {} Profiles root: {}",
                ui.icon_ok(),
                profiles_path.display()
            ));
        } else {
            ui.println(format!(
                "  {} Profiles root missing (created on first use): {}",
                ui.icon_warn(),
                profiles_path.display()
            ));
        }
        ok
    });

    // 2. Settings file
    check_step(ui, "Settings", || match Settings::read(&paths.settings_file) {
        Ok(settings) => {
            ui.println(format!("  {} Settings file readable", ui.icon_ok()));
            match &settings.active_profile {
                Some(name) => {
                    ui.println(format!("  {} Active profile: {}", ui.icon_info(), name));
                    if profiles_path.join(name).is_dir() {
                        ui.println(format!("  {} Active profile directory exists", ui.icon_ok()));
                        true
                    } else {
                        ui.println(format!(
                            "  {} Active profile directory MISSING",
                            ui.icon_err()
                        ));
                        false
                    }
                }
                None => {
                    ui.println(format!("  {} No active profile", ui.icon_info()));
                    true
                }
            }
        }
        Err(e) => {
            if paths.settings_file.exists() {
                ui.println(format!("  {} Settings file corrupt: {}", ui.icon_err(), e));
                false
            } else {
                ui.println(format!(
                    "  {} Settings file missing (fresh install?)",
                    ui.icon_warn()
                ));
                true
            }
        }
    });

    // 3. Profile records
    check_step(ui, "Profiles", || {
        let entries = match fs::read_dir(&profiles_path) {
            Ok(entries) => entries,
            Err(_) => {
                ui.println(format!("  {} No profiles root yet", ui.icon_warn()));
                return true;
            }
        };

        let mut all_valid = true;
        let mut found = 0;

        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            found += 1;
            let name = entry.file_name().to_string_lossy().to_string();
            let record = dir.join(PROFILE_FILE);

            if !record.is_file() {
                ui.println(format!(
                    "    {} {} (no {}, ignored by the registry)",
                    ui.icon_warn(),
                    name,
                    PROFILE_FILE
                ));
                continue;
            }

            match fs::read_to_string(&record)
                .map_err(|e| e.to_string())
                .and_then(|c| serde_json::from_str::<ProfileOptions>(&c).map_err(|e| e.to_string()))
            {
                Ok(profile) => {
                    if profile.name != name {
                        ui.println(format!(
                            "    {} {} (record names '{}', directory disagrees)",
                            ui.icon_err(),
                            name,
                            profile.name
                        ));
                        all_valid = false;
                    } else {
                        let categories = profile.enabled_categories().len();
                        ui.println(format!(
                            "    {} {} ({} categor{})",
                            ui.icon_ok(),
                            name,
                            categories,
                            if categories == 1 { "y" } else { "ies" }
                        ));
                    }
                }
                Err(e) => {
                    ui.println(format!("    {} {} (corrupt record: {})", ui.icon_err(), name, e));
                    all_valid = false;
                }
            }
        }

        if found == 0 {
            ui.println(format!("  {} No profiles found", ui.icon_warn()));
        }
        all_valid
    });
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F)
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    if !check_fn() {
        ui.println(format!("  {} Issues detected!", ui.icon_err()));
    }
    ui.newline();
}
