//! Computed filesystem locations.

use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::PathBuf;

/// Directory name of the live configuration root inside a vault.
pub const VAULT_CONFIG_DIR: &str = ".vault";

/// All locations the tool works with.
#[derive(Debug, Clone)]
pub struct Paths {
    /// ~/.vaultprof
    pub base_dir: PathBuf,
    /// ~/.vaultprof/settings.json
    pub settings_file: PathBuf,
    /// ~/.vaultprof/profiles - default profiles root when the settings
    /// file does not name one.
    pub default_profiles_dir: PathBuf,
    /// The vault's live configuration directory.
    pub config_dir: PathBuf,
}

impl Paths {
    /// Resolve locations from the home directory and the vault config
    /// directory override, defaulting to `./.vault`.
    pub fn new(config_dir: Option<PathBuf>) -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
        let base_dir = base_dirs.home_dir().join(".vaultprof");

        let config_dir = match config_dir {
            Some(dir) => dir,
            None => std::env::current_dir()
                .context("Failed to determine current directory")?
                .join(VAULT_CONFIG_DIR),
        };

        Ok(Self {
            settings_file: base_dir.join("settings.json"),
            default_profiles_dir: base_dir.join("profiles"),
            base_dir,
            config_dir,
        })
    }

}
