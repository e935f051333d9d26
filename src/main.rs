use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vaultprof::{
    commands,
    doctor::run_doctor,
    manager::ProfileManager,
    paths::Paths,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "vaultprof")]
#[command(about = "Vault settings profile manager - save, load and reconcile named configuration profiles")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Vault config directory (defaults to ./.vault)
    #[arg(long, global = true, value_name = "DIR")]
    vault_config: Option<PathBuf>,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all profiles
    List,

    /// Show the active profile and configured paths
    Current,

    /// Show detailed information about a profile
    Inspect {
        /// Name of the profile to inspect
        name: String,
    },

    /// Create a new profile from the current vault config
    Create {
        /// Name of the profile to create
        name: String,

        /// Categories to include (skip interactive selection)
        /// Comma-separated: appearance,app,bookmarks,communityPlugins,corePlugins,graph,hotkeys,snippets
        #[arg(long, value_delimiter = ',')]
        categories: Option<Vec<String>>,

        /// Reconcile automatically while this profile is active
        #[arg(long)]
        auto_sync: bool,
    },

    /// Switch to a profile (load it into the vault config)
    Use {
        /// Name of the profile to activate; omit to deactivate
        name: Option<String>,
    },

    /// Remove a profile and all its stored files
    Remove {
        /// Name of the profile to remove
        name: String,
    },

    /// Change a profile's name, categories or auto-sync flag
    Edit {
        /// Name of the profile to edit
        name: String,

        /// New name for the profile
        #[arg(long, value_name = "NAME")]
        rename: Option<String>,

        /// Replace the enabled category set (comma-separated)
        #[arg(long, value_delimiter = ',')]
        categories: Option<Vec<String>>,

        /// Turn auto-sync on or off
        #[arg(long, value_name = "BOOL")]
        auto_sync: Option<bool>,
    },

    /// Save the vault config into a profile (overwrites stored copies)
    Save {
        /// Name of the profile to save into
        name: String,
    },

    /// Load a profile into the vault config (overwrites live files)
    Load {
        /// Name of the profile to load
        name: String,

        /// Load only these categories (comma-separated)
        #[arg(long, value_delimiter = ',')]
        categories: Option<Vec<String>>,
    },

    /// Reconcile a profile with the vault config (newest file wins)
    Sync {
        /// Profile to reconcile; defaults to the active one
        name: Option<String>,
    },

    /// Show the profiles root, or migrate it to a new directory
    Path {
        /// Move the profiles root here
        #[arg(long, value_name = "DIR")]
        set: Option<PathBuf>,
    },

    /// Run diagnostics on the vaultprof setup
    Doctor,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = Paths::new(cli.vault_config.clone())?;
    let ui = Ui::new(cli.color, cli.no_color);

    if matches!(cli.command, Commands::Doctor) {
        run_doctor(&paths, &ui);
        return Ok(());
    }

    let mut mgr = ProfileManager::open(paths)?;

    // Startup reconcile for an auto-sync active profile happens before the
    // requested command runs.
    if let Err(e) = mgr.startup_auto_sync() {
        ui.warn(format!("Auto-sync failed: {}", e));
    }

    match cli.command {
        Commands::List => commands::list(&mgr, &ui),
        Commands::Current => commands::current(&mgr, &ui),
        Commands::Inspect { name } => commands::inspect(&mgr, &name, &ui),
        Commands::Create {
            name,
            categories,
            auto_sync,
        } => commands::create(&mut mgr, &name, categories, auto_sync, &ui),
        Commands::Use { name } => commands::use_profile(&mut mgr, name.as_deref(), cli.yes, &ui),
        Commands::Remove { name } => commands::remove(&mut mgr, &name, cli.yes, &ui),
        Commands::Edit {
            name,
            rename,
            categories,
            auto_sync,
        } => commands::edit(&mut mgr, &name, rename.as_deref(), categories, auto_sync, &ui),
        Commands::Save { name } => commands::save(&mut mgr, &name, cli.yes, &ui),
        Commands::Load { name, categories } => {
            commands::load(&mut mgr, &name, categories, cli.yes, &ui)
        }
        Commands::Sync { name } => commands::sync(&mut mgr, name.as_deref(), &ui),
        Commands::Path { set } => commands::path(&mut mgr, set.as_deref(), cli.yes, &ui),
        Commands::Doctor => unreachable!("handled above"),
    }
}
