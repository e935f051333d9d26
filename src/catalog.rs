//! Static catalog of configuration categories.
//!
//! Each category maps to a fixed set of path patterns inside the live vault
//! config directory. The table is the single source of truth for what the
//! synchronization engine is allowed to touch; there is no runtime field
//! enumeration anywhere.
//!
//! Patterns are deliberately not full globs. Exactly two wildcard shapes are
//! supported, matching the layouts that actually occur: `dir/*` (files
//! directly inside a directory) and `dir/*/*` (files one directory deeper,
//! e.g. one file set per installed plugin). Expansion is re-run on every
//! sync call so newly installed plugins or themes are always picked up.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Result;

/// A configuration category that a profile can include in synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Appearance,
    App,
    Bookmarks,
    CommunityPlugins,
    CorePlugins,
    Graph,
    Hotkeys,
    Snippets,
}

/// Display metadata plus the file patterns a category owns.
#[derive(Debug)]
pub struct CategoryDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Patterns relative to the live config root.
    pub files: &'static [&'static str],
    /// Patterns excluded even when matched by `files`. Ignore always wins.
    pub ignore: &'static [&'static str],
}

/// The engine's own per-vault data file. It must never be synchronized,
/// otherwise a load could overwrite the settings of the running tool.
pub const SELF_DATA_FILE: &str = "plugins/vaultprof/data.json";

const APPEARANCE: CategoryDescriptor = CategoryDescriptor {
    name: "Appearance",
    description: "Appearance settings and installed themes",
    files: &["appearance.json", "themes/*/*"],
    ignore: &[],
};

const APP: CategoryDescriptor = CategoryDescriptor {
    name: "App",
    description: "General application settings",
    files: &["app.json"],
    ignore: &[],
};

const BOOKMARKS: CategoryDescriptor = CategoryDescriptor {
    name: "Bookmarks",
    description: "Bookmarked files and folders",
    files: &["bookmarks.json"],
    ignore: &[],
};

const COMMUNITY_PLUGINS: CategoryDescriptor = CategoryDescriptor {
    name: "Community plugins",
    description: "Installed community plugins and their settings",
    files: &["community-plugins.json", "plugins/*/*"],
    ignore: &[SELF_DATA_FILE],
};

const CORE_PLUGINS: CategoryDescriptor = CategoryDescriptor {
    name: "Core plugins",
    description: "Core plugin configuration",
    files: &["core-plugins.json", "core-plugins-migration.json"],
    ignore: &[],
};

const GRAPH: CategoryDescriptor = CategoryDescriptor {
    name: "Graph",
    description: "Graph view settings",
    files: &["graph.json"],
    ignore: &[],
};

const HOTKEYS: CategoryDescriptor = CategoryDescriptor {
    name: "Hotkeys",
    description: "Custom hotkey bindings",
    files: &["hotkeys.json"],
    ignore: &[],
};

const SNIPPETS: CategoryDescriptor = CategoryDescriptor {
    name: "CSS snippets",
    description: "Custom CSS snippets",
    files: &["snippets/*"],
    ignore: &[],
};

impl Category {
    /// Every known category, in stable display order.
    pub fn all() -> Vec<Category> {
        vec![
            Category::Appearance,
            Category::App,
            Category::Bookmarks,
            Category::CommunityPlugins,
            Category::CorePlugins,
            Category::Graph,
            Category::Hotkeys,
            Category::Snippets,
        ]
    }

    pub fn descriptor(&self) -> &'static CategoryDescriptor {
        match self {
            Category::Appearance => &APPEARANCE,
            Category::App => &APP,
            Category::Bookmarks => &BOOKMARKS,
            Category::CommunityPlugins => &COMMUNITY_PLUGINS,
            Category::CorePlugins => &CORE_PLUGINS,
            Category::Graph => &GRAPH,
            Category::Hotkeys => &HOTKEYS,
            Category::Snippets => &SNIPPETS,
        }
    }

    pub fn display_name(&self) -> &'static str {
        self.descriptor().name
    }

    /// Short identifier for compact table output.
    pub fn short_name(&self) -> &'static str {
        match self {
            Category::Appearance => "ap",
            Category::App => "A",
            Category::Bookmarks => "B",
            Category::CommunityPlugins => "cp",
            Category::CorePlugins => "CP",
            Category::Graph => "G",
            Category::Hotkeys => "H",
            Category::Snippets => "S",
        }
    }

    /// Key used on the CLI and in `profile.json`.
    pub fn key(&self) -> &'static str {
        match self {
            Category::Appearance => "appearance",
            Category::App => "app",
            Category::Bookmarks => "bookmarks",
            Category::CommunityPlugins => "communityPlugins",
            Category::CorePlugins => "corePlugins",
            Category::Graph => "graph",
            Category::Hotkeys => "hotkeys",
            Category::Snippets => "snippets",
        }
    }

    /// Expand this category's patterns against `root`, returning relative
    /// paths of existing files, with ignore patterns already applied.
    pub fn expand(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let desc = self.descriptor();
        let mut matched = Vec::new();
        for pattern in desc.files {
            for rel in expand_pattern(root, pattern)? {
                if desc.ignore.iter().any(|ig| pattern_matches(ig, &rel)) {
                    continue;
                }
                matched.push(rel);
            }
        }
        matched.sort();
        matched.dedup();
        Ok(matched)
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "appearance" => Ok(Category::Appearance),
            "app" => Ok(Category::App),
            "bookmarks" => Ok(Category::Bookmarks),
            "communityplugins" | "community-plugins" => Ok(Category::CommunityPlugins),
            "coreplugins" | "core-plugins" => Ok(Category::CorePlugins),
            "graph" => Ok(Category::Graph),
            "hotkeys" => Ok(Category::Hotkeys),
            "snippets" => Ok(Category::Snippets),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// Expand a one-level-wildcard pattern against `root`.
///
/// Each `*` segment matches exactly one path segment: an intermediate `*`
/// matches any subdirectory, a trailing `*` matches any non-directory entry.
/// Missing directories along the way simply yield no matches.
fn expand_pattern(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let segments: Vec<&str> = pattern.split('/').collect();
    let mut results = Vec::new();
    walk_segments(root, &segments, PathBuf::new(), &mut results)?;
    Ok(results)
}

fn walk_segments(
    dir: &Path,
    segments: &[&str],
    rel: PathBuf,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };

    if rest.is_empty() {
        // Final segment names files.
        if *head == "*" {
            if !dir.exists() {
                return Ok(());
            }
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                if !entry.path().is_dir() {
                    out.push(rel.join(entry.file_name()));
                }
            }
        } else if dir.join(head).is_file() {
            out.push(rel.join(head));
        }
        return Ok(());
    }

    // Intermediate segment names directories.
    if *head == "*" {
        if !dir.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                walk_segments(&entry.path(), rest, rel.join(entry.file_name()), out)?;
            }
        }
    } else {
        walk_segments(&dir.join(head), rest, rel.join(head), out)?;
    }
    Ok(())
}

/// Segment-wise match of a relative path against a pattern, `*` matching
/// any single segment.
pub fn pattern_matches(pattern: &str, rel: &Path) -> bool {
    let pattern_segs: Vec<&str> = pattern.split('/').collect();
    let path_segs: Vec<&std::ffi::OsStr> = rel.iter().collect();

    if pattern_segs.len() != path_segs.len() {
        return false;
    }

    pattern_segs
        .iter()
        .zip(path_segs.iter())
        .all(|(p, s)| *p == "*" || s.to_str() == Some(p))
}
