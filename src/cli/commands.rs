use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::model::section::Section;
use crate::model::tile::{FolderDisplay, FolderSort, FolderView, TileType};

#[derive(Parser, Debug)]
#[command(
    name = "dockutil",
    about = concat!("dockutil v", env!("CARGO_PKG_VERSION"), " - manage macOS Dock items"),
    version,
    after_help = "Targets are dock plists or home directories; the default is your own dock."
)]
pub struct Cli {
    /// Add a path or URL to the dock (repeatable)
    #[arg(short = 'a', long = "add", value_name = "PATH|URL", action = ArgAction::Append)]
    pub add: Vec<String>,

    /// Remove an item by label, URL or bundle id; `all` empties the dock,
    /// `spacer-tiles` removes every spacer (repeatable)
    #[arg(short = 'r', long = "remove", value_name = "LABEL|URL|all|spacer-tiles", action = ArgAction::Append)]
    pub remove: Vec<String>,

    /// Move an existing item; needs --position, --after or --before
    #[arg(short = 'm', long = "move", value_name = "LABEL|URL|BUNDLE")]
    pub move_item: Option<String>,

    /// Report the section and slot of an item
    #[arg(short = 'f', long = "find", value_name = "LABEL|URL|BUNDLE")]
    pub find: Option<String>,

    /// List every item in the dock
    #[arg(short = 'L', long = "list")]
    pub list: bool,

    /// Replace the item with this label, keeping its slot
    #[arg(short = 'R', long = "replacing", value_name = "LABEL")]
    pub replacing: Option<String>,

    /// beginning, end, middle, a 1-based slot, or +N/-N relative to the
    /// item's current slot
    #[arg(short = 'p', long = "position", allow_hyphen_values = true)]
    pub position: Option<String>,

    /// Place after the item with this label
    #[arg(short = 'A', long = "after", value_name = "LABEL")]
    pub after: Option<String>,

    /// Place before the item with this label
    #[arg(short = 'B', long = "before", value_name = "LABEL")]
    pub before: Option<String>,

    /// Section for additions: apps, recent or others
    #[arg(short = 's', long = "section", value_parser = parse_section)]
    pub section: Option<Section>,

    /// Folder view: auto, fan, grid or list
    #[arg(long, value_parser = parse_view)]
    pub view: Option<FolderView>,

    /// Folder display: folder or stack
    #[arg(long, value_parser = parse_display)]
    pub display: Option<FolderDisplay>,

    /// Folder sort: name, dateadded, datemodified, datecreated or kind
    #[arg(long, value_parser = parse_sort)]
    pub sort: Option<FolderSort>,

    /// Label for an added item
    #[arg(short = 'l', long = "label")]
    pub label: Option<String>,

    /// Tile type: file, directory, url, spacer, small-spacer or flex-spacer
    #[arg(short = 't', long = "type", value_parser = parse_tile_type)]
    pub tile_type: Option<TileType>,

    /// Restart the dock after changes (default)
    #[arg(long)]
    pub restart: bool,

    /// Leave the dock running; changes show up on its next launch
    #[arg(long = "no-restart")]
    pub no_restart: bool,

    /// Apply to every home directory under --homeloc
    #[arg(long)]
    pub allhomes: bool,

    /// Where home directories live
    #[arg(short = 'H', long = "homeloc", value_name = "DIR")]
    pub homeloc: Option<PathBuf>,

    /// Verbose output; repeat for more
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Output find and list results as JSON
    #[arg(long)]
    pub json: bool,

    /// Config file (default: $DOCKUTIL_CONFIG or the platform config dir)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Dock plists or home directories
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
}

impl Cli {
    /// Whether anything was asked for at all
    pub fn has_action(&self) -> bool {
        !self.add.is_empty()
            || !self.remove.is_empty()
            || self.move_item.is_some()
            || self.find.is_some()
            || self.list
    }

    /// Flag override of the config's restart setting, if any
    pub fn restart_override(&self) -> Option<bool> {
        if self.no_restart {
            Some(false)
        } else if self.restart {
            Some(true)
        } else {
            None
        }
    }
}

fn parse_section(s: &str) -> Result<Section, String> {
    Section::parse(s).ok_or_else(|| format!("unknown section '{}' (expected: apps, recent, others)", s))
}

fn parse_view(s: &str) -> Result<FolderView, String> {
    FolderView::parse(s)
        .ok_or_else(|| format!("unknown view '{}' (expected: auto, fan, grid, list)", s))
}

fn parse_display(s: &str) -> Result<FolderDisplay, String> {
    FolderDisplay::parse(s)
        .ok_or_else(|| format!("unknown display '{}' (expected: folder, stack)", s))
}

fn parse_sort(s: &str) -> Result<FolderSort, String> {
    FolderSort::parse(s).ok_or_else(|| {
        format!(
            "unknown sort '{}' (expected: name, dateadded, datemodified, datecreated, kind)",
            s
        )
    })
}

fn parse_tile_type(s: &str) -> Result<TileType, String> {
    TileType::from_name(s).ok_or_else(|| {
        format!(
            "unknown type '{}' (expected: file, directory, url, spacer, small-spacer, flex-spacer)",
            s
        )
    })
}
