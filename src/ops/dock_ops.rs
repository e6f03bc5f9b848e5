use std::path::Path;

use crate::model::section::{Section, Sections};
use crate::model::tile::{FolderOptions, Tile, TileType, random_guid};
use crate::ops::locate::{find_in_section, locate};
use crate::ops::position::{Placement, PlacementSpec, resolve};

/// Error type for dock mutations
#[derive(Debug, thiserror::Error)]
pub enum DockError {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("{0} already exists in dock. Use --replacing '{0}' to update an existing item")]
    DuplicateLabel(String),
    #[error("could not parse position: {0}")]
    InvalidPosition(String),
}

/// Removal keyword that empties every section
pub const REMOVE_ALL: &str = "all";
/// Removal keyword that drops every spacer tile
pub const REMOVE_SPACERS: &str = "spacer-tiles";

/// A request to add one tile
#[derive(Debug, Clone)]
pub struct AddRequest<'a> {
    /// Filesystem path or URL string
    pub path: &'a str,
    pub tile_type: TileType,
    pub section: Section,
    pub label: Option<&'a str>,
    /// Replace the tile answering to this query in the same section
    pub replacing: Option<&'a str>,
    pub placement: PlacementSpec<'a>,
    /// Only used for directory tiles
    pub folder: FolderOptions,
}

/// Result of a successful `find`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found {
    pub section: Section,
    /// 1-based slot within the section
    pub slot: usize,
}

/// The label a new tile gets when none is given.
///
/// URLs are labelled with themselves, paths with their file name minus the
/// extension, spacers with nothing.
pub fn default_label(path: &str, tile_type: &TileType) -> String {
    match tile_type {
        TileType::Url => path.to_string(),
        t if t.is_spacer() => String::new(),
        _ => {
            let trimmed = path.trim_end_matches('/');
            Path::new(trimmed)
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
                .unwrap_or_else(|| path.to_string())
        }
    }
}

fn build_tile(req: &AddRequest<'_>, label: &str, guid: i64) -> Tile {
    match &req.tile_type {
        TileType::Directory => Tile::directory(req.path, label, req.folder, guid),
        TileType::Url => Tile::url_tile(req.path, label, guid),
        t if t.is_spacer() => Tile::spacer(t.clone(), guid),
        _ => Tile::file(req.path, label, req.section, guid),
    }
}

/// Add a tile. On any error the sections are left exactly as they were.
pub fn add(sections: &mut Sections, req: &AddRequest<'_>) -> Result<Placement, DockError> {
    let label = match req.label {
        Some(l) => l.to_string(),
        None => default_label(req.path, &req.tile_type),
    };

    // Label-only collision check, scoped to the destination section
    if !label.is_empty()
        && req.replacing != Some(label.as_str())
        && sections
            .tiles(req.section)
            .iter()
            .any(|t| t.label() == Some(label.as_str()))
    {
        return Err(DockError::DuplicateLabel(label));
    }

    let mut spec = req.placement;
    let forced_position;
    let mut replaced = None;
    if let Some(target) = req.replacing {
        match find_in_section(sections, req.section, target) {
            Some(index) => {
                tracing::debug!(item = target, index, "replacing existing item");
                replaced = sections.remove(req.section, index).map(|t| (index, t));
                forced_position = (index + 1).to_string();
                spec = PlacementSpec {
                    position: Some(forced_position.as_str()),
                    before: None,
                    after: None,
                };
            }
            None => tracing::warn!(item = target, "item to replace not found, adding instead"),
        }
    }

    let placement = match resolve(sections, req.section, &spec, 0) {
        Ok(p) => p,
        Err(e) => {
            if let Some((index, tile)) = replaced {
                sections.insert(req.section, index, tile);
            }
            return Err(e);
        }
    };

    let tile = build_tile(req, &label, random_guid());
    tracing::debug!(label = %label, section = %placement.section, index = placement.index, "inserting tile");
    sections.insert(placement.section, placement.index, tile);
    Ok(placement)
}

/// Remove tiles. Returns how many were removed.
///
/// `all` empties every section and `spacer-tiles` drops every spacer; both
/// succeed even when nothing matched. Any other query removes the first
/// match in priority order.
pub fn remove(sections: &mut Sections, query: &str) -> Result<usize, DockError> {
    match query {
        REMOVE_ALL => {
            let count = sections.total();
            sections.clear();
            Ok(count)
        }
        REMOVE_SPACERS => {
            let mut count = 0;
            for section in Section::ALL {
                let tiles = sections.tiles_mut(section);
                let before = tiles.len();
                tiles.retain(|t| !t.is_spacer());
                count += before - tiles.len();
            }
            Ok(count)
        }
        _ => {
            let (section, index) =
                locate(sections, query).ok_or_else(|| DockError::NotFound(query.to_string()))?;
            sections.remove(section, index);
            Ok(1)
        }
    }
}

/// Move a tile within its own section.
///
/// Relative positions (`+N`/`-N`) count from the slot the tile occupied
/// before the move. An anchor in a different section cannot pull the tile
/// across; the tile is appended to its own section instead.
pub fn move_tile(
    sections: &mut Sections,
    query: &str,
    spec: &PlacementSpec<'_>,
) -> Result<Placement, DockError> {
    let (section, original_index) =
        locate(sections, query).ok_or_else(|| DockError::NotFound(query.to_string()))?;
    let tile = sections
        .remove(section, original_index)
        .ok_or_else(|| DockError::NotFound(query.to_string()))?;

    let mut placement = match resolve(sections, section, spec, original_index) {
        Ok(p) => p,
        Err(e) => {
            sections.insert(section, original_index, tile);
            return Err(e);
        }
    };
    if placement.section != section {
        tracing::warn!(
            item = query,
            anchor_section = %placement.section,
            "anchor is in another section, moving to end of {}",
            section
        );
        placement = Placement {
            section,
            index: sections.len(section),
        };
    }

    sections.insert(placement.section, placement.index, tile);
    Ok(placement)
}

/// Locate a tile without changing anything
pub fn find(sections: &Sections, query: &str) -> Result<Found, DockError> {
    locate(sections, query)
        .map(|(section, index)| Found {
            section,
            slot: index + 1,
        })
        .ok_or_else(|| DockError::NotFound(query.to_string()))
}

/// Every tile with its section and 1-based slot, in priority order
pub fn list(sections: &Sections) -> Vec<(Section, usize, &Tile)> {
    Section::ALL
        .into_iter()
        .flat_map(|s| {
            sections
                .tiles(s)
                .iter()
                .enumerate()
                .map(move |(i, t)| (s, i + 1, t))
        })
        .collect()
}
