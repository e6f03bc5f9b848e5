use indexmap::IndexMap;
use serde::Serialize;

use crate::model::section::Section;
use crate::model::tile::Tile;
use crate::ops::dock_ops::Found;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TileJson {
    pub slot: usize,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tile_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
}

/// One document's tiles, grouped by section key in priority order
#[derive(Serialize)]
pub struct DockListJson {
    pub path: String,
    pub sections: IndexMap<&'static str, Vec<TileJson>>,
}

#[derive(Serialize)]
pub struct FindJson {
    pub query: String,
    pub path: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn tile_to_json(slot: usize, tile: &Tile) -> TileJson {
    TileJson {
        slot,
        label: tile.label().unwrap_or_default().to_string(),
        url: tile.url().map(str::to_string),
        tile_type: tile.tile_type().map(|t| t.as_str().to_string()),
        bundle_id: tile.bundle_identifier().map(str::to_string),
    }
}

pub fn list_to_json(path: &str, entries: &[(Section, usize, &Tile)]) -> DockListJson {
    let mut sections: IndexMap<&'static str, Vec<TileJson>> =
        Section::ALL.iter().map(|s| (s.key(), Vec::new())).collect();
    for (section, slot, tile) in entries {
        if let Some(tiles) = sections.get_mut(section.key()) {
            tiles.push(tile_to_json(*slot, tile));
        }
    }
    DockListJson {
        path: path.to_string(),
        sections,
    }
}

pub fn find_to_json(query: &str, path: &str, found: Option<Found>) -> FindJson {
    FindJson {
        query: query.to_string(),
        path: path.to_string(),
        found: found.is_some(),
        section: found.map(|f| f.section),
        slot: found.map(|f| f.slot),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// `label<TAB>url<TAB>section-key<TAB>document<TAB>bundle-id`, blanks for
/// missing fields
pub fn format_list_line(section: Section, tile: &Tile, path: &str) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        tile.label().unwrap_or_default(),
        tile.url().unwrap_or_default(),
        section.key(),
        path,
        tile.bundle_identifier().unwrap_or_default()
    )
}

pub fn format_find(query: &str, path: &str, found: Option<Found>) -> String {
    match found {
        Some(f) => format!(
            "{} was found in {} at slot {} in {}",
            query,
            f.section.key(),
            f.slot,
            path
        ),
        None => format!("{} was not found in {}", query, path),
    }
}
