use crate::model::section::{Section, Sections};
use crate::model::tile::Tile;

/// Does this tile answer to `query` by label, bundle id, path or url?
pub fn tile_matches(tile: &Tile, query: &str) -> bool {
    tile.label() == Some(query)
        || tile.bundle_identifier() == Some(query)
        || tile.decoded_path().as_deref() == Some(query)
        || tile.url() == Some(query)
}

/// Index of the first tile in `section` matching `query`
pub fn find_in_section(sections: &Sections, section: Section, query: &str) -> Option<usize> {
    sections
        .tiles(section)
        .iter()
        .position(|t| tile_matches(t, query))
}

/// First match across sections in priority order (apps, recent, others)
pub fn locate(sections: &Sections, query: &str) -> Option<(Section, usize)> {
    Section::ALL
        .into_iter()
        .find_map(|s| find_in_section(sections, s, query).map(|i| (s, i)))
}
