use serde::{Deserialize, Serialize};

use super::tile::Tile;

/// One of the three fixed partitions of the dock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Apps,
    Recent,
    Others,
}

impl Section {
    /// Search priority order: apps → recent → others
    pub const ALL: [Section; 3] = [Section::Apps, Section::Recent, Section::Others];

    /// The top-level document key holding this section's tiles
    pub fn key(self) -> &'static str {
        match self {
            Section::Apps => "persistent-apps",
            Section::Recent => "recent-apps",
            Section::Others => "persistent-others",
        }
    }

    /// Parse a short section name (`apps`, `recent`, `others`) or a document key.
    pub fn parse(s: &str) -> Option<Section> {
        match s {
            "apps" | "persistent-apps" => Some(Section::Apps),
            "recent" | "recent-apps" => Some(Section::Recent),
            "others" | "persistent-others" => Some(Section::Others),
            _ => None,
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            Section::Apps => 0,
            Section::Recent => 1,
            Section::Others => 2,
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Section::Apps => write!(f, "apps"),
            Section::Recent => write!(f, "recent"),
            Section::Others => write!(f, "others"),
        }
    }
}

/// The three ordered tile sequences of a dock document.
///
/// Only index-level operations live here; placement policy belongs to
/// `ops::dock_ops`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    lists: [Vec<Tile>; 3],
}

impl Sections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tiles(&self, section: Section) -> &[Tile] {
        &self.lists[section.slot()]
    }

    pub fn tiles_mut(&mut self, section: Section) -> &mut Vec<Tile> {
        &mut self.lists[section.slot()]
    }

    pub fn len(&self, section: Section) -> usize {
        self.lists[section.slot()].len()
    }

    /// Total number of tiles across all sections
    pub fn total(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Insert at `index`; an index past the end appends.
    pub fn insert(&mut self, section: Section, index: usize, tile: Tile) {
        let list = self.tiles_mut(section);
        let index = index.min(list.len());
        list.insert(index, tile);
    }

    pub fn push(&mut self, section: Section, tile: Tile) {
        self.tiles_mut(section).push(tile);
    }

    pub fn remove(&mut self, section: Section, index: usize) -> Option<Tile> {
        let list = self.tiles_mut(section);
        if index < list.len() {
            Some(list.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        for list in &mut self.lists {
            list.clear();
        }
    }

    /// Replace a whole section's contents
    pub fn set(&mut self, section: Section, tiles: Vec<Tile>) {
        self.lists[section.slot()] = tiles;
    }

    /// Iterate `(section, tile)` pairs in priority order
    pub fn iter(&self) -> impl Iterator<Item = (Section, &Tile)> {
        Section::ALL
            .into_iter()
            .flat_map(move |s| self.tiles(s).iter().map(move |t| (s, t)))
    }
}
