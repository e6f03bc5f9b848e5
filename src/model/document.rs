use plist::{Dictionary, Value};

use super::section::{Section, Sections};
use super::tile::Tile;

/// A dock document: the three tile sections plus every other top-level key
/// of the source, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub sections: Sections,
    /// The source dictionary as read, including the managed section keys so
    /// that key order survives a rewrite.
    root: Dictionary,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from sections alone (no unmanaged keys)
    pub fn from_sections(sections: Sections) -> Self {
        Document {
            sections,
            root: Dictionary::new(),
        }
    }

    /// Split a top-level dictionary into sections and unmanaged keys.
    /// A missing or non-array section key reads as an empty section.
    pub fn from_dictionary(root: Dictionary) -> Self {
        let mut sections = Sections::new();
        for section in Section::ALL {
            sections.set(section, section_tiles(root.get(section.key()), section));
        }
        Document { sections, root }
    }

    /// Rebuild the full top-level dictionary. Managed keys are replaced in
    /// place; a section key that was absent is only added when non-empty.
    pub fn to_dictionary(&self) -> Dictionary {
        let mut root = self.root.clone();
        for section in Section::ALL {
            let key = section.key();
            if root.contains_key(key) || self.sections.len(section) > 0 {
                root.insert(key.to_string(), self.section_value(section));
            }
        }
        root
    }

    /// The array value stored under a section's key
    pub fn section_value(&self, section: Section) -> Value {
        Value::Array(
            self.sections
                .tiles(section)
                .iter()
                .map(|t| Value::Dictionary(t.payload().clone()))
                .collect(),
        )
    }

    /// Top-level keys this tool never touches
    pub fn unmanaged(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.root
            .iter()
            .filter(|(k, _)| !Section::ALL.iter().any(|s| s.key() == k.as_str()))
    }
}

/// Decode one section array. Entries that are not dictionaries cannot be
/// modelled as tiles and are dropped.
pub fn section_tiles(value: Option<&Value>, section: Section) -> Vec<Tile> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item.as_dictionary() {
            Some(dict) => Some(Tile::from_payload(dict.clone())),
            None => {
                tracing::warn!(section = %section, "skipping non-dictionary tile entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tile::TileType;
    use pretty_assertions::assert_eq;

    fn sample_root() -> Dictionary {
        let mut root = Dictionary::new();
        root.insert("autohide".into(), Value::Boolean(true));
        let apps = vec![
            Value::Dictionary(Tile::file("/Applications/Mail.app", "Mail", Section::Apps, 1).into_payload()),
            Value::Dictionary(Tile::spacer(TileType::Spacer, 2).into_payload()),
        ];
        root.insert("persistent-apps".into(), Value::Array(apps));
        root.insert("tilesize".into(), Value::from(48i64));
        root.insert("mod-count".into(), Value::from(12i64));
        root
    }

    #[test]
    fn test_from_dictionary_splits_sections() {
        let doc = Document::from_dictionary(sample_root());
        assert_eq!(doc.sections.len(Section::Apps), 2);
        assert_eq!(doc.sections.len(Section::Recent), 0);
        assert_eq!(doc.sections.len(Section::Others), 0);
        let keys: Vec<&str> = doc.unmanaged().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["autohide", "tilesize", "mod-count"]);
    }

    #[test]
    fn test_round_trip_without_changes() {
        let root = sample_root();
        let doc = Document::from_dictionary(root.clone());
        assert_eq!(doc.to_dictionary(), root);
    }

    #[test]
    fn test_absent_section_written_only_when_used() {
        let mut doc = Document::from_dictionary(sample_root());
        assert!(!doc.to_dictionary().contains_key("persistent-others"));

        doc.sections
            .push(Section::Others, Tile::url_tile("https://example.com", "Example", 3));
        let out = doc.to_dictionary();
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["autohide", "persistent-apps", "tilesize", "mod-count", "persistent-others"]
        );
    }

    #[test]
    fn test_non_array_section_reads_empty() {
        let mut root = Dictionary::new();
        root.insert("persistent-apps".into(), Value::from("garbage"));
        let doc = Document::from_dictionary(root);
        assert_eq!(doc.sections.len(Section::Apps), 0);
    }
}
