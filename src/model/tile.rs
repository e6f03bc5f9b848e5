use plist::{Dictionary, Value};
use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;

use super::section::Section;

// Payload keys
const GUID: &str = "GUID";
const TILE_TYPE: &str = "tile-type";
const TILE_DATA: &str = "tile-data";
const FILE_DATA: &str = "file-data";
const URL_STRING: &str = "_CFURLString";
const URL_STRING_TYPE: &str = "_CFURLStringType";

/// The kind of a dock tile, as stored in `tile-type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileType {
    File,
    Directory,
    Url,
    Spacer,
    SmallSpacer,
    FlexSpacer,
    /// A tile type this tool does not create, kept verbatim
    Other(String),
}

impl TileType {
    pub fn as_str(&self) -> &str {
        match self {
            TileType::File => "file-tile",
            TileType::Directory => "directory-tile",
            TileType::Url => "url-tile",
            TileType::Spacer => "spacer-tile",
            TileType::SmallSpacer => "small-spacer-tile",
            TileType::FlexSpacer => "flex-spacer-tile",
            TileType::Other(s) => s,
        }
    }

    /// Parse a stored `tile-type` value. Never fails; unknown names become `Other`.
    pub fn from_stored(s: &str) -> TileType {
        match s {
            "file-tile" => TileType::File,
            "directory-tile" => TileType::Directory,
            "url-tile" => TileType::Url,
            "spacer-tile" => TileType::Spacer,
            "small-spacer-tile" => TileType::SmallSpacer,
            "flex-spacer-tile" => TileType::FlexSpacer,
            other => TileType::Other(other.to_string()),
        }
    }

    /// Parse a user-facing type name (`file`, `small-spacer`, ...).
    pub fn from_name(s: &str) -> Option<TileType> {
        match s.strip_suffix("-tile").unwrap_or(s) {
            "file" => Some(TileType::File),
            "directory" => Some(TileType::Directory),
            "url" => Some(TileType::Url),
            "spacer" => Some(TileType::Spacer),
            "small-spacer" => Some(TileType::SmallSpacer),
            "flex-spacer" => Some(TileType::FlexSpacer),
            _ => None,
        }
    }

    pub fn is_spacer(&self) -> bool {
        self.as_str().contains("spacer")
    }
}

impl std::fmt::Display for TileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a folder tile's contents are shown when opened (`showas`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderView {
    #[default]
    Auto,
    Fan,
    Grid,
    List,
}

impl FolderView {
    pub fn value(self) -> i64 {
        match self {
            FolderView::Auto => 0,
            FolderView::Fan => 1,
            FolderView::Grid => 2,
            FolderView::List => 3,
        }
    }

    pub fn from_value(v: i64) -> Option<Self> {
        match v {
            0 => Some(FolderView::Auto),
            1 => Some(FolderView::Fan),
            2 => Some(FolderView::Grid),
            3 => Some(FolderView::List),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(FolderView::Auto),
            "fan" => Some(FolderView::Fan),
            "grid" => Some(FolderView::Grid),
            "list" => Some(FolderView::List),
            _ => None,
        }
    }
}

/// How a folder tile's icon is drawn (`displayas`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderDisplay {
    Stack,
    #[default]
    Folder,
}

impl FolderDisplay {
    pub fn value(self) -> i64 {
        match self {
            FolderDisplay::Stack => 0,
            FolderDisplay::Folder => 1,
        }
    }

    pub fn from_value(v: i64) -> Option<Self> {
        match v {
            0 => Some(FolderDisplay::Stack),
            1 => Some(FolderDisplay::Folder),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stack" => Some(FolderDisplay::Stack),
            "folder" => Some(FolderDisplay::Folder),
            _ => None,
        }
    }
}

/// Sort order of a folder tile's contents (`arrangement`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderSort {
    Name,
    DateAdded,
    #[default]
    DateModified,
    DateCreated,
    Kind,
}

impl FolderSort {
    pub fn value(self) -> i64 {
        match self {
            FolderSort::Name => 1,
            FolderSort::DateAdded => 2,
            FolderSort::DateModified => 3,
            FolderSort::DateCreated => 4,
            FolderSort::Kind => 5,
        }
    }

    pub fn from_value(v: i64) -> Option<Self> {
        match v {
            1 => Some(FolderSort::Name),
            2 => Some(FolderSort::DateAdded),
            3 => Some(FolderSort::DateModified),
            4 => Some(FolderSort::DateCreated),
            5 => Some(FolderSort::Kind),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(FolderSort::Name),
            "dateadded" => Some(FolderSort::DateAdded),
            "datemodified" => Some(FolderSort::DateModified),
            "datecreated" => Some(FolderSort::DateCreated),
            "kind" => Some(FolderSort::Kind),
            _ => None,
        }
    }
}

/// Display options carried by directory tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FolderOptions {
    #[serde(default)]
    pub view: FolderView,
    #[serde(default)]
    pub display: FolderDisplay,
    #[serde(default)]
    pub sort: FolderSort,
}

/// Generate a fresh tile GUID. Uniqueness is not checked against the document.
pub fn random_guid() -> i64 {
    rand::thread_rng().gen_range(1_000_000_000..9_999_999_999)
}

/// One placed dock item.
///
/// The tile is stored as its raw ordered dictionary so that fields this tool
/// does not understand (bookmarks, mod dates, ...) survive a rewrite. The
/// accessors below are views over a known subset of keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    payload: Dictionary,
}

impl Tile {
    pub fn from_payload(payload: Dictionary) -> Self {
        Tile { payload }
    }

    pub fn payload(&self) -> &Dictionary {
        &self.payload
    }

    pub fn into_payload(self) -> Dictionary {
        self.payload
    }

    /// Look up a nested value by a path of dictionary keys
    fn value_at(&self, path: &[&str]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut dict = &self.payload;
        for key in parents {
            dict = dict.get(key)?.as_dictionary()?;
        }
        dict.get(last)
    }

    fn string_at(&self, path: &[&str]) -> Option<&str> {
        self.value_at(path).and_then(Value::as_string)
    }

    fn integer_at(&self, path: &[&str]) -> Option<i64> {
        self.value_at(path).and_then(Value::as_signed_integer)
    }

    pub fn id(&self) -> Option<i64> {
        self.integer_at(&[GUID])
    }

    pub fn tile_type(&self) -> Option<TileType> {
        self.string_at(&[TILE_TYPE]).map(TileType::from_stored)
    }

    pub fn label(&self) -> Option<&str> {
        self.string_at(&[TILE_DATA, "file-label"])
            .or_else(|| self.string_at(&[TILE_DATA, "label"]))
    }

    pub fn bundle_identifier(&self) -> Option<&str> {
        self.string_at(&[TILE_DATA, "bundle-identifier"])
    }

    /// The stored path or URL string
    pub fn url(&self) -> Option<&str> {
        self.string_at(&[TILE_DATA, FILE_DATA, URL_STRING])
            .or_else(|| self.string_at(&[TILE_DATA, "url", URL_STRING]))
    }

    /// Folder options, if this tile carries any of them
    pub fn folder_options(&self) -> Option<FolderOptions> {
        let view = self.integer_at(&[TILE_DATA, "showas"]);
        let display = self.integer_at(&[TILE_DATA, "displayas"]);
        let sort = self.integer_at(&[TILE_DATA, "arrangement"]);
        if view.is_none() && display.is_none() && sort.is_none() {
            return None;
        }
        Some(FolderOptions {
            view: view.and_then(FolderView::from_value).unwrap_or_default(),
            display: display.and_then(FolderDisplay::from_value).unwrap_or_default(),
            sort: sort.and_then(FolderSort::from_value).unwrap_or_default(),
        })
    }

    pub fn is_spacer(&self) -> bool {
        self.tile_type().is_some_and(|t| t.is_spacer())
    }

    /// The filesystem path encoded by `url`, percent-decoded and without a
    /// trailing slash.
    pub fn decoded_path(&self) -> Option<String> {
        self.url().and_then(decode_url_path)
    }

    // -----------------------------------------------------------------------
    // Constructors for new tiles
    // -----------------------------------------------------------------------

    /// An application or document tile. Recent-section tiles use file-type 1.
    pub fn file(path: &str, label: &str, section: Section, guid: i64) -> Self {
        let mut data = Dictionary::new();
        data.insert(FILE_DATA.into(), file_data(path, 0));
        data.insert("file-label".into(), Value::from(label));
        let file_type: i64 = if section == Section::Recent { 1 } else { 41 };
        data.insert("file-type".into(), Value::from(file_type));
        Self::with_data(TileType::File, data, guid)
    }

    pub fn directory(path: &str, label: &str, options: FolderOptions, guid: i64) -> Self {
        let mut data = Dictionary::new();
        data.insert("directory".into(), Value::from(1i64));
        data.insert("arrangement".into(), Value::from(options.sort.value()));
        data.insert("displayas".into(), Value::from(options.display.value()));
        data.insert("showas".into(), Value::from(options.view.value()));
        data.insert(FILE_DATA.into(), file_data(path, 0));
        data.insert("file-label".into(), Value::from(label));
        data.insert("file-type".into(), Value::from(2i64));
        Self::with_data(TileType::Directory, data, guid)
    }

    pub fn url_tile(url: &str, label: &str, guid: i64) -> Self {
        let mut data = Dictionary::new();
        data.insert("label".into(), Value::from(label));
        data.insert("url".into(), file_data(url, 15));
        Self::with_data(TileType::Url, data, guid)
    }

    /// A spacer of the given kind; non-spacer kinds are coerced to a plain spacer.
    pub fn spacer(kind: TileType, guid: i64) -> Self {
        let kind = if kind.is_spacer() { kind } else { TileType::Spacer };
        Self::with_data(kind, Dictionary::new(), guid)
    }

    fn with_data(kind: TileType, data: Dictionary, guid: i64) -> Self {
        let mut payload = Dictionary::new();
        payload.insert(GUID.into(), Value::from(guid));
        payload.insert(TILE_DATA.into(), Value::Dictionary(data));
        payload.insert(TILE_TYPE.into(), Value::from(kind.as_str()));
        Tile { payload }
    }
}

fn file_data(url: &str, url_type: i64) -> Value {
    let mut dict = Dictionary::new();
    dict.insert(URL_STRING.into(), Value::from(url));
    dict.insert(URL_STRING_TYPE.into(), Value::from(url_type));
    Value::Dictionary(dict)
}

/// Turn a stored `_CFURLString` into a comparable path.
///
/// Bare paths are used as-is, `file://` URLs are percent-decoded into a path,
/// and other schemes yield their path component.
pub fn decode_url_path(raw: &str) -> Option<String> {
    let path = if raw.starts_with('/') {
        raw.to_string()
    } else {
        let parsed = Url::parse(raw).ok()?;
        if parsed.scheme() == "file" {
            parsed.to_file_path().ok()?.to_string_lossy().into_owned()
        } else {
            // A bare host has no path to match against
            match parsed.path() {
                "" | "/" => return None,
                path => path.to_string(),
            }
        }
    };
    Some(trim_trailing_slash(path))
}

fn trim_trailing_slash(mut path: String) -> String {
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}
