use std::fs;
use std::io::{self, Write};
use std::path::Path;

use plist::{Dictionary, Value};
use tempfile::NamedTempFile;

use crate::io::store::StoreError;

/// Reads and writes a whole dock document as a top-level dictionary
pub trait DocumentCodec {
    fn load(&self, path: &Path) -> Result<Dictionary, StoreError>;
    fn save(&self, path: &Path, root: &Dictionary) -> Result<(), StoreError>;
}

/// Direct file access through the `plist` crate. Writes binary plists.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlistFile;

impl DocumentCodec for PlistFile {
    fn load(&self, path: &Path) -> Result<Dictionary, StoreError> {
        let value = Value::from_file(path).map_err(|e| StoreError::DocumentUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        dictionary_root(value, path)
    }

    fn save(&self, path: &Path, root: &Dictionary) -> Result<(), StoreError> {
        let bytes = encode_binary(root).map_err(|e| StoreError::DocumentUnwritable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        atomic_write(path, &bytes).map_err(|e| StoreError::DocumentUnwritable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Parse plist bytes (any format) into a top-level dictionary
pub fn decode(bytes: &[u8], path: &Path) -> Result<Dictionary, StoreError> {
    let value = Value::from_reader(io::Cursor::new(bytes)).map_err(|e| {
        StoreError::DocumentUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;
    dictionary_root(value, path)
}

fn dictionary_root(value: Value, path: &Path) -> Result<Dictionary, StoreError> {
    value
        .into_dictionary()
        .ok_or_else(|| StoreError::DocumentUnreadable {
            path: path.to_path_buf(),
            reason: "top-level object is not a dictionary".to_string(),
        })
}

/// Serialize a dictionary as a binary plist
pub fn encode_binary(root: &Dictionary) -> Result<Vec<u8>, plist::Error> {
    let mut buf = Vec::new();
    Value::Dictionary(root.clone()).to_writer_binary(&mut buf)?;
    Ok(buf)
}

/// Write via a temp file in the same directory, then rename over `path`.
/// The original file's permission bits are carried over.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Numeric owner of a file
#[cfg(unix)]
pub fn file_owner(path: &Path) -> io::Result<u32> {
    use std::os::unix::fs::MetadataExt;
    Ok(fs::metadata(path)?.uid())
}

#[cfg(not(unix))]
pub fn file_owner(_path: &Path) -> io::Result<u32> {
    Ok(0)
}

/// Hand the file back to `uid` if a rewrite changed its owner
#[cfg(unix)]
pub fn restore_owner(path: &Path, uid: u32) -> io::Result<()> {
    if file_owner(path)? == uid {
        return Ok(());
    }
    std::os::unix::fs::chown(path, Some(uid), None)
}

#[cfg(not(unix))]
pub fn restore_owner(_path: &Path, _uid: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Dictionary {
        let mut root = Dictionary::new();
        root.insert("tilesize".into(), Value::from(36i64));
        root.insert("persistent-apps".into(), Value::Array(Vec::new()));
        root.insert("orientation".into(), Value::from("left"));
        root
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("com.apple.dock.plist");
        PlistFile.save(&path, &sample()).unwrap();
        let loaded = PlistFile.load(&path).unwrap();
        let keys: Vec<&str> = loaded.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["tilesize", "persistent-apps", "orientation"]);
        assert_eq!(loaded.get("orientation"), Some(&Value::from("left")));
    }

    #[test]
    fn test_load_garbage_is_unreadable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.plist");
        fs::write(&path, b"this is not a plist").unwrap();
        assert!(matches!(
            PlistFile.load(&path),
            Err(StoreError::DocumentUnreadable { .. })
        ));
    }

    #[test]
    fn test_non_dictionary_root_is_unreadable() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<array><string>nope</string></array>
</plist>
"#;
        assert!(matches!(
            decode(xml, Path::new("x.plist")),
            Err(StoreError::DocumentUnreadable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.plist");
        fs::write(&path, b"old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
        atomic_write(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn test_restore_owner_same_uid_is_noop() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.plist");
        fs::write(&path, b"x").unwrap();
        let owner = file_owner(&path).unwrap();
        restore_owner(&path, owner).unwrap();
        assert_eq!(file_owner(&path).unwrap(), owner);
    }
}
