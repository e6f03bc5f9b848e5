use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::DockConfig;

/// Environment variable naming an alternative config file
pub const CONFIG_ENV: &str = "DOCKUTIL_CONFIG";

/// Error type for loading the config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Where the config lives: an explicit path, then `$DOCKUTIL_CONFIG`, then
/// `dockutil/config.toml` in the platform config directory.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("dockutil").join("config.toml"))
}

/// Load the config. A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<DockConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(DockConfig::default());
    };
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(DockConfig::default());
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tile::{FolderDisplay, FolderSort, FolderView};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(Some(&tmp.path().join("config.toml"))).unwrap();
        assert_eq!(config.homeloc, "/Users");
        assert!(config.restart);
        assert_eq!(config.reload.timeout_ms, 250);
        assert_eq!(config.reload.modification_wait_secs, 5);
    }

    #[test]
    fn test_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"homeloc = "/home"
restart = false

[folder]
view = "grid"
sort = "name"

[reload]
timeout_ms = 1000
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.homeloc, "/home");
        assert!(!config.restart);
        assert_eq!(config.folder.view, FolderView::Grid);
        assert_eq!(config.folder.display, FolderDisplay::Folder);
        assert_eq!(config.folder.sort, FolderSort::Name);
        assert_eq!(config.reload.timeout_ms, 1000);
        assert_eq!(config.reload.modification_wait_secs, 5);
    }

    #[test]
    fn test_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "restart = \"sometimes\"\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_explicit_path_wins() {
        let explicit = Path::new("/etc/dockutil.toml");
        assert_eq!(config_path(Some(explicit)), Some(explicit.to_path_buf()));
    }
}
