use serde::{Deserialize, Serialize};

use super::tile::FolderOptions;

/// Configuration from `config.toml`. Every field is optional in the file;
/// command-line flags override whatever is set here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockConfig {
    /// Directory scanned by `--allhomes`
    #[serde(default = "default_homeloc")]
    pub homeloc: String,
    /// Restart the dock after writing unless `--no-restart` is given
    #[serde(default = "default_true")]
    pub restart: bool,
    /// Defaults for new directory tiles
    #[serde(default)]
    pub folder: FolderOptions,
    #[serde(default)]
    pub reload: ReloadConfig,
}

impl Default for DockConfig {
    fn default() -> Self {
        DockConfig {
            homeloc: default_homeloc(),
            restart: true,
            folder: FolderOptions::default(),
            reload: ReloadConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadConfig {
    /// How long to wait for the document change after signalling a reload
    /// before force-restarting the dock
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Upper bound on waiting for the system to finish its own first writes
    /// to a freshly created dock document
    #[serde(default = "default_modification_wait_secs")]
    pub modification_wait_secs: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        ReloadConfig {
            timeout_ms: default_timeout_ms(),
            modification_wait_secs: default_modification_wait_secs(),
        }
    }
}

fn default_homeloc() -> String {
    "/Users".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    250
}

fn default_modification_wait_secs() -> u64 {
    5
}
