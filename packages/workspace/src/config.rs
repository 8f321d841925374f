use crate::remote::DEFAULT_API_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_STATE_DIR: &str = ".stylesync";

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Quiet period after the last edit before decorations are reconciled
    #[serde(default = "default_change_wait_ms")]
    pub change_wait_ms: u64,

    /// Style token handed to the decoration host
    #[serde(default = "default_style_token")]
    pub style_token: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Where state records live; relative paths resolve against the working
    /// directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<String>,
}

fn default_change_wait_ms() -> u64 {
    1000
}

fn default_style_token() -> String {
    "stylesync.linked".to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl SyncConfig {
    pub fn change_wait(&self) -> Duration {
        Duration::from_millis(self.change_wait_ms)
    }

    pub fn state_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(self.state_dir.as_deref().unwrap_or(DEFAULT_STATE_DIR))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            change_wait_ms: default_change_wait_ms(),
            style_token: default_style_token(),
            api_base_url: default_api_base_url(),
            state_dir: None,
        }
    }
}
