use anyhow::Context;
use std::path::Path;
use stylesync_workspace::SyncConfig;

pub const DEFAULT_CONFIG_NAME: &str = "stylesync.config.json";

/// Load `stylesync.config.json` from `cwd`, falling back to defaults when the
/// file does not exist
pub fn load(cwd: &Path) -> anyhow::Result<SyncConfig> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    if !config_path.exists() {
        return Ok(SyncConfig::default());
    }

    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Cannot read {}", config_path.display()))?;
    let config = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config in {}", config_path.display()))?;
    Ok(config)
}
