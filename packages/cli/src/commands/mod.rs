pub mod annotations;
pub mod attach;
pub mod layers;
pub mod link;
pub mod refresh;
pub mod status;
pub mod unlink;
pub mod unsync;
pub mod watch;

pub use annotations::{annotations, AnnotationsArgs};
pub use attach::{attach, AttachArgs};
pub use layers::{layers, LayersArgs};
pub use link::{link, LinkArgs};
pub use refresh::{refresh, RefreshArgs};
pub use status::{status, StatusArgs};
pub use unlink::{unlink, UnlinkArgs};
pub use unsync::{unsync, UnsyncArgs};
pub use watch::{watch, WatchArgs};

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use stylesync_workspace::{
    DecorationHost, HttpRemoteSource, JsonStateStore, SyncConfig, SyncController, SyncHandle,
};

pub type Controller<H> = SyncController<JsonStateStore, HttpRemoteSource, H>;

/// Everything a command needs besides its own arguments
pub struct Context {
    pub cwd: PathBuf,
    pub config: SyncConfig,
    pub token: Option<String>,
}

/// A stylesheet opened in a controller
pub struct Session<H> {
    pub path: PathBuf,
    pub controller: Controller<H>,
}

impl Context {
    pub fn controller<H: DecorationHost>(&self, host: H) -> (Controller<H>, SyncHandle) {
        let store = JsonStateStore::new(self.config.state_dir(&self.cwd));
        let remote = HttpRemoteSource::new(self.config.api_base_url.clone());

        let (mut controller, handle) = SyncController::new(self.config.clone(), store, remote, host);
        controller.set_credential(self.token.clone());
        (controller, handle)
    }

    /// Read `file` and make it the controller's active file
    pub async fn open<H: DecorationHost>(&self, file: &Path, host: H) -> Result<Session<H>> {
        let (path, text) = self.read(file).await?;
        let uri = file_uri(&path);

        // One-shot commands drive the controller directly, not through its loop
        let (mut controller, _handle) = self.controller(host);
        controller.activate(uri, text).await?;

        Ok(Session { path, controller })
    }

    pub async fn read(&self, file: &Path) -> Result<(PathBuf, String)> {
        let path = tokio::fs::canonicalize(self.cwd.join(file))
            .await
            .with_context(|| format!("Cannot find {}", file.display()))?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;
        Ok((path, text))
    }
}

pub fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// File name for messages, falling back to the full path
pub fn short_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
